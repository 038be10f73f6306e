// 📤 Load Gateway - canonical records → staging / analytics tables
// One transaction per call. Replace = delete + insert, Upsert = insert or
// update by the table's natural key. Rounding happens here and nowhere else.

use crate::db::{insert_load_event, LoadEvent};
use crate::errors::{PersistenceError, PersistenceErrorKind};
use crate::models::{
    BenchmarkPricePoint, ExchangeRatePoint, MonthlyBenchmarkSummary, MonthlyExchangeSummary,
    MonthlyRetailSummary, RetailPriceRecord,
};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

// ============================================================================
// STRATEGY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteStrategy {
    /// Delete every row, then insert the batch
    #[default]
    Replace,
    /// Insert or update by natural key
    Upsert,
}

impl WriteStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteStrategy::Replace => "replace",
            WriteStrategy::Upsert => "upsert",
        }
    }
}

// ============================================================================
// TABLE SPECS
// ============================================================================

/// How a column's value is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Date,
    Text,
    Integer,
    /// Prices and rates: 2 decimals
    Money,
    /// Percentages and volumes: 4 decimals
    Ratio,
}

/// Stored precision of `Money` columns
pub const MONEY_DECIMALS: i32 = 2;
/// Stored precision of `Ratio` columns
pub const RATIO_DECIMALS: i32 = 4;

impl ColumnKind {
    fn decimals(&self) -> Option<i32> {
        match self {
            ColumnKind::Money => Some(MONEY_DECIMALS),
            ColumnKind::Ratio => Some(RATIO_DECIMALS),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn col(name: &'static str, kind: ColumnKind) -> Column {
    Column { name, kind }
}

use ColumnKind::{Date, Integer, Money, Ratio, Text};

const BENCHMARK_PRICES: &[Column] = &[col("date", Date), col("price", Money)];

const RETAIL_PRICES: &[Column] = &[
    col("period", Date),
    col("region", Text),
    col("brand", Text),
    col("product", Text),
    col("pump_price", Money),
    col("volume", Ratio),
    col("market_share_pct", Ratio),
];

const EXCHANGE_RATES: &[Column] = &[
    col("date", Date),
    col("source_tag", Text),
    col("buy", Money),
    col("sell", Money),
];

const BENCHMARK_MONTHLY: &[Column] = &[
    col("month", Date),
    col("avg_price", Money),
    col("min_price", Money),
    col("max_price", Money),
    col("sample_count", Integer),
];

const RETAIL_MONTHLY: &[Column] = &[
    col("month", Date),
    col("product", Text),
    col("median_price", Money),
    col("total_volume", Ratio),
    col("sample_count", Integer),
];

const RETAIL_MONTHLY_REGIONAL: &[Column] = &[
    col("month", Date),
    col("region", Text),
    col("brand", Text),
    col("product", Text),
    col("median_price", Money),
    col("total_volume", Ratio),
    col("sample_count", Integer),
];

const EXCHANGE_MONTHLY: &[Column] = &[
    col("month", Date),
    col("avg_oficial", Money),
    col("avg_blue", Money),
    col("avg_gap_pct", Ratio),
    col("sample_count", Integer),
];

/// Every destination table the gateway knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    StagingBenchmark,
    StagingRetail,
    StagingExchange,
    AnalyticsBenchmark,
    AnalyticsRetail,
    AnalyticsRetailRegional,
    AnalyticsExchange,
}

impl Table {
    pub const ALL: [Table; 7] = [
        Table::StagingBenchmark,
        Table::StagingRetail,
        Table::StagingExchange,
        Table::AnalyticsBenchmark,
        Table::AnalyticsRetail,
        Table::AnalyticsRetailRegional,
        Table::AnalyticsExchange,
    ];

    pub fn schema(&self) -> &'static str {
        match self {
            Table::StagingBenchmark | Table::StagingRetail | Table::StagingExchange => "staging",
            _ => "analytics",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Table::StagingBenchmark => "benchmark_prices",
            Table::StagingRetail => "retail_prices",
            Table::StagingExchange => "exchange_rates",
            Table::AnalyticsBenchmark => "benchmark_prices_monthly",
            Table::AnalyticsRetail => "retail_prices_monthly",
            Table::AnalyticsRetailRegional => "retail_prices_monthly_regional",
            Table::AnalyticsExchange => "exchange_rates_monthly",
        }
    }

    /// `schema.name`
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.schema(), self.name())
    }

    /// Business columns in insert order (surrogate id and load_timestamp excluded)
    pub fn columns(&self) -> &'static [Column] {
        match self {
            Table::StagingBenchmark => BENCHMARK_PRICES,
            Table::StagingRetail => RETAIL_PRICES,
            Table::StagingExchange => EXCHANGE_RATES,
            Table::AnalyticsBenchmark => BENCHMARK_MONTHLY,
            Table::AnalyticsRetail => RETAIL_MONTHLY,
            Table::AnalyticsRetailRegional => RETAIL_MONTHLY_REGIONAL,
            Table::AnalyticsExchange => EXCHANGE_MONTHLY,
        }
    }

    /// Natural key used by `Upsert`. Retail staging has none.
    pub fn conflict_key(&self) -> Option<&'static [&'static str]> {
        match self {
            Table::StagingBenchmark => Some(&["date"]),
            Table::StagingRetail => None,
            Table::StagingExchange => Some(&["date", "source_tag"]),
            Table::AnalyticsBenchmark | Table::AnalyticsExchange => Some(&["month"]),
            Table::AnalyticsRetail => Some(&["month", "product"]),
            Table::AnalyticsRetailRegional => Some(&["month", "region", "brand", "product"]),
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema(), self.name())
    }
}

// ============================================================================
// LOADABLE RECORDS
// ============================================================================

/// A record type that knows which tables it belongs to and how it maps onto
/// their columns.
pub trait Loadable {
    fn accepts(table: Table) -> bool;

    /// Values in `table.columns()` order, unrounded
    fn to_row(&self, table: Table) -> Vec<Value>;
}

fn date_value(date: NaiveDate) -> Value {
    Value::Text(date.format("%Y-%m-%d").to_string())
}

fn text_value(text: &str) -> Value {
    Value::Text(text.to_string())
}

fn opt_real(value: Option<f64>) -> Value {
    value.map(Value::Real).unwrap_or(Value::Null)
}

impl Loadable for BenchmarkPricePoint {
    fn accepts(table: Table) -> bool {
        table == Table::StagingBenchmark
    }

    fn to_row(&self, _table: Table) -> Vec<Value> {
        vec![date_value(self.date), Value::Real(self.price)]
    }
}

impl Loadable for RetailPriceRecord {
    fn accepts(table: Table) -> bool {
        table == Table::StagingRetail
    }

    fn to_row(&self, _table: Table) -> Vec<Value> {
        vec![
            date_value(self.period),
            text_value(&self.region),
            self.brand.as_deref().map(text_value).unwrap_or(Value::Null),
            text_value(&self.product),
            Value::Real(self.pump_price),
            opt_real(self.volume),
            opt_real(self.market_share_pct),
        ]
    }
}

impl Loadable for ExchangeRatePoint {
    fn accepts(table: Table) -> bool {
        table == Table::StagingExchange
    }

    fn to_row(&self, _table: Table) -> Vec<Value> {
        vec![
            date_value(self.date),
            text_value(self.source_tag.as_str()),
            opt_real(self.buy),
            Value::Real(self.sell),
        ]
    }
}

impl Loadable for MonthlyBenchmarkSummary {
    fn accepts(table: Table) -> bool {
        table == Table::AnalyticsBenchmark
    }

    fn to_row(&self, _table: Table) -> Vec<Value> {
        vec![
            date_value(self.month),
            Value::Real(self.avg_price),
            Value::Real(self.min_price),
            Value::Real(self.max_price),
            Value::Integer(self.sample_count),
        ]
    }
}

impl Loadable for MonthlyRetailSummary {
    fn accepts(table: Table) -> bool {
        matches!(table, Table::AnalyticsRetail | Table::AnalyticsRetailRegional)
    }

    fn to_row(&self, table: Table) -> Vec<Value> {
        let mut row = vec![date_value(self.month)];
        if table == Table::AnalyticsRetailRegional {
            // Key columns are NOT NULL; an absent brand is stored as ''
            row.push(text_value(self.region.as_deref().unwrap_or("")));
            row.push(text_value(self.brand.as_deref().unwrap_or("")));
        }
        row.extend([
            text_value(&self.product),
            Value::Real(self.median_price),
            Value::Real(self.total_volume),
            Value::Integer(self.sample_count),
        ]);
        row
    }
}

impl Loadable for MonthlyExchangeSummary {
    fn accepts(table: Table) -> bool {
        table == Table::AnalyticsExchange
    }

    fn to_row(&self, _table: Table) -> Vec<Value> {
        vec![
            date_value(self.month),
            opt_real(self.avg_oficial),
            opt_real(self.avg_blue),
            opt_real(self.avg_gap_pct),
            Value::Integer(self.sample_count),
        ]
    }
}

// ============================================================================
// ROUNDING + FINGERPRINT
// ============================================================================

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn round_row(columns: &[Column], row: Vec<Value>) -> Vec<Value> {
    row.into_iter()
        .zip(columns)
        .map(|(value, column)| match (value, column.kind.decimals()) {
            (Value::Real(v), Some(decimals)) => Value::Real(round_to(v, decimals)),
            (value, _) => value,
        })
        .collect()
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => format!("{:.4}", r),
        Value::Text(t) => t.clone(),
        Value::Blob(b) => format!("{:?}", b),
    }
}

/// SHA-256 over the rendered rows in sorted order, so input order does not matter.
pub fn fingerprint(rows: &[Vec<Value>]) -> String {
    let mut lines: Vec<String> = rows
        .iter()
        .map(|row| row.iter().map(render_value).collect::<Vec<_>>().join("|"))
        .collect();
    lines.sort();

    let mut hasher = Sha256::new();
    for line in &lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// GATEWAY
// ============================================================================

/// Outcome of one committed load call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub table: Table,
    pub strategy: WriteStrategy,
    pub attempted: usize,
    pub written: usize,
    /// Rows deleted by `Replace` before inserting
    pub removed: usize,
    pub fingerprint: String,
}

fn insert_sql(table: Table, strategy: WriteStrategy) -> Result<String, PersistenceError> {
    let columns = table.columns();
    let names: Vec<&str> = columns.iter().map(|c| c.name).collect();
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();

    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table.qualified(),
        names.join(", "),
        placeholders.join(", ")
    );

    if strategy == WriteStrategy::Upsert {
        let key = table.conflict_key().ok_or_else(|| {
            PersistenceError::new(
                table.qualified(),
                0,
                PersistenceErrorKind::MissingConflictKey,
                "upsert needs a natural key and this table has none",
            )
        })?;

        let updates: Vec<String> = names
            .iter()
            .filter(|n| !key.contains(n))
            .map(|n| format!("{n} = excluded.{n}"))
            .chain(std::iter::once("load_timestamp = CURRENT_TIMESTAMP".to_string()))
            .collect();

        sql.push_str(&format!(
            " ON CONFLICT ({}) DO UPDATE SET {}",
            key.join(", "),
            updates.join(", ")
        ));
    }

    Ok(sql)
}

/// Write `records` into `table` in one transaction.
///
/// On any failure the transaction is dropped uncommitted and the table keeps
/// its pre-call content. After commit a `load_log` entry is appended on a
/// best-effort basis.
pub fn load<R: Loadable>(
    conn: &mut Connection,
    records: &[R],
    table: Table,
    strategy: WriteStrategy,
    run_id: &str,
) -> Result<LoadReport, PersistenceError> {
    let attempted = records.len();
    let qualified = table.qualified();

    if !R::accepts(table) {
        return Err(PersistenceError::new(
            qualified,
            attempted,
            PersistenceErrorKind::SchemaMismatch,
            format!("{} records do not belong in this table", std::any::type_name::<R>()),
        ));
    }

    let sql = insert_sql(table, strategy).map_err(|e| PersistenceError { attempted, ..e })?;
    let rows: Vec<Vec<Value>> = records
        .iter()
        .map(|r| round_row(table.columns(), r.to_row(table)))
        .collect();

    debug!(table = %qualified, strategy = strategy.as_str(), attempted, "load begin");

    let sqlite_err = |e: rusqlite::Error| PersistenceError::from_sqlite(&qualified, attempted, e);

    let tx = conn.transaction().map_err(sqlite_err)?;

    let removed = match strategy {
        WriteStrategy::Replace => tx
            .execute(&format!("DELETE FROM {}", qualified), [])
            .map_err(sqlite_err)?,
        WriteStrategy::Upsert => 0,
    };

    let mut written = 0;
    {
        let mut stmt = tx.prepare(&sql).map_err(sqlite_err)?;
        for row in &rows {
            match stmt.execute(rusqlite::params_from_iter(row.iter())) {
                Ok(n) => written += n,
                Err(e) => {
                    warn!(table = %qualified, error = %e, "load rolled back");
                    return Err(sqlite_err(e));
                }
            }
        }
    }

    tx.commit().map_err(sqlite_err)?;

    let report = LoadReport {
        table,
        strategy,
        attempted,
        written,
        removed,
        fingerprint: fingerprint(&rows),
    };

    info!(
        table = %qualified,
        strategy = strategy.as_str(),
        written = report.written,
        removed = report.removed,
        "load committed"
    );

    if let Err(e) = insert_load_event(conn, &LoadEvent::from_report(run_id, &report)) {
        warn!(table = %qualified, error = %e, "failed to record load in load_log");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, count_rows, fetch_rows, get_load_events, StorageLayout};
    use crate::models::SourceTag;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn point(day: u32, price: f64) -> BenchmarkPricePoint {
        BenchmarkPricePoint {
            date: d(2024, 1, day),
            price,
        }
    }

    fn conn() -> Connection {
        db::open(&StorageLayout::InMemory).unwrap()
    }

    #[test]
    fn test_replace_with_empty_input_empties_table() {
        let mut conn = conn();
        let existing: Vec<_> = (1..=10).map(|day| point(day, 80.0 + day as f64)).collect();
        load(&mut conn, &existing, Table::StagingBenchmark, WriteStrategy::Replace, "r1").unwrap();
        assert_eq!(count_rows(&conn, Table::StagingBenchmark).unwrap(), 10);

        let empty: Vec<BenchmarkPricePoint> = Vec::new();
        let report = load(&mut conn, &empty, Table::StagingBenchmark, WriteStrategy::Replace, "r2").unwrap();

        assert_eq!(count_rows(&conn, Table::StagingBenchmark).unwrap(), 0);
        assert_eq!(report.removed, 10);
        assert_eq!(report.written, 0);
    }

    #[test]
    fn test_upsert_keeps_latest_value_per_key() {
        let mut conn = conn();

        load(&mut conn, &[point(1, 80.0)], Table::StagingBenchmark, WriteStrategy::Upsert, "r1").unwrap();
        load(&mut conn, &[point(1, 81.5)], Table::StagingBenchmark, WriteStrategy::Upsert, "r2").unwrap();

        let rows = fetch_rows(&conn, Table::StagingBenchmark).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1], Value::Real(81.5));
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut conn = conn();
        let batch = vec![point(1, 80.0), point(2, 81.0)];

        let first = load(&mut conn, &batch, Table::StagingBenchmark, WriteStrategy::Upsert, "r1").unwrap();
        let after_first = fetch_rows(&conn, Table::StagingBenchmark).unwrap();
        let second = load(&mut conn, &batch, Table::StagingBenchmark, WriteStrategy::Upsert, "r2").unwrap();

        assert_eq!(after_first, fetch_rows(&conn, Table::StagingBenchmark).unwrap());
        assert_eq!(first.fingerprint, second.fingerprint);
    }

    #[test]
    fn test_failed_replace_leaves_previous_rows() {
        let mut conn = conn();
        load(&mut conn, &[point(1, 80.0), point(2, 81.0)], Table::StagingBenchmark, WriteStrategy::Replace, "r1")
            .unwrap();
        let before = fetch_rows(&conn, Table::StagingBenchmark).unwrap();

        // Rounds to 0.00 and violates CHECK (price > 0) after the DELETE ran
        let err = load(
            &mut conn,
            &[point(3, 82.0), point(4, 0.001)],
            Table::StagingBenchmark,
            WriteStrategy::Replace,
            "r2",
        )
        .unwrap_err();

        assert_eq!(err.kind, PersistenceErrorKind::Constraint);
        assert_eq!(err.table, "staging.benchmark_prices");
        assert_eq!(err.attempted, 2);
        assert_eq!(fetch_rows(&conn, Table::StagingBenchmark).unwrap(), before);
    }

    #[test]
    fn test_failed_upsert_applies_no_inserts_or_updates() {
        let mut conn = conn();
        load(&mut conn, &[point(1, 80.0), point(2, 81.0)], Table::StagingBenchmark, WriteStrategy::Upsert, "r1")
            .unwrap();
        let before = fetch_rows(&conn, Table::StagingBenchmark).unwrap();

        // New key, update of day 1, then a row that violates CHECK (price > 0)
        let err = load(
            &mut conn,
            &[point(3, 82.0), point(1, 90.0), point(4, 0.001)],
            Table::StagingBenchmark,
            WriteStrategy::Upsert,
            "r2",
        )
        .unwrap_err();

        assert_eq!(err.kind, PersistenceErrorKind::Constraint);
        assert_eq!(err.attempted, 3);
        assert_eq!(fetch_rows(&conn, Table::StagingBenchmark).unwrap(), before);
        assert_eq!(count_rows(&conn, Table::StagingBenchmark).unwrap(), 2);
    }

    #[test]
    fn test_upsert_without_natural_key_is_refused() {
        let mut conn = conn();
        let record = RetailPriceRecord {
            period: d(2024, 1, 1),
            region: "Salta".to_string(),
            brand: None,
            product: "GNC".to_string(),
            pump_price: 100.0,
            volume: None,
            market_share_pct: None,
        };

        let err = load(&mut conn, &[record], Table::StagingRetail, WriteStrategy::Upsert, "r1").unwrap_err();

        assert_eq!(err.kind, PersistenceErrorKind::MissingConflictKey);
        assert_eq!(err.attempted, 1);
        assert_eq!(count_rows(&conn, Table::StagingRetail).unwrap(), 0);
    }

    #[test]
    fn test_foreign_table_is_schema_mismatch() {
        let mut conn = conn();

        let err = load(&mut conn, &[point(1, 80.0)], Table::AnalyticsBenchmark, WriteStrategy::Replace, "r1")
            .unwrap_err();

        assert_eq!(err.kind, PersistenceErrorKind::SchemaMismatch);
    }

    #[test]
    fn test_rounding_at_write_time() {
        let mut conn = conn();
        let summary = MonthlyExchangeSummary {
            month: d(2024, 1, 1),
            avg_oficial: Some(150.004),
            avg_blue: Some(185.0051),
            avg_gap_pct: Some(23.333333),
            sample_count: 2,
        };

        load(&mut conn, &[summary], Table::AnalyticsExchange, WriteStrategy::Replace, "r1").unwrap();

        let rows = fetch_rows(&conn, Table::AnalyticsExchange).unwrap();
        assert_eq!(rows[0][0], Value::Text("2024-01-01".to_string()));
        assert_eq!(rows[0][1], Value::Real(150.0));
        assert_eq!(rows[0][2], Value::Real(185.01));
        assert_eq!(rows[0][3], Value::Real(23.3333));
        assert_eq!(rows[0][4], Value::Integer(2));
    }

    #[test]
    fn test_regional_summary_stores_missing_brand_as_empty() {
        let mut conn = conn();
        let summary = MonthlyRetailSummary {
            month: d(2024, 1, 1),
            region: Some("Salta".to_string()),
            brand: None,
            product: "GNC".to_string(),
            median_price: 115.0,
            total_volume: 0.0,
            sample_count: 4,
        };

        load(&mut conn, &[summary.clone()], Table::AnalyticsRetailRegional, WriteStrategy::Upsert, "r1").unwrap();
        load(&mut conn, &[summary], Table::AnalyticsRetailRegional, WriteStrategy::Upsert, "r2").unwrap();

        let rows = fetch_rows(&conn, Table::AnalyticsRetailRegional).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][2], Value::Text(String::new()));
    }

    #[test]
    fn test_exchange_upsert_keys_on_date_and_tag() {
        let mut conn = conn();
        let quotes = vec![
            ExchangeRatePoint {
                date: d(2024, 1, 2),
                source_tag: SourceTag::Oficial,
                buy: None,
                sell: 820.0,
            },
            ExchangeRatePoint {
                date: d(2024, 1, 2),
                source_tag: SourceTag::Blue,
                buy: Some(990.0),
                sell: 1010.0,
            },
        ];

        load(&mut conn, &quotes, Table::StagingExchange, WriteStrategy::Upsert, "r1").unwrap();
        load(&mut conn, &quotes, Table::StagingExchange, WriteStrategy::Upsert, "r2").unwrap();

        assert_eq!(count_rows(&conn, Table::StagingExchange).unwrap(), 2);
    }

    #[test]
    fn test_fingerprint_ignores_input_order() {
        let a = vec![point(1, 80.0), point(2, 81.0)];
        let b = vec![point(2, 81.0), point(1, 80.0)];

        let rows = |points: &[BenchmarkPricePoint]| -> Vec<Vec<Value>> {
            points.iter().map(|p| p.to_row(Table::StagingBenchmark)).collect()
        };

        assert_eq!(fingerprint(&rows(&a)), fingerprint(&rows(&b)));
        assert_ne!(fingerprint(&rows(&a)), fingerprint(&rows(&a[..1])));
    }

    #[test]
    fn test_successful_load_is_audited() {
        let mut conn = conn();

        let report = load(&mut conn, &[point(1, 80.0)], Table::StagingBenchmark, WriteStrategy::Replace, "run-42")
            .unwrap();

        let events = get_load_events(&conn, Some("run-42")).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].table_name, "staging.benchmark_prices");
        assert_eq!(events[0].fingerprint, report.fingerprint);
    }

    #[test]
    fn test_missing_audit_table_does_not_fail_load() {
        let mut conn = conn();
        conn.execute("DROP TABLE main.load_log", []).unwrap();

        let report = load(&mut conn, &[point(1, 80.0)], Table::StagingBenchmark, WriteStrategy::Replace, "r1");

        assert!(report.is_ok());
        assert_eq!(count_rows(&conn, Table::StagingBenchmark).unwrap(), 1);
    }
}
