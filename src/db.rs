// 🗄️ Storage layout, DDL and read helpers
// Main database holds the load_log audit table; `staging` and `analytics`
// are attached databases.

use crate::load::{LoadReport, Table};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, Connection, DatabaseName};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the three databases live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLayout {
    /// Everything in memory (tests, dry runs)
    InMemory,
    /// `etl.db`, `staging.db` and `analytics.db` inside this directory
    Directory(PathBuf),
}

impl StorageLayout {
    fn main_path(&self) -> Option<PathBuf> {
        match self {
            StorageLayout::InMemory => None,
            StorageLayout::Directory(dir) => Some(dir.join("etl.db")),
        }
    }

    fn attached_path(&self, schema: &str) -> String {
        match self {
            StorageLayout::InMemory => ":memory:".to_string(),
            StorageLayout::Directory(dir) => dir.join(format!("{}.db", schema)).display().to_string(),
        }
    }
}

/// Open the main database, attach both schemas and create every table.
pub fn open(layout: &StorageLayout) -> Result<Connection> {
    let conn = match layout.main_path() {
        None => Connection::open_in_memory().context("Failed to open in-memory database")?,
        Some(path) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
            }
            Connection::open(&path).with_context(|| format!("Failed to open {}", path.display()))?
        }
    };

    setup_database(&conn, layout)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection, layout: &StorageLayout) -> Result<()> {
    for schema in ["staging", "analytics"] {
        let attached: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM pragma_database_list WHERE name = ?1",
            [schema],
            |row| row.get(0),
        )?;
        if !attached {
            conn.execute(
                &format!("ATTACH DATABASE ?1 AS {}", schema),
                [layout.attached_path(schema)],
            )
            .with_context(|| format!("Failed to attach {} schema", schema))?;
        }
    }

    // WAL for crash recovery when file-backed
    if let StorageLayout::Directory(_) = layout {
        for schema in [
            DatabaseName::Main,
            DatabaseName::Attached("staging"),
            DatabaseName::Attached("analytics"),
        ] {
            conn.pragma_update_and_check(Some(schema), "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            })?;
        }
    }

    // ==========================================================================
    // Staging tier (record grain)
    // ==========================================================================
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS staging.benchmark_prices (
            date TEXT PRIMARY KEY,
            price REAL NOT NULL CHECK (price > 0),
            load_timestamp TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS staging.retail_prices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            period TEXT NOT NULL,
            region TEXT NOT NULL,
            brand TEXT,
            product TEXT NOT NULL,
            pump_price REAL NOT NULL CHECK (pump_price > 0),
            volume REAL CHECK (volume IS NULL OR volume >= 0),
            market_share_pct REAL CHECK (market_share_pct IS NULL OR market_share_pct BETWEEN 0 AND 100),
            load_timestamp TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS staging.idx_retail_period ON retail_prices(period);

        CREATE TABLE IF NOT EXISTS staging.exchange_rates (
            date TEXT NOT NULL,
            source_tag TEXT NOT NULL CHECK (source_tag IN ('oficial', 'blue')),
            buy REAL CHECK (buy IS NULL OR buy > 0),
            sell REAL NOT NULL CHECK (sell > 0),
            load_timestamp TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (date, source_tag)
        );",
    )?;

    // ==========================================================================
    // Analytics tier (monthly grain)
    // ==========================================================================
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS analytics.benchmark_prices_monthly (
            month TEXT PRIMARY KEY,
            avg_price REAL NOT NULL CHECK (avg_price > 0),
            min_price REAL NOT NULL CHECK (min_price > 0),
            max_price REAL NOT NULL CHECK (max_price > 0),
            sample_count INTEGER NOT NULL CHECK (sample_count > 0),
            load_timestamp TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS analytics.retail_prices_monthly (
            month TEXT NOT NULL,
            product TEXT NOT NULL,
            median_price REAL NOT NULL CHECK (median_price > 0),
            total_volume REAL NOT NULL CHECK (total_volume >= 0),
            sample_count INTEGER NOT NULL CHECK (sample_count > 0),
            load_timestamp TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (month, product)
        );

        CREATE TABLE IF NOT EXISTS analytics.retail_prices_monthly_regional (
            month TEXT NOT NULL,
            region TEXT NOT NULL,
            brand TEXT NOT NULL,
            product TEXT NOT NULL,
            median_price REAL NOT NULL CHECK (median_price > 0),
            total_volume REAL NOT NULL CHECK (total_volume >= 0),
            sample_count INTEGER NOT NULL CHECK (sample_count > 0),
            load_timestamp TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (month, region, brand, product)
        );

        CREATE TABLE IF NOT EXISTS analytics.exchange_rates_monthly (
            month TEXT PRIMARY KEY,
            avg_oficial REAL CHECK (avg_oficial IS NULL OR avg_oficial > 0),
            avg_blue REAL CHECK (avg_blue IS NULL OR avg_blue > 0),
            avg_gap_pct REAL,
            sample_count INTEGER NOT NULL CHECK (sample_count > 0),
            load_timestamp TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );",
    )?;

    // ==========================================================================
    // Audit trail
    // ==========================================================================
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS main.load_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            run_id TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            table_name TEXT NOT NULL,
            strategy TEXT NOT NULL,
            attempted INTEGER NOT NULL,
            written INTEGER NOT NULL,
            removed INTEGER NOT NULL,
            fingerprint TEXT NOT NULL,
            data TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS main.idx_load_log_run ON load_log(run_id);",
    )?;

    Ok(())
}

// ============================================================================
// AUDIT TRAIL
// ============================================================================

/// One committed load, as recorded in `load_log`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LoadEvent {
    pub event_id: String,
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub table_name: String,
    pub strategy: String,
    pub attempted: i64,
    pub written: i64,
    pub removed: i64,
    pub fingerprint: String,
    pub data: serde_json::Value,
}

impl LoadEvent {
    pub fn from_report(run_id: &str, report: &LoadReport) -> Self {
        LoadEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            run_id: run_id.to_string(),
            timestamp: Utc::now(),
            table_name: report.table.qualified(),
            strategy: report.strategy.as_str().to_string(),
            attempted: report.attempted as i64,
            written: report.written as i64,
            removed: report.removed as i64,
            fingerprint: report.fingerprint.clone(),
            data: serde_json::to_value(report).unwrap_or(serde_json::Value::Null),
        }
    }
}

pub fn insert_load_event(conn: &Connection, event: &LoadEvent) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO main.load_log (
            event_id, run_id, timestamp, table_name, strategy,
            attempted, written, removed, fingerprint, data
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            event.event_id,
            event.run_id,
            event.timestamp.to_rfc3339(),
            event.table_name,
            event.strategy,
            event.attempted,
            event.written,
            event.removed,
            event.fingerprint,
            data_json,
        ],
    )?;

    Ok(())
}

/// Load history, oldest first. Pass a run id to narrow it to one run.
pub fn get_load_events(conn: &Connection, run_id: Option<&str>) -> Result<Vec<LoadEvent>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, run_id, timestamp, table_name, strategy,
                attempted, written, removed, fingerprint, data
         FROM main.load_log
         WHERE ?1 IS NULL OR run_id = ?1
         ORDER BY id",
    )?;

    let rows = stmt.query_map([run_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, i64>(5)?,
            row.get::<_, i64>(6)?,
            row.get::<_, i64>(7)?,
            row.get::<_, String>(8)?,
            row.get::<_, String>(9)?,
        ))
    })?;

    let mut events = Vec::new();
    for row in rows {
        let (event_id, run_id, timestamp, table_name, strategy, attempted, written, removed, fingerprint, data) =
            row?;
        events.push(LoadEvent {
            event_id,
            run_id,
            timestamp: DateTime::parse_from_rfc3339(&timestamp)
                .context("Invalid load_log timestamp")?
                .with_timezone(&Utc),
            table_name,
            strategy,
            attempted,
            written,
            removed,
            fingerprint,
            data: serde_json::from_str(&data).context("Invalid load_log data")?,
        });
    }

    Ok(events)
}

// ============================================================================
// READ HELPERS
// ============================================================================

pub fn count_rows(conn: &Connection, table: Table) -> Result<i64> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", table.qualified()),
        [],
        |row| row.get(0),
    )?;

    Ok(count)
}

/// Every row of `table` (business columns only), in a stable order.
pub fn fetch_rows(conn: &Connection, table: Table) -> Result<Vec<Vec<Value>>> {
    let names: Vec<&str> = table.columns().iter().map(|c| c.name).collect();
    let sql = format!(
        "SELECT {cols} FROM {table} ORDER BY {cols}",
        cols = names.join(", "),
        table = table.qualified()
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        (0..names.len()).map(|i| row.get::<_, Value>(i)).collect::<rusqlite::Result<Vec<_>>>()
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
