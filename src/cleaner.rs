// 🧹 Cleaner - Raw batches → canonical records
// One cleaner per dataset. Bad rows are skipped with a reason, never raised;
// only a batch that is not a usable table fails the whole source.

use crate::config::{PipelineConfig, ProductCatalog, ProductLookup};
use crate::errors::{DataFormatError, RejectReason, RowValidationError};
use crate::load::{round_to, MONEY_DECIMALS};
use crate::models::{
    first_of_month, BenchmarkPricePoint, Dataset, ExchangeRatePoint, RetailPriceRecord, SourceTag,
};
use crate::raw::RawBatch;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

// ============================================================================
// CORE TYPES
// ============================================================================

/// A row that passed validation. `coerced` counts optional fields that were
/// present but unusable and were nulled.
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted<T> {
    pub record: T,
    pub coerced: usize,
}

pub type RowOutcome<T> = Result<Accepted<T>, RowValidationError>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanReport {
    pub dataset: Dataset,
    pub input_rows: usize,
    pub accepted: usize,
    pub duplicates_removed: usize,
    pub coerced_values: usize,
    pub rejections: Vec<RowValidationError>,
}

impl CleanReport {
    fn new(dataset: Dataset, input_rows: usize) -> Self {
        CleanReport {
            dataset,
            input_rows,
            accepted: 0,
            duplicates_removed: 0,
            coerced_values: 0,
            rejections: Vec::new(),
        }
    }

    pub fn rejected(&self) -> usize {
        self.rejections.len()
    }
}

/// Canonical records plus what happened to the rows that did not make it.
///
/// The records are held in order, so iterating again always yields the same
/// sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Cleaned<T> {
    pub records: Vec<T>,
    pub report: CleanReport,
}

impl<T> Cleaned<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Cleaner - one implementation per dataset
pub trait Cleaner {
    type Record;

    fn dataset(&self) -> Dataset;

    /// Validate, normalize, dedupe and order a raw batch.
    fn clean(&self, batch: &RawBatch) -> Result<Cleaned<Self::Record>, DataFormatError>;
}

// ============================================================================
// COLUMN MAPPING
// ============================================================================

/// One canonical field and the raw headers it may appear under.
struct FieldSpec {
    name: &'static str,
    aliases: &'static [&'static str],
    required: bool,
}

/// Resolve every field to a column index, or fail listing all missing required fields.
fn resolve_columns(
    dataset: Dataset,
    batch: &RawBatch,
    fields: &[FieldSpec],
) -> Result<Vec<Option<usize>>, DataFormatError> {
    batch.check_shape(dataset)?;

    let resolved: Vec<Option<usize>> = fields.iter().map(|f| batch.find_column(f.aliases)).collect();

    let missing: Vec<String> = fields
        .iter()
        .zip(&resolved)
        .filter(|(f, idx)| f.required && idx.is_none())
        .map(|(f, _)| f.name.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(DataFormatError::MissingColumns {
            dataset,
            missing,
            available: batch.columns().to_vec(),
        });
    }

    Ok(resolved)
}

fn cell<'r>(row: &'r [Option<String>], idx: Option<usize>) -> Option<&'r str> {
    idx.and_then(|i| row.get(i)).and_then(|v| v.as_deref())
}

fn attach_row<'a, T: 'a>(
    dataset: Dataset,
    batch: &'a RawBatch,
    parse: impl Fn(&[Option<String>]) -> Result<Accepted<T>, RejectReason> + 'a,
) -> impl Iterator<Item = RowOutcome<T>> + 'a {
    batch.rows().enumerate().map(move |(i, row)| {
        parse(row).map_err(|reason| RowValidationError {
            dataset,
            row: i + 1,
            reason,
        })
    })
}

/// Split outcomes into records and a report.
fn collect_outcomes<T>(
    dataset: Dataset,
    input_rows: usize,
    outcomes: impl Iterator<Item = RowOutcome<T>>,
) -> (Vec<T>, CleanReport) {
    let mut report = CleanReport::new(dataset, input_rows);
    let mut records = Vec::new();

    for outcome in outcomes {
        match outcome {
            Ok(accepted) => {
                report.coerced_values += accepted.coerced;
                records.push(accepted.record);
            }
            Err(rejection) => {
                debug!(%rejection, "row rejected");
                report.rejections.push(rejection);
            }
        }
    }

    (records, report)
}

fn finish<T>(records: Vec<T>, mut report: CleanReport, before_dedup: usize) -> Cleaned<T> {
    report.accepted = records.len();
    report.duplicates_removed = before_dedup - records.len();

    info!(
        dataset = %report.dataset,
        input = report.input_rows,
        accepted = report.accepted,
        rejected = report.rejected(),
        duplicates = report.duplicates_removed,
        coerced = report.coerced_values,
        "cleaning complete"
    );

    Cleaned { records, report }
}

// ============================================================================
// VALUE PARSING
// ============================================================================

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();

    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }

    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.date_naive());
    }

    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Month-aligned period: accepts `YYYY/MM`, `YYYY-MM` and any full date.
pub fn parse_period(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();

    let with_day = format!("{}/01", s.replace('-', "/"));
    if let Ok(date) = NaiveDate::parse_from_str(&with_day, "%Y/%m/%d") {
        return Some(date);
    }

    parse_date(s).map(first_of_month)
}

/// Finite decimal with `.` or a single `,` as separator.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let s = raw.trim();

    let parsed = s.parse::<f64>().ok().or_else(|| {
        if s.matches(',').count() == 1 && !s.contains('.') {
            s.replace(',', ".").parse::<f64>().ok()
        } else {
            None
        }
    })?;

    parsed.is_finite().then_some(parsed)
}

fn required_date(row: &[Option<String>], idx: Option<usize>, field: &'static str) -> Result<NaiveDate, RejectReason> {
    let raw = cell(row, idx).ok_or(RejectReason::MissingValue { field })?;
    parse_date(raw).ok_or_else(|| RejectReason::UnparsableDate {
        field,
        value: raw.to_string(),
    })
}

/// A price or rate that stays > 0 once rounded to the stored precision.
fn required_price(row: &[Option<String>], idx: Option<usize>, field: &'static str) -> Result<f64, RejectReason> {
    let raw = cell(row, idx).ok_or(RejectReason::MissingValue { field })?;
    let value = parse_decimal(raw).ok_or_else(|| RejectReason::UnparsableNumber {
        field,
        value: raw.to_string(),
    })?;

    if value <= 0.0 {
        return Err(RejectReason::NonPositive { field, value });
    }
    if round_to(value, MONEY_DECIMALS) <= 0.0 {
        return Err(RejectReason::RoundsToZero {
            field,
            value,
            decimals: MONEY_DECIMALS,
        });
    }
    Ok(value)
}

fn required_text(row: &[Option<String>], idx: Option<usize>, field: &'static str) -> Result<String, RejectReason> {
    cell(row, idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(RejectReason::MissingValue { field })
}

/// Optional number: absent → None; present but outside `accept` → None and counted.
fn optional_number(
    row: &[Option<String>],
    idx: Option<usize>,
    coerced: &mut usize,
    accept: impl Fn(f64) -> bool,
) -> Option<f64> {
    let raw = cell(row, idx)?;
    match parse_decimal(raw) {
        Some(v) if accept(v) => Some(v),
        _ => {
            *coerced += 1;
            None
        }
    }
}

// ============================================================================
// BENCHMARK
// ============================================================================

const BENCHMARK_FIELDS: [FieldSpec; 2] = [
    FieldSpec {
        name: "date",
        aliases: &["date", "fecha"],
        required: true,
    },
    FieldSpec {
        name: "price",
        aliases: &["brent_price", "brent_price_usd", "price", "close"],
        required: true,
    },
];

#[derive(Debug, Clone, Copy, Default)]
pub struct BenchmarkCleaner;

impl BenchmarkCleaner {
    pub fn new() -> Self {
        BenchmarkCleaner
    }

    /// Lazily validate each row in input order. Dedup and ordering happen in `clean`.
    pub fn validate<'a>(
        &'a self,
        batch: &'a RawBatch,
    ) -> Result<impl Iterator<Item = RowOutcome<BenchmarkPricePoint>> + 'a, DataFormatError> {
        let cols = resolve_columns(Dataset::Benchmark, batch, &BENCHMARK_FIELDS)?;
        let (date_idx, price_idx) = (cols[0], cols[1]);

        Ok(attach_row(Dataset::Benchmark, batch, move |row| {
            let date = required_date(row, date_idx, "date")?;
            let price = required_price(row, price_idx, "price")?;
            Ok(Accepted {
                record: BenchmarkPricePoint { date, price },
                coerced: 0,
            })
        }))
    }
}

impl Cleaner for BenchmarkCleaner {
    type Record = BenchmarkPricePoint;

    fn dataset(&self) -> Dataset {
        Dataset::Benchmark
    }

    fn clean(&self, batch: &RawBatch) -> Result<Cleaned<BenchmarkPricePoint>, DataFormatError> {
        let (records, report) = collect_outcomes(Dataset::Benchmark, batch.len(), self.validate(batch)?);
        let before = records.len();

        // Later rows overwrite earlier ones: latest occurrence wins
        let by_date: BTreeMap<NaiveDate, BenchmarkPricePoint> =
            records.into_iter().map(|p| (p.date, p)).collect();

        Ok(finish(by_date.into_values().collect(), report, before))
    }
}

// ============================================================================
// RETAIL
// ============================================================================

const RETAIL_FIELDS: [FieldSpec; 7] = [
    FieldSpec {
        name: "periodo",
        aliases: &["periodo", "period"],
        required: true,
    },
    FieldSpec {
        name: "provincia",
        aliases: &["provincia", "region"],
        required: true,
    },
    FieldSpec {
        name: "bandera",
        aliases: &["bandera", "brand", "empresabandera"],
        required: false,
    },
    FieldSpec {
        name: "producto",
        aliases: &["producto", "product"],
        required: true,
    },
    FieldSpec {
        name: "precio_surtidor",
        aliases: &["precio_surtidor", "pump_price", "precio"],
        required: true,
    },
    FieldSpec {
        name: "volumen",
        aliases: &["volumen", "volume"],
        required: false,
    },
    FieldSpec {
        name: "market_share_pct",
        aliases: &["market_share_pct"],
        required: false,
    },
];

#[derive(Debug, Clone)]
pub struct RetailCleaner {
    catalog: ProductCatalog,
    drop_unmapped: bool,
}

impl RetailCleaner {
    pub fn new(catalog: ProductCatalog, drop_unmapped: bool) -> Self {
        RetailCleaner {
            catalog,
            drop_unmapped,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.product_catalog.clone(), config.drop_unmapped_products)
    }

    fn standardize_product(&self, raw: String) -> Result<String, RejectReason> {
        match self.catalog.lookup(&raw) {
            ProductLookup::Mapped(name) => Ok(name),
            ProductLookup::NotAvailable => Err(RejectReason::ProductNotAvailable { value: raw }),
            ProductLookup::Unmapped if self.drop_unmapped => {
                Err(RejectReason::UnmappedProduct { value: raw })
            }
            ProductLookup::Unmapped => Ok(raw.to_uppercase()),
        }
    }

    pub fn validate<'a>(
        &'a self,
        batch: &'a RawBatch,
    ) -> Result<impl Iterator<Item = RowOutcome<RetailPriceRecord>> + 'a, DataFormatError> {
        let cols = resolve_columns(Dataset::Retail, batch, &RETAIL_FIELDS)?;

        Ok(attach_row(Dataset::Retail, batch, move |row| {
            let raw_period = cell(row, cols[0]).ok_or(RejectReason::MissingValue { field: "period" })?;
            let period = parse_period(raw_period).ok_or_else(|| RejectReason::UnparsableDate {
                field: "period",
                value: raw_period.to_string(),
            })?;
            let region = required_text(row, cols[1], "region")?;
            let product = self.standardize_product(required_text(row, cols[3], "product")?)?;
            let pump_price = required_price(row, cols[4], "pump_price")?;

            let brand = cell(row, cols[2])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);

            let mut coerced = 0;
            let volume = optional_number(row, cols[5], &mut coerced, |v| v >= 0.0);
            let market_share_pct =
                optional_number(row, cols[6], &mut coerced, |v| (0.0..=100.0).contains(&v));

            Ok(Accepted {
                record: RetailPriceRecord {
                    period,
                    region,
                    brand,
                    product,
                    pump_price,
                    volume,
                    market_share_pct,
                },
                coerced,
            })
        }))
    }
}

type RetailIdentity = (NaiveDate, String, Option<String>, String, u64, Option<u64>, Option<u64>);

fn retail_identity(r: &RetailPriceRecord) -> RetailIdentity {
    (
        r.period,
        r.region.clone(),
        r.brand.clone(),
        r.product.clone(),
        r.pump_price.to_bits(),
        r.volume.map(f64::to_bits),
        r.market_share_pct.map(f64::to_bits),
    )
}

impl Default for RetailCleaner {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl Cleaner for RetailCleaner {
    type Record = RetailPriceRecord;

    fn dataset(&self) -> Dataset {
        Dataset::Retail
    }

    fn clean(&self, batch: &RawBatch) -> Result<Cleaned<RetailPriceRecord>, DataFormatError> {
        let (records, report) = collect_outcomes(Dataset::Retail, batch.len(), self.validate(batch)?);
        let before = records.len();

        // Rows may repeat across regions/brands; only rows identical in every field are dropped
        let mut seen = HashSet::new();
        let mut records: Vec<RetailPriceRecord> =
            records.into_iter().filter(|r| seen.insert(retail_identity(r))).collect();
        records.sort_by_key(|r| r.period);

        Ok(finish(records, report, before))
    }
}

// ============================================================================
// EXCHANGE RATE
// ============================================================================

const EXCHANGE_FIELDS: [FieldSpec; 4] = [
    FieldSpec {
        name: "date",
        aliases: &["date", "fecha"],
        required: true,
    },
    FieldSpec {
        name: "source",
        aliases: &["source", "source_tag", "tipo"],
        required: true,
    },
    FieldSpec {
        name: "value_buy",
        aliases: &["value_buy", "buy", "compra"],
        required: false,
    },
    FieldSpec {
        name: "value_sell",
        aliases: &["value_sell", "sell", "venta"],
        required: true,
    },
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ExchangeCleaner;

impl ExchangeCleaner {
    pub fn new() -> Self {
        ExchangeCleaner
    }

    pub fn validate<'a>(
        &'a self,
        batch: &'a RawBatch,
    ) -> Result<impl Iterator<Item = RowOutcome<ExchangeRatePoint>> + 'a, DataFormatError> {
        let cols = resolve_columns(Dataset::Exchange, batch, &EXCHANGE_FIELDS)?;

        Ok(attach_row(Dataset::Exchange, batch, move |row| {
            let date = required_date(row, cols[0], "date")?;
            let raw_tag = cell(row, cols[1]).ok_or(RejectReason::MissingValue { field: "source" })?;
            let source_tag = SourceTag::parse(raw_tag).ok_or_else(|| RejectReason::UnknownSourceTag {
                value: raw_tag.to_string(),
            })?;
            let sell = required_price(row, cols[3], "sell")?;

            let mut coerced = 0;
            let buy = optional_number(row, cols[2], &mut coerced, |v| round_to(v, MONEY_DECIMALS) > 0.0);

            Ok(Accepted {
                record: ExchangeRatePoint {
                    date,
                    source_tag,
                    buy,
                    sell,
                },
                coerced,
            })
        }))
    }
}

impl Cleaner for ExchangeCleaner {
    type Record = ExchangeRatePoint;

    fn dataset(&self) -> Dataset {
        Dataset::Exchange
    }

    fn clean(&self, batch: &RawBatch) -> Result<Cleaned<ExchangeRatePoint>, DataFormatError> {
        let (records, report) = collect_outcomes(Dataset::Exchange, batch.len(), self.validate(batch)?);
        let before = records.len();

        // Both tags for one date are kept; repeats of the same (date, tag) keep the latest
        let by_key: BTreeMap<(NaiveDate, SourceTag), ExchangeRatePoint> = records
            .into_iter()
            .map(|p| ((p.date, p.source_tag), p))
            .collect();

        Ok(finish(by_key.into_values().collect(), report, before))
    }
}
