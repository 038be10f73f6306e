// ⚠️ Error taxonomy for the transform-and-load engine
// Row-level errors stay inside the cleaner; everything else reaches the caller.

use crate::load::Table;
use crate::models::Dataset;
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// ROW LEVEL (non-fatal)
// ============================================================================

/// Why a single raw row was dropped by the cleaner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RejectReason {
    MissingValue { field: &'static str },
    UnparsableDate { field: &'static str, value: String },
    UnparsableNumber { field: &'static str, value: String },
    NonPositive { field: &'static str, value: f64 },
    RoundsToZero { field: &'static str, value: f64, decimals: i32 },
    UnknownSourceTag { value: String },
    ProductNotAvailable { value: String },
    UnmappedProduct { value: String },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::MissingValue { field } => write!(f, "{} is missing", field),
            RejectReason::UnparsableDate { field, value } => {
                write!(f, "{} is not a date: {:?}", field, value)
            }
            RejectReason::UnparsableNumber { field, value } => {
                write!(f, "{} is not a number: {:?}", field, value)
            }
            RejectReason::NonPositive { field, value } => {
                write!(f, "{} must be > 0, got {}", field, value)
            }
            RejectReason::RoundsToZero { field, value, decimals } => {
                write!(f, "{} {} rounds to zero at {} decimals", field, value, decimals)
            }
            RejectReason::UnknownSourceTag { value } => {
                write!(f, "unknown source tag {:?} (expected oficial or blue)", value)
            }
            RejectReason::ProductNotAvailable { value } => {
                write!(f, "product {:?} is marked as not available", value)
            }
            RejectReason::UnmappedProduct { value } => {
                write!(f, "product {:?} is not in the catalog", value)
            }
        }
    }
}

/// A raw row the cleaner skipped. `row` is 1-based over data rows.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{dataset} row {row}: {reason}")]
pub struct RowValidationError {
    pub dataset: Dataset,
    pub row: usize,
    pub reason: RejectReason,
}

// ============================================================================
// BATCH LEVEL (fatal to one source)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataFormatError {
    #[error("{dataset} batch is empty")]
    EmptyBatch { dataset: Dataset },

    #[error("{dataset} batch is missing required columns: {}", missing.join(", "))]
    MissingColumns {
        dataset: Dataset,
        missing: Vec<String>,
        available: Vec<String>,
    },

    #[error("{dataset} batch row {row} has {found} fields, header has {expected}")]
    RaggedRow {
        dataset: Dataset,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("{dataset} batch could not be read as a table: {detail}")]
    Unreadable { dataset: Dataset, detail: String },
}

impl DataFormatError {
    pub fn dataset(&self) -> Dataset {
        match self {
            DataFormatError::EmptyBatch { dataset }
            | DataFormatError::MissingColumns { dataset, .. }
            | DataFormatError::RaggedRow { dataset, .. }
            | DataFormatError::Unreadable { dataset, .. } => *dataset,
        }
    }
}

// ============================================================================
// AGGREGATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{dataset} summary for {month} violates invariant: {detail}")]
pub struct AggregationInvariantError {
    pub dataset: Dataset,
    pub month: NaiveDate,
    pub detail: String,
}

// ============================================================================
// PERSISTENCE (fatal to one load call)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PersistenceErrorKind {
    /// Connection, I/O or locking failure reported by the store
    Connectivity,
    /// CHECK / NOT NULL / UNIQUE violation
    Constraint,
    /// Upsert requested on a table without a natural key
    MissingConflictKey,
    /// Record type does not belong to the target table
    SchemaMismatch,
    Other,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("load into {table} failed ({kind:?}) after attempting {attempted} records: {detail}")]
pub struct PersistenceError {
    pub table: String,
    pub attempted: usize,
    pub kind: PersistenceErrorKind,
    pub detail: String,
}

impl PersistenceError {
    pub fn new(
        table: impl Into<String>,
        attempted: usize,
        kind: PersistenceErrorKind,
        detail: impl Into<String>,
    ) -> Self {
        PersistenceError {
            table: table.into(),
            attempted,
            kind,
            detail: detail.into(),
        }
    }

    /// Classify a rusqlite failure for the given destination.
    pub fn from_sqlite(table: &str, attempted: usize, err: rusqlite::Error) -> Self {
        let kind = match &err {
            rusqlite::Error::SqliteFailure(e, _) => match e.code {
                rusqlite::ErrorCode::ConstraintViolation => PersistenceErrorKind::Constraint,
                rusqlite::ErrorCode::CannotOpen
                | rusqlite::ErrorCode::DatabaseBusy
                | rusqlite::ErrorCode::DatabaseLocked
                | rusqlite::ErrorCode::SystemIoFailure
                | rusqlite::ErrorCode::NotADatabase
                | rusqlite::ErrorCode::ReadOnly => PersistenceErrorKind::Connectivity,
                _ => PersistenceErrorKind::Other,
            },
            _ => PersistenceErrorKind::Other,
        };
        PersistenceError::new(table, attempted, kind, err.to_string())
    }
}

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

// ============================================================================
// PIPELINE (one per source/destination pair)
// ============================================================================

/// Typed failure of one stage of one source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageError {
    #[error(transparent)]
    DataFormat(#[from] DataFormatError),

    #[error(transparent)]
    Aggregation(#[from] AggregationInvariantError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// A stage that did not commit, with the table it was bound for and the
/// number of records it carried when it failed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{table} ({attempted} records): {error}")]
pub struct StageFailure {
    pub table: Table,
    pub attempted: usize,
    #[source]
    pub error: StageError,
}

impl StageFailure {
    pub fn new(table: Table, attempted: usize, error: impl Into<StageError>) -> Self {
        StageFailure {
            table,
            attempted,
            error: error.into(),
        }
    }
}
