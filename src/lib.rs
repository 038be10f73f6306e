// Fuel Price ETL - Core Library
// Transform-and-load engine: clean raw extracts, roll them up per month and
// load both tiers into SQLite. Used by the CLI and the integration tests.

pub mod models;
pub mod errors;
pub mod raw;
pub mod config;
pub mod cleaner;     // Raw batches → canonical records
pub mod aggregator;  // Canonical records → monthly summaries
pub mod load;        // Load gateway (replace / upsert)
pub mod db;          // Storage layout, DDL, audit log
pub mod pipeline;    // Facade over the three stages

// Re-export commonly used types
pub use models::{
    BenchmarkPricePoint, Dataset, ExchangeRatePoint, MonthlyBenchmarkSummary,
    MonthlyExchangeSummary, MonthlyRetailSummary, RetailPriceRecord, SourceTag,
};
pub use errors::{
    AggregationInvariantError, ConfigError, DataFormatError, PersistenceError,
    PersistenceErrorKind, RejectReason, RowValidationError, StageError,
    StageFailure,
};
pub use raw::RawBatch;
pub use config::{PipelineConfig, ProductCatalog, ProductLookup, RetailGranularity};
pub use cleaner::{
    BenchmarkCleaner, CleanReport, Cleaned, Cleaner, ExchangeCleaner, RetailCleaner,
};
pub use aggregator::{aggregate_benchmark, aggregate_exchange, aggregate_retail, median};
pub use load::{load, LoadReport, Loadable, Table, WriteStrategy};
pub use db::{LoadEvent, StorageLayout};
pub use pipeline::{Pipeline, PipelineReport, RawInputs, SourceOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
