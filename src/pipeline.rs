// 🔁 Pipeline facade - Cleaner → Aggregator → Load, per source and across sources
// A failing source never stops the others; staging and analytics loads of one
// source are attempted independently and both outcomes are reported.

use crate::aggregator::{aggregate_benchmark, aggregate_exchange, aggregate_retail};
use crate::cleaner::{BenchmarkCleaner, CleanReport, Cleaner, ExchangeCleaner, RetailCleaner};
use crate::config::{PipelineConfig, RetailGranularity};
use crate::errors::{AggregationInvariantError, StageFailure};
use crate::load::{load, LoadReport, Loadable, Table, WriteStrategy};
use crate::models::Dataset;
use crate::raw::RawBatch;
use rusqlite::Connection;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Raw batches handed over by the extraction connectors. Absent sources are skipped.
#[derive(Debug, Clone, Default)]
pub struct RawInputs {
    pub benchmark: Option<RawBatch>,
    pub retail: Option<RawBatch>,
    pub exchange: Option<RawBatch>,
}

/// What happened to one source in one run.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceOutcome {
    pub dataset: Dataset,
    /// `None` when the batch could not be cleaned at all
    pub clean: Option<CleanReport>,
    pub staging: Result<LoadReport, StageFailure>,
    pub analytics: Result<LoadReport, StageFailure>,
}

impl SourceOutcome {
    pub fn is_success(&self) -> bool {
        self.staging.is_ok() && self.analytics.is_ok()
    }

    pub fn failures(&self) -> Vec<&StageFailure> {
        [&self.staging, &self.analytics]
            .into_iter()
            .filter_map(|result| result.as_ref().err())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub run_id: String,
    pub sources: Vec<SourceOutcome>,
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        self.sources.iter().all(SourceOutcome::is_success)
    }

    pub fn source(&self, dataset: Dataset) -> Option<&SourceOutcome> {
        self.sources.iter().find(|s| s.dataset == dataset)
    }
}

/// Serializable view of a run, for logs and the CLI
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub run_id: &'a str,
    pub sources: Vec<SourceSummary<'a>>,
}

#[derive(Debug, Serialize)]
pub struct SourceSummary<'a> {
    pub dataset: Dataset,
    pub clean: Option<&'a CleanReport>,
    pub staging: StageSummary<'a>,
    pub analytics: StageSummary<'a>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StageSummary<'a> {
    Ok { report: &'a LoadReport },
    Failed {
        table: Table,
        attempted: usize,
        error: String,
    },
}

impl<'a> From<&'a Result<LoadReport, StageFailure>> for StageSummary<'a> {
    fn from(result: &'a Result<LoadReport, StageFailure>) -> Self {
        match result {
            Ok(report) => StageSummary::Ok { report },
            Err(failure) => StageSummary::Failed {
                table: failure.table,
                attempted: failure.attempted,
                error: failure.error.to_string(),
            },
        }
    }
}

impl PipelineReport {
    pub fn summary(&self) -> RunSummary<'_> {
        RunSummary {
            run_id: &self.run_id,
            sources: self
                .sources
                .iter()
                .map(|s| SourceSummary {
                    dataset: s.dataset,
                    clean: s.clean.as_ref(),
                    staging: (&s.staging).into(),
                    analytics: (&s.analytics).into(),
                })
                .collect(),
        }
    }
}

/// One pipeline = one run id shared by every load it performs.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    run_id: String,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Pipeline {
            config,
            run_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run_benchmark(&self, conn: &mut Connection, batch: &RawBatch) -> SourceOutcome {
        self.run_source(
            conn,
            &BenchmarkCleaner::new(),
            batch,
            Table::StagingBenchmark,
            Table::AnalyticsBenchmark,
            aggregate_benchmark,
        )
    }

    pub fn run_retail(&self, conn: &mut Connection, batch: &RawBatch) -> SourceOutcome {
        let granularity = self.config.retail_granularity;
        let analytics_table = match granularity {
            RetailGranularity::Product => Table::AnalyticsRetail,
            RetailGranularity::RegionBrandProduct => Table::AnalyticsRetailRegional,
        };

        self.run_source(
            conn,
            &RetailCleaner::from_config(&self.config),
            batch,
            Table::StagingRetail,
            analytics_table,
            |records| aggregate_retail(records, granularity),
        )
    }

    pub fn run_exchange(&self, conn: &mut Connection, batch: &RawBatch) -> SourceOutcome {
        self.run_source(
            conn,
            &ExchangeCleaner::new(),
            batch,
            Table::StagingExchange,
            Table::AnalyticsExchange,
            aggregate_exchange,
        )
    }

    /// Run every provided source in a fixed order: benchmark, retail, exchange.
    pub fn run_all(&self, conn: &mut Connection, inputs: &RawInputs) -> PipelineReport {
        let started = Instant::now();
        let mut sources = Vec::new();

        if let Some(batch) = &inputs.benchmark {
            sources.push(self.run_benchmark(conn, batch));
        }
        if let Some(batch) = &inputs.retail {
            sources.push(self.run_retail(conn, batch));
        }
        if let Some(batch) = &inputs.exchange {
            sources.push(self.run_exchange(conn, batch));
        }

        let report = PipelineReport {
            run_id: self.run_id.clone(),
            sources,
        };

        let failed = report.sources.iter().filter(|s| !s.is_success()).count();
        info!(
            run_id = %self.run_id,
            sources = report.sources.len(),
            failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline run finished"
        );

        report
    }

    /// Retail staging has no natural key, so it is always replaced.
    fn staging_strategy(&self, table: Table) -> WriteStrategy {
        if table.conflict_key().is_none() && self.config.staging_strategy == WriteStrategy::Upsert {
            debug!(table = %table, "no natural key, falling back to replace");
            return WriteStrategy::Replace;
        }
        self.config.staging_strategy
    }

    fn run_source<C, S>(
        &self,
        conn: &mut Connection,
        cleaner: &C,
        batch: &RawBatch,
        staging_table: Table,
        analytics_table: Table,
        aggregate: impl FnOnce(&[C::Record]) -> Result<Vec<S>, AggregationInvariantError>,
    ) -> SourceOutcome
    where
        C: Cleaner,
        C::Record: Loadable,
        S: Loadable,
    {
        let dataset = cleaner.dataset();

        let started = Instant::now();
        let cleaned = match cleaner.clean(batch) {
            Ok(cleaned) => cleaned,
            Err(e) => {
                warn!(%dataset, error = %e, "source skipped");
                return SourceOutcome {
                    dataset,
                    clean: None,
                    staging: Err(StageFailure::new(staging_table, batch.len(), e.clone())),
                    analytics: Err(StageFailure::new(analytics_table, batch.len(), e)),
                };
            }
        };
        debug!(%dataset, elapsed_ms = started.elapsed().as_millis() as u64, "clean stage");

        let started = Instant::now();
        let staging = load(
            conn,
            &cleaned.records,
            staging_table,
            self.staging_strategy(staging_table),
            &self.run_id,
        )
        .map_err(|e| StageFailure::new(staging_table, cleaned.len(), e));
        debug!(%dataset, elapsed_ms = started.elapsed().as_millis() as u64, "staging stage");

        let started = Instant::now();
        let analytics = aggregate(&cleaned.records)
            .map_err(|e| StageFailure::new(analytics_table, cleaned.len(), e))
            .and_then(|summaries| {
                load(
                    conn,
                    &summaries,
                    analytics_table,
                    self.config.analytics_strategy,
                    &self.run_id,
                )
                .map_err(|e| StageFailure::new(analytics_table, summaries.len(), e))
            });
        debug!(%dataset, elapsed_ms = started.elapsed().as_millis() as u64, "analytics stage");

        for (stage, result) in [("staging", &staging), ("analytics", &analytics)] {
            if let Err(failure) = result {
                warn!(%dataset, stage, table = %failure.table, error = %failure.error, "stage failed");
            }
        }

        SourceOutcome {
            dataset,
            clean: Some(cleaned.report),
            staging,
            analytics,
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
