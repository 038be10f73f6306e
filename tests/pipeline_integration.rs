//! End-to-end tests for the pipeline facade.
//!
//! Tests:
//! 1. Two identical runs leave identical destination state and fingerprints
//! 2. A file-backed store survives reopening and keeps the audit trail
//! 3. A broken source does not affect the other two
//! 4. The monthly gap and median laws hold after loading
//! 5. The regional retail granularity writes to its own table

use fuel_price_etl::db::{count_rows, fetch_rows, get_load_events, open};
use fuel_price_etl::{
    Dataset, Pipeline, PipelineConfig, RawBatch, RawInputs, RetailGranularity, StageError,
    StageFailure, StorageLayout, Table, WriteStrategy,
};
use rusqlite::types::Value;
use rusqlite::Connection;

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn brent_csv() -> &'static str {
    "date,brent_price_usd\n\
     2024-01-02,80.10\n\
     2024-01-03,81.25\n\
     2024-01-03,81.30\n\
     2024-01-04,\n\
     2024-02-01,84.00\n"
}

fn retail_csv() -> &'static str {
    "periodo,provincia,bandera,producto,precio_surtidor,volumen\n\
     2024/01,Buenos Aires,YPF,GNC,100,1000\n\
     2024/01,Córdoba,Shell,GNC,110,500\n\
     2024/01,Mendoza,Axion,GNC,120,\n\
     2024/01,Salta,YPF,GNC,130,250.5\n\
     2024/01,Salta,YPF,GNC,-5,100\n\
     2024/01,Salta,YPF,n/d,99,100\n"
}

fn exchange_csv() -> &'static str {
    "date,source,value_buy,value_sell\n\
     2024-01-01,oficial,98,100\n\
     2024-01-01,blue,148,150\n\
     2024-01-02,Oficial,198,200\n\
     2024-01-02,Blue,218,220\n\
     2024-01-02,tarjeta,300,320\n"
}

fn inputs() -> RawInputs {
    RawInputs {
        benchmark: Some(RawBatch::read_csv(Dataset::Benchmark, brent_csv().as_bytes()).unwrap()),
        retail: Some(RawBatch::read_csv(Dataset::Retail, retail_csv().as_bytes()).unwrap()),
        exchange: Some(RawBatch::read_csv(Dataset::Exchange, exchange_csv().as_bytes()).unwrap()),
    }
}

fn snapshot(conn: &Connection) -> Vec<Vec<Vec<Value>>> {
    Table::ALL.iter().map(|t| fetch_rows(conn, *t).unwrap()).collect()
}

fn fingerprints(report: &fuel_price_etl::PipelineReport) -> Vec<String> {
    report
        .sources
        .iter()
        .flat_map(|s| [&s.staging, &s.analytics])
        .map(|r| r.as_ref().unwrap().fingerprint.clone())
        .collect()
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[test]
fn test_two_runs_are_idempotent() {
    let mut conn = open(&StorageLayout::InMemory).unwrap();
    let inputs = inputs();

    let first = Pipeline::default().run_all(&mut conn, &inputs);
    assert!(first.is_success(), "{:?}", first);
    let after_first = snapshot(&conn);

    let second = Pipeline::default().run_all(&mut conn, &inputs);
    assert!(second.is_success());

    assert_eq!(after_first, snapshot(&conn));
    assert_eq!(fingerprints(&first), fingerprints(&second));
    assert_ne!(first.run_id, second.run_id);
}

#[test]
fn test_upsert_runs_are_idempotent() {
    let mut conn = open(&StorageLayout::InMemory).unwrap();
    let config = PipelineConfig {
        staging_strategy: WriteStrategy::Upsert,
        analytics_strategy: WriteStrategy::Upsert,
        ..PipelineConfig::default()
    };
    let inputs = inputs();

    Pipeline::new(config.clone()).run_all(&mut conn, &inputs);
    let after_first = snapshot(&conn);
    let second = Pipeline::new(config).run_all(&mut conn, &inputs);

    assert!(second.is_success());
    assert_eq!(after_first, snapshot(&conn));
}

#[test]
fn test_clean_counts_flow_into_the_report() {
    let mut conn = open(&StorageLayout::InMemory).unwrap();

    let report = Pipeline::default().run_all(&mut conn, &inputs());

    let benchmark = report.source(Dataset::Benchmark).unwrap().clean.as_ref().unwrap();
    assert_eq!(benchmark.input_rows, 5);
    assert_eq!(benchmark.accepted, 3);
    assert_eq!(benchmark.duplicates_removed, 1);
    assert_eq!(benchmark.rejected(), 1);

    let retail = report.source(Dataset::Retail).unwrap().clean.as_ref().unwrap();
    assert_eq!(retail.accepted, 4);
    assert_eq!(retail.rejected(), 2);

    let exchange = report.source(Dataset::Exchange).unwrap().clean.as_ref().unwrap();
    assert_eq!(exchange.accepted, 4);
    assert_eq!(exchange.rejected(), 1);
}

#[test]
fn test_monthly_laws_hold_in_the_store() {
    let mut conn = open(&StorageLayout::InMemory).unwrap();

    Pipeline::default().run_all(&mut conn, &inputs());

    let exchange = fetch_rows(&conn, Table::AnalyticsExchange).unwrap();
    assert_eq!(exchange.len(), 1);
    assert_eq!(exchange[0][1], Value::Real(150.0));
    assert_eq!(exchange[0][2], Value::Real(185.0));
    // Mean of daily gaps (50% and 10%), not 185/150 - 1
    assert_eq!(exchange[0][3], Value::Real(30.0));

    let retail = fetch_rows(&conn, Table::AnalyticsRetail).unwrap();
    assert_eq!(retail.len(), 1);
    assert_eq!(retail[0][1], Value::Text("GNC".to_string()));
    assert_eq!(retail[0][2], Value::Real(115.0));
    assert_eq!(retail[0][3], Value::Real(1750.5));

    let benchmark = fetch_rows(&conn, Table::StagingBenchmark).unwrap();
    assert_eq!(benchmark[1][1], Value::Real(81.3));
}

#[test]
fn test_broken_source_leaves_others_untouched() {
    let mut conn = open(&StorageLayout::InMemory).unwrap();
    Pipeline::default().run_all(&mut conn, &inputs());
    let retail_before = fetch_rows(&conn, Table::StagingRetail).unwrap();

    let mut broken = inputs();
    broken.retail = Some(RawBatch::from_records(&["periodo", "provincia"], &[&["2024/02", "Salta"]]));
    let report = Pipeline::default().run_all(&mut conn, &broken);

    let retail = report.source(Dataset::Retail).unwrap();
    assert!(matches!(
        retail.staging,
        Err(StageFailure { table: Table::StagingRetail, attempted: 1, error: StageError::DataFormat(_) })
    ));
    assert!(matches!(
        retail.analytics,
        Err(StageFailure { table: Table::AnalyticsRetail, attempted: 1, error: StageError::DataFormat(_) })
    ));
    assert!(report.source(Dataset::Benchmark).unwrap().is_success());
    assert!(report.source(Dataset::Exchange).unwrap().is_success());
    assert_eq!(fetch_rows(&conn, Table::StagingRetail).unwrap(), retail_before);
}

#[test]
fn test_regional_granularity_uses_its_own_table() {
    let mut conn = open(&StorageLayout::InMemory).unwrap();
    let config = PipelineConfig {
        retail_granularity: RetailGranularity::RegionBrandProduct,
        ..PipelineConfig::default()
    };

    let report = Pipeline::new(config).run_all(&mut conn, &inputs());

    assert!(report.is_success());
    assert_eq!(count_rows(&conn, Table::AnalyticsRetail).unwrap(), 0);
    assert_eq!(count_rows(&conn, Table::AnalyticsRetailRegional).unwrap(), 4);
}

#[test]
fn test_file_backed_store_keeps_state_and_audit() {
    let dir = tempfile::tempdir().unwrap();
    let layout = StorageLayout::Directory(dir.path().join("data"));

    let run_id = {
        let mut conn = open(&layout).unwrap();
        let pipeline = Pipeline::default();
        let report = pipeline.run_all(&mut conn, &inputs());
        assert!(report.is_success());
        report.run_id
    };

    let conn = open(&layout).unwrap();
    assert_eq!(count_rows(&conn, Table::StagingBenchmark).unwrap(), 3);
    assert_eq!(count_rows(&conn, Table::AnalyticsBenchmark).unwrap(), 2);

    // Two loads per source
    let events = get_load_events(&conn, Some(&run_id)).unwrap();
    assert_eq!(events.len(), 6);
    assert!(events.iter().all(|e| e.run_id == run_id));
}
