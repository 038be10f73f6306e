use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fuel_price_etl::{
    db, Dataset, Pipeline, PipelineConfig, PipelineReport, RawBatch, RawInputs, StorageLayout,
};

#[derive(Parser)]
#[command(
    name = "fuel-price-etl",
    version,
    about = "Transform-and-load engine for Brent, retail fuel and USD/ARS price series"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean, aggregate and load the given CSV extracts.
    Run {
        /// Brent benchmark CSV (date, brent_price).
        #[arg(long, env = "ETL_BENCHMARK_CSV")]
        benchmark: Option<PathBuf>,

        /// Retail fuel price CSV (periodo, provincia, producto, precio_surtidor, ...).
        #[arg(long, env = "ETL_RETAIL_CSV")]
        retail: Option<PathBuf>,

        /// Exchange rate CSV (date, source, value_buy, value_sell).
        #[arg(long, env = "ETL_EXCHANGE_CSV")]
        exchange: Option<PathBuf>,

        /// Directory holding etl.db, staging.db and analytics.db.
        #[arg(long, env = "ETL_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,

        /// Pipeline config (TOML). Defaults apply when omitted.
        #[arg(long, env = "ETL_CONFIG")]
        config: Option<PathBuf>,

        /// Print the run summary as JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show the load audit log.
    History {
        /// Directory holding etl.db, staging.db and analytics.db.
        #[arg(long, env = "ETL_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,

        /// Only show loads from this run.
        #[arg(long)]
        run_id: Option<String>,
    },
}

fn main() -> Result<()> {
    setup_logging();

    match Cli::parse().command {
        Commands::Run {
            benchmark,
            retail,
            exchange,
            data_dir,
            config,
            json,
        } => run(benchmark, retail, exchange, &data_dir, config.as_deref(), json),
        Commands::History { data_dir, run_id } => history(&data_dir, run_id.as_deref()),
    }
}

/// RUST_LOG wins; otherwise info.
fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn read_batch(dataset: Dataset, path: Option<PathBuf>) -> Result<Option<RawBatch>> {
    path.map(|p| {
        RawBatch::read_csv_path(dataset, &p).with_context(|| format!("Failed to read {} extract", dataset))
    })
    .transpose()
}

fn run(
    benchmark: Option<PathBuf>,
    retail: Option<PathBuf>,
    exchange: Option<PathBuf>,
    data_dir: &Path,
    config_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    if benchmark.is_none() && retail.is_none() && exchange.is_none() {
        bail!("nothing to do: pass at least one of --benchmark, --retail, --exchange");
    }

    let config = match config_path {
        Some(path) => PipelineConfig::from_path(path).context("Failed to load pipeline config")?,
        None => PipelineConfig::default(),
    };

    let inputs = RawInputs {
        benchmark: read_batch(Dataset::Benchmark, benchmark)?,
        retail: read_batch(Dataset::Retail, retail)?,
        exchange: read_batch(Dataset::Exchange, exchange)?,
    };

    let mut conn = db::open(&StorageLayout::Directory(data_dir.to_path_buf()))
        .with_context(|| format!("Failed to open store in {}", data_dir.display()))?;

    let pipeline = Pipeline::new(config);
    let report = pipeline.run_all(&mut conn, &inputs);

    if json {
        println!("{}", serde_json::to_string_pretty(&report.summary())?);
    } else {
        print_report(&report);
    }

    if !report.is_success() {
        bail!("run {} finished with failed stages", report.run_id);
    }

    Ok(())
}

fn print_report(report: &PipelineReport) {
    println!("🛢️  Fuel price ETL - run {}", report.run_id);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for source in &report.sources {
        println!("\n📂 {}", source.dataset);

        if let Some(clean) = &source.clean {
            println!(
                "   cleaned: {} of {} rows kept ({} rejected, {} duplicates, {} coerced)",
                clean.accepted,
                clean.input_rows,
                clean.rejected(),
                clean.duplicates_removed,
                clean.coerced_values
            );
        }

        for (stage, result) in [("staging", &source.staging), ("analytics", &source.analytics)] {
            match result {
                Ok(load) => println!(
                    "   ✓ {:<9} {} rows → {} ({})",
                    stage,
                    load.written,
                    load.table,
                    load.strategy.as_str()
                ),
                Err(e) => println!("   ❌ {:<9} {}", stage, e),
            }
        }
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if report.is_success() {
        println!("✅ All stages committed");
    } else {
        println!("⚠️  Some stages failed; their tables were left untouched");
    }
}

fn history(data_dir: &Path, run_id: Option<&str>) -> Result<()> {
    let conn = db::open(&StorageLayout::Directory(data_dir.to_path_buf()))
        .with_context(|| format!("Failed to open store in {}", data_dir.display()))?;

    let events = db::get_load_events(&conn, run_id)?;
    if events.is_empty() {
        println!("No loads recorded yet.");
        return Ok(());
    }

    for event in events {
        println!(
            "{}  {}  {:<42} {:<8} attempted={} written={} removed={} {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.run_id,
            event.table_name,
            event.strategy,
            event.attempted,
            event.written,
            event.removed,
            &event.fingerprint[..12.min(event.fingerprint.len())]
        );
    }

    Ok(())
}
