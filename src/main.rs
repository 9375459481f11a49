use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use startup_market_etl::config::{AppConfig, StorageBackend};
use startup_market_etl::logging::init_logging;
use startup_market_etl::metrics::init_metrics;
use startup_market_etl::pipeline::inspect::inspect_pipeline;
use startup_market_etl::pipeline::{load_aggregates, run_aggregate, run_all, run_clean, run_ingest, PipelineContext};
use startup_market_etl::queries;
use startup_market_etl::scoring::{
    discover_opportunities, evaluate_idea, CapitalBand, DiscoveryPreferences, RiskAppetite, DEFAULT_DISCOVERY_LIMIT,
};

#[derive(Parser)]
#[command(name = "startup_market_etl")]
#[command(about = "Startup market ETL: raw records to sector intelligence and opportunity scores")]
#[command(version = "0.1.0")]
struct Cli {
    /// Config file (defaults to etl.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Storage backend override: sqlite or memory
    #[arg(long, global = true)]
    backend: Option<StorageBackend>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load an input file into the raw collection
    Ingest {
        /// .csv, .json, .jsonl or .ndjson file (defaults to <data_dir>/raw/<raw_file_name>)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Empty the raw collection first
        #[arg(long)]
        replace: bool,
    },
    /// Normalize and deduplicate raw records into the clean collection
    Clean,
    /// Rebuild the sector snapshot from the clean collection
    Aggregate,
    /// Run ingest, clean and aggregate sequentially
    Run {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        replace: bool,
    },
    /// Show row and column counts for every collection
    Verify,
    /// Rank sectors by opportunity
    Discover {
        #[arg(long)]
        sector: Option<String>,
        /// low, medium or high
        #[arg(long)]
        risk: Option<RiskAppetite>,
        /// under-50k, 50k-500k, 500k-5m or over-5m
        #[arg(long)]
        capital_band: Option<CapitalBand>,
        #[arg(long, default_value_t = DEFAULT_DISCOVERY_LIMIT)]
        limit: usize,
    },
    /// Evaluate an idea in one sector with a given amount of capital
    Evaluate {
        #[arg(long)]
        sector: String,
        #[arg(long)]
        capital: f64,
    },
    /// Run the canned market queries
    Query {
        /// Sector for the capital distribution and funding-floor queries
        #[arg(long)]
        sector: Option<String>,
        #[arg(long, default_value_t = 1_000_000.0)]
        min_funding: f64,
    },
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(backend) = cli.backend {
        config.storage.backend = backend;
    }

    let _log_guard = init_logging(&config.logging);
    if let Some(addr) = &config.metrics.addr {
        init_metrics(addr);
    }

    let default_input = config.pipeline.default_raw_file();
    let ctx = match PipelineContext::connect(config).await {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Storage unavailable: {}", e);
            println!("❌ Could not connect to storage: {}", e);
            return Err(e.into());
        }
    };

    match cli.command {
        Commands::Ingest { input, replace } => {
            println!("📥 Running ingest...");
            let input = input.unwrap_or(default_input);
            let report = run_ingest(&ctx, &input, replace).await?;
            println!(
                "✅ Ingested {} of {} rows from {} ({} columns, {} skipped)",
                report.insert.inserted,
                report.rows_read,
                input.display(),
                report.columns,
                report.rows_skipped
            );
        }
        Commands::Clean => {
            println!("🧹 Running clean...");
            let report = run_clean(&ctx).await?;
            println!(
                "✅ Cleaned {} raw records: {} rejected, {} duplicates removed, {} saved",
                report.raw_records, report.rejected, report.duplicates_removed, report.insert.inserted
            );
        }
        Commands::Aggregate => {
            println!("📈 Running aggregate...");
            let report = run_aggregate(&ctx).await?;
            println!(
                "✅ Aggregated {} records into {} sectors ({} dropped)",
                report.clean_records,
                report.sectors,
                report.dropped_sectors.len()
            );
        }
        Commands::Run { input, replace } => {
            println!("🔄 Running full pipeline...");
            let input = input.unwrap_or(default_input);
            let report = run_all(&ctx, &input, replace).await?;
            info!(
                "Pipeline finished: ingest run {}, clean run {}, aggregate run {}",
                report.ingest.run.run_id, report.clean.run.run_id, report.aggregate.run.run_id
            );
            print_json(&report)?;
        }
        Commands::Verify => {
            for stats in inspect_pipeline(ctx.store.as_ref()).await? {
                println!("\n{}", "=".repeat(70));
                println!("Collection: {}", stats.collection);
                println!("{}", "=".repeat(70));
                println!("Row Count: {}", stats.documents);
                println!("Column Count: {}", stats.column_count());
            }
        }
        Commands::Discover {
            sector,
            risk,
            capital_band,
            limit,
        } => {
            let aggregates = load_aggregates(ctx.store.as_ref()).await?;
            let preferences = DiscoveryPreferences {
                sector,
                risk_appetite: risk,
                capital_band,
            };
            let recommendations = discover_opportunities(&aggregates, &preferences, limit)?;
            for (rank, rec) in recommendations.iter().enumerate() {
                println!("\n{}. {} (score {:.2}/10)", rank + 1, rec.sector, rec.score.total);
                for reason in &rec.reasons {
                    println!("   - {}", reason);
                }
            }
        }
        Commands::Evaluate { sector, capital } => {
            let aggregates = load_aggregates(ctx.store.as_ref()).await?;
            let evaluation = evaluate_idea(&aggregates, &sector, capital)?;
            print_json(&evaluation)?;
        }
        Commands::Query { sector, min_funding } => {
            let aggregates = load_aggregates(ctx.store.as_ref()).await?;
            println!("Top sectors by funding:");
            print_json(&queries::top_sectors_by_funding(&aggregates, queries::TOP_SECTORS_LIMIT))?;
            println!("High growth, low risk sectors:");
            print_json(&queries::high_growth_low_risk(&aggregates))?;
            println!("Founding timeline:");
            print_json(&queries::sector_timeline(&aggregates, queries::TIMELINE_LIMIT))?;

            if let Some(sector) = sector {
                match queries::sector_capital_distribution(ctx.store.as_ref(), &sector).await? {
                    Some(distribution) => print_json(&distribution)?,
                    None => println!("⚠️  No aggregate for sector {}", sector),
                }
                let count = queries::count_startups_with_funding(ctx.store.as_ref(), &sector, min_funding).await?;
                println!("{} startups in {} with at least ${:.0}", count, sector, min_funding);
            }
        }
    }

    Ok(())
}
