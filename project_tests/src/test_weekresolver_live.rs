//! # Week Resolver Live Test
//!
//! Connects to a running week resolver service and prints the raw result of
//! one lookup. Reads `WEEKRESOLVER_SERVICE_URL` (or `.env`) unless a URL is
//! given on the command line.

use chrono::NaiveDate;
use clap::Parser;
use lib_weekresolver::loggers::tracing_setup::{TracingOptions, init_tracing};
use lib_weekresolver::{ConnectorConfig, WeekResolverConnector};

#[derive(Parser)]
#[clap(name = "test_weekresolver_live", about = "Live week resolver lookup.")]
struct Args {
    /// Catalogue code to resolve.
    #[clap(default_value = "DPF")]
    catalogue_code: String,

    /// Date to resolve, as YYYY-MM-DD.
    #[clap(long, default_value = "2019-10-10")]
    date: NaiveDate,

    /// Service URL; overrides WEEKRESOLVER_SERVICE_URL.
    #[clap(long)]
    service_url: Option<String>,
}

/// Executes the live lookup.
///
/// Prints the full ResolutionResult to stdout on success.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _guard = init_tracing(&TracingOptions {
        level: "debug".to_string(),
        ..TracingOptions::default()
    })?;

    let connector = match args.service_url {
        Some(url) => WeekResolverConnector::from_config(&ConnectorConfig::new(url))?,
        None => WeekResolverConnector::from_env()?,
    };

    println!(
        "[*] Requesting {} for {} from {}...",
        args.catalogue_code,
        args.date,
        connector.base_url()
    );

    match connector.resolve(&args.catalogue_code, args.date).await {
        Ok(result) => {
            println!("\n[SUCCESS] Data received:");
            println!("-----------------------------------------------");
            println!("{}", serde_json::to_string_pretty(&result)?);
            println!("-----------------------------------------------");
        }
        Err(e) => {
            eprintln!("\n[ERROR] Week code lookup failed:");
            eprintln!(">>> {}", e);
            std::process::exit(1);
        }
    }

    connector.close();
    Ok(())
}
