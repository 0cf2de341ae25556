//! # weekcode
//!
//! Looks up the week code of a catalogue code for a date through the week
//! resolver service and prints it. The service URL comes from `--service-url`
//! or `WEEKRESOLVER_SERVICE_URL`; the remaining `WEEKRESOLVER_*` variables
//! tune the retry policy.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{ArgAction, Parser, ValueHint};
use lib_weekresolver::configs::config_env::SERVICE_URL_VAR;
use lib_weekresolver::loggers::tracing_setup::{TracingOptions, init_tracing};
use lib_weekresolver::{ConnectorConfig, WeekResolverConnector};

/// CLI arguments for weekcode.
#[derive(Parser)]
#[clap(
    name = "weekcode",
    version = "1.0.0",
    author = "ckir",
    about = "Resolves the week code of a catalogue code.",
    long_about = "Asks the week resolver service which week code applies to a catalogue code \
                  on a given date (today by default) and prints it."
)]
pub struct Cli {
    /// Catalogue code, e.g. DPF or BKM.
    #[clap(value_parser)]
    pub catalogue_code: String,

    /// Date to resolve, as YYYY-MM-DD. Defaults to today's local date.
    #[clap(long, short = 'd', value_name = "DATE")]
    pub date: Option<NaiveDate>,

    /// Root URL of the week resolver service.
    #[clap(long, env = SERVICE_URL_VAR, value_hint = ValueHint::Url)]
    pub service_url: Option<String>,

    /// Give up after this many seconds, retries included.
    #[clap(long, value_name = "SECS")]
    pub deadline_secs: Option<u64>,

    /// Fallback log filter when RUST_LOG is unset.
    #[clap(long, default_value = "warn")]
    pub log_level: String,

    /// Also write JSON logs to daily files in this directory.
    #[clap(long, value_hint = ValueHint::DirPath)]
    pub log_dir: Option<PathBuf>,

    /// Print the whole result as JSON instead of only the week code.
    #[clap(long, action = ArgAction::SetTrue)]
    pub json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Cli) -> Result<()> {
    let _guard = init_tracing(&TracingOptions {
        level: args.log_level.clone(),
        log_dir: args.log_dir.clone(),
        file_prefix: "weekcode".to_string(),
        ..TracingOptions::default()
    })
    .context("failed to initialize logging")?;

    let mut config = match &args.service_url {
        // The flag wins over the variable; the rest still comes from the environment.
        Some(url) => {
            let url = url.clone();
            ConnectorConfig::from_lookup(move |key: &str| {
                if key == SERVICE_URL_VAR {
                    Some(url.clone())
                } else {
                    std::env::var(key).ok()
                }
            })?
        }
        None => ConnectorConfig::from_env()?,
    };
    if let Some(secs) = args.deadline_secs {
        config.call_deadline = Some(Duration::from_secs(secs));
    }
    tracing::debug!("{}", config);

    let connector = WeekResolverConnector::from_config(&config)?;
    let date = args
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let result = connector
        .resolve(&args.catalogue_code, date)
        .await
        .with_context(|| format!("lookup of {} for {} failed", args.catalogue_code, date))?;
    connector.close();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.week_code());
    }
    Ok(())
}
