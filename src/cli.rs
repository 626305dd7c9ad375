//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use crate::adapters::csv_adapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::client::{IndicatorClient, TopScores, DEFAULT_HISTORY_DAYS};
use crate::domain::error::CacheError;
use crate::domain::raw_row::row_to_json;
use crate::domain::record::IndicatorRecord;
use crate::logging;
use crate::settings::ClientSettings;

#[derive(Parser, Debug)]
#[command(
    name = "investing-cache",
    about = "Query precomputed daily stock indicators",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Output format for records
    #[arg(long, value_enum, default_value_t = OutputFormat::Json, global = true)]
    pub format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Default, Clone)]
pub struct ConnectionArgs {
    /// INI file with a [supabase] section
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Store URL (https://, postgres://, sqlite://)
    #[arg(long, global = true)]
    pub url: Option<String>,
    /// API key, or password for postgres://
    #[arg(long, global = true)]
    pub key: Option<String>,
    #[arg(long, global = true)]
    pub schema: Option<String>,
    #[arg(long, global = true)]
    pub table: Option<String>,
    /// Transport timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Indicators for one ticker
    Get {
        symbol: String,
        /// Defaults to the latest date with data
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Indicators for several tickers on one date
    Batch {
        #[arg(required = true)]
        symbols: Vec<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Tickers with data on a date
    Tickers {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Most recent date with data
    Latest,
    /// Recent rows for one ticker, newest first
    History {
        symbol: String,
        #[arg(long, default_value_t = DEFAULT_HISTORY_DAYS)]
        days: usize,
    },
    /// Highest-scoring tickers on a date
    Top {
        /// Score column to rank by
        #[arg(long, default_value = "bullish_score")]
        score: String,
        #[arg(long, default_value_t = 7.0)]
        min: f64,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show whether credentials are configured, without connecting
    Status,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("write failed: {0}")]
    Io(#[from] io::Error),

    #[error("json output failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv output failed: {0}")]
    Csv(#[from] csv::Error),
}

impl From<&CliError> for ExitCode {
    fn from(err: &CliError) -> Self {
        match err {
            CliError::Cache(e) => e.into(),
            _ => ExitCode::from(1),
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    logging::init(cli.verbose);

    let settings = match settings_from_args(&cli.connection, |name| std::env::var(name).ok()) {
        Ok(s) => s,
        Err(e) => return report(&CliError::Cache(e)),
    };
    let client = IndicatorClient::new(settings);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match execute(&client, &cli.command, cli.format, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

fn report(err: &CliError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, CacheError> {
    FileConfigAdapter::from_file(path).map_err(|e| CacheError::ConfigFile {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Flags beat the config file, the file beats `lookup` (the environment).
pub fn settings_from_args(
    args: &ConnectionArgs,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ClientSettings, CacheError> {
    let mut settings = match &args.config {
        Some(path) => ClientSettings::from_config(&load_config(path)?, lookup),
        None => ClientSettings::resolve(None, None, lookup),
    };

    if let Some(url) = &args.url {
        settings = settings.with_url(url.as_str());
    }
    if let Some(key) = &args.key {
        settings = settings.with_key(key.as_str());
    }
    if let Some(schema) = &args.schema {
        settings = settings.with_schema(schema.as_str());
    }
    if let Some(table) = &args.table {
        settings = settings.with_table(table.as_str());
    }
    if let Some(secs) = args.timeout {
        settings = settings.with_timeout(Duration::from_secs(secs));
    }
    Ok(settings)
}

/// Runs one command against `client`, writing results to `out`.
pub fn execute(
    client: &IndicatorClient,
    command: &Command,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    match command {
        Command::Get { symbol, date } => {
            let record = client.get(symbol, *date)?;
            match format {
                OutputFormat::Json => write_json(out, &record_json(&record)),
                OutputFormat::Csv => Ok(csv_adapter::write_records(&[record], out)?),
            }
        }
        Command::Batch { symbols, date } => {
            let records = client.get_batch(symbols, *date)?;
            match format {
                OutputFormat::Json => {
                    let map: serde_json::Map<String, Value> = records
                        .iter()
                        .map(|(symbol, record)| (symbol.clone(), record_json(record)))
                        .collect();
                    write_json(out, &Value::Object(map))
                }
                OutputFormat::Csv => {
                    let records: Vec<IndicatorRecord> = records.into_values().collect();
                    Ok(csv_adapter::write_records(&records, out)?)
                }
            }
        }
        Command::Tickers { date } => {
            let tickers = client.list_tickers(*date)?;
            match format {
                OutputFormat::Json => write_json(out, &json!(tickers)),
                OutputFormat::Csv => Ok(csv_adapter::write_column("symbol", &tickers, out)?),
            }
        }
        Command::Latest => {
            let date = client.get_latest_date()?.format("%Y-%m-%d").to_string();
            match format {
                OutputFormat::Json => write_json(out, &json!(date)),
                OutputFormat::Csv => Ok(csv_adapter::write_column("date", &[date], out)?),
            }
        }
        Command::History { symbol, days } => {
            let records = client.get_history(symbol, *days)?;
            write_records(out, format, &records)
        }
        Command::Top {
            score,
            min,
            limit,
            date,
        } => {
            let request = TopScores {
                score_field: score.clone(),
                min_score: *min,
                limit: *limit,
                date: *date,
            };
            let records = client.get_top_scores(&request)?;
            write_records(out, format, &records)
        }
        Command::Status => {
            let settings = client.settings();
            match format {
                OutputFormat::Json => write_json(
                    out,
                    &json!({
                        "configured": client.is_configured(),
                        "url": settings.url,
                        "table": settings.table_ref().to_string(),
                    }),
                ),
                OutputFormat::Csv => {
                    writeln!(out, "{client}")?;
                    writeln!(out, "url: {}", settings.url.as_deref().unwrap_or("-"))?;
                    writeln!(out, "table: {}", settings.table_ref())?;
                    Ok(())
                }
            }
        }
    }
}

fn record_json(record: &IndicatorRecord) -> Value {
    row_to_json(&record.to_row())
}

fn write_json(out: &mut dyn Write, value: &Value) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn write_records(
    out: &mut dyn Write,
    format: OutputFormat,
    records: &[IndicatorRecord],
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => write_json(out, &Value::Array(records.iter().map(record_json).collect())),
        OutputFormat::Csv => Ok(csv_adapter::write_records(records, out)?),
    }
}
