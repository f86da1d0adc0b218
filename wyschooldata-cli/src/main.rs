//! wyschooldata CLI: published years, single and multi-year fetch, tidy reshape.
//!
//! Commands:
//! - `years`: print the currently published year range
//! - `fetch <YEAR>`: one year in the wide schema (or tidy with `--tidy`)
//! - `fetch-many <YEAR>...`: several years concatenated, all-or-nothing
//!
//! The provider is chosen from `--fixture`, `--synthetic`, or an HTTP base URL
//! (`--base-url` or `upstream.base_url` in the config file).

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use polars::prelude::*;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use wyschooldata_core::data::{
    synthetic_provider, tidy_to_dataframe, wide_to_dataframe, MemoryProvider,
};
use wyschooldata_core::{ClientConfig, EnrollmentClient, TidyExtract, WideExtract};

/// Bounds served by `--synthetic`.
const SYNTHETIC_YEARS: (i32, i32) = (2000, 2024);

#[derive(Parser)]
#[command(
    name = "wyschooldata",
    about = "Wyoming school enrollment data: list years, fetch and reshape extracts"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Serve extracts from a JSON fixture document instead of the network.
    #[arg(long, global = true, conflicts_with_all = ["synthetic", "base_url"])]
    fixture: Option<PathBuf>,

    /// Serve generated data for 2000-2024; no network access.
    #[arg(long, global = true, default_value_t = false, conflicts_with = "base_url")]
    synthetic: bool,

    /// Base URL of the enrollment endpoint. Overrides the config file.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Per-call upstream timeout in seconds. Overrides the config file.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Worker threads for `fetch-many`. Overrides the config file.
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the currently published year range.
    Years,
    /// Fetch one school year, identified by its ending calendar year.
    Fetch {
        year: i32,

        /// Reshape into one row per subgroup.
        #[arg(long, default_value_t = false)]
        tidy: bool,
    },
    /// Fetch several years; fails as a whole if any year fails.
    FetchMany {
        #[arg(required = true)]
        years: Vec<i32>,

        /// Reshape into one row per subgroup.
        #[arg(long, default_value_t = false)]
        tidy: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Csv,
    Json,
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = build_client(&cli)?;

    match cli.command {
        Commands::Years => run_years(&client, cli.format),
        Commands::Fetch { year, tidy } => {
            let wide = client.fetch(year)?;
            emit(&client, wide, tidy, cli.format)
        }
        Commands::FetchMany { years, tidy } => {
            let wide = client.fetch_many(&years)?;
            emit(&client, wide, tidy, cli.format)
        }
    }
}

fn build_client(cli: &Cli) -> Result<EnrollmentClient> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };
    if let Some(url) = &cli.base_url {
        config.upstream.base_url = Some(url.clone());
    }
    if let Some(secs) = cli.timeout_secs {
        config.upstream.timeout_secs = secs;
    }
    if let Some(workers) = cli.workers {
        config.fetch.max_workers = workers;
    }
    config.validate()?;

    if let Some(path) = &cli.fixture {
        let provider = MemoryProvider::from_json_file(path)
            .with_context(|| format!("loading fixture {}", path.display()))?;
        info!(fixture = %path.display(), "using fixture provider");
        return Ok(EnrollmentClient::with_provider(config, Arc::new(provider)));
    }

    if cli.synthetic {
        let (min_year, max_year) = SYNTHETIC_YEARS;
        info!(min_year, max_year, "using synthetic provider");
        return Ok(EnrollmentClient::with_provider(
            config,
            Arc::new(synthetic_provider(min_year, max_year)),
        ));
    }

    if config.upstream.base_url.is_none() {
        bail!("no provider: pass --base-url, --fixture or --synthetic, or set upstream.base_url");
    }
    Ok(EnrollmentClient::from_config(config)?)
}

fn run_years(client: &EnrollmentClient, format: OutputFormat) -> Result<()> {
    let range = client.get_available_years()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&range)?),
        OutputFormat::Csv => println!("min_year,max_year\n{},{}", range.min_year(), range.max_year()),
        OutputFormat::Table => println!("Published years: {range} ({} years)", range.len()),
    }
    Ok(())
}

fn emit(client: &EnrollmentClient, wide: WideExtract, tidy: bool, format: OutputFormat) -> Result<()> {
    if tidy {
        let extract = client.tidy(wide);
        report_diagnostics(&extract);
        match format {
            OutputFormat::Json => print_json(&extract.records),
            _ => print_frame(tidy_to_dataframe(&extract)?, format),
        }
    } else {
        match format {
            OutputFormat::Json => print_json(&wide.records),
            _ => print_frame(wide_to_dataframe(&wide)?, format),
        }
    }
}

fn report_diagnostics(extract: &TidyExtract) {
    let unrecognized = extract.unrecognized_columns();
    if !unrecognized.is_empty() {
        eprintln!("Unrecognized columns (passed through): {}", unrecognized.join(", "));
    }
    let mismatches = extract.total_mismatches();
    if mismatches > 0 {
        eprintln!("{mismatches} row(s) with subgroups not adding up to the total");
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

fn print_frame(mut df: DataFrame, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Csv => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            CsvWriter::new(&mut out).include_header(true).finish(&mut df)?;
        }
        _ => println!("{df}"),
    }
    Ok(())
}
