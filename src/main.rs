//! redis-cp - copy a keyspace between Redis-compatible servers
//!
//! Picks MIGRATE when both servers support it and DUMP/RESTORE otherwise,
//! then copies every key matching a pattern in pipelined batches.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use colored::Colorize;

use redis_cp::migration::{Orchestrator, RunBanner, RunSummary};
use redis_cp::MigrationConfig;
use redis_cp_core::config::LogFormat;

/// redis-cp - copy keys between Redis-compatible servers, keeping TTLs
#[derive(Parser, Debug)]
#[command(name = "redis-cp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Source host
    #[arg(value_name = "SRC")]
    source: Option<String>,

    /// Destination host
    #[arg(value_name = "DST")]
    destination: Option<String>,

    /// Path to configuration file (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Report what would be copied without writing to the destination
    #[arg(long = "dryrun", alias = "dry-run")]
    dry_run: bool,

    /// Database index for both sides
    #[arg(long, value_name = "N")]
    db: Option<u32>,

    /// Port for both sides
    #[arg(long, value_name = "PORT")]
    port: Option<u16>,

    /// Source database index (overrides --db)
    #[arg(long, value_name = "N")]
    sdb: Option<u32>,

    /// Destination database index (overrides --db)
    #[arg(long, value_name = "N")]
    ddb: Option<u32>,

    /// Source port (overrides --port)
    #[arg(long, value_name = "PORT")]
    sport: Option<u16>,

    /// Destination port (overrides --port)
    #[arg(long, value_name = "PORT")]
    dport: Option<u16>,

    /// Keys per batch [default: 100]
    #[arg(long = "batch", value_name = "N")]
    batch_size: Option<usize>,

    /// COUNT hint for each SCAN page [default: 100]
    #[arg(long, value_name = "N")]
    scan_count: Option<usize>,

    /// Only copy keys matching this glob [default: *]
    #[arg(long, value_name = "GLOB")]
    pattern: Option<String>,

    /// MIGRATE timeout in milliseconds [default: 1000]
    #[arg(long = "migrate-timeout", value_name = "MS")]
    migrate_timeout_ms: Option<u64>,

    /// Source password
    #[arg(long, value_name = "PASSWORD", env = "REDIS_CP_SOURCE_PASSWORD", hide_env_values = true)]
    source_password: Option<String>,

    /// Destination password
    #[arg(
        long,
        value_name = "PASSWORD",
        env = "REDIS_CP_DESTINATION_PASSWORD",
        hide_env_values = true
    )]
    destination_password: Option<String>,

    /// Print progress before every batch
    #[arg(long)]
    verbose: bool,

    /// Print the final summary as JSON
    #[arg(long)]
    json: bool,

    /// Log level: trace, debug, info, warn, error (overrides config file)
    #[arg(
        short = 'l',
        long = "log-level",
        value_name = "LEVEL",
        env = "REDIS_CP_LOG_LEVEL"
    )]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum, value_name = "FORMAT")]
    log_format: Option<LogFormatArg>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

impl Cli {
    /// Apply CLI argument overrides to the configuration
    fn apply_to_config(&self, config: &mut MigrationConfig) {
        if let Some(ref host) = self.source {
            config.source.host = host.clone();
        }
        if let Some(ref host) = self.destination {
            config.destination.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(db) = self.db {
            config.db = db;
        }
        if self.sport.is_some() {
            config.source.port = self.sport;
        }
        if self.dport.is_some() {
            config.destination.port = self.dport;
        }
        if self.sdb.is_some() {
            config.source.db = self.sdb;
        }
        if self.ddb.is_some() {
            config.destination.db = self.ddb;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(scan_count) = self.scan_count {
            config.scan_count = scan_count;
        }
        if let Some(ref pattern) = self.pattern {
            config.pattern = pattern.clone();
        }
        if let Some(timeout) = self.migrate_timeout_ms {
            config.migrate_timeout_ms = timeout;
        }
        if let Some(ref password) = self.source_password {
            config.source.password = Some(password.clone());
        }
        if let Some(ref password) = self.destination_password {
            config.destination.password = Some(password.clone());
        }
        if let Some(ref level) = self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.logging.format = format.into();
        }
        config.dry_run |= self.dry_run;
        config.verbose |= self.verbose;
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<MigrationConfig> {
    let mut config = match &cli.config {
        Some(path) => MigrationConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => MigrationConfig::default(),
    };
    cli.apply_to_config(&mut config);
    Ok(config)
}

fn init_logging(config: &MigrationConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    // stdout carries the report; logs go to stderr.
    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn print_banner(banner: &RunBanner) {
    println!("{}", banner.to_string().bold());
}

fn print_summary(summary: &RunSummary) {
    let tag = format!("[{}]", summary.tag());
    let tag = if summary.dry_run {
        tag.yellow().bold()
    } else {
        tag.green().bold()
    };
    println!(
        "{} {} keys copied, {} skipped",
        tag, summary.copied, summary.skipped
    );
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    init_logging(&config);

    let verbose = config.verbose;
    let orchestrator = Orchestrator::new(config)?;
    let (source, destination) = orchestrator.connect().await?;
    let prepared = orchestrator.prepare(source, destination).await?;
    print_banner(prepared.banner());

    let summary = prepared
        .execute(|progress| {
            if verbose {
                println!("{}", progress.line());
            }
        })
        .await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
