//! Folio CLI - run the HTML to PDF converter against a directory

mod logging;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use folio_core::application::ConversionService;
use folio_core::domain::InvocationRequest;
use folio_core::port::cancel_channel;
use folio_core::port::time_provider::SystemTimeProvider;
use folio_core::{EchoMode, InvokerConfig};
use folio_infra_system::SubprocessInvoker;

use report::{exit_status, ErrorReport};

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Convert a directory of HTML files to PDF", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory containing the HTML files
    html_dir: String,

    /// Converter executable (default: <install dir>/bin/html_to_pdf_all)
    /// Overrides FOLIO_CONVERTER_BIN
    #[arg(long)]
    converter: Option<PathBuf>,

    /// Stop the converter after this many milliseconds
    /// Overrides FOLIO_TIMEOUT_MS
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Do not echo converter output while it runs
    #[arg(short, long)]
    quiet: bool,

    /// Print the outcome (or error) as JSON on stdout; live converter
    /// output goes to stderr instead
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging()?;

    info!("Folio v{} starting...", folio_core::VERSION);

    let mut config = InvokerConfig::from_env().context("Invalid Folio configuration")?;
    if let Some(converter) = cli.converter {
        config = config.with_executable(converter);
    }
    if let Some(ms) = cli.timeout_ms {
        config = config.with_timeout(Some(Duration::from_millis(ms)));
    }
    if cli.quiet {
        config = config.with_echo_mode(EchoMode::Off);
    } else if cli.json {
        // stdout carries only the JSON document
        config = config.with_echo_mode(EchoMode::Stderr);
    }

    let time_provider = Arc::new(SystemTimeProvider);
    let invoker = Arc::new(SubprocessInvoker::new(config, time_provider.clone()));
    let service = ConversionService::new(invoker, time_provider);

    let (cancel_handle, cancel_token) = cancel_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, stopping converter");
            cancel_handle.cancel();
        }
    });

    match service
        .convert(InvocationRequest::new(cli.html_dir), cancel_token)
        .await
    {
        Ok(outcome) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                eprintln!("{}", "✓ Conversion finished successfully".green().bold());
            }
            Ok(())
        }
        Err(e) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&ErrorReport::from(&e))?);
            } else {
                eprintln!("{} {}", "✗".red().bold(), e);
            }
            std::process::exit(exit_status(&e));
        }
    }
}
