//! PureBG CLI Tool
//!
//! Command-line interface that runs one image through the background removal
//! pipeline and writes the transparent result to disk.

use super::config::CliConfigBuilder;
use crate::{
    error::ErrorKind,
    pipeline::PipelineOrchestrator,
    tracing_config::{init_cli_tracing, TracingFormat},
    types::ProcessingState,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Remove the background of an image
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "purebg")]
pub struct Cli {
    /// Input image file (PNG, JPEG, WebP, GIF, BMP, TIFF)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Directory the result is written to
    #[arg(short, long, value_name = "OUTPUT_DIR", default_value = ".")]
    pub output: PathBuf,

    /// Channel value every one of R, G and B must exceed to be keyed out
    #[arg(short, long, default_value_t = crate::config::DEFAULT_WHITE_THRESHOLD)]
    pub threshold: u8,

    /// Remote image model performing subject isolation
    #[arg(short, long, default_value = crate::config::DEFAULT_MODEL)]
    pub model: String,

    /// API base URL
    #[arg(long, default_value = crate::config::DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// API key [default: read from the API_KEY environment variable]
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Output format (always with alpha channel)
    #[arg(short, long, value_enum, default_value_t = CliOutputFormat::Png)]
    pub format: CliOutputFormat,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 120)]
    pub timeout: u64,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON (requires the tracing-json feature)
    #[arg(long)]
    pub json_logs: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum CliOutputFormat {
    Png,
    #[cfg(feature = "webp-support")]
    Webp,
    Tiff,
}

/// Process exit code for a failed run
#[must_use]
pub fn exit_code_for(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Unknown => 1,
        ErrorKind::Config => 2,
        ErrorKind::Decode => 3,
        ErrorKind::Auth => 4,
        ErrorKind::RateLimit => 5,
        ErrorKind::ModelUnavailable => 6,
        ErrorKind::EmptyResponse => 7,
    }
}

pub async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_cli_tracing(cli.verbose, tracing_format(cli.json_logs)).context("Failed to initialize tracing")?;

    let config = CliConfigBuilder::from_cli(&cli).context("Invalid command-line arguments")?;
    debug!(
        model = %config.model,
        endpoint = %config.endpoint,
        threshold = config.white_threshold,
        format = %config.output_format,
        "Configuration built"
    );

    let pipeline = PipelineOrchestrator::new(&config).context("Failed to create pipeline")?;

    if let Err(error) = pipeline.select_image(&cli.input).await {
        eprintln!("❌ {}: {}", cli.input.display(), error);
        eprintln!("   {}", error.suggested_action());
        return Ok(ExitCode::from(exit_code_for(error.kind())));
    }
    info!("Input: {}", cli.input.display());

    let spinner = create_spinner();
    spinner.set_message(format!("Isolating subject with {}", config.model));
    let start_time = Instant::now();
    let state = pipeline.process().await;
    spinner.finish_and_clear();

    match state {
        ProcessingState::Complete => {
            let download = pipeline
                .download()
                .context("Pipeline completed without a result")?;
            let path = download.save(&cli.output).with_context(|| {
                format!("Failed to write result to {}", cli.output.display())
            })?;

            let snapshot = pipeline.snapshot();
            if !snapshot.matte_applied {
                warn!("Result could not be decoded for matting; saved without transparency");
            }
            println!(
                "✅ {} -> {} ({:.2}s)",
                cli.input.display(),
                path.display(),
                start_time.elapsed().as_secs_f64()
            );
            Ok(ExitCode::SUCCESS)
        },
        _ => {
            let report = pipeline
                .error()
                .context("Pipeline stopped without reporting an error")?;
            eprintln!("❌ {}: {}", cli.input.display(), report.message);
            eprintln!("   {}", report.kind.suggested_action());
            Ok(ExitCode::from(exit_code_for(report.kind)))
        },
    }
}

fn tracing_format(json_logs: bool) -> TracingFormat {
    #[cfg(feature = "tracing-json")]
    {
        if json_logs {
            return TracingFormat::Json;
        }
    }
    #[cfg(not(feature = "tracing-json"))]
    {
        if json_logs {
            eprintln!("--json-logs requires the tracing-json feature; using console output");
        }
    }
    TracingFormat::Console
}

fn create_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg} [{elapsed}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
