//! Main entry point for ryx CLI

use anyhow::Context;
use clap::Parser;
use ryx::cli::output::OutputFormatter;
use ryx::cli::{Args, VerbosityLevel};
use ryx::Extractor;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    let verbosity = args.verbosity_level();

    // Initialize logging
    init_logging(verbosity)?;
    debug!("Starting ryx with args: {:?}", args);

    let formatter = OutputFormatter::new(verbosity);

    let extractor = Extractor::with_config(args.extractor_config())
        .context("failed to set up extractor")?;

    let start_time = Instant::now();
    let extraction = extractor
        .extract(&args.video)
        .await
        .with_context(|| format!("could not extract formats for {}", args.video))?;
    info!(
        "Extraction finished in {}",
        humantime::format_duration(trim_to_millis(start_time.elapsed()))
    );

    let mut formats = extraction.formats;
    if let Some(itag) = args.itag {
        formats.retain(|format| format.itag == Some(itag));
        if formats.is_empty() {
            formatter.error(&format!("no format with itag {}", itag));
            formatter.print_failures(&extraction.failures);
            std::process::exit(1);
        }
    }

    if args.print_url {
        formatter.print_urls(&formats);
    } else if args.json {
        formatter.print_json(&formats)?;
    } else {
        formatter.print_formats(&extraction.video_id, &formats);
    }
    formatter.print_failures(&extraction.failures);

    Ok(())
}

/// Initialize logging system
fn init_logging(verbosity: VerbosityLevel) -> anyhow::Result<()> {
    // RUST_LOG wins over the verbosity flags
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(verbosity.default_log_filter()));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(())
}

fn trim_to_millis(duration: std::time::Duration) -> std::time::Duration {
    std::time::Duration::from_millis(duration.as_millis() as u64)
}
