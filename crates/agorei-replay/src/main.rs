//! Entry point for the feed scenario replayer.
//!
//! Reads a JSONL scenario from a file or stdin and prints one JSON frame per
//! applied line on stdout. Logs go to stderr.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;

use agorei_feed::FeedConfig;
use agorei_logging::{AgoreiSubscriberBuilder, LogConfig};
use agorei_replay::{Replay, StreamConfig, start_stream};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "agorei-replay")]
#[command(about = "Replay a feed scenario against an in-memory store")]
struct Args {
    /// Path to a JSONL scenario file (reads from stdin if not provided)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a JSON feed configuration (collection and field names)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Human-readable log output instead of JSONL
    #[arg(long)]
    pretty: bool,

    /// Default log level when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<FeedConfig> {
    let Some(path) = path else {
        return Ok(FeedConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading feed config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing feed config {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_config = if args.pretty {
        LogConfig::development()
    } else {
        LogConfig::default()
    };
    let _guard = AgoreiSubscriberBuilder::new()
        .with_config(log_config)
        .with_level(&args.log_level)
        .init();

    let config = load_config(args.config.as_deref())?;
    tracing::info!(collection = %config.collection, "starting replay");

    let mut replay = Replay::new(config);
    let mut lines = start_stream(StreamConfig {
        file_path: args.file,
    });

    while let Some(line) = lines.recv().await {
        let frame = replay.apply(line).await;
        println!("{}", serde_json::to_string(&frame)?);
    }

    replay.shutdown();
    tracing::info!("replay finished");
    Ok(())
}
