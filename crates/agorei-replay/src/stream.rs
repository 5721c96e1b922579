//! JSONL scenario reader.
//!
//! Supports reading from stdin or a file path.

use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

use crate::scenario::{ScenarioEvent, parse_line};

/// A parsed scenario line with its 1-based line number.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioLine {
    pub number: usize,
    pub event: ScenarioEvent,
}

/// Configuration for the stream reader.
#[derive(Debug, Clone, Default)]
pub struct StreamConfig {
    /// Path to a JSONL file, or None to read from stdin.
    pub file_path: Option<PathBuf>,
}

/// Starts the scenario reader in a background task.
///
/// Returns a channel receiver that yields parsed lines. The channel closes
/// when the input is exhausted or unreadable.
pub fn start_stream(config: StreamConfig) -> mpsc::UnboundedReceiver<ScenarioLine> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        if let Err(e) = run_stream(config, tx).await {
            tracing::error!("Scenario reader error: {:#}", e);
        }
    });

    rx
}

async fn run_stream(
    config: StreamConfig,
    tx: mpsc::UnboundedSender<ScenarioLine>,
) -> anyhow::Result<()> {
    if let Some(path) = config.file_path {
        tracing::info!(path = %path.display(), "reading scenario from file");
        let file = tokio::fs::File::open(&path).await?;
        read_lines(file, &tx).await?;
    } else {
        tracing::info!("reading scenario from stdin");
        read_lines(tokio::io::stdin(), &tx).await?;
    }

    tracing::info!("scenario reader finished");
    Ok(())
}

/// Reads lines from an async reader and forwards the parsed events.
///
/// Unparseable lines are logged and skipped.
pub async fn read_lines<R: AsyncRead + Unpin>(
    reader: R,
    tx: &mpsc::UnboundedSender<ScenarioLine>,
) -> anyhow::Result<usize> {
    let mut lines = BufReader::new(reader).lines();
    let mut number = 0;
    let mut sent = 0;

    while let Some(line) = lines.next_line().await? {
        number += 1;
        match parse_line(&line) {
            None => continue,
            Some(Ok(event)) => {
                if tx.send(ScenarioLine { number, event }).is_err() {
                    // Receiver dropped
                    break;
                }
                sent += 1;
            }
            Some(Err(e)) => {
                tracing::warn!(line = number, error = %e, "skipping unparseable scenario line");
            }
        }
    }

    Ok(sent)
}
