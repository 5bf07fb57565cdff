//! SFTP data types

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::error::SftpError;

/// Upload request: a local selection mirrored under a remote root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Local files and/or directories (non-empty, no duplicates)
    pub selected_paths: Vec<PathBuf>,
    /// Remote directory receiving the selection
    pub destination_root: String,
    /// Bare file or directory names to skip (exact match, not patterns)
    #[serde(default)]
    pub exclusions: BTreeSet<String>,
}

impl TransferRequest {
    pub fn new(
        selected_paths: impl IntoIterator<Item = PathBuf>,
        destination_root: impl Into<String>,
        exclusions: impl IntoIterator<Item = String>,
    ) -> Result<Self, SftpError> {
        let mut seen = BTreeSet::new();
        let selected_paths: Vec<PathBuf> = selected_paths
            .into_iter()
            .filter(|p| seen.insert(p.clone()))
            .collect();

        if selected_paths.is_empty() {
            return Err(SftpError::InvalidRequest(
                "no files or folders selected".to_string(),
            ));
        }

        let destination_root = destination_root.into().trim().to_string();
        if destination_root.is_empty() {
            return Err(SftpError::InvalidRequest(
                "destination directory is empty".to_string(),
            ));
        }

        Ok(Self {
            selected_paths,
            destination_root,
            exclusions: exclusions.into_iter().collect(),
        })
    }

    /// Parse a comma-separated exclusion list, e.g. `".git, node_modules,,"`
    pub fn parse_exclusions(input: &str) -> BTreeSet<String> {
        input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Final state of one upload run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum TransferOutcome {
    Success,
    Terminated,
    Error(String),
}

/// Severity attached to observer log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Success,
    Warning,
    Error,
}

/// Receives log lines, progress and the final outcome of an operation.
///
/// Called from the background task; implementors marshal to their own context.
pub trait TransferObserver: Send + Sync {
    fn on_log(&self, message: &str, level: LogLevel);

    fn on_progress(&self, _percent: u8) {}

    fn on_outcome(&self, _outcome: &TransferOutcome) {}
}

/// Observer that discards everything
pub struct NullObserver;

impl TransferObserver for NullObserver {
    fn on_log(&self, _message: &str, _level: LogLevel) {}
}

/// Event emitted by [`ChannelObserver`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransferEvent {
    Log { message: String, level: LogLevel },
    Progress { percent: u8 },
    Outcome { outcome: TransferOutcome },
}

/// Observer that forwards every event, in order, into an unbounded channel
#[derive(Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<TransferEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TransferEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl TransferObserver for ChannelObserver {
    fn on_log(&self, message: &str, level: LogLevel) {
        let _ = self.tx.send(TransferEvent::Log {
            message: message.to_string(),
            level,
        });
    }

    fn on_progress(&self, percent: u8) {
        let _ = self.tx.send(TransferEvent::Progress { percent });
    }

    fn on_outcome(&self, outcome: &TransferOutcome) {
        let _ = self.tx.send(TransferEvent::Outcome {
            outcome: outcome.clone(),
        });
    }
}

/// Per-entry results of a recursive remote operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResult {
    /// Successfully processed paths
    pub success: Vec<String>,
    /// Failed paths with error messages
    pub failed: Vec<(String, String)>,
}

impl BatchResult {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn merge(&mut self, other: BatchResult) {
        self.success.extend(other.success);
        self.failed.extend(other.failed);
    }
}

/// Constants for SFTP operations
pub mod constants {
    /// Chunk size for streaming file transfers (64 KB)
    pub const CHUNK_SIZE: usize = 64 * 1024;
}
