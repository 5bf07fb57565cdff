//! One-shot remote operations: download, delete, rename, mkdir, move

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::sftp::{BatchResult, LogLevel, RemoteFs, RemoteTreeOps, SftpError, TransferObserver};
use crate::ssh::SshConfig;

/// A remote operation as requested by the front end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum RemoteOperation {
    Download {
        remote_path: String,
        local_destination: PathBuf,
    },
    Delete {
        remote_path: String,
    },
    Rename {
        remote_path: String,
        new_name: String,
    },
    CreateDir {
        remote_path: String,
    },
    Move {
        remote_path: String,
        destination: String,
    },
}

impl RemoteOperation {
    /// Short name used in messages
    pub fn name(&self) -> &'static str {
        match self {
            RemoteOperation::Download { .. } => "download",
            RemoteOperation::Delete { .. } => "delete",
            RemoteOperation::Rename { .. } => "rename",
            RemoteOperation::CreateDir { .. } => "create_dir",
            RemoteOperation::Move { .. } => "move",
        }
    }
}

/// Summary of one finished operation
#[derive(Debug, Clone, Serialize)]
pub struct OperationReport {
    pub message: String,
    pub level: LogLevel,
    /// Per-path results; single-path operations report exactly one entry
    pub result: BatchResult,
}

/// Run `op` on its own connection and report the result.
///
/// Connection failures and failed single-path operations are reported as
/// errors; recursive operations report partial success.
pub async fn run_remote_operation(
    config: &SshConfig,
    op: &RemoteOperation,
    observer: &dyn TransferObserver,
) -> OperationReport {
    let name = op.name();

    let (conn, sftp) = match super::open_session(config).await {
        Ok(pair) => pair,
        Err(e) => return error_report(name, &e, observer),
    };

    let outcome = execute(&sftp, op, observer).await;
    super::close_session(conn, sftp).await;

    match outcome {
        Ok(result) => {
            let report = OperationReport {
                message: format!("{} operation completed successfully.", capitalize(name)),
                level: if result.is_complete() {
                    LogLevel::Success
                } else {
                    LogLevel::Warning
                },
                result,
            };
            info!("{}", report.message);
            observer.on_log(&report.message, report.level);
            report
        }
        Err(e) => error_report(name, &e, observer),
    }
}

/// Dispatch `op` against an open filesystem
pub async fn execute(
    fs: &dyn RemoteFs,
    op: &RemoteOperation,
    observer: &dyn TransferObserver,
) -> Result<BatchResult, SftpError> {
    let ops = RemoteTreeOps::new(fs, observer);

    let single = |path: String| BatchResult {
        success: vec![path],
        failed: Vec::new(),
    };

    match op {
        RemoteOperation::Download {
            remote_path,
            local_destination,
        } => Ok(ops.download(remote_path, local_destination).await),
        RemoteOperation::Delete { remote_path } => Ok(ops.delete(remote_path).await),
        RemoteOperation::Rename {
            remote_path,
            new_name,
        } => ops.rename(remote_path, new_name).await.map(single),
        RemoteOperation::CreateDir { remote_path } => ops.mkdir(remote_path).await.map(single),
        RemoteOperation::Move {
            remote_path,
            destination,
        } => ops.move_to(remote_path, destination).await.map(single),
    }
}

fn error_report(name: &str, err: &SftpError, observer: &dyn TransferObserver) -> OperationReport {
    let message = format!("Error during {}: {}", name, err);
    error!("{}", message);
    observer.on_log(&message, LogLevel::Error);
    OperationReport {
        message,
        level: LogLevel::Error,
        result: BatchResult::default(),
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
