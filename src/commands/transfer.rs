//! Background upload runs

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};

use super::diagnostics::fetch_system_info;
use crate::config::{ProfileStore, StorageError};
use crate::sftp::{
    CancellationToken, LogLevel, TransferEngine, TransferGuard, TransferObserver,
    TransferOutcome, TransferRegistry, TransferRequest,
};
use crate::ssh::{SshClient, SshConfig};

/// Handle to one upload running on a background task
pub struct TransferHandle {
    id: String,
    cancel: CancellationToken,
    join: JoinHandle<TransferOutcome>,
}

impl TransferHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Ask the run to stop at its next cancellation point.
    ///
    /// The file being written completes first; the outcome becomes
    /// [`TransferOutcome::Terminated`].
    pub fn terminate(&self) {
        info!("Termination requested for transfer {}", self.id);
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the run to end
    pub async fn wait(self) -> TransferOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Transfer task {} failed: {}", self.id, e);
                TransferOutcome::Error(format!("transfer task failed: {}", e))
            }
        }
    }
}

/// Start an upload on a background task and return immediately.
///
/// The run connects, logs host diagnostics, uploads, and closes its
/// connection. Progress, log lines and the final outcome go to `observer`.
/// The run is tracked in `registry` until it ends.
pub fn start_transfer(
    config: SshConfig,
    request: TransferRequest,
    observer: Arc<dyn TransferObserver>,
    registry: Arc<TransferRegistry>,
) -> TransferHandle {
    let id = uuid::Uuid::new_v4().to_string();
    let cancel = registry.register(&id);
    let guard = TransferGuard::new(registry, id.clone());

    let task_cancel = cancel.clone();
    let join = tokio::spawn(async move {
        let _guard = guard;
        run_transfer(config, request, task_cancel, observer.as_ref()).await
    });

    TransferHandle { id, cancel, join }
}

/// Start an upload to a saved profile's host and destination.
///
/// The password is supplied per run; profiles never hold one. Lookup and
/// request errors are returned before anything connects.
pub async fn start_transfer_from_profile(
    store: &ProfileStore,
    name: &str,
    password: impl Into<String>,
    selection: Vec<PathBuf>,
    observer: Arc<dyn TransferObserver>,
    registry: Arc<TransferRegistry>,
) -> Result<TransferHandle, StorageError> {
    let profile = store.profile(name).await?;
    let request = profile
        .transfer_request(selection)
        .map_err(|e| StorageError::InvalidProfile {
            name: profile.name.clone(),
            reason: e.to_string(),
        })?;

    info!(
        "Starting transfer with profile '{}' to {}",
        profile.name, request.destination_root
    );
    Ok(start_transfer(
        profile.to_ssh_config(password),
        request,
        observer,
        registry,
    ))
}

async fn run_transfer(
    config: SshConfig,
    request: TransferRequest,
    cancel: CancellationToken,
    observer: &dyn TransferObserver,
) -> TransferOutcome {
    observer.on_log("Starting file transfer...", LogLevel::Info);
    observer.on_log("Establishing SSH connection...", LogLevel::Info);

    let conn = match SshClient::new(config).connect().await {
        Ok(conn) => conn,
        Err(e) => return fail(observer, e.to_string()),
    };
    observer.on_log("SSH connection established.", LogLevel::Success);

    fetch_system_info(&conn, &cancel, observer).await;

    if cancel.is_cancelled() {
        conn.close().await;
        observer.on_log("Transfer terminated by the user.", LogLevel::Warning);
        observer.on_outcome(&TransferOutcome::Terminated);
        return TransferOutcome::Terminated;
    }

    let sftp = match conn.open_sftp().await {
        Ok(sftp) => sftp,
        Err(e) => {
            conn.close().await;
            return fail(observer, e.to_string());
        }
    };

    let outcome = TransferEngine::new(&sftp, cancel, observer)
        .run(&request)
        .await;

    super::close_session(conn, sftp).await;
    info!("Transfer finished: {:?}", outcome);
    outcome
}

fn fail(observer: &dyn TransferObserver, reason: String) -> TransferOutcome {
    error!("Transfer failed: {}", reason);
    observer.on_log(&format!("Error: {}", reason), LogLevel::Error);
    let outcome = TransferOutcome::Error(reason);
    observer.on_outcome(&outcome);
    outcome
}
