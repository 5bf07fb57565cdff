//! Upload engine for SFTP operations
//!
//! Mirrors a local selection under a remote root, one file at a time, with
//! cooperative cancellation.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use super::ensure::DirectoryEnsurer;
use super::error::SftpError;
use super::estimate::SizeEstimator;
use super::path_utils::{local_basename, remote_parent, PathMapper};
use super::progress::ProgressAggregator;
use super::remote_fs::RemoteFs;
use super::types::{LogLevel, TransferObserver, TransferOutcome, TransferRequest};
use super::walk::{excluded_entry, SelectionWalker, WalkEntry};

/// Shared stop flag for one run.
///
/// Clones observe the same flag; setting it more than once is harmless.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Tracks the cancellation tokens of in-flight runs by id.
///
/// Owned by whoever starts transfers; there is no process-wide instance.
#[derive(Default)]
pub struct TransferRegistry {
    tokens: RwLock<HashMap<String, CancellationToken>>,
}

impl TransferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new run and get its token
    pub fn register(&self, transfer_id: &str) -> CancellationToken {
        let token = CancellationToken::new();
        self.tokens
            .write()
            .insert(transfer_id.to_string(), token.clone());
        info!("Registered transfer: {}", transfer_id);
        token
    }

    /// Remove a run from tracking
    pub fn unregister(&self, transfer_id: &str) {
        self.tokens.write().remove(transfer_id);
        debug!("Unregistered transfer: {}", transfer_id);
    }

    /// Cancel a specific run
    pub fn cancel(&self, transfer_id: &str) -> bool {
        if let Some(token) = self.tokens.read().get(transfer_id) {
            token.cancel();
            info!("Cancelled transfer: {}", transfer_id);
            true
        } else {
            warn!("Transfer not found for cancel: {}", transfer_id);
            false
        }
    }

    /// Cancel all active runs
    pub fn cancel_all(&self) {
        for (id, token) in self.tokens.read().iter() {
            token.cancel();
            info!("Cancelled transfer: {}", id);
        }
    }

    pub fn active_count(&self) -> usize {
        self.tokens.read().len()
    }
}

/// RAII guard that unregisters a run from [`TransferRegistry`] on drop,
/// including early returns and panics.
pub struct TransferGuard {
    registry: Arc<TransferRegistry>,
    transfer_id: String,
}

impl TransferGuard {
    pub fn new(registry: Arc<TransferRegistry>, transfer_id: String) -> Self {
        Self {
            registry,
            transfer_id,
        }
    }
}

impl Drop for TransferGuard {
    fn drop(&mut self) {
        self.registry.unregister(&self.transfer_id);
    }
}

/// Per-run mutable state: progress and the directories already ensured
struct RunState {
    mapper: PathMapper,
    progress: ProgressAggregator,
    ensured: HashSet<String>,
}

/// Uploads one [`TransferRequest`] through a [`RemoteFs`].
///
/// Single-threaded and sequential: one file is in flight at a time. The first
/// failing file aborts the whole batch, since later files may rely on
/// directories created by earlier steps.
pub struct TransferEngine<'a> {
    fs: &'a dyn RemoteFs,
    cancel: CancellationToken,
    observer: &'a dyn TransferObserver,
}

impl<'a> TransferEngine<'a> {
    pub fn new(
        fs: &'a dyn RemoteFs,
        cancel: CancellationToken,
        observer: &'a dyn TransferObserver,
    ) -> Self {
        Self {
            fs,
            cancel,
            observer,
        }
    }

    /// Run the upload to completion, cancellation or first error.
    ///
    /// The outcome is also passed to the observer. Files already uploaded are
    /// left in place whatever the outcome.
    pub async fn run(&self, request: &TransferRequest) -> TransferOutcome {
        let outcome = match self.run_inner(request).await {
            Ok(()) => {
                self.log("File transfer completed successfully.", LogLevel::Success);
                TransferOutcome::Success
            }
            Err(SftpError::TransferCancelled) => TransferOutcome::Terminated,
            Err(e) => {
                error!("Transfer failed: {}", e);
                self.log(&format!("Error: {}", e), LogLevel::Error);
                TransferOutcome::Error(e.to_string())
            }
        };
        self.observer.on_outcome(&outcome);
        outcome
    }

    async fn run_inner(&self, request: &TransferRequest) -> Result<(), SftpError> {
        let destination = request.destination_root.as_str();

        if self.fs.exists(destination).await.unwrap_or(false) {
            self.log(
                &format!("Destination directory exists: {}", destination),
                LogLevel::Success,
            );
        } else {
            self.log(
                &format!(
                    "Destination directory '{}' does not exist. Creating it...",
                    destination
                ),
                LogLevel::Warning,
            );
        }
        let mut ensured = HashSet::new();
        self.ensure_dir(&mut ensured, destination).await?;

        let total_bytes =
            SizeEstimator::new(self.observer).estimate(&request.selected_paths, &request.exclusions);
        self.log(
            &format!(
                "Total size to upload: {:.2} MB",
                total_bytes as f64 / (1024.0 * 1024.0)
            ),
            LogLevel::Info,
        );

        let mut state = RunState {
            mapper: PathMapper::new(&request.selected_paths)?,
            progress: ProgressAggregator::new(total_bytes),
            ensured,
        };
        debug!("Common root: {}", state.mapper.common_root().display());
        let mut reported = HashSet::new();

        for path in &request.selected_paths {
            if self.cancel.is_cancelled() {
                self.log("Transfer terminated by the user.", LogLevel::Warning);
                return Err(SftpError::TransferCancelled);
            }

            if let Some(excluded) =
                excluded_entry(path, state.mapper.common_root(), &request.exclusions)
            {
                if reported.insert(excluded.clone()) {
                    let kind = if excluded.is_dir() { "directory" } else { "file" };
                    self.log(
                        &format!("Excluded {}: {}", kind, local_basename(&excluded)),
                        LogLevel::Warning,
                    );
                }
                continue;
            }

            if path.is_dir() {
                self.upload_directory(&mut state, request, path).await?;
            } else if path.is_file() {
                let remote = state.mapper.remote_path_for(path, destination)?;
                self.upload_file(&mut state, path, &remote).await?;
            } else {
                return Err(SftpError::transfer(
                    path.display().to_string(),
                    "not a readable file or directory",
                ));
            }
        }

        Ok(())
    }

    async fn upload_directory(
        &self,
        state: &mut RunState,
        request: &TransferRequest,
        root: &Path,
    ) -> Result<(), SftpError> {
        let destination = request.destination_root.as_str();

        for entry in SelectionWalker::new(root, &request.exclusions) {
            if self.cancel.is_cancelled() {
                self.log("Transfer terminated by the user.", LogLevel::Warning);
                return Err(SftpError::TransferCancelled);
            }

            match entry {
                Ok(WalkEntry::Dir(dir)) => {
                    let remote_dir = state.mapper.remote_path_for(&dir, destination)?;
                    self.ensure_dir(&mut state.ensured, &remote_dir).await?;
                }
                Ok(WalkEntry::File(file)) => {
                    let remote = state.mapper.remote_path_for(&file, destination)?;
                    self.upload_file(state, &file, &remote).await?;
                }
                Ok(WalkEntry::Excluded { path, is_dir }) => {
                    let kind = if is_dir { "directory" } else { "file" };
                    self.log(
                        &format!("Excluded {}: {}", kind, local_basename(&path)),
                        LogLevel::Warning,
                    );
                }
                Err(e) => {
                    let path = e.path().unwrap_or(root).display().to_string();
                    return Err(SftpError::transfer(path, e));
                }
            }
        }

        Ok(())
    }

    async fn upload_file(
        &self,
        state: &mut RunState,
        local: &Path,
        remote: &str,
    ) -> Result<(), SftpError> {
        let name = local_basename(local);
        self.ensure_dir(&mut state.ensured, &remote_parent(remote)).await?;

        self.log(
            &format!("Uploading {} to {}", local.display(), remote),
            LogLevel::Info,
        );

        let cancel = &self.cancel;
        let observer = self.observer;
        let progress = &mut state.progress;
        let mut on_bytes = |bytes: u64| {
            if cancel.is_cancelled() {
                return;
            }
            if let Some(pct) = progress.record(bytes) {
                observer.on_progress(pct);
            }
        };

        if let Err(e) = self.fs.put(local, remote, &mut on_bytes).await {
            self.log(&format!("Failed to upload {}: {}", name, e), LogLevel::Error);
            return Err(SftpError::transfer(local.display().to_string(), e));
        }

        if self.cancel.is_cancelled() {
            self.log("Transfer terminated during file upload.", LogLevel::Warning);
            return Err(SftpError::TransferCancelled);
        }

        self.log(&format!("Uploaded {}", name), LogLevel::Success);
        Ok(())
    }

    /// Ensure `remote_dir` once per run; a creation failure aborts the upload
    async fn ensure_dir(
        &self,
        ensured: &mut HashSet<String>,
        remote_dir: &str,
    ) -> Result<(), SftpError> {
        if remote_dir.is_empty() || ensured.contains(remote_dir) {
            return Ok(());
        }

        let report = DirectoryEnsurer::new(self.fs, self.observer)
            .ensure(remote_dir)
            .await;
        if let Some(failure) = report.first_failure() {
            return Err(SftpError::operation("create directory", remote_dir, failure));
        }

        ensured.insert(remote_dir.to_string());
        Ok(())
    }

    fn log(&self, message: &str, level: LogLevel) {
        debug!("{}", message);
        self.observer.on_log(message, level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_shared_and_idempotent() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_registry_cancel_and_guard() {
        let registry = Arc::new(TransferRegistry::new());
        let token = registry.register("t-1");
        assert_eq!(registry.active_count(), 1);

        assert!(registry.cancel("t-1"));
        assert!(token.is_cancelled());
        assert!(!registry.cancel("missing"));

        {
            let _guard = TransferGuard::new(registry.clone(), "t-1".to_string());
        }
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn test_cancel_all() {
        let registry = TransferRegistry::new();
        let a = registry.register("a");
        let b = registry.register("b");
        registry.cancel_all();
        assert!(a.is_cancelled() && b.is_cancelled());
    }
}
