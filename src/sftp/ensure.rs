//! Incremental creation of remote directory paths

use tracing::{debug, warn};

use super::path_utils::trim_remote;
use super::remote_fs::RemoteFs;
use super::types::{LogLevel, TransferObserver};

/// What one `ensure` call did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnsureReport {
    /// Prefixes created by this call, shallowest first
    pub created: Vec<String>,
    /// Prefixes that could not be created, with the cause
    pub failed: Vec<(String, String)>,
}

impl EnsureReport {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }

    /// First failure, formatted for an error message
    pub fn first_failure(&self) -> Option<String> {
        self.failed
            .first()
            .map(|(path, reason)| format!("{}: {}", path, reason))
    }
}

/// Makes sure a remote directory exists, one segment at a time
pub struct DirectoryEnsurer<'a> {
    fs: &'a dyn RemoteFs,
    observer: &'a dyn TransferObserver,
}

impl<'a> DirectoryEnsurer<'a> {
    pub fn new(fs: &'a dyn RemoteFs, observer: &'a dyn TransferObserver) -> Self {
        Self { fs, observer }
    }

    /// Walk the prefixes of `remote_path`, creating each missing one.
    ///
    /// Failures are logged and collected, never returned as `Err`; existing
    /// prefixes are left untouched. Relative paths are resolved against the
    /// session's working directory by the server.
    pub async fn ensure(&self, remote_path: &str) -> EnsureReport {
        let mut report = EnsureReport::default();
        let absolute = remote_path.starts_with('/');
        let mut prefix = String::new();

        for segment in trim_remote(remote_path).split('/').filter(|s| !s.is_empty()) {
            if absolute || !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);

            match self.fs.exists(&prefix).await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => debug!("Probe of {} failed ({}), trying mkdir", prefix, e),
            }

            match self.fs.mkdir(&prefix).await {
                Ok(()) => {
                    debug!("Created remote directory {}", prefix);
                    self.observer
                        .on_log(&format!("Created directory: {}", prefix), LogLevel::Success);
                    report.created.push(prefix.clone());
                }
                Err(e) => {
                    warn!("Failed to create directory {}: {}", prefix, e);
                    self.observer.on_log(
                        &format!("Failed to create directory {}: {}", prefix, e),
                        LogLevel::Error,
                    );
                    report.failed.push((prefix.clone(), e.to_string()));
                }
            }
        }

        report
    }
}
