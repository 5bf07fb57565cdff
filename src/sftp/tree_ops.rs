//! Recursive and single-path operations on the remote tree
//!
//! Unlike uploads, download and delete keep going after a per-item failure
//! and report every success and failure in a [`BatchResult`].

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::error::SftpError;
use super::path_utils::{join_remote_path, remote_basename, remote_parent, trim_remote};
use super::remote_fs::RemoteFs;
use super::types::{BatchResult, LogLevel, TransferObserver};

pub struct RemoteTreeOps<'a> {
    fs: &'a dyn RemoteFs,
    observer: &'a dyn TransferObserver,
}

impl<'a> RemoteTreeOps<'a> {
    pub fn new(fs: &'a dyn RemoteFs, observer: &'a dyn TransferObserver) -> Self {
        Self { fs, observer }
    }

    /// Download a file or a whole directory tree.
    ///
    /// A file lands in `local_destination/<basename>`. A directory's contents
    /// are mirrored into `local_destination`, which is created if missing.
    pub async fn download(&self, remote_path: &str, local_destination: &Path) -> BatchResult {
        let mut result = BatchResult::default();

        let entry = match self.fs.stat(remote_path).await {
            Ok(entry) => entry,
            Err(e) => {
                self.fail(&mut result, remote_path, "download", &e);
                return result;
            }
        };

        if !entry.is_dir {
            let local = local_destination.join(remote_basename(remote_path));
            self.download_file(&mut result, remote_path, &local).await;
            return result;
        }

        // Pre-order: every local directory exists before anything is written into it
        let mut pending: Vec<(String, PathBuf)> =
            vec![(remote_path.to_string(), local_destination.to_path_buf())];

        while let Some((remote_dir, local_dir)) = pending.pop() {
            if let Err(e) = tokio::fs::create_dir_all(&local_dir).await {
                self.fail(&mut result, &remote_dir, "download directory", &e);
                continue;
            }

            let entries = match self.fs.list_entries(&remote_dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    self.fail(&mut result, &remote_dir, "download directory", &e);
                    continue;
                }
            };

            let mut subdirs = Vec::new();
            for entry in entries {
                let local = local_dir.join(&entry.name);
                if entry.is_dir {
                    subdirs.push((entry.path, local));
                } else {
                    self.download_file(&mut result, &entry.path, &local).await;
                }
            }
            // Reversed so the stack visits subdirectories in listing order
            pending.extend(subdirs.into_iter().rev());
        }

        info!(
            "Download of {} finished: {} ok, {} failed",
            remote_path,
            result.success.len(),
            result.failed.len()
        );
        result
    }

    async fn download_file(&self, result: &mut BatchResult, remote: &str, local: &Path) {
        match self.fs.get(remote, local).await {
            Ok(_) => {
                self.observer
                    .on_log(&format!("Downloaded: {}", remote), LogLevel::Success);
                result.success.push(remote.to_string());
            }
            Err(e) => self.fail(result, remote, "download", &e),
        }
    }

    /// Delete a file, or a directory and everything below it.
    ///
    /// Files go first; each directory is removed only after all of its
    /// descendants were attempted, whether or not they succeeded.
    pub async fn delete(&self, remote_path: &str) -> BatchResult {
        let mut result = BatchResult::default();

        let entry = match self.fs.stat(remote_path).await {
            Ok(entry) => entry,
            Err(e) => {
                self.fail(&mut result, remote_path, "delete", &e);
                return result;
            }
        };

        if !entry.is_dir {
            self.delete_file(&mut result, remote_path).await;
            return result;
        }

        let mut pending = vec![remote_path.to_string()];
        let mut visited = Vec::new();

        while let Some(dir) = pending.pop() {
            match self.fs.list_entries(&dir).await {
                Ok(entries) => {
                    for entry in entries {
                        if entry.is_dir {
                            pending.push(entry.path);
                        } else {
                            self.delete_file(&mut result, &entry.path).await;
                        }
                    }
                }
                Err(e) => self.fail(&mut result, &dir, "list directory", &e),
            }
            visited.push(dir);
        }

        // A directory is always visited before its subdirectories, so the
        // reverse order removes children before parents
        for dir in visited.into_iter().rev() {
            match self.fs.rmdir(&dir).await {
                Ok(()) => {
                    self.observer
                        .on_log(&format!("Deleted directory: {}", dir), LogLevel::Success);
                    result.success.push(dir);
                }
                Err(e) => self.fail(&mut result, &dir, "delete directory", &e),
            }
        }

        info!(
            "Delete of {} finished: {} ok, {} failed",
            remote_path,
            result.success.len(),
            result.failed.len()
        );
        result
    }

    async fn delete_file(&self, result: &mut BatchResult, remote: &str) {
        match self.fs.remove(remote).await {
            Ok(()) => {
                self.observer
                    .on_log(&format!("Deleted: {}", remote), LogLevel::Success);
                result.success.push(remote.to_string());
            }
            Err(e) => self.fail(result, remote, "delete", &e),
        }
    }

    /// Rename within the same parent directory; returns the new path
    pub async fn rename(&self, remote_path: &str, new_name: &str) -> Result<String, SftpError> {
        if new_name.is_empty() || new_name.contains('/') {
            return Err(SftpError::InvalidPath(format!(
                "'{}' is not a valid file name",
                new_name
            )));
        }

        let new_path = join_remote_path(&remote_parent(remote_path), new_name);
        self.fs
            .rename(remote_path, &new_path)
            .await
            .map_err(|e| SftpError::operation("rename", remote_path, e))?;

        self.observer
            .on_log(&format!("Renamed to: {}", new_path), LogLevel::Success);
        Ok(new_path)
    }

    /// Move into `destination_dir`, keeping the basename; returns the new path
    pub async fn move_to(
        &self,
        remote_path: &str,
        destination_dir: &str,
    ) -> Result<String, SftpError> {
        let destination_dir = trim_remote(destination_dir);
        if destination_dir.is_empty() {
            return Err(SftpError::InvalidPath(
                "move destination must not be empty".to_string(),
            ));
        }

        let new_path = join_remote_path(destination_dir, remote_basename(remote_path));
        self.fs
            .rename(remote_path, &new_path)
            .await
            .map_err(|e| SftpError::operation("move", remote_path, e))?;

        self.observer
            .on_log(&format!("Moved to: {}", new_path), LogLevel::Success);
        Ok(new_path)
    }

    /// Create a single directory; the parent must exist
    pub async fn mkdir(&self, remote_path: &str) -> Result<String, SftpError> {
        self.fs
            .mkdir(remote_path)
            .await
            .map_err(|e| SftpError::operation("create directory", remote_path, e))?;

        self.observer
            .on_log(&format!("Created directory: {}", remote_path), LogLevel::Success);
        Ok(remote_path.to_string())
    }

    fn fail(&self, result: &mut BatchResult, path: &str, op: &str, err: &dyn std::fmt::Display) {
        warn!("Failed to {} {}: {}", op, path, err);
        self.observer
            .on_log(&format!("Failed to {} {}: {}", op, path, err), LogLevel::Error);
        result.failed.push((path.to_string(), err.to_string()));
    }
}
