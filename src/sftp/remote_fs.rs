//! Remote filesystem capability interface
//!
//! The engine only talks to the remote side through [`RemoteFs`]; the SFTP
//! session implements it over the wire, tests implement it in memory.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::SftpError;

/// One entry of a remote directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// File name (not full path)
    pub name: String,
    /// Full remote path
    pub path: String,
    pub is_dir: bool,
    /// Size in bytes (0 for directories on most servers)
    pub size: u64,
}

/// Byte-count callback for `put`: receives the number of bytes just written
pub type BytesCallback<'a> = &'a mut (dyn FnMut(u64) + Send);

#[async_trait]
pub trait RemoteFs: Send + Sync {
    /// Metadata of a single path
    async fn stat(&self, path: &str) -> Result<RemoteEntry, SftpError>;

    /// Directory contents, without `.` and `..`
    async fn list_entries(&self, path: &str) -> Result<Vec<RemoteEntry>, SftpError>;

    /// Whether `path` exists and is a directory that can be entered
    async fn exists(&self, path: &str) -> Result<bool, SftpError>;

    /// Create one directory; the parent must already exist
    async fn mkdir(&self, path: &str) -> Result<(), SftpError>;

    /// Download `remote_path` into the local file `local_path`
    async fn get(&self, remote_path: &str, local_path: &Path) -> Result<u64, SftpError>;

    /// Upload `local_path` to `remote_path`, reporting written bytes to `on_bytes`
    async fn put(
        &self,
        local_path: &Path,
        remote_path: &str,
        on_bytes: BytesCallback<'_>,
    ) -> Result<u64, SftpError>;

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), SftpError>;

    /// Remove a file
    async fn remove(&self, path: &str) -> Result<(), SftpError>;

    /// Remove an empty directory
    async fn rmdir(&self, path: &str) -> Result<(), SftpError>;
}
