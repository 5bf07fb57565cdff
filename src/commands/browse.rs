//! Remote directory browsing

use serde::Serialize;
use tracing::{info, warn};

use crate::sftp::path_utils::{remote_parent, trim_remote};
use crate::sftp::{RemoteEntry, RemoteFs, SftpError};
use crate::ssh::SshConfig;

/// A directory listing and the directory it belongs to
#[derive(Debug, Clone, Serialize)]
pub struct RemoteListing {
    pub path: String,
    pub entries: Vec<RemoteEntry>,
}

/// List `path` on a fresh connection, directories first, then by name
pub async fn list_remote_directory(
    config: &SshConfig,
    path: &str,
) -> Result<Vec<RemoteEntry>, SftpError> {
    let (conn, sftp) = super::open_session(config).await?;
    let result = list_sorted(&sftp, path).await;
    super::close_session(conn, sftp).await;
    result
}

/// Re-list `base`, falling back to its parent when `base` is gone
pub async fn refresh_remote_directory(
    config: &SshConfig,
    base: &str,
) -> Result<RemoteListing, SftpError> {
    let (conn, sftp) = super::open_session(config).await?;
    let result = refresh(&sftp, base).await;
    super::close_session(conn, sftp).await;
    result
}

pub async fn list_sorted(fs: &dyn RemoteFs, path: &str) -> Result<Vec<RemoteEntry>, SftpError> {
    let mut entries = fs.list_entries(path).await?;
    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
    Ok(entries)
}

pub async fn refresh(fs: &dyn RemoteFs, base: &str) -> Result<RemoteListing, SftpError> {
    let base = trim_remote(base);

    let path = if fs.exists(base).await.unwrap_or(false) {
        base.to_string()
    } else {
        let parent = remote_parent(base);
        if parent.is_empty() || parent == base {
            return Err(SftpError::DirectoryNotFound(format!(
                "{} (unable to navigate to parent directory)",
                base
            )));
        }
        warn!("{} no longer exists, showing {}", base, parent);
        parent
    };

    let entries = list_sorted(fs, &path).await?;
    info!("Refreshed {} ({} entries)", path, entries.len());
    Ok(RemoteListing { path, entries })
}
