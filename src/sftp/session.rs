//! SFTP session over an authenticated SSH connection
//!
//! [`SftpSession`] is the wire implementation of [`RemoteFs`].

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use russh_sftp::client::error::Error as SftpErrorInner;
use russh_sftp::client::SftpSession as RusshSftpSession;
use russh_sftp::protocol::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::error::SftpError;
use super::path_utils::{join_remote_path, remote_basename};
use super::remote_fs::{BytesCallback, RemoteEntry, RemoteFs};
use super::types::constants::CHUNK_SIZE;

/// SFTP I/O timeout so a dead connection cannot stall a transfer forever (5 minutes)
const SFTP_IO_TIMEOUT: Duration = Duration::from_secs(300);

pub struct SftpSession {
    sftp: RusshSftpSession,
}

impl SftpSession {
    pub fn new(sftp: RusshSftpSession) -> Self {
        Self { sftp }
    }

    /// Close the SFTP channel. Errors are logged, not returned.
    pub async fn close(self) {
        if let Err(e) = self.sftp.close().await {
            warn!("Failed to close SFTP session cleanly: {}", e);
        }
    }

    /// Resolve a path (e.g. `.`) to its absolute form on the server
    pub async fn canonicalize(&self, path: &str) -> Result<String, SftpError> {
        self.sftp
            .canonicalize(path)
            .await
            .map_err(|e| map_sftp_error(e, path))
    }
}

#[async_trait]
impl RemoteFs for SftpSession {
    async fn stat(&self, path: &str) -> Result<RemoteEntry, SftpError> {
        let metadata = self
            .sftp
            .metadata(path)
            .await
            .map_err(|e| map_sftp_error(e, path))?;

        Ok(RemoteEntry {
            name: remote_basename(path).to_string(),
            path: path.to_string(),
            is_dir: metadata.is_dir(),
            size: metadata.size.unwrap_or(0),
        })
    }

    async fn list_entries(&self, path: &str) -> Result<Vec<RemoteEntry>, SftpError> {
        let read_dir = self
            .sftp
            .read_dir(path)
            .await
            .map_err(|e| map_sftp_error(e, path))?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let name = entry.file_name();
            if name == "." || name == ".." {
                continue;
            }
            let metadata = entry.metadata();
            entries.push(RemoteEntry {
                path: join_remote_path(path, &name),
                is_dir: metadata.is_dir(),
                size: metadata.size.unwrap_or(0),
                name,
            });
        }

        debug!("Listed {} entries in {}", entries.len(), path);
        Ok(entries)
    }

    async fn exists(&self, path: &str) -> Result<bool, SftpError> {
        match self.sftp.metadata(path).await {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) => {
                let err = map_sftp_error(e, path);
                if err.is_not_found() {
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn mkdir(&self, path: &str) -> Result<(), SftpError> {
        self.sftp
            .create_dir(path)
            .await
            .map_err(|e| map_sftp_error(e, path))?;
        info!("Created remote directory: {}", path);
        Ok(())
    }

    async fn get(&self, remote_path: &str, local_path: &Path) -> Result<u64, SftpError> {
        let mut remote_file = self
            .sftp
            .open(remote_path)
            .await
            .map_err(|e| map_sftp_error(e, remote_path))?;
        let mut local_file = tokio::fs::File::create(local_path).await?;

        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut transferred = 0u64;

        loop {
            let bytes_read =
                match tokio::time::timeout(SFTP_IO_TIMEOUT, remote_file.read(&mut buffer)).await {
                    Ok(Ok(n)) => n,
                    Ok(Err(e)) => return Err(SftpError::transfer(remote_path, e)),
                    Err(_) => {
                        warn!(
                            "SFTP download read timeout after {:?} at {} bytes",
                            SFTP_IO_TIMEOUT, transferred
                        );
                        return Err(SftpError::transfer(
                            remote_path,
                            format!("read timeout after {:?}", SFTP_IO_TIMEOUT),
                        ));
                    }
                };

            if bytes_read == 0 {
                break;
            }

            local_file.write_all(&buffer[..bytes_read]).await?;
            transferred += bytes_read as u64;
        }

        local_file.flush().await?;
        if let Err(e) = remote_file.shutdown().await {
            debug!("Closing remote file {} failed: {}", remote_path, e);
        }

        info!(
            "Downloaded {} -> {} ({} bytes)",
            remote_path,
            local_path.display(),
            transferred
        );
        Ok(transferred)
    }

    async fn put(
        &self,
        local_path: &Path,
        remote_path: &str,
        on_bytes: BytesCallback<'_>,
    ) -> Result<u64, SftpError> {
        let mut local_file = tokio::fs::File::open(local_path).await?;
        let mut remote_file = self
            .sftp
            .create(remote_path)
            .await
            .map_err(|e| map_sftp_error(e, remote_path))?;

        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut transferred = 0u64;

        loop {
            let bytes_read = local_file.read(&mut buffer).await?;
            if bytes_read == 0 {
                break;
            }

            match tokio::time::timeout(
                SFTP_IO_TIMEOUT,
                AsyncWriteExt::write_all(&mut remote_file, &buffer[..bytes_read]),
            )
            .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(SftpError::transfer(remote_path, e)),
                Err(_) => {
                    warn!(
                        "SFTP upload write timeout after {:?} at {} bytes",
                        SFTP_IO_TIMEOUT, transferred
                    );
                    return Err(SftpError::transfer(
                        remote_path,
                        format!("remote write timeout after {:?}", SFTP_IO_TIMEOUT),
                    ));
                }
            }

            transferred += bytes_read as u64;
            on_bytes(bytes_read as u64);
        }

        match tokio::time::timeout(SFTP_IO_TIMEOUT, remote_file.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(SftpError::transfer(remote_path, e)),
            Err(_) => {
                warn!("SFTP upload close timeout after {:?}", SFTP_IO_TIMEOUT);
                return Err(SftpError::transfer(
                    remote_path,
                    format!("remote close timeout after {:?}", SFTP_IO_TIMEOUT),
                ));
            }
        }

        debug!(
            "Uploaded {} -> {} ({} bytes)",
            local_path.display(),
            remote_path,
            transferred
        );
        Ok(transferred)
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), SftpError> {
        self.sftp
            .rename(old_path, new_path)
            .await
            .map_err(|e| map_sftp_error(e, old_path))?;
        info!("Renamed {} -> {}", old_path, new_path);
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), SftpError> {
        self.sftp
            .remove_file(path)
            .await
            .map_err(|e| map_sftp_error(e, path))
    }

    async fn rmdir(&self, path: &str) -> Result<(), SftpError> {
        self.sftp
            .remove_dir(path)
            .await
            .map_err(|e| map_sftp_error(e, path))
    }
}

/// Map SFTP errors to our error type
fn map_sftp_error(err: SftpErrorInner, path: &str) -> SftpError {
    if let SftpErrorInner::Status(status) = &err {
        match status.status_code {
            StatusCode::NoSuchFile => return SftpError::FileNotFound(path.to_string()),
            StatusCode::PermissionDenied => return SftpError::PermissionDenied(path.to_string()),
            _ => {}
        }
    }

    let err_str = err.to_string();
    if err_str.contains("No such file") || err_str.contains("not found") {
        SftpError::FileNotFound(path.to_string())
    } else if err_str.contains("Permission denied") {
        SftpError::PermissionDenied(path.to_string())
    } else {
        SftpError::ProtocolError(err_str)
    }
}
