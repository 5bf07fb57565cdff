//! SFTP Error types

use thiserror::Error;

use crate::ssh::SshError;

#[derive(Error, Debug)]
pub enum SftpError {
    #[error("Connection error: {0}")]
    Connection(#[from] SshError),

    #[error("SFTP subsystem not available: {0}")]
    SubsystemNotAvailable(String),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid transfer request: {0}")]
    InvalidRequest(String),

    #[error("Failed to transfer {path}: {reason}")]
    TransferError { path: String, reason: String },

    #[error("Failed to {op} {path}: {reason}")]
    OperationFailed {
        op: &'static str,
        path: String,
        reason: String,
    },

    #[error("Transfer cancelled")]
    TransferCancelled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SFTP protocol error: {0}")]
    ProtocolError(String),
}

impl SftpError {
    /// Wrap any error as a per-file transfer failure.
    pub fn transfer(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        SftpError::TransferError {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Wrap any error as a failed standalone remote operation.
    pub fn operation(op: &'static str, path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        SftpError::OperationFailed {
            op,
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error means the remote path does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SftpError::FileNotFound(_) | SftpError::DirectoryNotFound(_)
        )
    }
}

impl From<russh_sftp::client::error::Error> for SftpError {
    fn from(err: russh_sftp::client::error::Error) -> Self {
        SftpError::ProtocolError(err.to_string())
    }
}

// Render as a plain string for whatever front end consumes operation reports
impl serde::Serialize for SftpError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_path_and_cause() {
        let err = SftpError::transfer("/local/a.txt", "broken pipe");
        assert_eq!(err.to_string(), "Failed to transfer /local/a.txt: broken pipe");

        let err = SftpError::operation("rename", "/srv/a", "Permission denied");
        assert_eq!(err.to_string(), "Failed to rename /srv/a: Permission denied");
    }

    #[test]
    fn test_is_not_found() {
        assert!(SftpError::FileNotFound("/x".into()).is_not_found());
        assert!(SftpError::DirectoryNotFound("/x".into()).is_not_found());
        assert!(!SftpError::PermissionDenied("/x".into()).is_not_found());
    }
}
