//! Authenticated SSH connection: SFTP subsystem and command execution

use russh::client::Handle;
use russh::ChannelMsg;
use tracing::{debug, info, warn};

use super::client::ClientHandler;
use super::error::SshError;
use crate::sftp::{SftpError, SftpSession};

/// Captured output of a remote command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_status: Option<u32>,
}

/// Accumulates exec channel messages until the channel closes.
///
/// The exit status usually arrives after EOF, so EOF alone does not end the
/// read.
#[derive(Debug, Default)]
struct OutputCollector {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_status: Option<u32>,
}

impl OutputCollector {
    /// Take one message; returns false once nothing more can arrive
    fn absorb(&mut self, msg: Option<ChannelMsg>) -> bool {
        match msg {
            Some(ChannelMsg::Data { data }) => self.stdout.extend_from_slice(&data),
            // ext=1 is stderr
            Some(ChannelMsg::ExtendedData { data, ext: 1 }) => self.stderr.extend_from_slice(&data),
            Some(ChannelMsg::ExitStatus { exit_status }) => self.exit_status = Some(exit_status),
            Some(ChannelMsg::Close) | None => return false,
            Some(_) => {}
        }
        true
    }

    fn finish(self) -> CommandOutput {
        CommandOutput {
            stdout: String::from_utf8_lossy(&self.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&self.stderr).trim().to_string(),
            exit_status: self.exit_status,
        }
    }
}

/// One authenticated SSH connection.
///
/// Not shared between operations: each operation connects, works and closes.
pub struct SshConnection {
    handle: Handle<ClientHandler>,
    addr: String,
}

impl SshConnection {
    pub(crate) fn new(handle: Handle<ClientHandler>, addr: String) -> Self {
        Self { handle, addr }
    }

    pub fn address(&self) -> &str {
        &self.addr
    }

    /// Open the SFTP subsystem on a fresh channel
    pub async fn open_sftp(&self) -> Result<SftpSession, SftpError> {
        info!("Opening SFTP subsystem on {}", self.addr);

        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| SftpError::ChannelError(e.to_string()))?;

        channel.request_subsystem(true, "sftp").await.map_err(|e| {
            SftpError::SubsystemNotAvailable(format!("Failed to request SFTP subsystem: {}", e))
        })?;

        let sftp = russh_sftp::client::SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| SftpError::SubsystemNotAvailable(e.to_string()))?;

        Ok(SftpSession::new(sftp))
    }

    /// Run a command and collect stdout/stderr until the channel closes
    pub async fn exec_command(&self, command: &str) -> Result<CommandOutput, SshError> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| SshError::ChannelError(format!("Failed to open exec channel: {}", e)))?;

        debug!("Exec: {}", command);

        channel
            .exec(true, command)
            .await
            .map_err(|e| SshError::ChannelError(format!("Failed to execute command: {}", e)))?;

        let mut output = OutputCollector::default();
        while output.absorb(channel.wait().await) {}

        Ok(output.finish())
    }

    /// Disconnect; failures are logged, not returned
    pub async fn close(self) {
        if let Err(e) = self
            .handle
            .disconnect(russh::Disconnect::ByApplication, "Session closed", "en")
            .await
        {
            warn!("Error disconnecting from {}: {}", self.addr, e);
        }
        debug!("Disconnected from {}", self.addr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use russh::CryptoVec;

    fn data(bytes: &[u8]) -> Option<ChannelMsg> {
        Some(ChannelMsg::Data {
            data: CryptoVec::from(bytes.to_vec()),
        })
    }

    #[test]
    fn test_exit_status_after_eof_is_kept() {
        let mut output = OutputCollector::default();
        assert!(output.absorb(data(b"Linux web-01\n")));
        assert!(output.absorb(Some(ChannelMsg::Eof)));
        assert!(output.absorb(Some(ChannelMsg::ExitStatus { exit_status: 0 })));
        assert!(!output.absorb(Some(ChannelMsg::Close)));

        let output = output.finish();
        assert_eq!(output.stdout, "Linux web-01");
        assert_eq!(output.exit_status, Some(0));
    }

    #[test]
    fn test_stderr_and_dropped_channel() {
        let mut output = OutputCollector::default();
        assert!(output.absorb(Some(ChannelMsg::ExtendedData {
            data: CryptoVec::from(b"df: not found".to_vec()),
            ext: 1,
        })));
        assert!(!output.absorb(None));

        let output = output.finish();
        assert_eq!(output.stderr, "df: not found");
        assert!(output.stdout.is_empty());
        assert_eq!(output.exit_status, None);
    }
}
