//! Operation layer
//!
//! Every operation opens its own SSH connection and SFTP session, does its
//! work and closes both. Nothing is shared between operations.

pub mod browse;
pub mod diagnostics;
pub mod remote;
pub mod transfer;

pub use browse::{list_remote_directory, refresh_remote_directory, RemoteListing};
pub use diagnostics::fetch_system_info;
pub use remote::{run_remote_operation, OperationReport, RemoteOperation};
pub use transfer::{start_transfer, start_transfer_from_profile, TransferHandle};

use tracing::info;

use crate::sftp::{SftpError, SftpSession};
use crate::ssh::{SshClient, SshConfig, SshConnection};

/// Connect, authenticate and open SFTP in one step
pub(crate) async fn open_session(
    config: &SshConfig,
) -> Result<(SshConnection, SftpSession), SftpError> {
    let conn = SshClient::new(config.clone()).connect().await?;
    match conn.open_sftp().await {
        Ok(sftp) => {
            info!("SFTP session ready on {}", conn.address());
            Ok((conn, sftp))
        }
        Err(e) => {
            conn.close().await;
            Err(e)
        }
    }
}

/// Close the SFTP session, then the connection
pub(crate) async fn close_session(conn: SshConnection, sftp: SftpSession) {
    sftp.close().await;
    conn.close().await;
}
