//! vps-transfer - mirror local files onto a remote host over SFTP
//!
//! Uploads a selection of local files and folders under a remote destination,
//! with name-based exclusions, byte-level progress and cooperative
//! cancellation. Also downloads, deletes, renames and moves remote trees.

pub mod commands;
pub mod config;
pub mod sftp;
pub mod ssh;

pub use commands::{start_transfer, start_transfer_from_profile, TransferHandle};
pub use config::{ConnectionProfile, ProfileStore};
pub use sftp::{
    CancellationToken, LogLevel, RemoteFs, SftpError, TransferEngine, TransferObserver,
    TransferOutcome, TransferRequest,
};
pub use ssh::{SshConfig, SshError};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging. `RUST_LOG` overrides the default `info` filter.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
