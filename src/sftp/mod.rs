//! SFTP transfer module
//!
//! Uploads local selections, downloads and deletes remote trees, and
//! provides the small remote mutators (rename, move, mkdir).

pub mod ensure;
pub mod error;
pub mod estimate;
pub mod path_utils;
pub mod progress;
pub mod remote_fs;
pub mod session;
pub mod transfer;
pub mod tree_ops;
pub mod types;
pub mod walk;

pub use ensure::{DirectoryEnsurer, EnsureReport};
pub use error::SftpError;
pub use estimate::SizeEstimator;
pub use path_utils::PathMapper;
pub use progress::{ProgressAggregator, TransferProgress};
pub use remote_fs::{BytesCallback, RemoteEntry, RemoteFs};
pub use session::SftpSession;
pub use transfer::{CancellationToken, TransferEngine, TransferGuard, TransferRegistry};
pub use tree_ops::RemoteTreeOps;
pub use types::*;
pub use walk::{SelectionWalker, WalkEntry};
