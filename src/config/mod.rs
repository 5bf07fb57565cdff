//! Configuration Management Module
//!
//! Persists connection profiles. Passwords are never written to disk.

pub mod storage;
pub mod types;

pub use storage::{profiles_file, ProfileStore, StorageError};
pub use types::{ConfigFile, ConnectionProfile, CONFIG_VERSION};
