//! SSH module - password-authenticated connections
//!
//! Provides the session transport consumed by the SFTP layer:
//! - Direct SSH connections with a bounded handshake
//! - SFTP subsystem channels
//! - Remote command execution for host diagnostics

mod client;
mod config;
mod error;
mod session;

pub use client::{fingerprint, ClientHandler, SshClient};
pub use config::SshConfig;
pub use error::SshError;
pub use session::{CommandOutput, SshConnection};
