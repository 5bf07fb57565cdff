//! Saved connection profiles

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::sftp::{SftpError, TransferRequest};
use crate::ssh::SshConfig;

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root of `profiles.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub version: u32,
    #[serde(default)]
    pub profiles: Vec<ConnectionProfile>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            profiles: Vec::new(),
        }
    }
}

impl ConfigFile {
    pub fn get(&self, name: &str) -> Option<&ConnectionProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Insert or replace the profile with the same name
    pub fn upsert(&mut self, profile: ConnectionProfile) {
        match self.profiles.iter_mut().find(|p| p.name == profile.name) {
            Some(existing) => *existing = profile,
            None => self.profiles.push(profile),
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.profiles.len();
        self.profiles.retain(|p| p.name != name);
        self.profiles.len() != before
    }
}

/// A saved target host and upload destination. The password is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub name: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    /// Remote destination directory for uploads
    pub destination: String,
    /// Comma-separated names to skip, as typed by the user
    #[serde(default)]
    pub exclusions: String,
}

fn default_port() -> u16 {
    22
}

impl ConnectionProfile {
    /// Check that every field needed to start a transfer is filled in
    pub fn validate(&self) -> Result<(), String> {
        let missing: Vec<&str> = [
            ("host", self.host.trim().is_empty()),
            ("username", self.username.trim().is_empty()),
            ("destination", self.destination.trim().is_empty()),
        ]
        .into_iter()
        .filter_map(|(field, empty)| empty.then_some(field))
        .collect();

        if !missing.is_empty() {
            return Err(format!(
                "Please fill in all required fields (missing: {})",
                missing.join(", ")
            ));
        }
        if self.port == 0 {
            return Err("Port must be between 1 and 65535".to_string());
        }
        Ok(())
    }

    pub fn to_ssh_config(&self, password: impl Into<String>) -> SshConfig {
        SshConfig::new(
            self.host.trim(),
            self.port,
            self.username.trim(),
            password,
        )
    }

    /// Parsed exclusion names
    pub fn exclusion_set(&self) -> BTreeSet<String> {
        TransferRequest::parse_exclusions(&self.exclusions)
    }

    /// Upload `selection` to this profile's destination with its exclusions
    pub fn transfer_request(&self, selection: Vec<PathBuf>) -> Result<TransferRequest, SftpError> {
        TransferRequest::new(selection, self.destination.as_str(), self.exclusion_set())
    }
}
