//! Profile store on disk
//!
//! One JSON document at `~/.vps-transfer/profiles.json`. Updates are written
//! to a sibling `.tmp` file and renamed into place.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, error, warn};

use super::types::{ConfigFile, ConnectionProfile, CONFIG_VERSION};

const STORE_DIR: &str = ".vps-transfer";
const STORE_FILE: &str = "profiles.json";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to determine home directory")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config version {found} is newer than supported {supported}")]
    VersionTooNew { found: u32, supported: u32 },

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Invalid profile '{name}': {reason}")]
    InvalidProfile { name: String, reason: String },
}

/// Default location of the profiles file
pub fn profiles_file() -> Result<PathBuf, StorageError> {
    let home = dirs::home_dir().ok_or(StorageError::NoConfigDir)?;
    Ok(home.join(STORE_DIR).join(STORE_FILE))
}

/// Saved connection profiles, keyed by name
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn open_default() -> Result<Self, StorageError> {
        Ok(Self::at(profiles_file()?))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole file.
    ///
    /// A missing file is an empty store. A file that does not parse is moved
    /// aside and the store starts empty.
    pub async fn load(&self) -> Result<ConfigFile, StorageError> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ConfigFile::default())
            }
            Err(e) => return Err(e.into()),
        };

        let config: ConfigFile = match serde_json::from_slice(&raw) {
            Ok(config) => config,
            Err(e) => {
                warn!("Profiles file {:?} is corrupted: {}", self.path, e);
                self.set_aside().await;
                return Ok(ConfigFile::default());
            }
        };

        if config.version > CONFIG_VERSION {
            return Err(StorageError::VersionTooNew {
                found: config.version,
                supported: CONFIG_VERSION,
            });
        }
        Ok(config)
    }

    pub async fn save(&self, config: &ConfigFile) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_vec_pretty(config)?).await?;
        fs::rename(&staging, &self.path).await?;

        debug!("Saved {} profiles to {:?}", config.profiles.len(), self.path);
        Ok(())
    }

    /// A saved profile that is complete enough to connect with
    pub async fn profile(&self, name: &str) -> Result<ConnectionProfile, StorageError> {
        let profile = self
            .load()
            .await?
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::ProfileNotFound(name.to_string()))?;

        profile
            .validate()
            .map_err(|reason| StorageError::InvalidProfile {
                name: name.to_string(),
                reason,
            })?;
        Ok(profile)
    }

    /// Validate, then insert or replace `profile` by name
    pub async fn put_profile(&self, profile: ConnectionProfile) -> Result<(), StorageError> {
        profile
            .validate()
            .map_err(|reason| StorageError::InvalidProfile {
                name: profile.name.clone(),
                reason,
            })?;

        let mut config = self.load().await?;
        config.upsert(profile);
        self.save(&config).await
    }

    /// Returns whether a profile with that name existed
    pub async fn delete_profile(&self, name: &str) -> Result<bool, StorageError> {
        let mut config = self.load().await?;
        if !config.remove(name) {
            return Ok(false);
        }
        self.save(&config).await?;
        Ok(true)
    }

    /// Rename an unreadable file to `profiles.json.corrupt.<timestamp>`
    async fn set_aside(&self) {
        let aside = self.path.with_extension(format!(
            "json.corrupt.{}",
            chrono::Local::now().format("%Y%m%dT%H%M%S")
        ));
        match fs::rename(&self.path, &aside).await {
            Ok(()) => warn!("Moved corrupted profiles file to {:?}", aside),
            Err(e) => error!("Failed to move corrupted profiles file aside: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staging() -> ConnectionProfile {
        ConnectionProfile {
            name: "staging".to_string(),
            host: "10.0.0.5".to_string(),
            port: 22,
            username: "deploy".to_string(),
            destination: "/srv/staging".to_string(),
            exclusions: ".git".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_an_empty_store() {
        let temp = tempfile::tempdir().unwrap();
        let store = ProfileStore::at(temp.path().join("profiles.json"));

        let config = store.load().await.unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert!(config.profiles.is_empty());
    }

    #[tokio::test]
    async fn test_put_and_fetch_profile() {
        let temp = tempfile::tempdir().unwrap();
        let store = ProfileStore::at(temp.path().join("nested/profiles.json"));

        store.put_profile(staging()).await.unwrap();
        assert_eq!(store.profile("staging").await.unwrap(), staging());
        assert!(!temp.path().join("nested/profiles.json.tmp").exists());

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(!raw.contains("password"));

        assert!(store.delete_profile("staging").await.unwrap());
        assert!(!store.delete_profile("staging").await.unwrap());
        assert!(matches!(
            store.profile("staging").await,
            Err(StorageError::ProfileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_incomplete_profile_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let store = ProfileStore::at(temp.path().join("profiles.json"));

        let mut profile = staging();
        profile.destination.clear();
        let err = store.put_profile(profile).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidProfile { .. }));
        assert!(err.to_string().contains("destination"));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_corrupted_file_is_set_aside() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("profiles.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = ProfileStore::at(path.clone());

        let config = store.load().await.unwrap();
        assert!(config.profiles.is_empty());
        assert!(!path.exists());

        let aside = std::fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt."))
            .count();
        assert_eq!(aside, 1);
    }

    #[tokio::test]
    async fn test_newer_version_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("profiles.json");
        std::fs::write(&path, r#"{"version": 99, "profiles": []}"#).unwrap();

        let err = ProfileStore::at(path).load().await.unwrap_err();
        assert!(matches!(err, StorageError::VersionTooNew { found: 99, .. }));
    }
}
