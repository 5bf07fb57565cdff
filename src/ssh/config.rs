//! SSH Configuration

use serde::{Deserialize, Serialize};

use super::error::SshError;

/// SSH connection configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct SshConfig {
    /// Remote host address
    pub host: String,

    /// SSH port (default: 22)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Username for authentication
    pub username: String,

    /// Password for authentication
    #[serde(skip_serializing)]
    pub password: String,

    /// Handshake timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl SshConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            timeout_secs: default_timeout(),
        }
    }

    /// Reject configurations with an empty host, user or secret.
    pub fn validate(&self) -> Result<(), SshError> {
        if self.host.trim().is_empty() {
            return Err(SshError::InvalidConfig("host is empty".to_string()));
        }
        if self.username.trim().is_empty() {
            return Err(SshError::InvalidConfig("username is empty".to_string()));
        }
        if self.password.is_empty() {
            return Err(SshError::InvalidConfig("password is empty".to_string()));
        }
        if self.port == 0 {
            return Err(SshError::InvalidConfig("port must be non-zero".to_string()));
        }
        Ok(())
    }

    /// `host:port` for logging and address resolution
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Keep the password out of debug output
impl std::fmt::Debug for SshConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_port() -> u16 {
    22
}

fn default_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_json() {
        let config: SshConfig = serde_json::from_str(
            r#"{"host": "vps.example.com", "username": "deploy", "password": "hunter2"}"#,
        )
        .unwrap();
        assert_eq!(config.port, 22);
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.address(), "vps.example.com:22");
    }

    #[test]
    fn test_password_not_serialized_or_printed() {
        let config = SshConfig::new("h", 2222, "u", "secret");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
        assert!(!format!("{:?}", config).contains("secret"));
    }

    #[test]
    fn test_validate() {
        assert!(SshConfig::new("h", 22, "u", "p").validate().is_ok());
        assert!(SshConfig::new(" ", 22, "u", "p").validate().is_err());
        assert!(SshConfig::new("h", 22, "", "p").validate().is_err());
        assert!(SshConfig::new("h", 22, "u", "").validate().is_err());
        assert!(SshConfig::new("h", 0, "u", "p").validate().is_err());
    }
}
