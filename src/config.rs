// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Monitor configuration
//!
//! Settings come from an optional TOML file, then CLI flags and the
//! `FB_USERNAME` / `FB_PASSWORD` environment variables override them.

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};

/// TR-064 port of the device
pub const TR064_PORT: u16 = 49000;

/// Monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Device host (`192.168.178.1`) or full base URL (`https://fritz.box:49443`)
    pub url: String,
    /// TR-064 user name
    pub username: Option<String>,
    /// TR-064 password
    pub password: Option<String>,
    /// Bind address of the metrics endpoint (default: "0.0.0.0")
    pub bind_address: String,
    /// Port of the metrics endpoint (default: 8080)
    pub port: u16,
    /// Per-request timeout against the device in seconds (default: 10)
    pub request_timeout_secs: u64,
    /// Whether to log served requests (default: true)
    pub request_logging: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            url: "192.168.178.1".into(),
            username: None,
            password: None,
            bind_address: "0.0.0.0".into(),
            port: 8080,
            request_timeout_secs: 10,
            request_logging: true,
        }
    }
}

impl AppConfig {
    /// Load from TOML file
    pub fn from_toml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MonitorError::Configuration(format!("Cannot read {}: {}", path, e)))?;
        Self::from_toml(&content)
    }

    /// Parse from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Fail early when credentials are missing
    pub fn validate(&self) -> Result<()> {
        let missing = |v: &Option<String>| v.as_deref().map_or(true, str::is_empty);
        if missing(&self.username) || missing(&self.password) {
            return Err(MonitorError::Configuration(
                "please enter user name / password".into(),
            ));
        }
        Ok(())
    }

    /// Base URL of the device's TR-064 interface, without trailing slash
    pub fn device_base_url(&self) -> String {
        let url = self.url.trim().trim_end_matches('/');
        if url.contains("://") {
            url.to_string()
        } else {
            format!("http://{}:{}", url, TR064_PORT)
        }
    }

    /// Listen address of the metrics endpoint
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or_default()
    }

    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or_default()
    }

    /// Generate sample config
    pub fn sample_toml() -> String {
        r#"# FRITZ!Box monitor configuration
url = "192.168.178.1"
# url = "https://fritz.box:49443"
username = "monitoring"
# password = "..."  (prefer the FB_PASSWORD environment variable)
bind_address = "0.0.0.0"
port = 8080
request_timeout_secs = 10
request_logging = true
"#
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.url, "192.168.178.1");
        assert_eq!(config.listen_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_device_base_url() {
        let mut config = AppConfig::default();
        assert_eq!(config.device_base_url(), "http://192.168.178.1:49000");

        config.url = "https://fritz.box:49443/".into();
        assert_eq!(config.device_base_url(), "https://fritz.box:49443");
    }

    #[test]
    fn test_validate_requires_credentials() {
        let mut config = AppConfig::default();
        assert!(matches!(
            config.validate(),
            Err(MonitorError::Configuration(_))
        ));

        config.username = Some("admin".into());
        config.password = Some(String::new());
        assert!(config.validate().is_err());

        config.password = Some("secret".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = AppConfig::from_toml("url = \"10.0.0.1\"\nport = 9133\n").unwrap();
        assert_eq!(config.url, "10.0.0.1");
        assert_eq!(config.port, 9133);
        assert_eq!(config.request_timeout_secs, 10);
        assert!(config.username.is_none());
    }

    #[test]
    fn test_sample_toml_parses() {
        let config = AppConfig::from_toml(&AppConfig::sample_toml()).unwrap();
        assert_eq!(config.username.as_deref(), Some("monitoring"));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            AppConfig::from_toml("port = \"not a number\""),
            Err(MonitorError::Configuration(_))
        ));
    }
}
