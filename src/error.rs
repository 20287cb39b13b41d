// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Error types for the FRITZ!Box monitor

use thiserror::Error;

/// Result type alias for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Main error type for the FRITZ!Box monitor
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Configuration error (missing credentials, unreadable config file)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Device URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Connection-level failure talking to the device
    #[error("Network error: {0}")]
    Network(String),

    /// Request to the device timed out
    #[error("Timeout calling {0}")]
    Timeout(String),

    /// Device rejected the digest credentials
    #[error("Authentication failed for {0}")]
    Authentication(String),

    /// A description document could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Not implemented
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl MonitorError {
    /// Whether this error only degrades the affected request instead of the whole poll
    pub fn is_degradable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Authentication(_))
    }
}

impl From<quick_xml::Error> for MonitorError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<toml::de::Error> for MonitorError {
    fn from(err: toml::de::Error) -> Self {
        Self::Configuration(format!("TOML parse error: {}", err))
    }
}
