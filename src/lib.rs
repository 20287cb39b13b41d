// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! # FRITZ!Box monitor
//!
//! Discovers the TR-064 interface of an AVM FRITZ!Box, invokes every
//! read-only ("Get") action over digest-authenticated SOAP and exports the
//! results as Prometheus metrics.
//!
//! ## Layers
//!
//! - [`transport`]: the [`transport::HttpTransport`] seam and its reqwest implementation
//! - [`digest`] / [`client`]: HTTP Digest authentication with a single retry
//! - [`discovery`]: root description and SCPD parsing, the get-only predicate
//! - [`soap`]: envelope construction and response value extraction
//! - [`upnp`]: one full poll of the device
//! - [`correction`] / [`collector`]: counter reset correction and metric assembly
//! - [`prometheus`] / [`http_server`]: exposition format and the scrape endpoint
//!
//! ## Example
//!
//! ```no_run
//! use fbmonlib::{AppConfig, CounterCorrection, FritzCollector, UpnpClient};
//! use std::sync::Arc;
//!
//! # async fn run() -> fbmonlib::Result<()> {
//! let config = AppConfig::from_toml("username = \"monitoring\"\npassword = \"secret\"")?;
//! config.validate()?;
//!
//! let client = UpnpClient::from_config(&config)?;
//! let collector = FritzCollector::new(client, Arc::new(CounterCorrection::new()));
//! println!("{}", collector.scrape().await?);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod collector;
pub mod config;
pub mod correction;
pub mod digest;
pub mod discovery;
pub mod error;
pub mod http_server;
pub mod prometheus;
pub mod soap;
pub mod transport;
pub mod upnp;

pub use collector::FritzCollector;
pub use config::AppConfig;
pub use correction::{CounterCorrection, CounterKey};
pub use digest::Credentials;
pub use discovery::ServiceFilter;
pub use error::{MonitorError, Result};
pub use soap::ServiceActionValue;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method};
pub use upnp::UpnpClient;

/// Crate version, reported in the exposition header
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
