// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! CLI tool for the FRITZ!Box monitor (fbmon)

use clap::{Parser, Subcommand};
use fbmonlib::http_server::{render_all, HttpServer, HttpServerConfig};
use fbmonlib::{AppConfig, CounterCorrection, FritzCollector, UpnpClient};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "fbmon")]
#[command(about = "FRITZ!Box monitor: TR-064 values as Prometheus metrics", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Device host or base URL (default: 192.168.178.1)
    #[arg(long, global = true)]
    url: Option<String>,

    /// TR-064 user name
    #[arg(long, global = true, env = "FB_USERNAME")]
    user: Option<String>,

    /// TR-064 password
    #[arg(long, global = true, env = "FB_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Bind address of the metrics endpoint
    #[arg(long, global = true)]
    bind: Option<String>,

    /// Port of the metrics endpoint
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Per-request timeout against the device in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve /metrics, /all and /health (default)
    Serve,
    /// Poll every getter of every service once and print the values
    Discover {
        /// Output format (text or json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Print a sample configuration file
    SampleConfig,
}

impl Cli {
    /// File configuration with flag and environment overrides applied
    fn load_config(&self) -> fbmonlib::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_toml_file(path)?,
            None => AppConfig::default(),
        };

        if let Some(url) = &self.url {
            config.url = url.clone();
        }
        if let Some(user) = &self.user {
            config.username = Some(user.clone());
        }
        if let Some(password) = &self.password {
            config.password = Some(password.clone());
        }
        if let Some(bind) = &self.bind {
            config.bind_address = bind.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(timeout) = self.timeout {
            config.request_timeout_secs = timeout;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    env_logger::init();

    if let Some(Commands::SampleConfig) = &cli.command {
        print!("{}", AppConfig::sample_toml());
        return Ok(());
    }

    let config = cli.load_config()?;
    let client = UpnpClient::from_config(&config)?;
    let collector = Arc::new(FritzCollector::new(client, Arc::new(CounterCorrection::new())));

    match &cli.command {
        Some(Commands::Discover { format }) => {
            let values = collector.discover_all().await?;
            let format = (format == "json").then_some("json");
            println!("{}", render_all(&values, format).body);
        }
        Some(Commands::Serve) | None => {
            log::info!(
                "Polling {} and serving metrics on {}",
                collector.client().base_url(),
                config.listen_address()
            );
            HttpServer::new(HttpServerConfig::from(&config), collector)
                .run()
                .await?;
        }
        Some(Commands::SampleConfig) => {}
    }

    Ok(())
}
