// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! HTTP server for the metrics endpoint
//!
//! A small HTTP/1.1 server built on tokio. Every request to `/metrics` or
//! `/all` triggers a full poll of the device.
//!
//! | Path | Content |
//! |---|---|
//! | `/metrics` | Prometheus exposition of the metric catalog |
//! | `/all` | every getter value (`?format=json` for JSON) |
//! | `/health` | `OK` |

use crate::collector::FritzCollector;
use crate::config::AppConfig;
use crate::prometheus::PrometheusExporter;
use crate::soap::ServiceActionValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServerConfig {
    /// Bind address (default: "0.0.0.0")
    pub bind_address: String,
    /// Port (default: 8080)
    pub port: u16,
    /// Maximum request size in bytes (default: 64KB)
    pub max_request_size: usize,
    /// Whether to log requests (default: true)
    pub request_logging: bool,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".into(),
            port: 8080,
            max_request_size: 65_536,
            request_logging: true,
        }
    }
}

impl From<&AppConfig> for HttpServerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            bind_address: config.bind_address.clone(),
            port: config.port,
            request_logging: config.request_logging,
            ..Default::default()
        }
    }
}

/// Parsed request line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
}

/// Response to write back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

impl Response {
    fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8".into(),
            body: body.into(),
        }
    }

    /// Serialize to a complete HTTP/1.1 message
    pub fn to_http(&self) -> String {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n\
             Connection: close\r\n\r\n{}",
            self.status,
            status_text(self.status),
            self.content_type,
            self.body.len(),
            self.body
        )
    }
}

/// HTTP server that exposes the collector
#[derive(Clone)]
pub struct HttpServer {
    config: HttpServerConfig,
    collector: Arc<FritzCollector>,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig, collector: Arc<FritzCollector>) -> Self {
        Self { config, collector }
    }

    /// Run the HTTP server until Ctrl-C
    #[cfg(feature = "cli")]
    pub async fn run(&self) -> crate::Result<()> {
        use tokio::net::TcpListener;

        let addr = format!("{}:{}", self.config.bind_address, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::MonitorError::Other(format!("Failed to bind to {}: {}", addr, e)))?;

        log::info!("Server is ready to handle requests at {}", addr);
        log::info!("Endpoints: /metrics, /all, /health");

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Server is shutting down...");
                    break;
                }
                accepted = listener.accept() => {
                    let (stream, peer_addr) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            log::warn!("Accept error: {}", e);
                            continue;
                        }
                    };
                    let server = self.clone();
                    tokio::spawn(async move {
                        server.serve_connection(stream, peer_addr).await;
                    });
                }
            }
        }

        log::info!("Server stopped");
        Ok(())
    }

    /// Run the HTTP server (stub when cli feature is not enabled)
    #[cfg(not(feature = "cli"))]
    pub async fn run(&self) -> crate::Result<()> {
        Err(crate::MonitorError::NotImplemented(
            "HTTP server requires the 'cli' feature (for tokio)".into(),
        ))
    }

    #[cfg(feature = "cli")]
    async fn serve_connection(
        &self,
        mut stream: tokio::net::TcpStream,
        peer_addr: std::net::SocketAddr,
    ) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let start = std::time::Instant::now();
        let mut buf = vec![0u8; self.config.max_request_size];
        let n = match stream.read(&mut buf).await {
            Ok(n) if n > 0 => n,
            _ => return,
        };

        let raw = String::from_utf8_lossy(&buf[..n]);
        let response = match Self::parse_http_request(&raw) {
            Some(request) => {
                let response = self.handle(&request).await;
                if self.config.request_logging {
                    log::info!(
                        "{} {} {} {}ms from {}",
                        request.method,
                        request.path,
                        response.status,
                        start.elapsed().as_millis(),
                        peer_addr
                    );
                }
                response
            }
            None => Response::text(400, "Bad Request"),
        };

        let _ = stream.write_all(response.to_http().as_bytes()).await;
    }

    /// Parse the request line of a raw HTTP/1.1 request
    fn parse_http_request(raw: &str) -> Option<Request> {
        let request_line = raw.lines().next()?;
        let parts: Vec<&str> = request_line.split_whitespace().collect();
        if parts.len() < 2 {
            return None;
        }

        let method = parts[0].to_uppercase();
        let full_path = parts[1];

        // Split path and query string
        let (path, query) = match full_path.split_once('?') {
            Some((p, q)) => {
                let map = q
                    .split('&')
                    .filter_map(|pair| pair.split_once('='))
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                (p.to_string(), map)
            }
            None => (full_path.to_string(), HashMap::new()),
        };

        Some(Request {
            method,
            path,
            query,
        })
    }

    /// Route a request. Scrapes fail with 500 only when the poll itself fails.
    pub async fn handle(&self, request: &Request) -> Response {
        if request.method != "GET" {
            return Response::text(405, "Method Not Allowed");
        }

        match request.path.as_str() {
            "/health" => Response::text(200, "OK"),
            "/metrics" => match self.collector.scrape().await {
                Ok(body) => Response {
                    status: 200,
                    content_type: PrometheusExporter::content_type().into(),
                    body,
                },
                Err(e) => {
                    log::error!("Scrape failed: {}", e);
                    Response::text(500, format!("Scrape failed: {}", e))
                }
            },
            "/all" => match self.collector.discover_all().await {
                Ok(values) => render_all(&values, request.query.get("format").map(String::as_str)),
                Err(e) => {
                    log::error!("Discovery failed: {}", e);
                    Response::text(500, format!("Discovery failed: {}", e))
                }
            },
            _ => Response::text(404, "Not Found"),
        }
    }
}

/// Render every discovered value as text lines or JSON
pub fn render_all(values: &[ServiceActionValue], format: Option<&str>) -> Response {
    if format == Some("json") {
        return match serde_json::to_string_pretty(values) {
            Ok(body) => Response {
                status: 200,
                content_type: "application/json".into(),
                body,
            },
            Err(e) => Response::text(500, e.to_string()),
        };
    }

    let mut body = String::from("service:::action/variable    =    value\n");
    for value in values {
        body.push_str(&value.to_string());
        body.push('\n');
    }
    Response::text(200, body)
}

fn status_text(code: u16) -> &'static str {
    match code {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}
