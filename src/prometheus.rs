// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Prometheus exposition format
//!
//! Renders metric families in the Prometheus text format with `# HELP` and
//! `# TYPE` annotations and label support.
//!
//! # Examples
//!
//! ```
//! use fbmonlib::prometheus::{MetricFamily, PrometheusExporter};
//!
//! let mut exporter = PrometheusExporter::new("fb");
//! exporter.add(MetricFamily::gauge("fb_wlan_number_associations", "Number of WLAN clients", 3.0));
//!
//! let output = exporter.export();
//! assert!(output.contains("# TYPE fb_wlan_number_associations gauge"));
//! assert!(output.contains("fb_wlan_number_associations 3"));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prometheus metric type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricType {
    /// A gauge is a metric that represents a single numerical value that can go up and down
    Gauge,
    /// A counter is a metric that represents a single monotonically increasing counter
    Counter,
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gauge => write!(f, "gauge"),
            Self::Counter => write!(f, "counter"),
        }
    }
}

/// A single metric sample with optional labels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSample {
    /// Label key-value pairs
    pub labels: BTreeMap<String, String>,
    /// Metric value
    pub value: f64,
}

/// A complete metric family with metadata and samples
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricFamily {
    /// Metric name
    pub name: String,
    /// Help text
    pub help: String,
    /// Metric type
    pub metric_type: MetricType,
    /// Samples
    pub samples: Vec<MetricSample>,
}

impl MetricFamily {
    /// Create a family without samples
    pub fn new(name: &str, help: &str, metric_type: MetricType) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            metric_type,
            samples: Vec::new(),
        }
    }

    /// Create a new gauge metric
    pub fn gauge(name: &str, help: &str, value: f64) -> Self {
        let mut family = Self::new(name, help, MetricType::Gauge);
        family.add_sample(value, BTreeMap::new());
        family
    }

    /// Create a counter metric
    pub fn counter(name: &str, help: &str, value: f64) -> Self {
        let mut family = Self::new(name, help, MetricType::Counter);
        family.add_sample(value, BTreeMap::new());
        family
    }

    /// Add a labeled sample to this family
    pub fn add_sample(&mut self, value: f64, labels: BTreeMap<String, String>) {
        self.samples.push(MetricSample { labels, value });
    }

    /// Builder form of [`MetricFamily::add_sample`]
    pub fn with_sample(mut self, value: f64, labels: BTreeMap<String, String>) -> Self {
        self.add_sample(value, labels);
        self
    }

    /// Format this metric family in Prometheus exposition format
    pub fn format(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# HELP {} {}\n", self.name, self.help));
        out.push_str(&format!("# TYPE {} {}\n", self.name, self.metric_type));

        for sample in &self.samples {
            if sample.labels.is_empty() {
                out.push_str(&format!("{} {}\n", self.name, format_value(sample.value)));
            } else {
                let label_str: Vec<String> = sample
                    .labels
                    .iter()
                    .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
                    .collect();
                out.push_str(&format!(
                    "{}{{{}}} {}\n",
                    self.name,
                    label_str.join(","),
                    format_value(sample.value)
                ));
            }
        }

        out
    }
}

/// Collects metric families for one scrape
#[derive(Debug, Clone)]
pub struct PrometheusExporter {
    /// Namespace prefix for all metrics
    prefix: String,
    /// Collected metric families, in first-seen order
    families: Vec<MetricFamily>,
}

impl PrometheusExporter {
    /// Create a new exporter with the given namespace prefix
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: sanitize_metric_name(prefix),
            families: Vec::new(),
        }
    }

    /// Add a metric family. Samples of a family with the same name are
    /// merged into the existing one so HELP/TYPE appear once.
    pub fn add(&mut self, family: MetricFamily) {
        match self.families.iter_mut().find(|f| f.name == family.name) {
            Some(existing) => existing.samples.extend(family.samples),
            None => self.families.push(family),
        }
    }

    /// Add one sample to the prefixed family `name`
    pub fn sample(
        &mut self,
        name: &str,
        help: &str,
        metric_type: MetricType,
        value: f64,
        labels: BTreeMap<String, String>,
    ) {
        let name = self.prefixed(name);
        self.add(MetricFamily::new(&name, help, metric_type).with_sample(value, labels));
    }

    /// Full metric name including the namespace prefix
    pub fn prefixed(&self, name: &str) -> String {
        format!("{}_{}", self.prefix, sanitize_metric_name(name))
    }

    pub fn families(&self) -> &[MetricFamily] {
        &self.families
    }

    /// Find a family by its full name
    pub fn family(&self, name: &str) -> Option<&MetricFamily> {
        self.families.iter().find(|f| f.name == name)
    }

    /// Export all metrics in Prometheus text exposition format
    pub fn export(&self) -> String {
        let mut output = String::with_capacity(4096);

        // Add metadata comment
        output.push_str(&format!(
            "# FRITZ!Box monitor v{} Prometheus Metrics\n\n",
            crate::VERSION
        ));

        for family in self.families.iter().filter(|f| !f.samples.is_empty()) {
            output.push_str(&family.format());
            output.push('\n');
        }

        output
    }

    /// Get the content type for Prometheus exposition format
    pub fn content_type() -> &'static str {
        "text/plain; version=0.0.4; charset=utf-8"
    }
}

/// Sanitize a string for use as a Prometheus metric name
fn sanitize_metric_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Escape a label value for Prometheus format
fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Format a float value for Prometheus (special handling for NaN, Inf)
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value == value.floor() && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}
