// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! FRITZ!Box metric assembly
//!
//! Maps extracted TR-064 values to named, labeled Prometheus metrics. The
//! metric catalog below is the only place that names device services,
//! actions and variables; the interest filter for a scrape is derived from
//! it.

use crate::correction::{CounterCorrection, CounterKey};
use crate::discovery::ServiceFilter;
use crate::error::Result;
use crate::prometheus::{MetricType, PrometheusExporter};
use crate::soap::ServiceActionValue;
use crate::upnp::UpnpClient;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Namespace prefix of all exported metrics
pub const METRIC_PREFIX: &str = "fb";

/// Number of WLAN radios (`WLANConfiguration:1..=3`) reported
pub const WLAN_INSTANCES: usize = 3;

/// How a catalog value is exported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Raw value, may go up and down
    Gauge,
    /// Corrected through the counter cache
    Counter,
    /// Raw counter plus a `_corrected` companion
    CounterWithRaw,
}

/// One scalar metric read from one device variable
#[derive(Debug, Clone, Copy)]
pub struct MetricSpec {
    pub name: &'static str,
    pub help: &'static str,
    pub service: &'static str,
    pub action: &'static str,
    pub variable: &'static str,
    pub kind: ValueKind,
}

const fn spec(
    name: &'static str,
    help: &'static str,
    service: &'static str,
    action: &'static str,
    variable: &'static str,
    kind: ValueKind,
) -> MetricSpec {
    MetricSpec {
        name,
        help,
        service,
        action,
        variable,
        kind,
    }
}

const WAN: &str = "WANCommonInterfaceConfig";
const WAN_PPP: &str = "WANPPPConnection";
const LAN: &str = "LANEthernetInterfaceConfig";
const WLAN: &str = "WLANConfiguration";

/// Unlabeled device-wide metrics
pub const SCALAR_METRICS: &[MetricSpec] = &[
    spec(
        "wan_total_bytes_received",
        "WAN total bytes received",
        WAN,
        "GetTotalBytesReceived",
        "TotalBytesReceived",
        ValueKind::CounterWithRaw,
    ),
    spec(
        "wan_total_bytes_sent",
        "WAN total bytes sent",
        WAN,
        "GetTotalBytesSent",
        "TotalBytesSent",
        ValueKind::CounterWithRaw,
    ),
    spec(
        "wan_total_packets_received",
        "WAN total packets received",
        WAN,
        "GetTotalPacketsReceived",
        "TotalPacketsReceived",
        ValueKind::Counter,
    ),
    spec(
        "wan_total_packets_sent",
        "WAN total packets sent",
        WAN,
        "GetTotalPacketsSent",
        "TotalPacketsSent",
        ValueKind::Counter,
    ),
    spec(
        "lan_eth_total_bytes_received",
        "LAN ethernet total bytes received",
        LAN,
        "GetStatistics",
        "Stats.BytesReceived",
        ValueKind::Counter,
    ),
    spec(
        "lan_eth_total_bytes_sent",
        "LAN ethernet total bytes sent",
        LAN,
        "GetStatistics",
        "Stats.BytesSent",
        ValueKind::Counter,
    ),
    spec(
        "lan_eth_total_packets_received",
        "LAN ethernet total packets received",
        LAN,
        "GetStatistics",
        "Stats.PacketsReceived",
        ValueKind::Counter,
    ),
    spec(
        "lan_eth_total_packets_sent",
        "LAN ethernet total packets sent",
        LAN,
        "GetStatistics",
        "Stats.PacketsSent",
        ValueKind::Counter,
    ),
];

/// Per-radio metrics, labeled with `ssid_standard`
pub const WLAN_METRICS: &[MetricSpec] = &[
    spec(
        "wlan_number_associations",
        "Number of WLAN clients",
        WLAN,
        "GetTotalAssociations",
        "TotalAssociations",
        ValueKind::Gauge,
    ),
    spec(
        "wlan_total_packets_sent",
        "WLAN total packets sent",
        WLAN,
        "GetStatistics",
        "TotalPacketsSent",
        ValueKind::Counter,
    ),
    spec(
        "wlan_total_packets_received",
        "WLAN total packets received",
        WLAN,
        "GetStatistics",
        "TotalPacketsReceived",
        ValueKind::Counter,
    ),
];

const WLAN_INFO: (&str, &str, &str) = (WLAN, "GetInfo", "SSID");
const WLAN_STANDARD: (&str, &str, &str) = (WLAN, "GetInfo", "Standard");
const PPP_UPTIME: (&str, &str, &str) = (WAN_PPP, "GetStatusInfo", "Uptime");
const PPP_STATUS: (&str, &str, &str) = (WAN_PPP, "GetStatusInfo", "ConnectionStatus");
const PPP_EXTERNAL_IP: (&str, &str, &str) = (WAN_PPP, "GetExternalIPAddress", "ExternalIPAddress");

/// Interest filter covering every action the catalog reads
pub fn interest_filter() -> ServiceFilter {
    let mut filter = ServiceFilter::all();
    for spec in SCALAR_METRICS.iter().chain(WLAN_METRICS) {
        filter.insert(spec.service, [spec.action]);
    }
    let labels = [WLAN_INFO, WLAN_STANDARD, PPP_UPTIME, PPP_STATUS, PPP_EXTERNAL_IP];
    for (service, action, _) in labels {
        filter.insert(service, [action]);
    }
    filter
}

/// First value whose service type contains `service` and whose action and
/// variable match exactly. Absence is logged and is not an error.
pub fn find_value<'a>(
    values: &'a [ServiceActionValue],
    service: &str,
    action: &str,
    variable: &str,
) -> Option<&'a ServiceActionValue> {
    let found = values.iter().find(|v| {
        v.service_type.contains(service) && v.action_name == action && v.variable == variable
    });
    if found.is_none() {
        log::debug!(
            "value for service {}, action {}, variable {} not found",
            service,
            action,
            variable
        );
    }
    found
}

/// Numeric value of a device string; non-numeric values count as 0.
/// `NaN` and infinities parse as floats but are not readings either.
pub fn parse_number(value: &str) -> f64 {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Builds the metric set for each scrape
pub struct FritzCollector {
    client: UpnpClient,
    corrections: Arc<CounterCorrection>,
    filter: ServiceFilter,
}

impl FritzCollector {
    pub fn new(client: UpnpClient, corrections: Arc<CounterCorrection>) -> Self {
        Self {
            client,
            corrections,
            filter: interest_filter(),
        }
    }

    pub fn client(&self) -> &UpnpClient {
        &self.client
    }

    /// Poll the device and render the metrics in exposition format
    pub async fn scrape(&self) -> Result<String> {
        let values = self.client.execute(&self.filter).await?;
        Ok(self.assemble(&values).export())
    }

    /// Poll the device without a filter (every getter of every service)
    pub async fn discover_all(&self) -> Result<Vec<ServiceActionValue>> {
        self.client.execute(&ServiceFilter::all()).await
    }

    /// Turn one cycle's values into metric families, updating counter state
    pub fn assemble(&self, values: &[ServiceActionValue]) -> PrometheusExporter {
        let mut exporter = PrometheusExporter::new(METRIC_PREFIX);

        for spec in SCALAR_METRICS {
            self.export_spec(&mut exporter, values, spec, spec.service, BTreeMap::new());
        }

        self.export_ppp(&mut exporter, values);

        for instance in 1..=WLAN_INSTANCES {
            let service = format!("{}:{}", WLAN, instance);
            if !values.iter().any(|v| v.service_type.contains(&service)) {
                continue;
            }

            let text = |(_, action, variable): (&str, &str, &str)| {
                find_value(values, &service, action, variable)
                    .map(|v| v.value.clone())
                    .unwrap_or_default()
            };
            let mut labels = BTreeMap::new();
            labels.insert(
                "ssid_standard".to_string(),
                format!("{} ({})", text(WLAN_INFO), text(WLAN_STANDARD)),
            );

            for spec in WLAN_METRICS {
                self.export_spec(&mut exporter, values, spec, &service, labels.clone());
            }
        }

        exporter.sample(
            "scrape_values_total",
            "Number of values read from the device in this scrape",
            MetricType::Gauge,
            values.len() as f64,
            BTreeMap::new(),
        );

        exporter
    }

    fn export_spec(
        &self,
        exporter: &mut PrometheusExporter,
        values: &[ServiceActionValue],
        spec: &MetricSpec,
        service: &str,
        labels: BTreeMap<String, String>,
    ) {
        let Some(found) = find_value(values, service, spec.action, spec.variable) else {
            return;
        };
        let raw = parse_number(&found.value);

        match spec.kind {
            ValueKind::Gauge => {
                exporter.sample(spec.name, spec.help, MetricType::Gauge, raw, labels);
            }
            ValueKind::Counter => {
                let corrected = self.correct(found, raw);
                exporter.sample(spec.name, spec.help, MetricType::Counter, corrected, labels);
            }
            ValueKind::CounterWithRaw => {
                let corrected = self.correct(found, raw);
                exporter.sample(spec.name, spec.help, MetricType::Counter, raw, labels.clone());
                exporter.sample(
                    &format!("{}_corrected", spec.name),
                    &format!("{} corrected", spec.help),
                    MetricType::Counter,
                    corrected,
                    labels,
                );
            }
        }
    }

    fn export_ppp(&self, exporter: &mut PrometheusExporter, values: &[ServiceActionValue]) {
        let lookup = |(service, action, variable): (&str, &str, &str)| {
            find_value(values, service, action, variable)
        };
        let Some(uptime) = lookup(PPP_UPTIME) else {
            return;
        };

        let mut labels = BTreeMap::new();
        labels.insert(
            "ip".to_string(),
            lookup(PPP_EXTERNAL_IP).map(|v| v.value.clone()).unwrap_or_default(),
        );
        labels.insert(
            "status".to_string(),
            lookup(PPP_STATUS).map(|v| v.value.clone()).unwrap_or_default(),
        );
        exporter.sample(
            "wanppp_status_uptime",
            "WAN PPP uptime",
            MetricType::Gauge,
            parse_number(&uptime.value),
            labels,
        );
    }

    fn correct(&self, value: &ServiceActionValue, raw: f64) -> f64 {
        let key = CounterKey::new(&value.service_type, &value.action_name, &value.variable);
        self.corrections.correct(&key, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::Credentials;
    use crate::discovery::Selection;
    use crate::transport::mock::MockTransport;

    fn value(service: &str, action: &str, variable: &str, value: &str) -> ServiceActionValue {
        ServiceActionValue {
            service_type: format!("urn:dslforum-org:service:{}", service),
            action_name: action.into(),
            variable: variable.into(),
            value: value.into(),
        }
    }

    fn collector() -> FritzCollector {
        let client = UpnpClient::new(
            "http://fritz.box:49000",
            Arc::new(MockTransport::new()),
            Credentials::new("admin", "secret"),
        );
        FritzCollector::new(client, Arc::new(CounterCorrection::new()))
    }

    #[test]
    fn test_interest_filter_covers_catalog() {
        let filter = interest_filter();
        let wlan = filter.select("urn:dslforum-org:service:WLANConfiguration:2");
        assert!(wlan.accepts("GetInfo"));
        assert!(wlan.accepts("GetTotalAssociations"));
        assert!(wlan.accepts("GetStatistics"));
        assert!(!wlan.accepts("GetSecurityKeys"));

        let ppp = filter.select("urn:dslforum-org:service:WANPPPConnection:1");
        assert!(ppp.accepts("GetExternalIPAddress"));
        assert!(ppp.accepts("GetStatusInfo"));

        assert_eq!(
            filter.select("urn:dslforum-org:service:DeviceInfo:1"),
            Selection::Skip
        );
    }

    #[test]
    fn test_find_value_by_substring() {
        let values = vec![value("WLANConfiguration:2", "GetInfo", "SSID", "guest")];
        assert_eq!(
            find_value(&values, "WLANConfiguration:2", "GetInfo", "SSID").map(|v| v.value.as_str()),
            Some("guest")
        );
        assert!(find_value(&values, "WLANConfiguration:1", "GetInfo", "SSID").is_none());
        assert!(find_value(&values, "WLANConfiguration", "GetInfo", "Standard").is_none());
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("4711"), 4711.0);
        assert_eq!(parse_number(" 12.5 "), 12.5);
        assert_eq!(parse_number("Connected"), 0.0);
        assert_eq!(parse_number(""), 0.0);
        assert_eq!(parse_number("NaN"), 0.0);
        assert_eq!(parse_number("inf"), 0.0);
        assert_eq!(parse_number("-infinity"), 0.0);
    }

    #[test]
    fn test_assemble_non_finite_readings_stay_non_negative() {
        let collector = collector();
        let mut corrected = Vec::new();
        for raw in ["4711", "100", "NaN", "50", "inf", "80"] {
            let values = vec![value(
                "WANCommonInterfaceConfig:1",
                "GetTotalBytesReceived",
                "TotalBytesReceived",
                raw,
            )];
            let exporter = collector.assemble(&values);
            let family = exporter
                .family("fb_wan_total_bytes_received_corrected")
                .unwrap();
            corrected.push(family.samples[0].value);
        }
        assert_eq!(corrected, [4711.0, 0.0, 0.0, 50.0, 0.0, 80.0]);
    }

    #[test]
    fn test_assemble_wan_counters_with_reset() {
        let collector = collector();
        let cycle = |raw: &str| {
            let values = vec![value(
                "WANCommonInterfaceConfig:1",
                "GetTotalBytesReceived",
                "TotalBytesReceived",
                raw,
            )];
            collector.assemble(&values)
        };

        let expected = [("4711", 4711.0), ("4712", 4712.0), ("100", 0.0), ("150", 50.0)];
        for (raw, corrected) in expected {
            let exporter = cycle(raw);
            let raw_family = exporter.family("fb_wan_total_bytes_received").unwrap();
            assert_eq!(raw_family.samples[0].value, parse_number(raw));
            let family = exporter.family("fb_wan_total_bytes_received_corrected").unwrap();
            assert_eq!(family.samples[0].value, corrected);
        }
    }

    #[test]
    fn test_assemble_wlan_labels_per_radio() {
        let collector = collector();
        let values = vec![
            value("WLANConfiguration:1", "GetInfo", "SSID", "home"),
            value("WLANConfiguration:1", "GetInfo", "Standard", "n"),
            value("WLANConfiguration:1", "GetTotalAssociations", "TotalAssociations", "5"),
            value("WLANConfiguration:2", "GetInfo", "SSID", "home"),
            value("WLANConfiguration:2", "GetInfo", "Standard", "ac"),
            value("WLANConfiguration:2", "GetTotalAssociations", "TotalAssociations", "2"),
            value("WLANConfiguration:2", "GetStatistics", "TotalPacketsSent", "1000"),
        ];
        let exporter = collector.assemble(&values);

        let associations = exporter.family("fb_wlan_number_associations").unwrap();
        let rendered: Vec<_> = associations
            .samples
            .iter()
            .map(|s| (s.labels["ssid_standard"].as_str(), s.value))
            .collect();
        assert_eq!(rendered, [("home (n)", 5.0), ("home (ac)", 2.0)]);

        let sent = exporter.family("fb_wlan_total_packets_sent").unwrap();
        assert_eq!(sent.samples.len(), 1);
        assert_eq!(sent.samples[0].labels["ssid_standard"], "home (ac)");
    }

    #[test]
    fn test_assemble_ppp_uptime() {
        let collector = collector();
        let values = vec![
            value("WANPPPConnection:1", "GetExternalIPAddress", "ExternalIPAddress", "203.0.113.7"),
            value("WANPPPConnection:1", "GetStatusInfo", "ConnectionStatus", "Connected"),
            value("WANPPPConnection:1", "GetStatusInfo", "Uptime", "86400"),
        ];
        let output = collector.assemble(&values).export();
        assert!(output.contains(
            "fb_wanppp_status_uptime{ip=\"203.0.113.7\",status=\"Connected\"} 86400"
        ));
    }

    #[test]
    fn test_assemble_missing_values_are_omitted() {
        let collector = collector();
        let output = collector.assemble(&[]).export();
        assert!(!output.contains("fb_wan_total_bytes_received"));
        assert!(!output.contains("fb_wlan_"));
        assert!(output.contains("fb_scrape_values_total 0"));
    }
}
