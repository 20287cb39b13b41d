// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! One poll of the device: discovery followed by sequential invocation

use crate::client::DigestClient;
use crate::config::AppConfig;
use crate::digest::Credentials;
use crate::discovery::{Discovery, ServiceFilter};
use crate::error::{MonitorError, Result};
use crate::soap::{ServiceActionValue, SoapInvoker};
use crate::transport::{HttpTransport, ReqwestTransport};
use std::sync::Arc;
use std::time::Duration;

/// TR-064 client for one device
#[derive(Clone)]
pub struct UpnpClient {
    base_url: String,
    client: DigestClient,
}

impl UpnpClient {
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        credentials: Credentials,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            client: DigestClient::new(transport, credentials),
        }
    }

    /// Client talking to the configured device over reqwest
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(Duration::from_secs(config.request_timeout_secs))?;
        Ok(Self::new(
            config.device_base_url(),
            Arc::new(transport),
            Credentials::new(config.username(), config.password()),
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Discover the schema and invoke every selected getter.
    ///
    /// The schema is fetched fresh on every call. Actions run one at a time
    /// in discovery order and their values are appended in that order.
    pub async fn execute(&self, filter: &ServiceFilter) -> Result<Vec<ServiceActionValue>> {
        let discovered = Discovery::new(&self.client, &self.base_url)
            .discover(filter)
            .await?;
        let invoker = SoapInvoker::new(&self.client, &self.base_url);

        let mut result = Vec::new();
        for entry in &discovered {
            for action in &entry.actions {
                match invoker.invoke(&entry.service, action).await {
                    Ok(values) => result.extend(values),
                    Err(e @ MonitorError::Network(_)) => {
                        log::warn!(
                            "Calling {}#{} failed: {}",
                            entry.service.service_type,
                            action.name,
                            e
                        );
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        for value in &result {
            log::debug!("{}", value);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::fixtures::*;
    use crate::transport::mock::{MockTransport, Reply};

    const WLAN1_INFO: &str = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
<s:Body>
<u:GetInfoResponse xmlns:u="urn:dslforum-org:service:WLANConfiguration:1">
<NewSSID>home</NewSSID><NewStandard>n</NewStandard>
</u:GetInfoResponse></s:Body></s:Envelope>"#;

    const WLAN2_INFO: &str = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
<s:Body>
<u:GetInfoResponse xmlns:u="urn:dslforum-org:service:WLANConfiguration:2">
<NewSSID>home</NewSSID><NewStandard>ac</NewStandard>
</u:GetInfoResponse></s:Body></s:Envelope>"#;

    fn device() -> Arc<MockTransport> {
        let transport = Arc::new(MockTransport::with_digest(Credentials::new("admin", "secret")));
        transport.ok(&format!("{}/tr64desc.xml", BASE), ROOT);
        transport.ok(&format!("{}/deviceinfoSCPD.xml", BASE), DEVICE_INFO_SCPD);
        transport.ok(&format!("{}/wlanconfigSCPD.xml", BASE), WLAN_SCPD);
        transport.ok(&format!("{}/upnp/control/wlanconfig1", BASE), WLAN1_INFO);
        transport.ok(&format!("{}/upnp/control/wlanconfig2", BASE), WLAN2_INFO);
        transport
    }

    #[tokio::test]
    async fn test_execute_preserves_invocation_order() {
        let transport = device();
        let client = UpnpClient::new(BASE, transport, Credentials::new("admin", "secret"));
        let filter = ServiceFilter::all().with("WLANConfiguration", ["GetInfo"]);

        let values = client.execute(&filter).await.unwrap();
        let rendered: Vec<_> = values
            .iter()
            .map(|v| (v.service_type.as_str(), v.variable.as_str(), v.value.as_str()))
            .collect();
        assert_eq!(
            rendered,
            [
                ("urn:dslforum-org:service:WLANConfiguration:1", "SSID", "home"),
                ("urn:dslforum-org:service:WLANConfiguration:1", "Standard", "n"),
                ("urn:dslforum-org:service:WLANConfiguration:2", "SSID", "home"),
                ("urn:dslforum-org:service:WLANConfiguration:2", "Standard", "ac"),
            ]
        );
    }

    #[tokio::test]
    async fn test_execute_tolerates_failed_invocation() {
        let transport = device();
        transport.reply(&format!("{}/upnp/control/deviceinfo", BASE), Reply::Network);
        transport.reply(&format!("{}/upnp/control/wlanconfig1", BASE), Reply::Timeout);
        let client = UpnpClient::new(BASE, transport, Credentials::new("admin", "secret"));

        let values = client.execute(&ServiceFilter::all()).await.unwrap();
        // wlanconfig1 answers once with data, then times out on GetTotalAssociations;
        // wlanconfig2 answers GetInfo for both of its actions
        assert!(values
            .iter()
            .all(|v| v.service_type.contains("WLANConfiguration")));
        assert!(values.iter().any(|v| v.service_type.ends_with(":2")));
    }

    #[test]
    fn test_from_config() {
        let config = AppConfig {
            url: "10.0.0.1".into(),
            username: Some("admin".into()),
            password: Some("secret".into()),
            ..Default::default()
        };
        let client = UpnpClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "http://10.0.0.1:49000");
    }
}
