// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! SOAP invocation of discovered getter actions

use crate::client::DigestClient;
use crate::discovery::{join_url, Action, Service};
use crate::error::Result;
use crate::transport::HttpRequest;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

const SOAP_ENV: &str = "http://schemas.xmlsoap.org/soap/envelope/"; // SOAP 1.1
const SOAP_ENCODING: &str = "http://schemas.xmlsoap.org/soap/encoding/";

/// One output value of one invoked action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceActionValue {
    pub service_type: String,
    pub action_name: String,
    /// Related state variable of the output argument
    pub variable: String,
    /// Raw value as returned by the device
    pub value: String,
}

impl std::fmt::Display for ServiceActionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:::{}/{}   =   {}",
            self.service_type, self.action_name, self.variable, self.value
        )
    }
}

/// Envelope calling an argument-less action
pub fn build_envelope(service_type: &str, action_name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="{soap}" s:encodingStyle="{encoding}">
    <s:Body><u:{action} xmlns:u="{service}"/></s:Body>
</s:Envelope>"#,
        soap = SOAP_ENV,
        encoding = SOAP_ENCODING,
        action = action_name,
        service = escape(service_type),
    )
}

/// Value of the `SoapAction` header
pub fn soap_action(service_type: &str, action_name: &str) -> String {
    format!("{}#{}", service_type, action_name)
}

/// POST request invoking `action` on `service`
pub fn build_request(base_url: &str, service: &Service, action: &Action) -> HttpRequest {
    HttpRequest::post(
        join_url(base_url, &service.control_url),
        build_envelope(&service.service_type, &action.name),
    )
    .with_header("Content-Type", "text/xml")
    .with_header("charset", "utf-8")
    .with_header("SoapAction", soap_action(&service.service_type, &action.name))
}

/// Stream a SOAP response and pick out the action's output arguments.
///
/// Each element named like an output argument yields one value from the
/// character data directly inside it. Arguments the device leaves out are
/// simply absent. Malformed XML ends extraction early, keeping what was
/// read so far.
pub fn extract_values(xml: &str, service_type: &str, action: &Action) -> Vec<ServiceActionValue> {
    let mut reader = Reader::from_str(xml);
    let mut values = Vec::new();

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                log::warn!(
                    "Malformed response for {}#{} at byte {}: {}",
                    service_type,
                    action.name,
                    reader.buffer_position(),
                    e
                );
                break;
            }
        };

        match event {
            Event::Start(e) => {
                let local = e.local_name();
                let Some(argument) = action
                    .outputs()
                    .find(|a| a.name.as_bytes() == local.as_ref())
                else {
                    continue;
                };

                let value = match reader.read_event() {
                    Ok(Event::Text(text)) => match text.unescape() {
                        Ok(value) => value.into_owned(),
                        Err(e) => {
                            log::warn!("Undecodable value for {}: {}", argument.name, e);
                            continue;
                        }
                    },
                    Ok(Event::CData(data)) => String::from_utf8_lossy(&data).into_owned(),
                    _ => continue,
                };
                let variable = if argument.related_state_variable.is_empty() {
                    argument.name.clone()
                } else {
                    argument.related_state_variable.clone()
                };
                values.push(ServiceActionValue {
                    service_type: service_type.to_string(),
                    action_name: action.name.clone(),
                    variable,
                    value,
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    values
}

/// Invokes actions of one device
pub struct SoapInvoker<'a> {
    client: &'a DigestClient,
    base_url: &'a str,
}

impl<'a> SoapInvoker<'a> {
    pub fn new(client: &'a DigestClient, base_url: &'a str) -> Self {
        Self { client, base_url }
    }

    /// Invoke one action and return its output values in response order
    pub async fn invoke(
        &self,
        service: &Service,
        action: &Action,
    ) -> Result<Vec<ServiceActionValue>> {
        let request = build_request(self.base_url, service, action);
        let body = self.client.fetch(&request).await?;
        Ok(extract_values(&body, &service.service_type, action))
    }
}
