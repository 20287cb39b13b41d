// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! TR-064 schema discovery
//!
//! The device describes itself in two levels of XML: the root description
//! (`/tr64desc.xml`) lists services, and each service's SCPD document lists
//! its actions and their arguments. Both are streamed with quick-xml and
//! reduced to the read-only "getter" actions that are safe to poll.
//!
//! The schema differs per firmware, so nothing here is typed per action:
//! services and actions are plain data matched by name.

use crate::client::DigestClient;
use crate::error::{MonitorError, Result};
use crate::transport::HttpRequest;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Path of the root description document
pub const ROOT_DESCRIPTION: &str = "/tr64desc.xml";

/// A management endpoint declared in the root description
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// e.g. `urn:dslforum-org:service:WLANConfiguration:2`
    pub service_type: String,
    /// Path that SOAP requests are POSTed to
    pub control_url: String,
    /// Path of the SCPD document
    pub scpd_url: String,
}

/// Argument direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    In,
    #[default]
    Out,
}

impl Direction {
    /// Anything other than `in` is treated as output
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("in") {
            Self::In
        } else {
            Self::Out
        }
    }
}

/// Action argument
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    /// Element name in the SOAP response, e.g. `NewTotalBytesSent`
    pub name: String,
    pub direction: Direction,
    /// Device state variable reported, e.g. `TotalBytesSent`
    pub related_state_variable: String,
}

/// Action declared in an SCPD document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    pub arguments: Vec<Argument>,
}

impl Action {
    /// Whether the action is a side-effect-free getter: its name follows
    /// the `Get` convention, it takes no input and returns something.
    pub fn is_get_only(&self) -> bool {
        self.name.contains("Get")
            && !self.arguments.is_empty()
            && self.arguments.iter().all(|a| a.direction == Direction::Out)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Argument> {
        self.arguments
            .iter()
            .filter(|a| a.direction == Direction::Out)
    }
}

/// A service together with the actions selected for invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredService {
    pub service: Service,
    pub actions: Vec<Action>,
}

/// Which actions of a service a filter selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<'a> {
    /// Every getter
    All,
    /// Only the named getters
    Only(&'a BTreeSet<String>),
    /// Service not of interest
    Skip,
}

impl Selection<'_> {
    pub fn accepts(&self, action: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(actions) => actions.contains(action),
            Self::Skip => false,
        }
    }
}

/// Interest filter: service-type substring -> wanted action names.
///
/// An empty filter selects every getter of every service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceFilter {
    services: BTreeMap<String, BTreeSet<String>>,
}

impl ServiceFilter {
    /// Empty filter (discovery-only mode)
    pub fn all() -> Self {
        Self::default()
    }

    /// Add wanted actions for services whose type contains `service`
    pub fn with<I, S>(mut self, service: &str, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(service, actions);
        self
    }

    pub fn insert<I, S>(&mut self, service: &str, actions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.services
            .entry(service.to_string())
            .or_default()
            .extend(actions.into_iter().map(Into::into));
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Select actions for a service type. The first key (in sorted order)
    /// contained in the type decides.
    pub fn select(&self, service_type: &str) -> Selection<'_> {
        if self.services.is_empty() {
            return Selection::All;
        }
        self.services
            .iter()
            .find(|(key, _)| service_type.contains(key.as_str()))
            .map(|(_, actions)| Selection::Only(actions))
            .unwrap_or(Selection::Skip)
    }
}

/// Parse the root description into its services
pub fn parse_services(xml: &str) -> Result<Vec<Service>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut services = Vec::new();
    let mut current: Option<Service> = None;
    let mut field: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if name == "service" {
                    current = Some(Service::default());
                } else {
                    field = Some(name);
                }
            }
            Event::Text(t) => {
                if let (Some(service), Some(field)) = (current.as_mut(), field.as_deref()) {
                    let value = t.unescape()?.into_owned();
                    match field {
                        "serviceType" => service.service_type = value,
                        "controlURL" => service.control_url = value,
                        "SCPDURL" => service.scpd_url = value,
                        _ => {}
                    }
                }
            }
            Event::End(e) => {
                field = None;
                if e.local_name().as_ref() == b"service" {
                    if let Some(service) = current.take() {
                        services.push(validate_service(service)?);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if current.is_some() {
        return Err(MonitorError::Decode(
            "unterminated service element in root description".into(),
        ));
    }
    Ok(services)
}

fn validate_service(service: Service) -> Result<Service> {
    let missing = [
        ("serviceType", &service.service_type),
        ("controlURL", &service.control_url),
        ("SCPDURL", &service.scpd_url),
    ]
    .into_iter()
    .find(|(_, v)| v.is_empty())
    .map(|(name, _)| name);

    match missing {
        Some(name) => Err(MonitorError::Decode(format!(
            "service element without {} ({})",
            name, service.service_type
        ))),
        None => Ok(service),
    }
}

/// Parse an SCPD document into all of its actions
pub fn parse_actions(xml: &str) -> Result<Vec<Action>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut actions = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut action: Option<Action> = None;
    let mut argument: Option<Argument> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match name.as_str() {
                    "action" => action = Some(Action::default()),
                    "argument" if action.is_some() => argument = Some(Argument::default()),
                    _ => {}
                }
                path.push(name);
            }
            Event::Text(t) => {
                let (Some(action), Some(field)) = (action.as_mut(), path.last()) else {
                    continue;
                };
                let value = t.unescape()?.into_owned();
                if let Some(argument) = argument.as_mut() {
                    match field.as_str() {
                        "name" => argument.name = value,
                        "direction" => argument.direction = Direction::parse(&value),
                        "relatedStateVariable" => argument.related_state_variable = value,
                        _ => {}
                    }
                } else if field == "name" {
                    action.name = value;
                }
            }
            Event::End(e) => {
                path.pop();
                match e.local_name().as_ref() {
                    b"argument" => {
                        if let (Some(action), Some(argument)) = (action.as_mut(), argument.take())
                        {
                            action.arguments.push(argument);
                        }
                    }
                    b"action" => {
                        if let Some(action) = action.take() {
                            if action.name.is_empty() {
                                return Err(MonitorError::Decode(
                                    "action element without name".into(),
                                ));
                            }
                            actions.push(action);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if action.is_some() {
        return Err(MonitorError::Decode(
            "unterminated action element in SCPD document".into(),
        ));
    }
    Ok(actions)
}

/// Resolve a path from a description document against the device base URL
pub fn join_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else if path.starts_with('/') {
        format!("{}{}", base_url, path)
    } else {
        format!("{}/{}", base_url, path)
    }
}

/// Discovery engine for one device
pub struct Discovery<'a> {
    client: &'a DigestClient,
    base_url: &'a str,
}

impl<'a> Discovery<'a> {
    pub fn new(client: &'a DigestClient, base_url: &'a str) -> Self {
        Self { client, base_url }
    }

    /// Fetch the root description and the SCPD of every service the filter
    /// selects, returning the selected getters per service in document order.
    ///
    /// An unfiltered discovery makes one request per service plus one for
    /// the root description. A filtered one skips the SCPD of every service
    /// the filter rejects, so it makes fewer; the result is the same as
    /// fetching all of them and filtering afterwards.
    ///
    /// Unreachable device or malformed description documents abort the
    /// discovery; an unreachable SCPD only drops that service.
    pub async fn discover(&self, filter: &ServiceFilter) -> Result<Vec<DiscoveredService>> {
        let root_url = join_url(self.base_url, ROOT_DESCRIPTION);
        let root = self.client.fetch(&HttpRequest::get(root_url)).await?;
        let services = parse_services(&root)?;
        log::debug!("Root description lists {} services", services.len());

        let mut discovered = Vec::new();
        for service in services {
            let selection = filter.select(&service.service_type);
            if selection == Selection::Skip {
                continue;
            }

            let scpd_url = join_url(self.base_url, &service.scpd_url);
            let scpd = match self.client.fetch(&HttpRequest::get(&scpd_url)).await {
                Ok(body) => body,
                Err(e @ MonitorError::Network(_)) => {
                    log::warn!("Skipping service {}: {}", service.service_type, e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let actions: Vec<Action> = parse_actions(&scpd)?
                .into_iter()
                .filter(|a| a.is_get_only() && selection.accepts(&a.name))
                .collect();

            log::debug!(
                "Service {}: {} actions selected",
                service.service_type,
                actions.len()
            );
            if !actions.is_empty() {
                discovered.push(DiscoveredService { service, actions });
            }
        }

        Ok(discovered)
    }
}
