// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Digest-authenticating HTTP client
//!
//! Each request is first sent without credentials. On a `401` the challenge
//! is answered exactly once; a second `401` means the credentials were
//! rejected. Nothing is cached between requests, so every request pays the
//! probe round trip.

use crate::digest::{generate_cnonce, Credentials, DigestChallenge};
use crate::error::{MonitorError, Result};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use std::sync::Arc;

const STATUS_OK: u16 = 200;
const STATUS_UNAUTHORIZED: u16 = 401;

/// HTTP client that answers Digest challenges
#[derive(Clone)]
pub struct DigestClient {
    transport: Arc<dyn HttpTransport>,
    credentials: Credentials,
}

impl DigestClient {
    pub fn new(transport: Arc<dyn HttpTransport>, credentials: Credentials) -> Self {
        Self {
            transport,
            credentials,
        }
    }

    /// Send a request, answering a Digest challenge if one comes back.
    ///
    /// Any status other than `401` on the probe is returned as-is.
    pub async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let response = self.transport.send(request).await?;
        if response.status != STATUS_UNAUTHORIZED {
            log::debug!(
                "Received status code {} from {}, auth skipped",
                response.status,
                request.url
            );
            return Ok(response);
        }

        let challenge = DigestChallenge::from_header(response.header("www-authenticate"));
        let uri = request_uri(&request.url)?;
        let authorization = challenge.authorization(
            &self.credentials,
            request.method.as_str(),
            &uri,
            &generate_cnonce(),
        );

        let authenticated = request.clone().with_header("Authorization", authorization);
        let response = self.transport.send(&authenticated).await?;
        if response.status == STATUS_UNAUTHORIZED {
            return Err(MonitorError::Authentication(request.url.clone()));
        }
        Ok(response)
    }

    /// Body of a successful exchange.
    ///
    /// Timeouts, rejected credentials and non-200 answers are logged and
    /// yield an empty body so the rest of the poll can continue. Connection
    /// failures are returned to the caller.
    pub async fn fetch(&self, request: &HttpRequest) -> Result<String> {
        match self.execute(request).await {
            Ok(response) if response.status == STATUS_OK => Ok(response.body),
            Ok(response) => {
                log::warn!(
                    "Failed to call URL {} - status code was {}",
                    request.url,
                    response.status
                );
                Ok(String::new())
            }
            Err(e) if e.is_degradable() => {
                log::warn!("{}", e);
                Ok(String::new())
            }
            Err(e) => Err(e),
        }
    }
}

/// Request-URI used in the digest: path plus query of the absolute URL
fn request_uri(url: &str) -> Result<String> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| MonitorError::InvalidUrl(format!("{}: {}", url, e)))?;
    Ok(match parsed.query() {
        Some(query) => format!("{}?{}", parsed.path(), query),
        None => parsed.path().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockTransport, Reply};
    use crate::transport::Method;

    const URL: &str = "http://fritz.box:49000/upnp/control/wancommonifconfig1";

    fn client(transport: Arc<MockTransport>) -> DigestClient {
        DigestClient::new(transport, Credentials::new("admin", "secret"))
    }

    #[test]
    fn test_request_uri() {
        assert_eq!(request_uri(URL).unwrap(), "/upnp/control/wancommonifconfig1");
        assert_eq!(request_uri("http://h:49000/a?b=c").unwrap(), "/a?b=c");
        assert!(matches!(
            request_uri("not a url"),
            Err(MonitorError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_no_challenge_returns_response_as_is() {
        let transport = Arc::new(MockTransport::new());
        transport.reply(URL, Reply::Response(HttpResponse::new(500, "boom")));

        let response = client(transport.clone())
            .execute(&HttpRequest::get(URL))
            .await
            .unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(response.body, "boom");
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_challenge_is_answered_once() {
        let transport = Arc::new(MockTransport::with_digest(Credentials::new("admin", "secret")));
        transport.ok(URL, "<ok/>");

        let request = HttpRequest::post(URL, "<s:Envelope/>")
            .with_header("Content-Type", "text/xml")
            .with_header("SoapAction", "urn:x#GetInfo");
        let body = client(transport.clone()).fetch(&request).await.unwrap();
        assert_eq!(body, "<ok/>");

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].header("authorization").is_none());

        let retry = &requests[1];
        assert_eq!(retry.method, Method::Post);
        assert_eq!(retry.body, "<s:Envelope/>");
        assert_eq!(retry.header("soapaction"), Some("urn:x#GetInfo"));
        let auth = retry.header("authorization").unwrap();
        assert!(auth.starts_with("Digest username=\"admin\""));
        assert!(auth.contains("realm=\"F!Box SOAP-Auth\""));
        assert!(auth.contains("uri=\"/upnp/control/wancommonifconfig1\""));
        assert!(auth.contains("qop=auth"));
    }

    #[tokio::test]
    async fn test_second_401_is_authentication_failure() {
        let transport = Arc::new(MockTransport::with_digest(Credentials::new("admin", "other")));
        transport.ok(URL, "<ok/>");

        let c = client(transport.clone());
        let err = c.execute(&HttpRequest::get(URL)).await.unwrap_err();
        assert!(matches!(err, MonitorError::Authentication(_)));
        assert_eq!(transport.requests().len(), 2);

        // Degrades to an empty body through fetch
        assert_eq!(c.fetch(&HttpRequest::get(URL)).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_missing_challenge_header_still_retries() {
        let transport = Arc::new(MockTransport::new());
        transport.reply(URL, Reply::Response(HttpResponse::new(401, "")));
        transport.ok(URL, "<ok/>");

        let body = client(transport.clone()).fetch(&HttpRequest::get(URL)).await.unwrap();
        assert_eq!(body, "<ok/>");
        let auth = transport.requests()[1]
            .header("authorization")
            .unwrap()
            .to_string();
        assert!(auth.contains("realm=\"\", nonce=\"\""));
    }

    #[tokio::test]
    async fn test_fetch_degrades_timeout_and_bad_status() {
        let transport = Arc::new(MockTransport::new());
        transport.reply(URL, Reply::Timeout);
        let c = client(transport.clone());
        assert_eq!(c.fetch(&HttpRequest::get(URL)).await.unwrap(), "");

        let other = "http://fritz.box:49000/missing.xml";
        assert_eq!(c.fetch(&HttpRequest::get(other)).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_fetch_propagates_network_failure() {
        let transport = Arc::new(MockTransport::new());
        transport.reply(URL, Reply::Network);
        let err = client(transport).fetch(&HttpRequest::get(URL)).await.unwrap_err();
        assert!(matches!(err, MonitorError::Network(_)));
    }
}
