// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! HTTP Digest authentication (RFC 2617, MD5, qop=auth)
//!
//! Everything here is pure except [`generate_cnonce`]; the client nonce is
//! passed in explicitly so identical inputs produce identical headers.

use md5::{Digest, Md5};
use rand::RngCore;

/// Nonce count sent with every authorization. Only one authenticated
/// attempt is made per challenge, so the count never advances.
pub const NONCE_COUNT: &str = "00000001";

/// Digest credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Parameters recovered from a `WWW-Authenticate: Digest ...` header.
/// Missing parameters are left empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub qop: String,
}

impl DigestChallenge {
    /// Parse a challenge header value
    pub fn parse(header: &str) -> Self {
        let mut challenge = Self::default();
        for (key, value) in parse_params(header) {
            match key.as_str() {
                "realm" => challenge.realm = value,
                "nonce" => challenge.nonce = value,
                "qop" => challenge.qop = select_qop(&value),
                _ => {}
            }
        }
        challenge
    }

    /// Parse an optional header; an absent header yields an empty challenge
    pub fn from_header(header: Option<&str>) -> Self {
        header.map(Self::parse).unwrap_or_default()
    }

    /// Compute the `response` digest
    pub fn response(
        &self,
        credentials: &Credentials,
        method: &str,
        uri: &str,
        cnonce: &str,
    ) -> String {
        let ha1 = hex_md5(&[&credentials.username, &self.realm, &credentials.password]);
        let ha2 = hex_md5(&[method, uri]);
        hex_md5(&[&ha1, &self.nonce, NONCE_COUNT, cnonce, &self.qop, &ha2])
    }

    /// Build the full `Authorization` header value
    pub fn authorization(
        &self,
        credentials: &Credentials,
        method: &str,
        uri: &str,
        cnonce: &str,
    ) -> String {
        let response = self.response(credentials, method, uri, cnonce);
        format!(
            concat!(
                r#"Digest username="{}", realm="{}", nonce="{}", uri="{}", "#,
                r#"response="{}", qop={}, nc={}, cnonce="{}", algorithm=MD5"#
            ),
            credentials.username,
            self.realm,
            self.nonce,
            uri,
            response,
            self.qop,
            NONCE_COUNT,
            cnonce
        )
    }
}

/// MD5 over the parts joined by `:`, as lowercase hex
pub fn hex_md5(parts: &[&str]) -> String {
    let mut h = Md5::new();
    for (i, p) in parts.iter().enumerate() {
        if i > 0 {
            h.update(b":");
        }
        h.update(p.as_bytes());
    }
    hex::encode(h.finalize())
}

/// Fresh 16-hex-character client nonce from the thread-local CSPRNG
pub fn generate_cnonce() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Split `Digest k1="v1", k2=v2` into lowercase keys and unquoted values.
/// Commas inside quoted values do not split.
pub(crate) fn parse_params(header: &str) -> Vec<(String, String)> {
    let header = header.trim();
    let rest = match header.split_once(char::is_whitespace) {
        Some((scheme, tail)) if scheme.eq_ignore_ascii_case("digest") => tail,
        _ => header,
    };

    let mut params = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in rest.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                push_param(&mut params, &current);
                current.clear();
            }
            _ => current.push(c),
        }
    }
    push_param(&mut params, &current);
    params
}

fn push_param(params: &mut Vec<(String, String)>, raw: &str) {
    if let Some((key, value)) = raw.split_once('=') {
        params.push((
            key.trim().to_ascii_lowercase(),
            value.trim().trim_matches('"').to_string(),
        ));
    }
}

/// Pick `auth` out of a qop list such as `auth,auth-int`
fn select_qop(offered: &str) -> String {
    let options: Vec<&str> = offered
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if options.contains(&"auth") {
        "auth".to_string()
    } else {
        options.first().copied().unwrap_or_default().to_string()
    }
}
