//! ID token parsing.
//!
//! Decodes the header and payload of a JSON Web Token so that claims such as
//! `exp` and `nonce` can be read. The signature is carried but never verified;
//! the token's consumer (the application backend) is responsible for that.

use crate::error::JwtError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use std::fmt;

/// A decoded, unverified JSON Web Token.
#[derive(Clone)]
pub struct Jwt {
    raw: String,
    header: Map<String, Value>,
    payload: Map<String, Value>,
    signature: String,
}

impl Jwt {
    pub fn decode(token: &str) -> Result<Self, JwtError> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(JwtError::SegmentCount(parts.len()));
        }

        let header = decode_segment(parts[0], "header")?;
        let payload = decode_segment(parts[1], "payload")?;

        Ok(Self {
            raw: token.to_string(),
            header,
            payload,
            signature: parts[2].to_string(),
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn header(&self) -> &Map<String, Value> {
        &self.header
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Any payload claim, registered or custom.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }

    pub fn claims(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn issuer(&self) -> Option<&str> {
        self.string_claim("iss")
    }

    pub fn subject(&self) -> Option<&str> {
        self.string_claim("sub")
    }

    pub fn nonce(&self) -> Option<&str> {
        self.string_claim("nonce")
    }

    /// `aud` may be a single string or a list of strings.
    pub fn audience(&self) -> Vec<&str> {
        match self.payload.get("aud") {
            Some(Value::String(aud)) => vec![aud.as_str()],
            Some(Value::Array(values)) => values.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.date_claim("exp")
    }

    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        self.date_claim("nbf")
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.date_claim("iat")
    }

    /// A token is expired when `now - leeway` is past `exp`, or when `now + leeway`
    /// is still before `iat`. Missing claims never expire a token. A token whose
    /// `exp` equals `now` is still valid.
    pub fn is_expired(&self, leeway_secs: u64, now: DateTime<Utc>) -> bool {
        let now = now.timestamp();
        let leeway = i64::try_from(leeway_secs).unwrap_or(i64::MAX);

        let past_expiry = self
            .numeric_claim("exp")
            .map_or(false, |exp| now.saturating_sub(leeway) > exp);
        let issued_in_future = self
            .numeric_claim("iat")
            .map_or(false, |iat| now.saturating_add(leeway) < iat);

        past_expiry || issued_in_future
    }

    fn string_claim(&self, name: &str) -> Option<&str> {
        self.payload.get(name).and_then(Value::as_str)
    }

    /// NumericDate claims are seconds since the epoch and may be fractional.
    fn numeric_claim(&self, name: &str) -> Option<i64> {
        let value = self.payload.get(name)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|secs| secs.floor() as i64))
    }

    fn date_claim(&self, name: &str) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.numeric_claim(name)?, 0).single()
    }
}

impl fmt::Debug for Jwt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jwt")
            .field("header", &self.header)
            .field("sub", &self.subject())
            .field("exp", &self.numeric_claim("exp"))
            .finish_non_exhaustive()
    }
}

fn decode_segment(segment: &str, name: &'static str) -> Result<Map<String, Value>, JwtError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|source| JwtError::InvalidBase64 {
            segment: name,
            source,
        })?;

    serde_json::from_slice(&bytes).map_err(|source| JwtError::InvalidJson {
        segment: name,
        source,
    })
}
