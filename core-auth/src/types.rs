use crate::error::JwtError;
use crate::jwt::Jwt;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Credential bundle returned by a login or a renewal.
///
/// `expires_at` is the access token's expiry. The ID token carries its own
/// `exp` claim and the two are not guaranteed to agree.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub id_token: String,
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub scope: Option<String>,
}

impl Credentials {
    /// Decode the user profile claims from the ID token.
    pub fn user(&self) -> Result<UserProfile, JwtError> {
        UserProfile::from_id_token(&self.id_token)
    }

    /// True if the access token expires at or before `now + min_ttl_secs`.
    pub fn will_expire_within(&self, min_ttl_secs: u64, now: DateTime<Utc>) -> bool {
        let min_ttl = Duration::seconds(min_ttl_secs.min(u32::MAX as u64) as i64);
        now.checked_add_signed(min_ttl)
            .map_or(true, |deadline| self.expires_at <= deadline)
    }

    /// Seconds of access token lifetime left at `now`; negative once expired.
    pub fn remaining_lifetime(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("id_token", &"[REDACTED]")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

/// OIDC standard profile claims carried in the ID token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub sub: String,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub picture: Option<String>,
    pub updated_at: Option<String>,
}

impl UserProfile {
    pub fn from_id_token(id_token: &str) -> Result<Self, JwtError> {
        let jwt = Jwt::decode(id_token)?;
        let claims = serde_json::Value::Object(jwt.claims().clone());
        serde_json::from_value(claims).map_err(|source| JwtError::InvalidJson {
            segment: "payload",
            source,
        })
    }
}
