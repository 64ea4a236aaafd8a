//! Auth0 application configuration.
//!
//! ```
//! use core_auth::Auth0Config;
//!
//! let config = Auth0Config::builder("my-client-id", "tenant.us.auth0.com")
//!     .scheme("demo")
//!     .enable_cached_logins(true)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.callback_url("demo"), "demo://tenant.us.auth0.com/callback");
//! ```

use crate::error::{AuthError, Result};
use bridge_traits::storage::SecureStore;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_SCHEME: &str = "app";

const ENV_CLIENT_ID: &str = "AUTH0_CLIENT_ID";
const ENV_DOMAIN: &str = "AUTH0_DOMAIN";
const ENV_SCHEME: &str = "AUTH0_SCHEME";
const ENV_ENABLE_CACHED_LOGINS: &str = "AUTH0_ENABLE_CACHED_LOGINS";

/// Immutable configuration for an Auth0 application registration.
#[derive(Clone)]
pub struct Auth0Config {
    client_id: String,
    /// Tenant host, normalized: no URL scheme, no trailing slash.
    domain: String,
    scheme: String,
    enable_cached_logins: bool,
    credentials_storage: Option<Arc<dyn SecureStore>>,
}

impl Auth0Config {
    pub fn builder(client_id: impl Into<String>, domain: impl Into<String>) -> Auth0ConfigBuilder {
        Auth0ConfigBuilder {
            client_id: client_id.into(),
            domain: domain.into(),
            scheme: DEFAULT_SCHEME.to_string(),
            enable_cached_logins: false,
            credentials_storage: None,
        }
    }

    /// Load configuration from `AUTH0_CLIENT_ID`, `AUTH0_DOMAIN` and the
    /// optional `AUTH0_SCHEME` / `AUTH0_ENABLE_CACHED_LOGINS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let client_id = lookup(ENV_CLIENT_ID)
            .ok_or_else(|| AuthError::Config(format!("{} is not set", ENV_CLIENT_ID)))?;
        let domain = lookup(ENV_DOMAIN)
            .ok_or_else(|| AuthError::Config(format!("{} is not set", ENV_DOMAIN)))?;

        let mut builder = Self::builder(client_id, domain);
        if let Some(scheme) = lookup(ENV_SCHEME) {
            builder = builder.scheme(scheme);
        }
        if let Some(flag) = lookup(ENV_ENABLE_CACHED_LOGINS) {
            builder = builder.enable_cached_logins(parse_flag(ENV_ENABLE_CACHED_LOGINS, &flag)?);
        }
        builder.build()
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn enable_cached_logins(&self) -> bool {
        self.enable_cached_logins
    }

    pub fn credentials_storage(&self) -> Option<Arc<dyn SecureStore>> {
        self.credentials_storage.clone()
    }

    pub fn base_url(&self) -> String {
        format!("https://{}/", self.domain)
    }

    pub fn authorize_url(&self) -> String {
        format!("{}authorize", self.base_url())
    }

    pub fn token_url(&self) -> String {
        format!("{}oauth/token", self.base_url())
    }

    pub fn logout_url(&self) -> String {
        format!("{}v2/logout", self.base_url())
    }

    /// Redirect target for the hosted pages. Must be listed in the
    /// application's Allowed Callback URLs and Allowed Logout URLs.
    pub fn callback_url(&self, scheme: &str) -> String {
        format!("{}://{}/callback", scheme, self.domain)
    }
}

impl fmt::Debug for Auth0Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth0Config")
            .field("client_id", &self.client_id)
            .field("domain", &self.domain)
            .field("scheme", &self.scheme)
            .field("enable_cached_logins", &self.enable_cached_logins)
            .field(
                "credentials_storage",
                &self.credentials_storage.as_ref().map(|_| "SecureStore { ... }"),
            )
            .finish()
    }
}

pub struct Auth0ConfigBuilder {
    client_id: String,
    domain: String,
    scheme: String,
    enable_cached_logins: bool,
    credentials_storage: Option<Arc<dyn SecureStore>>,
}

impl Auth0ConfigBuilder {
    /// URI scheme used for the login and logout redirects. Defaults to `"app"`.
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn enable_cached_logins(mut self, enable: bool) -> Self {
        self.enable_cached_logins = enable;
        self
    }

    /// Backend for the credentials cache. Only used with cached logins.
    pub fn credentials_storage(mut self, storage: Arc<dyn SecureStore>) -> Self {
        self.credentials_storage = Some(storage);
        self
    }

    pub fn build(self) -> Result<Auth0Config> {
        let client_id = self.client_id.trim().to_string();
        if client_id.is_empty() {
            return Err(AuthError::Config("client ID must not be empty".to_string()));
        }

        let domain = normalize_domain(&self.domain);
        if domain.is_empty() {
            return Err(AuthError::Config("domain must not be empty".to_string()));
        }
        if domain.contains('/') || domain.contains(char::is_whitespace) {
            return Err(AuthError::Config(format!("invalid domain: {}", self.domain)));
        }

        if !is_valid_scheme(&self.scheme) {
            return Err(AuthError::Config(format!(
                "invalid URI scheme: {:?}",
                self.scheme
            )));
        }

        Ok(Auth0Config {
            client_id,
            domain,
            scheme: self.scheme,
            enable_cached_logins: self.enable_cached_logins,
            credentials_storage: self.credentials_storage,
        })
    }
}

fn normalize_domain(domain: &str) -> String {
    let domain = domain.trim();
    let domain = domain
        .strip_prefix("https://")
        .or_else(|| domain.strip_prefix("http://"))
        .unwrap_or(domain);
    domain.trim_end_matches('/').to_string()
}

/// RFC 3986: `scheme = ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`
fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => Err(AuthError::Config(format!(
            "{} must be true or false, got {:?}",
            name, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Auth0Config::builder("client", "tenant.auth0.com")
            .build()
            .unwrap();
        assert_eq!(config.scheme(), "app");
        assert!(!config.enable_cached_logins());
        assert!(config.credentials_storage().is_none());
    }

    #[test]
    fn test_urls() {
        let config = Auth0Config::builder("client", "https://tenant.auth0.com/")
            .build()
            .unwrap();
        assert_eq!(config.domain(), "tenant.auth0.com");
        assert_eq!(config.base_url(), "https://tenant.auth0.com/");
        assert_eq!(config.authorize_url(), "https://tenant.auth0.com/authorize");
        assert_eq!(config.token_url(), "https://tenant.auth0.com/oauth/token");
        assert_eq!(config.logout_url(), "https://tenant.auth0.com/v2/logout");
        assert_eq!(
            config.callback_url("app"),
            "app://tenant.auth0.com/callback"
        );
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            Auth0Config::builder(" ", "tenant.auth0.com").build(),
            Err(AuthError::Config(_))
        ));
        assert!(matches!(
            Auth0Config::builder("client", "https://").build(),
            Err(AuthError::Config(_))
        ));
        assert!(matches!(
            Auth0Config::builder("client", "tenant.auth0.com/path").build(),
            Err(AuthError::Config(_))
        ));

        for bad in ["", "1app", "my app", "app:", "ap_p"] {
            let result = Auth0Config::builder("client", "tenant.auth0.com")
                .scheme(bad)
                .build();
            assert!(result.is_err(), "scheme {:?} should be rejected", bad);
        }
        for good in ["app", "com.example.app", "demo+auth", "x-1"] {
            let result = Auth0Config::builder("client", "tenant.auth0.com")
                .scheme(good)
                .build();
            assert!(result.is_ok(), "scheme {:?} should be accepted", good);
        }
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("AUTH0_CLIENT_ID", "abc"),
            ("AUTH0_DOMAIN", "tenant.eu.auth0.com"),
            ("AUTH0_ENABLE_CACHED_LOGINS", "1"),
        ]
        .into_iter()
        .collect();

        let config = Auth0Config::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.client_id(), "abc");
        assert_eq!(config.domain(), "tenant.eu.auth0.com");
        assert_eq!(config.scheme(), "app");
        assert!(config.enable_cached_logins());
    }

    #[test]
    fn test_from_lookup_missing_and_invalid() {
        let missing = Auth0Config::from_lookup(|_| None);
        assert!(matches!(missing, Err(AuthError::Config(msg)) if msg.contains("AUTH0_CLIENT_ID")));

        let bad_flag = Auth0Config::from_lookup(|k| match k {
            "AUTH0_ENABLE_CACHED_LOGINS" => Some("maybe".to_string()),
            _ => Some("value".to_string()),
        });
        assert!(matches!(bad_flag, Err(AuthError::Config(_))));
    }

    #[test]
    fn test_debug_hides_storage() {
        struct NullStore;

        #[async_trait::async_trait]
        impl SecureStore for NullStore {
            async fn set_secret(&self, _key: &str, _value: &[u8]) -> bridge_traits::error::Result<()> {
                Ok(())
            }
            async fn get_secret(&self, _key: &str) -> bridge_traits::error::Result<Option<Vec<u8>>> {
                Ok(None)
            }
            async fn delete_secret(&self, _key: &str) -> bridge_traits::error::Result<()> {
                Ok(())
            }
        }

        let config = Auth0Config::builder("client", "tenant.auth0.com")
            .credentials_storage(Arc::new(NullStore))
            .build()
            .unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("SecureStore { ... }"));
    }
}
