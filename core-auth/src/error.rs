use bridge_traits::BridgeError;
use thiserror::Error;

/// Failure to parse an ID token.
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("The token was expected to have 3 parts, but got {0}")]
    SegmentCount(usize),

    #[error("Received bytes didn't correspond to a valid Base64 encoded string in the {segment}")]
    InvalidBase64 {
        segment: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("The token's {segment} is not a valid JSON object")]
    InvalidJson {
        segment: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure talking to the Authentication API (`/oauth/token`).
#[derive(Error, Debug)]
pub enum AuthenticationError {
    /// The server answered with a non-2xx status.
    #[error("Authentication API returned {status} ({code}): {description}")]
    Api {
        status: u16,
        code: String,
        description: String,
    },

    #[error("Network request failed: {0}")]
    Network(#[source] BridgeError),

    #[error("Unexpected token endpoint response: {0}")]
    InvalidResponse(String),

    #[error("Failed to encode token request: {0}")]
    InvalidRequest(String),
}

impl AuthenticationError {
    pub fn is_network_error(&self) -> bool {
        matches!(self, AuthenticationError::Network(_))
    }

    /// The refresh token was revoked or has expired. A new login is required.
    pub fn is_invalid_grant(&self) -> bool {
        matches!(self, AuthenticationError::Api { code, .. } if code == "invalid_grant")
    }
}

/// Failure of a hosted login or logout flow.
#[derive(Error, Debug)]
pub enum WebAuthError {
    #[error("User cancelled the web authentication")]
    Cancelled,

    #[error("Browser session failed: {0}")]
    Browser(#[source] BridgeError),

    /// Error reported by the identity provider in the redirect.
    #[error("Authorization server returned {code}: {description}")]
    Callback { code: String, description: String },

    #[error("Failed to build hosted page URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid callback URL: {0}")]
    InvalidCallback(String),

    #[error("The received state does not match the one sent in the authorize request")]
    StateMismatch,

    #[error("The ID token nonce does not match the one sent in the authorize request")]
    NonceMismatch,

    #[error("Code exchange failed: {0}")]
    Authentication(#[from] AuthenticationError),

    #[error("Invalid ID token: {0}")]
    InvalidIdToken(#[from] JwtError),

    #[error("Web authentication requires a running tokio runtime")]
    NoRuntime,

    #[error("Web authentication ended without reporting a result")]
    Abandoned,
}

/// Failure of the credentials cache.
#[derive(Error, Debug)]
pub enum CredentialsManagerError {
    #[error("No credentials were previously saved")]
    NoCredentials,

    /// Stored data could not be decoded. The entry has been cleared.
    #[error("Stored credentials are corrupted: {0}")]
    Corrupted(String),

    #[error("Credentials need to be renewed but no refresh token is available")]
    NoRefreshToken,

    #[error("Failed to renew credentials: {0}")]
    RenewFailed(#[from] AuthenticationError),

    #[error(
        "The lifetime of the renewed access token ({lifetime}s) is less than the requested minimum ({min_ttl}s)"
    )]
    LargeMinTtl { min_ttl: u64, lifetime: i64 },

    #[error("Failed to serialize credentials: {0}")]
    Serialization(String),

    #[error("Credentials storage failed: {0}")]
    Storage(#[from] BridgeError),
}

#[derive(Error, Debug)]
pub enum AuthError {
    /// `login_from_cache` was called on a provider built without caching.
    #[error("Cached logins are not enabled; set enable_cached_logins when building the config")]
    CachedLoginsNotEnabled,

    #[error(transparent)]
    WebAuth(#[from] WebAuthError),

    #[error(transparent)]
    CredentialsManager(#[from] CredentialsManagerError),

    #[error("Invalid ID token: {0}")]
    InvalidIdToken(#[from] JwtError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl AuthError {
    /// Whether the same call can succeed later without code or config changes.
    pub fn is_recoverable(&self) -> bool {
        match self {
            AuthError::CachedLoginsNotEnabled | AuthError::Config(_) => false,
            AuthError::WebAuth(WebAuthError::Cancelled) => true,
            AuthError::WebAuth(WebAuthError::Authentication(e))
            | AuthError::CredentialsManager(CredentialsManagerError::RenewFailed(e)) => {
                e.is_network_error()
            }
            AuthError::WebAuth(WebAuthError::Browser(_)) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
