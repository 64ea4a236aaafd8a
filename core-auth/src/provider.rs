//! # Auth0 Provider
//!
//! Implements [`AuthProvider`] over Auth0: hosted login and logout through a
//! [`WebAuthFlow`], and silent login from an optional [`CredentialsCache`].
//!
//! ## ID token freshness
//!
//! The cache decides staleness from the access token's expiry alone. The ID
//! token has its own `exp` and is what the application backend checks, so
//! after a cache hit the ID token is checked with zero leeway and, if it has
//! expired, one forced refresh is requested and its result returned instead.
//!
//! ## Usage
//!
//! ```no_run
//! use core_auth::{Auth0Config, Auth0Provider, AuthProvider};
//! # use bridge_traits::http::HttpClient;
//! # use bridge_traits::web::BrowserSession;
//! # use std::sync::Arc;
//! # async fn example(http: Arc<dyn HttpClient>, browser: &dyn BrowserSession) -> core_auth::Result<()> {
//! let config = Auth0Config::builder("client-id", "tenant.us.auth0.com")
//!     .enable_cached_logins(true)
//!     .build()?;
//! let provider = Auth0Provider::new(config, http)?;
//!
//! let credentials = match provider.login_from_cache().await {
//!     Ok(credentials) => credentials,
//!     Err(_) => provider.login(browser).await?,
//! };
//! let id_token = provider.extract_id_token(&credentials);
//! # Ok(())
//! # }
//! ```

use crate::authentication::AuthenticationApiClient;
use crate::config::Auth0Config;
use crate::credentials_manager::{CredentialsCache, CredentialsRequest, SecureCredentialsManager};
use crate::error::{AuthError, Result, WebAuthError};
use crate::jwt::Jwt;
use crate::types::Credentials;
use crate::web_auth::{LoginRequest, LogoutRequest, UniversalLogin, WebAuthCallback, WebAuthFlow};
use async_trait::async_trait;
use bridge_traits::http::HttpClient;
use bridge_traits::storage::SecureStore;
use bridge_traits::time::{Clock, SystemClock};
use bridge_traits::web::BrowserSession;
use core_runtime::events::{AuthEvent, EventBus};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

/// Scopes requested by every login: profile claims plus a refresh token.
pub const SCOPES: &str = "openid profile email offline_access";

/// Authentication provider contract consumed by the host client library.
///
/// `T` is the provider's credential bundle.
#[async_trait]
pub trait AuthProvider<T>: Send + Sync {
    /// Interactive login. Suspends until the hosted flow completes.
    async fn login(&self, ctx: &dyn BrowserSession) -> Result<T>;

    /// Silent login from previously stored credentials.
    async fn login_from_cache(&self) -> Result<T>;

    async fn logout(&self, ctx: &dyn BrowserSession) -> Result<()>;

    /// The ID token shared with the application backend.
    fn extract_id_token(&self, auth_result: &T) -> String;
}

pub struct Auth0Provider {
    scheme: String,
    web_auth: Arc<dyn WebAuthFlow>,
    credentials_cache: Option<Arc<dyn CredentialsCache>>,
    clock: Arc<dyn Clock>,
    event_bus: Option<EventBus>,
}

impl Auth0Provider {
    /// Build a provider using Universal Login and, when cached logins are
    /// enabled, a [`SecureCredentialsManager`].
    ///
    /// # Errors
    ///
    /// [`AuthError::Config`] if cached logins are enabled without a
    /// credentials storage and no platform default is compiled in.
    pub fn new(config: Auth0Config, http_client: Arc<dyn HttpClient>) -> Result<Self> {
        let api_client = Arc::new(AuthenticationApiClient::new(config.clone(), http_client));
        let web_auth: Arc<dyn WebAuthFlow> = Arc::new(UniversalLogin::new(Arc::clone(&api_client)));

        let credentials_cache = if config.enable_cached_logins() {
            let storage = match config.credentials_storage() {
                Some(storage) => storage,
                None => default_storage(&config)?,
            };
            let cache: Arc<dyn CredentialsCache> =
                Arc::new(SecureCredentialsManager::new(api_client, storage));
            Some(cache)
        } else {
            None
        };

        info!(
            domain = %config.domain(),
            scheme = %config.scheme(),
            cached_logins = credentials_cache.is_some(),
            "Initialized Auth0 provider"
        );

        Ok(Self::from_parts(config.scheme(), web_auth, credentials_cache))
    }

    /// Assemble a provider from its collaborators. `credentials_cache` is
    /// `None` when cached logins are disabled.
    pub fn from_parts(
        scheme: impl Into<String>,
        web_auth: Arc<dyn WebAuthFlow>,
        credentials_cache: Option<Arc<dyn CredentialsCache>>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            web_auth,
            credentials_cache,
            clock: Arc::new(SystemClock),
            event_bus: None,
        }
    }

    /// Clock used for the ID token expiry check.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The credentials cache, if cached logins are enabled.
    ///
    /// Logout leaves stored credentials in place; hosts that want a full
    /// sign-out call `clear_credentials` on the cache.
    pub fn credentials_cache(&self) -> Option<&Arc<dyn CredentialsCache>> {
        self.credentials_cache.as_ref()
    }

    async fn run_login(&self, ctx: &dyn BrowserSession) -> Result<Credentials> {
        let request = LoginRequest {
            scheme: self.scheme.clone(),
            scope: SCOPES.to_string(),
        };
        let credentials =
            await_callback(|callback| self.web_auth.start_login(ctx, request, callback)).await?;

        if let Some(cache) = &self.credentials_cache {
            cache.save_credentials(&credentials).await?;
            debug!("Saved credentials to cache");
        }

        Ok(credentials)
    }

    async fn run_login_from_cache(&self) -> Result<Credentials> {
        let cache = self
            .credentials_cache
            .as_ref()
            .ok_or(AuthError::CachedLoginsNotEnabled)?;

        let credentials = cache
            .await_credentials(CredentialsRequest::default())
            .await?;

        let id_token = Jwt::decode(&credentials.id_token)?;
        if !id_token.is_expired(0, self.clock.now()) {
            return Ok(credentials);
        }

        info!("Cached ID token has expired, forcing a refresh");
        let refreshed = cache
            .await_credentials(CredentialsRequest::forced_refresh(SCOPES))
            .await?;
        self.emit(AuthEvent::TokenRefreshed {
            expires_at: refreshed.expires_at.timestamp(),
        });
        Ok(refreshed)
    }

    fn emit(&self, event: AuthEvent) {
        if let Some(bus) = &self.event_bus {
            // No subscribers is not an error
            let _ = bus.emit(event);
        }
    }

    fn report<T>(&self, result: &Result<T>, on_success: impl FnOnce(&T) -> AuthEvent) {
        let event = match result {
            Ok(value) => on_success(value),
            Err(e) => {
                warn!(error = %e, "Auth0 operation failed");
                AuthEvent::AuthError {
                    message: e.to_string(),
                    recoverable: e.is_recoverable(),
                }
            }
        };
        self.emit(event);
    }
}

#[async_trait]
impl AuthProvider<Credentials> for Auth0Provider {
    #[instrument(skip(self, ctx), fields(scheme = %self.scheme))]
    async fn login(&self, ctx: &dyn BrowserSession) -> Result<Credentials> {
        self.emit(AuthEvent::SigningIn {
            scheme: self.scheme.clone(),
        });
        let result = self.run_login(ctx).await;
        self.report(&result, signed_in);
        result
    }

    #[instrument(skip(self))]
    async fn login_from_cache(&self) -> Result<Credentials> {
        let result = self.run_login_from_cache().await;
        self.report(&result, signed_in);
        result
    }

    #[instrument(skip(self, ctx), fields(scheme = %self.scheme))]
    async fn logout(&self, ctx: &dyn BrowserSession) -> Result<()> {
        let request = LogoutRequest {
            scheme: self.scheme.clone(),
        };
        let result = await_callback(|callback| self.web_auth.start_logout(ctx, request, callback))
            .await
            .map_err(AuthError::from);
        self.report(&result, |_| AuthEvent::SignedOut);
        result
    }

    fn extract_id_token(&self, auth_result: &Credentials) -> String {
        auth_result.id_token.clone()
    }
}

fn signed_in(credentials: &Credentials) -> AuthEvent {
    AuthEvent::SignedIn {
        subject: Jwt::decode(&credentials.id_token)
            .ok()
            .and_then(|jwt| jwt.subject().map(str::to_string)),
    }
}

/// Suspend until a callback-style flow reports. A flow that drops its
/// callback without calling it resolves to [`WebAuthError::Abandoned`].
async fn await_callback<T, F>(start: F) -> std::result::Result<T, WebAuthError>
where
    T: Send + 'static,
    F: FnOnce(WebAuthCallback<T>),
{
    let (tx, rx) = oneshot::channel();
    start(Box::new(move |result: std::result::Result<T, WebAuthError>| {
        // The receiver is gone only if the caller stopped waiting
        let _ = tx.send(result);
    }));
    rx.await.unwrap_or(Err(WebAuthError::Abandoned))
}

#[cfg(feature = "desktop-shims")]
fn default_storage(config: &Auth0Config) -> Result<Arc<dyn SecureStore>> {
    let service = format!("auth0-session.{}", config.client_id());
    Ok(Arc::new(bridge_desktop::KeyringSecureStore::with_service_name(service)))
}

#[cfg(not(feature = "desktop-shims"))]
fn default_storage(_config: &Auth0Config) -> Result<Arc<dyn SecureStore>> {
    Err(AuthError::Config(
        "cached logins are enabled but no credentials storage was configured".to_string(),
    ))
}
