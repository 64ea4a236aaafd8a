//! Credentials cache
//!
//! Persists the credential bundle through a [`SecureStore`] and renews it with
//! the refresh token when a caller asks for a fresher bundle than the stored
//! one.
//!
//! ## Security Features
//!
//! - Stored as one JSON entry in a store that encrypts at rest (Keychain,
//!   Keystore, Credential Manager, Secret Service)
//! - Token values are never logged
//! - Undecodable entries are erased rather than retried
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{CredentialsCache, CredentialsRequest, SecureCredentialsManager};
//! # use core_auth::AuthenticationApiClient;
//! # use bridge_traits::storage::SecureStore;
//! # use std::sync::Arc;
//! # async fn example(api: Arc<AuthenticationApiClient>, store: Arc<dyn SecureStore>) -> Result<(), core_auth::CredentialsManagerError> {
//! let manager = SecureCredentialsManager::new(api, store);
//!
//! // Renew if the access token has less than five minutes left
//! let credentials = manager
//!     .await_credentials(CredentialsRequest {
//!         min_ttl: 300,
//!         ..Default::default()
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::authentication::AuthenticationApiClient;
use crate::error::CredentialsManagerError;
use crate::types::Credentials;
use async_trait::async_trait;
use bridge_traits::storage::SecureStore;
use bridge_traits::time::{Clock, SystemClock};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Secure store key holding the serialized bundle.
pub const CREDENTIALS_STORAGE_KEY: &str = "com.auth0.credentials";

type Result<T> = std::result::Result<T, CredentialsManagerError>;

/// Options for [`CredentialsCache::await_credentials`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialsRequest {
    /// Scope the returned credentials must carry. Renews when it differs
    /// from the stored scope.
    pub scope: Option<String>,
    /// Minimum seconds of access token lifetime the caller needs.
    pub min_ttl: u64,
    /// Extra form fields for the renewal request.
    pub parameters: HashMap<String, String>,
    /// Renew even if the stored bundle satisfies the other options.
    pub force_refresh: bool,
}

impl CredentialsRequest {
    /// Unconditional renewal with `scope`, no minimum lifetime and no extra
    /// parameters.
    pub fn forced_refresh(scope: impl Into<String>) -> Self {
        Self {
            scope: Some(scope.into()),
            min_ttl: 0,
            parameters: HashMap::new(),
            force_refresh: true,
        }
    }
}

/// Local store of the last credential bundle.
#[async_trait]
pub trait CredentialsCache: Send + Sync {
    /// Replace the stored bundle.
    async fn save_credentials(&self, credentials: &Credentials) -> Result<()>;

    /// Return the stored bundle, renewing it first when `request` demands.
    async fn await_credentials(&self, request: CredentialsRequest) -> Result<Credentials>;

    /// Whether a bundle is stored that is usable now or can be renewed.
    async fn has_valid_credentials(&self, min_ttl: u64) -> Result<bool>;

    async fn clear_credentials(&self) -> Result<()>;
}

/// [`CredentialsCache`] over a [`SecureStore`], renewing through the
/// Authentication API.
pub struct SecureCredentialsManager {
    api_client: Arc<AuthenticationApiClient>,
    storage: Arc<dyn SecureStore>,
    clock: Arc<dyn Clock>,
    /// Held across load, renew and save so concurrent callers never spend
    /// the same refresh token twice.
    renew_lock: Mutex<()>,
}

impl SecureCredentialsManager {
    pub fn new(api_client: Arc<AuthenticationApiClient>, storage: Arc<dyn SecureStore>) -> Self {
        Self {
            api_client,
            storage,
            clock: Arc::new(SystemClock),
            renew_lock: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    async fn load(&self) -> Result<Option<Credentials>> {
        let Some(bytes) = self.storage.get_secret(CREDENTIALS_STORAGE_KEY).await? else {
            return Ok(None);
        };

        match serde_json::from_slice::<Credentials>(&bytes) {
            Ok(credentials) => Ok(Some(credentials)),
            Err(e) => {
                warn!(error = %e, "Stored credentials are undecodable, clearing them");
                self.storage.delete_secret(CREDENTIALS_STORAGE_KEY).await?;
                Err(CredentialsManagerError::Corrupted(e.to_string()))
            }
        }
    }

    async fn store(&self, credentials: &Credentials) -> Result<()> {
        let bytes = serde_json::to_vec(credentials)
            .map_err(|e| CredentialsManagerError::Serialization(e.to_string()))?;
        self.storage
            .set_secret(CREDENTIALS_STORAGE_KEY, &bytes)
            .await?;
        Ok(())
    }

    async fn renew(
        &self,
        stored: Credentials,
        request: &CredentialsRequest,
    ) -> Result<Credentials> {
        let refresh_token = stored
            .refresh_token
            .clone()
            .ok_or(CredentialsManagerError::NoRefreshToken)?;

        let fresh = self
            .api_client
            .renew(&refresh_token, request.scope.as_deref(), &request.parameters)
            .await?;

        // Refresh token rotation is optional and Auth0 may omit the ID token
        let renewed = Credentials {
            id_token: if fresh.id_token.is_empty() {
                stored.id_token
            } else {
                fresh.id_token
            },
            refresh_token: fresh.refresh_token.or(Some(refresh_token)),
            scope: fresh.scope.or(stored.scope),
            ..fresh
        };

        let now = self.clock.now();
        if request.min_ttl > 0 && renewed.will_expire_within(request.min_ttl, now) {
            return Err(CredentialsManagerError::LargeMinTtl {
                min_ttl: request.min_ttl,
                lifetime: renewed.remaining_lifetime(now),
            });
        }

        self.store(&renewed).await?;
        info!(expires_at = %renewed.expires_at, "Renewed credentials");
        Ok(renewed)
    }
}

#[async_trait]
impl CredentialsCache for SecureCredentialsManager {
    #[instrument(skip(self, credentials))]
    async fn save_credentials(&self, credentials: &Credentials) -> Result<()> {
        let _guard = self.renew_lock.lock().await;
        self.store(credentials).await?;
        debug!("Saved credentials");
        Ok(())
    }

    #[instrument(
        skip(self, request),
        fields(min_ttl = request.min_ttl, force_refresh = request.force_refresh)
    )]
    async fn await_credentials(&self, request: CredentialsRequest) -> Result<Credentials> {
        let _guard = self.renew_lock.lock().await;

        let stored = self
            .load()
            .await?
            .ok_or(CredentialsManagerError::NoCredentials)?;

        let expiring = stored.will_expire_within(request.min_ttl, self.clock.now());
        let scope_changed = request
            .scope
            .as_deref()
            .map_or(false, |scope| !same_scope(scope, stored.scope.as_deref()));

        if !request.force_refresh && !expiring && !scope_changed {
            debug!("Returning stored credentials");
            return Ok(stored);
        }

        debug!(expiring, scope_changed, "Renewing stored credentials");
        self.renew(stored, &request).await
    }

    async fn has_valid_credentials(&self, min_ttl: u64) -> Result<bool> {
        let _guard = self.renew_lock.lock().await;
        let valid = match self.load().await? {
            Some(stored) => {
                stored.refresh_token.is_some()
                    || !stored.will_expire_within(min_ttl, self.clock.now())
            }
            None => false,
        };
        Ok(valid)
    }

    #[instrument(skip(self))]
    async fn clear_credentials(&self) -> Result<()> {
        let _guard = self.renew_lock.lock().await;
        self.storage.delete_secret(CREDENTIALS_STORAGE_KEY).await?;
        debug!("Cleared credentials");
        Ok(())
    }
}

/// Scopes compare as sets of space separated values.
fn same_scope(requested: &str, stored: Option<&str>) -> bool {
    let requested: BTreeSet<&str> = requested.split_whitespace().collect();
    let stored: BTreeSet<&str> = stored.unwrap_or_default().split_whitespace().collect();
    requested == stored
}
