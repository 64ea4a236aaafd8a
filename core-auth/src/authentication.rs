//! Auth0 Authentication API client.
//!
//! Covers the two grants this crate needs from `/oauth/token`:
//! - `authorization_code` with a PKCE verifier, at the end of a hosted login
//! - `refresh_token`, when cached credentials are renewed
//!
//! Requests are sent once. Token endpoint calls are not retried because a
//! rotated refresh token cannot be replayed.

use crate::config::Auth0Config;
use crate::error::AuthenticationError;
use crate::types::Credentials;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::time::{Clock, SystemClock};
use bytes::Bytes;
use chrono::Duration;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Applied when the token response omits `expires_in`.
const DEFAULT_EXPIRES_IN: i64 = 86_400;

type Result<T> = std::result::Result<T, AuthenticationError>;

pub struct AuthenticationApiClient {
    config: Auth0Config,
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
}

impl AuthenticationApiClient {
    pub fn new(config: Auth0Config, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
            clock: Arc::new(SystemClock),
        }
    }

    /// Clock used to turn `expires_in` into an absolute expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &Auth0Config {
        &self.config
    }

    /// Exchange an authorization code for credentials.
    ///
    /// The response must contain an ID token.
    #[instrument(skip(self, code, code_verifier), fields(domain = %self.config.domain()))]
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<Credentials> {
        let mut form = BTreeMap::new();
        form.insert("grant_type", "authorization_code");
        form.insert("client_id", self.config.client_id());
        form.insert("code", code);
        form.insert("code_verifier", code_verifier);
        form.insert("redirect_uri", redirect_uri);

        debug!("Exchanging authorization code for credentials");
        let response = self.post_token(&form).await?;

        let id_token = response.id_token.clone().ok_or_else(|| {
            AuthenticationError::InvalidResponse("token response has no id_token".to_string())
        })?;
        self.build_credentials(response, id_token)
    }

    /// Renew credentials with a refresh token.
    ///
    /// `parameters` are sent as extra form fields but cannot override the
    /// grant fields. A response without an ID token yields credentials with an
    /// empty `id_token`; callers holding a previous bundle keep its token.
    #[instrument(skip(self, refresh_token, parameters), fields(domain = %self.config.domain()))]
    pub async fn renew(
        &self,
        refresh_token: &str,
        scope: Option<&str>,
        parameters: &HashMap<String, String>,
    ) -> Result<Credentials> {
        let mut form: BTreeMap<&str, &str> = parameters
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        form.insert("grant_type", "refresh_token");
        form.insert("client_id", self.config.client_id());
        form.insert("refresh_token", refresh_token);
        if let Some(scope) = scope {
            form.insert("scope", scope);
        }

        debug!(extra_parameters = parameters.len(), "Renewing credentials");
        let response = self.post_token(&form).await?;

        let id_token = response.id_token.clone().unwrap_or_default();
        self.build_credentials(response, id_token)
    }

    async fn post_token(&self, form: &BTreeMap<&str, &str>) -> Result<TokenResponse> {
        let body = serde_urlencoded::to_string(form)
            .map_err(|e| AuthenticationError::InvalidRequest(e.to_string()))?;

        let request = HttpRequest::new(HttpMethod::Post, self.config.token_url())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Accept", "application/json")
            .body(Bytes::from(body));

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(AuthenticationError::Network)?;

        if !response.is_success() {
            let error = api_error(&response);
            warn!(status = response.status, error = %error, "Token request rejected");
            return Err(error);
        }

        response
            .json::<TokenResponse>()
            .map_err(|e| AuthenticationError::InvalidResponse(e.to_string()))
    }

    fn build_credentials(&self, response: TokenResponse, id_token: String) -> Result<Credentials> {
        let expires_in = response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);
        debug!(expires_in, "Token request succeeded");

        let expires_at = Duration::try_seconds(expires_in)
            .and_then(|lifetime| self.clock.now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                AuthenticationError::InvalidResponse(format!(
                    "expires_in out of range: {}",
                    expires_in
                ))
            })?;

        Ok(Credentials {
            id_token,
            access_token: response.access_token,
            token_type: response.token_type.unwrap_or_else(|| "Bearer".to_string()),
            refresh_token: response.refresh_token,
            expires_at,
            scope: response.scope,
        })
    }
}

/// Successful `/oauth/token` response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    id_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    token_type: Option<String>,
    scope: Option<String>,
}

/// Auth0 error bodies use `error`/`error_description`; some endpoints send
/// `code`/`description` instead.
#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
    code: Option<String>,
    description: Option<String>,
}

fn api_error(response: &HttpResponse) -> AuthenticationError {
    let body: ErrorResponse = response.json().unwrap_or_default();
    let code = body
        .error
        .or(body.code)
        .unwrap_or_else(|| "unknown_error".to_string());
    let description = body
        .error_description
        .or(body.description)
        .or_else(|| response.text().ok().filter(|t| !t.is_empty()))
        .unwrap_or_else(|| "no description".to_string());

    AuthenticationError::Api {
        status: response.status,
        code,
        description,
    }
}
