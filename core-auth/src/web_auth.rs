//! Hosted login and logout (Auth0 Universal Login).
//!
//! # Overview
//!
//! [`WebAuthFlow`] is callback based, matching the platform browser APIs it
//! sits on. A flow reports its outcome by calling the supplied
//! [`WebAuthCallback`] once; the `FnOnce` bound makes a second report
//! impossible.
//!
//! [`UniversalLogin`] implements the authorization code flow with PKCE:
//! 1. Generate a code verifier, `state` and `nonce`
//! 2. Open `/authorize` in the host's [`BrowserSession`]
//! 3. Parse the redirect, reject a foreign `state`
//! 4. Exchange the code at `/oauth/token`
//! 5. Check the ID token's `nonce`
//!
//! # Security
//!
//! Codes, verifiers and tokens are never logged.

use crate::authentication::AuthenticationApiClient;
use crate::error::WebAuthError;
use crate::jwt::Jwt;
use crate::pkce::AuthorizationSecrets;
use crate::types::Credentials;
use bridge_traits::error::BridgeError;
use bridge_traits::web::{BrowserRequest, BrowserSession};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Completion callback of a web flow.
pub type WebAuthCallback<T> = Box<dyn FnOnce(Result<T, WebAuthError>) + Send + 'static>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    /// URI scheme of the redirect back to the app.
    pub scheme: String,
    /// Space separated scopes to request.
    pub scope: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutRequest {
    pub scheme: String,
}

/// Launcher for the identity provider's hosted pages.
pub trait WebAuthFlow: Send + Sync {
    /// Must not block. `callback` may be invoked from any thread, before or
    /// after this method returns.
    fn start_login(
        &self,
        ctx: &dyn BrowserSession,
        request: LoginRequest,
        callback: WebAuthCallback<Credentials>,
    );

    fn start_logout(
        &self,
        ctx: &dyn BrowserSession,
        request: LogoutRequest,
        callback: WebAuthCallback<()>,
    );
}

/// Universal Login backed by the Authentication API.
///
/// Login needs a tokio runtime to run the code exchange after the browser
/// returns; without one the callback receives [`WebAuthError::NoRuntime`].
pub struct UniversalLogin {
    api_client: Arc<AuthenticationApiClient>,
}

impl UniversalLogin {
    pub fn new(api_client: Arc<AuthenticationApiClient>) -> Self {
        Self { api_client }
    }

    fn authorize_url(
        &self,
        request: &LoginRequest,
        redirect_uri: &str,
        secrets: &AuthorizationSecrets,
    ) -> Result<String, WebAuthError> {
        let config = self.api_client.config();
        let challenge = secrets.code_challenge();
        let url = Url::parse_with_params(
            &config.authorize_url(),
            &[
                ("client_id", config.client_id()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", request.scope.as_str()),
                ("state", secrets.state()),
                ("nonce", secrets.nonce()),
                ("code_challenge", challenge.as_str()),
                ("code_challenge_method", "S256"),
            ],
        )?;
        Ok(url.into())
    }

    fn logout_url(&self, return_to: &str) -> Result<String, WebAuthError> {
        let config = self.api_client.config();
        let url = Url::parse_with_params(
            &config.logout_url(),
            &[("client_id", config.client_id()), ("returnTo", return_to)],
        )?;
        Ok(url.into())
    }
}

impl WebAuthFlow for UniversalLogin {
    fn start_login(
        &self,
        ctx: &dyn BrowserSession,
        request: LoginRequest,
        callback: WebAuthCallback<Credentials>,
    ) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            callback(Err(WebAuthError::NoRuntime));
            return;
        };

        let redirect_uri = self.api_client.config().callback_url(&request.scheme);
        let secrets = AuthorizationSecrets::generate();
        let url = match self.authorize_url(&request, &redirect_uri, &secrets) {
            Ok(url) => url,
            Err(e) => {
                callback(Err(e));
                return;
            }
        };

        info!(scheme = %request.scheme, "Opening hosted login page");
        let api_client = Arc::clone(&self.api_client);
        let browser_request = BrowserRequest::new(url, redirect_uri.clone());

        ctx.launch(
            browser_request,
            Box::new(move |result| match result {
                Ok(redirect) => {
                    runtime.spawn(async move {
                        let outcome =
                            complete_login(&api_client, &redirect, &redirect_uri, &secrets).await;
                        if let Err(e) = &outcome {
                            warn!(error = %e, "Web login failed");
                        }
                        callback(outcome);
                    });
                }
                Err(e) => callback(Err(browser_error(e))),
            }),
        );
    }

    fn start_logout(
        &self,
        ctx: &dyn BrowserSession,
        request: LogoutRequest,
        callback: WebAuthCallback<()>,
    ) {
        let return_to = self.api_client.config().callback_url(&request.scheme);
        let url = match self.logout_url(&return_to) {
            Ok(url) => url,
            Err(e) => {
                callback(Err(e));
                return;
            }
        };

        info!(scheme = %request.scheme, "Opening hosted logout page");
        ctx.launch(
            BrowserRequest::new(url, return_to),
            Box::new(move |result| {
                callback(result.map(|_| ()).map_err(browser_error));
            }),
        );
    }
}

async fn complete_login(
    api_client: &AuthenticationApiClient,
    redirect: &str,
    redirect_uri: &str,
    secrets: &AuthorizationSecrets,
) -> Result<Credentials, WebAuthError> {
    let code = parse_callback(redirect, secrets.state())?;
    let credentials = api_client
        .exchange_code(&code, secrets.code_verifier(), redirect_uri)
        .await?;

    let id_token = Jwt::decode(&credentials.id_token)?;
    if id_token.nonce() != Some(secrets.nonce()) {
        return Err(WebAuthError::NonceMismatch);
    }

    debug!(subject = ?id_token.subject(), "Web login completed");
    Ok(credentials)
}

/// Extract the authorization code from the redirect URL.
fn parse_callback(redirect: &str, expected_state: &str) -> Result<String, WebAuthError> {
    let url = Url::parse(redirect)
        .map_err(|e| WebAuthError::InvalidCallback(format!("unparseable redirect: {}", e)))?;
    let mut params: HashMap<String, String> = url.query_pairs().into_owned().collect();

    if let Some(code) = params.remove("error") {
        return Err(WebAuthError::Callback {
            code,
            description: params.remove("error_description").unwrap_or_default(),
        });
    }

    let state = params
        .get("state")
        .ok_or_else(|| WebAuthError::InvalidCallback("missing state".to_string()))?;
    if state != expected_state {
        return Err(WebAuthError::StateMismatch);
    }

    params
        .remove("code")
        .ok_or_else(|| WebAuthError::InvalidCallback("missing code".to_string()))
}

fn browser_error(error: BridgeError) -> WebAuthError {
    match error {
        BridgeError::Cancelled => WebAuthError::Cancelled,
        other => WebAuthError::Browser(other),
    }
}
