//! Integration tests for Auth0Provider

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::storage::SecureStore;
use bridge_traits::time::FixedClock;
use bridge_traits::web::{BrowserCallback, BrowserRequest, BrowserSession};
use bytes::Bytes;
use chrono::{Duration, TimeZone, Utc};
use core_auth::{
    Auth0Config, Auth0Provider, AuthError, AuthProvider, Credentials, CredentialsCache,
    CredentialsManagerError, CredentialsRequest, JwtError, LoginRequest, LogoutRequest,
    WebAuthCallback, WebAuthError, WebAuthFlow, SCOPES,
};
use core_runtime::events::{AuthEvent, EventBus};
use mockall::{mock, predicate, Sequence};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const NOW: i64 = 1_700_000_000;

mock! {
    Cache {}

    #[async_trait]
    impl CredentialsCache for Cache {
        async fn save_credentials(&self, credentials: &Credentials) -> Result<(), CredentialsManagerError>;
        async fn await_credentials(&self, request: CredentialsRequest) -> Result<Credentials, CredentialsManagerError>;
        async fn has_valid_credentials(&self, min_ttl: u64) -> Result<bool, CredentialsManagerError>;
        async fn clear_credentials(&self) -> Result<(), CredentialsManagerError>;
    }
}

/// Web flow answering from another thread with a preset outcome.
#[derive(Default)]
struct FakeWebAuth {
    login_outcome: Mutex<Option<Result<Credentials, WebAuthError>>>,
    logins: Mutex<Vec<LoginRequest>>,
    logouts: Mutex<Vec<LogoutRequest>>,
}

impl FakeWebAuth {
    fn succeeding(credentials: Credentials) -> Self {
        Self {
            login_outcome: Mutex::new(Some(Ok(credentials))),
            ..Default::default()
        }
    }

    fn failing(error: WebAuthError) -> Self {
        Self {
            login_outcome: Mutex::new(Some(Err(error))),
            ..Default::default()
        }
    }
}

impl WebAuthFlow for FakeWebAuth {
    fn start_login(
        &self,
        _ctx: &dyn BrowserSession,
        request: LoginRequest,
        callback: WebAuthCallback<Credentials>,
    ) {
        self.logins.lock().unwrap().push(request);
        let outcome = self
            .login_outcome
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Err(WebAuthError::Cancelled));
        std::thread::spawn(move || callback(outcome));
    }

    fn start_logout(
        &self,
        _ctx: &dyn BrowserSession,
        request: LogoutRequest,
        callback: WebAuthCallback<()>,
    ) {
        self.logouts.lock().unwrap().push(request);
        std::thread::spawn(move || callback(Ok(())));
    }
}

struct UnusedBrowser;

impl BrowserSession for UnusedBrowser {
    fn launch(&self, _request: BrowserRequest, on_complete: BrowserCallback) {
        on_complete(Err(BridgeError::NotAvailable("not used".to_string())));
    }
}

fn id_token(payload: serde_json::Value) -> String {
    format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(payload.to_string())
    )
}

/// Bundle whose ID token expires `id_expires_in` seconds after NOW. The access
/// token always has an hour left.
fn bundle(access_token: &str, id_expires_in: i64) -> Credentials {
    Credentials {
        id_token: id_token(json!({
            "sub": "auth0|user",
            "iat": NOW - 3600,
            "exp": NOW + id_expires_in
        })),
        access_token: access_token.to_string(),
        token_type: "Bearer".to_string(),
        refresh_token: Some("rt".to_string()),
        expires_at: Utc.timestamp_opt(NOW, 0).unwrap() + Duration::seconds(3600),
        scope: Some(SCOPES.to_string()),
    }
}

fn provider(web_auth: Arc<FakeWebAuth>, cache: Option<MockCache>) -> Auth0Provider {
    let cache = cache.map(|c| Arc::new(c) as Arc<dyn CredentialsCache>);
    Auth0Provider::from_parts("app", web_auth, cache)
        .with_clock(Arc::new(FixedClock::at_timestamp(NOW)))
}

#[tokio::test]
async fn test_login_from_cache_without_caching_is_config_error() {
    let provider = provider(Arc::new(FakeWebAuth::default()), None);

    let result = provider.login_from_cache().await;
    assert!(matches!(result, Err(AuthError::CachedLoginsNotEnabled)));
}

#[tokio::test]
async fn test_login_from_cache_disabled_never_touches_storage() {
    #[derive(Default)]
    struct CountingStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SecureStore for CountingStore {
        async fn set_secret(&self, _key: &str, _value: &[u8]) -> BridgeResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn get_secret(&self, _key: &str) -> BridgeResult<Option<Vec<u8>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
        async fn delete_secret(&self, _key: &str) -> BridgeResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    let store = Arc::new(CountingStore::default());
    let config = Auth0Config::builder("client", "tenant.auth0.com")
        .enable_cached_logins(false)
        .credentials_storage(store.clone())
        .build()
        .unwrap();
    let provider = Auth0Provider::new(config, Arc::new(FakeTokenEndpoint::default())).unwrap();

    assert!(matches!(
        provider.login_from_cache().await,
        Err(AuthError::CachedLoginsNotEnabled)
    ));
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_login_from_cache_with_fresh_id_token_returns_first_bundle() {
    let first = bundle("first", 600);
    let mut cache = MockCache::new();
    let returned = first.clone();
    cache
        .expect_await_credentials()
        .with(predicate::eq(CredentialsRequest::default()))
        .times(1)
        .returning(move |_| Ok(returned.clone()));

    let provider = provider(Arc::new(FakeWebAuth::default()), Some(cache));

    let credentials = provider.login_from_cache().await.unwrap();
    assert_eq!(credentials, first);
}

#[tokio::test]
async fn test_login_from_cache_with_expired_id_token_forces_one_refresh() {
    let mut seq = Sequence::new();
    let mut cache = MockCache::new();
    cache
        .expect_await_credentials()
        .with(predicate::eq(CredentialsRequest::default()))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(bundle("stale", -1)));
    cache
        .expect_await_credentials()
        .withf(|request| {
            request.scope.as_deref() == Some("openid profile email offline_access")
                && request.min_ttl == 0
                && request.parameters.is_empty()
                && request.force_refresh
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(bundle("refreshed", 86_400)));

    let provider = provider(Arc::new(FakeWebAuth::default()), Some(cache));

    let credentials = provider.login_from_cache().await.unwrap();
    assert_eq!(credentials.access_token, "refreshed");
}

#[tokio::test]
async fn test_id_token_expiring_exactly_now_is_not_refreshed() {
    let mut cache = MockCache::new();
    cache
        .expect_await_credentials()
        .times(1)
        .returning(|_| Ok(bundle("edge", 0)));

    let provider = provider(Arc::new(FakeWebAuth::default()), Some(cache));
    assert_eq!(
        provider.login_from_cache().await.unwrap().access_token,
        "edge"
    );
}

#[tokio::test]
async fn test_login_from_cache_propagates_cache_errors() {
    let mut cache = MockCache::new();
    cache
        .expect_await_credentials()
        .times(1)
        .returning(|_| Err(CredentialsManagerError::NoCredentials));

    let provider = provider(Arc::new(FakeWebAuth::default()), Some(cache));

    assert!(matches!(
        provider.login_from_cache().await,
        Err(AuthError::CredentialsManager(CredentialsManagerError::NoCredentials))
    ));
}

#[tokio::test]
async fn test_forced_refresh_failure_is_returned() {
    let mut seq = Sequence::new();
    let mut cache = MockCache::new();
    cache
        .expect_await_credentials()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(bundle("stale", -60)));
    cache
        .expect_await_credentials()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(CredentialsManagerError::NoRefreshToken));

    let provider = provider(Arc::new(FakeWebAuth::default()), Some(cache));

    assert!(matches!(
        provider.login_from_cache().await,
        Err(AuthError::CredentialsManager(CredentialsManagerError::NoRefreshToken))
    ));
}

#[tokio::test]
async fn test_login_from_cache_with_malformed_id_token() {
    let mut cache = MockCache::new();
    cache.expect_await_credentials().times(1).returning(|_| {
        let mut credentials = bundle("at", 600);
        credentials.id_token = "not-a-jwt".to_string();
        Ok(credentials)
    });

    let provider = provider(Arc::new(FakeWebAuth::default()), Some(cache));

    assert!(matches!(
        provider.login_from_cache().await,
        Err(AuthError::InvalidIdToken(JwtError::SegmentCount(1)))
    ));
}

#[tokio::test]
async fn test_login_saves_before_returning() {
    let credentials = bundle("at", 600);
    let web_auth = Arc::new(FakeWebAuth::succeeding(credentials.clone()));
    let mut cache = MockCache::new();
    let expected = credentials.clone();
    cache
        .expect_save_credentials()
        .withf(move |saved| *saved == expected)
        .times(1)
        .returning(|_| Ok(()));

    let provider = provider(web_auth.clone(), Some(cache));

    let result = provider.login(&UnusedBrowser).await.unwrap();
    assert_eq!(result, credentials);

    let logins = web_auth.logins.lock().unwrap();
    assert_eq!(
        *logins,
        vec![LoginRequest {
            scheme: "app".to_string(),
            scope: "openid profile email offline_access".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_login_without_cache() {
    let credentials = bundle("at", 600);
    let provider = provider(Arc::new(FakeWebAuth::succeeding(credentials.clone())), None);

    assert_eq!(provider.login(&UnusedBrowser).await.unwrap(), credentials);
}

#[tokio::test]
async fn test_login_cancelled_does_not_save() {
    let mut cache = MockCache::new();
    cache.expect_save_credentials().times(0);

    let provider = provider(
        Arc::new(FakeWebAuth::failing(WebAuthError::Cancelled)),
        Some(cache),
    );

    assert!(matches!(
        provider.login(&UnusedBrowser).await,
        Err(AuthError::WebAuth(WebAuthError::Cancelled))
    ));
}

#[tokio::test]
async fn test_login_keeps_provider_error_detail() {
    let provider = provider(
        Arc::new(FakeWebAuth::failing(WebAuthError::Callback {
            code: "access_denied".to_string(),
            description: "User did not authorize the request".to_string(),
        })),
        None,
    );

    match provider.login(&UnusedBrowser).await {
        Err(AuthError::WebAuth(WebAuthError::Callback { code, .. })) => {
            assert_eq!(code, "access_denied")
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_login_save_failure_is_returned() {
    let mut cache = MockCache::new();
    cache.expect_save_credentials().times(1).returning(|_| {
        Err(CredentialsManagerError::Storage(BridgeError::NotAvailable(
            "keychain locked".to_string(),
        )))
    });

    let provider = provider(
        Arc::new(FakeWebAuth::succeeding(bundle("at", 600))),
        Some(cache),
    );

    assert!(matches!(
        provider.login(&UnusedBrowser).await,
        Err(AuthError::CredentialsManager(CredentialsManagerError::Storage(_)))
    ));
}

#[tokio::test]
async fn test_logout_does_not_touch_cache() {
    // Any cache call would fail the mock
    let cache = MockCache::new();
    let web_auth = Arc::new(FakeWebAuth::default());
    let provider = provider(web_auth.clone(), Some(cache));

    provider.logout(&UnusedBrowser).await.unwrap();

    assert_eq!(
        *web_auth.logouts.lock().unwrap(),
        vec![LogoutRequest {
            scheme: "app".to_string()
        }]
    );
}

#[tokio::test]
async fn test_extract_id_token() {
    let provider = provider(Arc::new(FakeWebAuth::default()), None);
    let credentials = bundle("at", 600);

    assert_eq!(provider.extract_id_token(&credentials), credentials.id_token);
}

#[tokio::test]
async fn test_events_for_login_and_refresh() {
    let mut seq = Sequence::new();
    let mut cache = MockCache::new();
    cache.expect_save_credentials().returning(|_| Ok(()));
    cache
        .expect_await_credentials()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(bundle("stale", -1)));
    cache
        .expect_await_credentials()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(bundle("refreshed", 600)));

    let bus = EventBus::new(16);
    let mut events = bus.subscribe();
    let provider = provider(
        Arc::new(FakeWebAuth::succeeding(bundle("at", 600))),
        Some(cache),
    )
    .with_event_bus(bus);

    provider.login(&UnusedBrowser).await.unwrap();
    provider.login_from_cache().await.unwrap();
    provider.logout(&UnusedBrowser).await.unwrap();

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }

    let signed_in = AuthEvent::SignedIn {
        subject: Some("auth0|user".to_string()),
    };
    assert_eq!(
        received,
        vec![
            AuthEvent::SigningIn {
                scheme: "app".to_string()
            },
            signed_in.clone(),
            AuthEvent::TokenRefreshed {
                expires_at: NOW + 3600
            },
            signed_in,
            AuthEvent::SignedOut,
        ]
    );
}

/// Token endpoint minting an ID token with the nonce the browser saw.
#[derive(Default)]
struct FakeTokenEndpoint {
    nonce: Arc<Mutex<String>>,
    calls: AtomicUsize,
}

#[async_trait]
impl HttpClient for FakeTokenEndpoint {
    async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let nonce = self.nonce.lock().unwrap().clone();
        let body = json!({
            "access_token": "at",
            "id_token": id_token(json!({
                "sub": "auth0|user",
                "nonce": nonce,
                "exp": Utc::now().timestamp() + 3600
            })),
            "refresh_token": "rt",
            "expires_in": 3600,
            "scope": SCOPES
        });
        Ok(HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        })
    }
}

#[derive(Default)]
struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl SecureStore for MemoryStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Browser that completes the hosted login immediately.
struct RedirectingBrowser {
    nonce: Arc<Mutex<String>>,
}

impl BrowserSession for RedirectingBrowser {
    fn launch(&self, request: BrowserRequest, on_complete: BrowserCallback) {
        let url = url::Url::parse(&request.url).unwrap();
        let param = |name: &str| {
            url.query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
                .unwrap_or_default()
        };
        *self.nonce.lock().unwrap() = param("nonce");
        on_complete(Ok(format!(
            "{}?code=abc&state={}",
            request.callback_url,
            param("state")
        )));
    }
}

#[tokio::test]
async fn test_end_to_end_login_then_silent_login() {
    let nonce = Arc::new(Mutex::new(String::new()));
    let http = Arc::new(FakeTokenEndpoint {
        nonce: Arc::clone(&nonce),
        calls: AtomicUsize::new(0),
    });
    let store = Arc::new(MemoryStore::default());
    let config = Auth0Config::builder("client", "tenant.auth0.com")
        .enable_cached_logins(true)
        .credentials_storage(store.clone())
        .build()
        .unwrap();
    let provider = Auth0Provider::new(config, http.clone()).unwrap();
    let browser = RedirectingBrowser { nonce };

    let logged_in = provider.login(&browser).await.unwrap();
    assert!(!store.entries.lock().unwrap().is_empty());

    let cached = provider.login_from_cache().await.unwrap();
    assert_eq!(cached, logged_in);
    // One code exchange, no renewal
    assert_eq!(http.calls.load(Ordering::SeqCst), 1);

    provider.logout(&browser).await.unwrap();
    assert!(!store.entries.lock().unwrap().is_empty());
}
