//! Workspace facade crate.
//!
//! Host applications can depend on `auth0-session` alone and get the
//! provider adapter, its collaborators, and the runtime helpers without
//! wiring each workspace crate individually. The `desktop-shims` feature
//! (default) adds the reqwest HTTP client and backs the cached-login store
//! with the OS keychain; without it the host supplies its own `HttpClient`.

pub use bridge_traits::{BrowserRequest, BrowserSession, Clock, HttpClient, SecureStore};
pub use core_auth::*;
pub use core_runtime::events::{AuthEvent, EventBus};
pub use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop::{KeyringSecureStore, ReqwestHttpClient};
