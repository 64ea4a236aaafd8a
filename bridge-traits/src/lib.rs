//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the authentication core and
//! platform-specific implementations. Each trait represents a capability the
//! core requires but that must be implemented differently per platform
//! (desktop, iOS, Android, web).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations for the identity provider's APIs
//!
//! ### Security & Storage
//! - [`SecureStore`](storage::SecureStore) - Encrypted credential persistence (Keychain/Keystore)
//!
//! ### Platform Integration
//! - [`BrowserSession`](web::BrowserSession) - Hosted login/logout pages in a browser or web view
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ `SecureStore`, `HttpClient` |
//! | iOS      | host app            | 📋 Planned |
//! | Android  | host app            | 📋 Planned |
//!
//! `BrowserSession` is always supplied by the host: only the host knows how
//! to present a web view and intercept its own callback scheme.
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert platform-specific errors to `BridgeError`,
//! and report a user dismissing a browser as [`BridgeError::Cancelled`].
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent usage
//! across async tasks.

pub mod error;
pub mod http;
pub mod storage;
pub mod time;
pub mod web;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use storage::SecureStore;
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
pub use web::{BrowserCallback, BrowserRequest, BrowserSession};
