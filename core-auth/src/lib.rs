//! # Authentication Module
//!
//! Auth0 provider adapter: hosted login and logout, an optional encrypted
//! credentials cache for silent re-login, and ID token extraction for sharing
//! the session with an application backend.
//!
//! ## Overview
//!
//! - [`Auth0Provider`] implements [`AuthProvider`], the contract the host
//!   client library consumes
//! - [`UniversalLogin`] runs the authorization code flow with PKCE in a
//!   host-provided browser session
//! - [`SecureCredentialsManager`] stores credentials in a `SecureStore` and
//!   renews them with the refresh token
//! - [`Jwt`] reads ID token claims so a stale ID token can force a refresh
//!
//! ## Features
//!
//! - `desktop-shims`: default the credentials storage to the OS keychain

pub mod authentication;
pub mod config;
pub mod credentials_manager;
pub mod error;
pub mod jwt;
mod pkce;
pub mod provider;
pub mod types;
pub mod web_auth;

pub use authentication::AuthenticationApiClient;
pub use config::{Auth0Config, Auth0ConfigBuilder, DEFAULT_SCHEME};
pub use credentials_manager::{
    CredentialsCache, CredentialsRequest, SecureCredentialsManager, CREDENTIALS_STORAGE_KEY,
};
pub use error::{
    AuthError, AuthenticationError, CredentialsManagerError, JwtError, Result, WebAuthError,
};
pub use jwt::Jwt;
pub use provider::{Auth0Provider, AuthProvider, SCOPES};
pub use types::{Credentials, UserProfile};
pub use web_auth::{LoginRequest, LogoutRequest, UniversalLogin, WebAuthCallback, WebAuthFlow};
