//! Browser / Web View Abstraction
//!
//! Hosted login and logout pages are presented by the host: a
//! Custom Tab or WebView on Android, `ASWebAuthenticationSession` on iOS, the
//! system browser plus a URL-scheme handler on desktop. The core only needs to
//! hand over a URL and learn which callback URL the page redirected to.
//!
//! The contract is callback based because that is how every platform API
//! reports completion. The completion callback is `FnOnce`, so an
//! implementation can resolve a launch at most once.

use crate::error::Result;

/// A page the host should present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserRequest {
    /// Fully built URL of the hosted page.
    pub url: String,
    /// The session is complete when the page navigates to a URL starting
    /// with this prefix.
    pub callback_url: String,
}

impl BrowserRequest {
    pub fn new(url: impl Into<String>, callback_url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            callback_url: callback_url.into(),
        }
    }
}

/// Completion callback for a browser session.
///
/// Receives the full callback URL (including query string) on success,
/// [`BridgeError::Cancelled`](crate::BridgeError::Cancelled) if the user
/// dismissed the page, or any other `BridgeError` if the page could not be
/// shown.
pub type BrowserCallback = Box<dyn FnOnce(Result<String>) + Send + 'static>;

/// Host-provided browser or web view launcher.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::web::{BrowserCallback, BrowserRequest, BrowserSession};
///
/// struct CustomTabs { /* JNI handles */ }
///
/// impl BrowserSession for CustomTabs {
///     fn launch(&self, request: BrowserRequest, on_complete: BrowserCallback) {
///         // Open request.url, register a handler for request.callback_url,
///         // then call on_complete(Ok(redirect_url)) from that handler.
///     }
/// }
/// ```
pub trait BrowserSession: Send + Sync {
    /// Present `request.url` and invoke `on_complete` exactly once when the
    /// session finishes. Must not block; completion may be reported from any
    /// thread.
    fn launch(&self, request: BrowserRequest, on_complete: BrowserCallback);
}
