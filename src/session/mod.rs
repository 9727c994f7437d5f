pub mod cdp;

use crate::{RenderError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

pub use cdp::{CdpSession, CdpSessionFactory};

/// The first HTTP response observed on a session's primary navigation.
#[derive(Debug, Clone)]
pub struct MainResponse {
    pub status: u16,
    headers: HashMap<String, String>,
}

impl MainResponse {
    pub fn new(status: u16, headers: HashMap<String, String>) -> Self {
        let headers = headers
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        Self { status, headers }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Discriminated navigation result. A failed navigation still carries the
/// best-known response so status resolution can consult it uniformly.
#[derive(Debug)]
pub enum NavigationOutcome {
    Loaded(Option<MainResponse>),
    Failed {
        error: RenderError,
        response: Option<MainResponse>,
    },
}

impl NavigationOutcome {
    pub fn response(&self) -> Option<&MainResponse> {
        match self {
            Self::Loaded(response) => response.as_ref(),
            Self::Failed { response, .. } => response.as_ref(),
        }
    }

    pub fn into_response(self) -> Option<MainResponse> {
        match self {
            Self::Loaded(response) => response,
            Self::Failed { response, .. } => response,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// Document load only; pages that initialize asynchronously keep running.
    Load,
    /// Document load plus a settle window with no in-flight requests.
    NetworkIdle,
}

#[derive(Debug, Clone, Copy)]
pub struct Clip {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Raster capture options. The output format is always JPEG; only the
/// fields named here are overridable.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub quality: u8,
    pub full_page: bool,
    pub clip: Option<Clip>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            quality: 80,
            full_page: false,
            clip: None,
        }
    }
}

/// One isolated browsing context. Exactly one render request uses a session
/// at a time; every operation is sequential and `close` must be called on
/// every exit path. No operation may be issued after `close`.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn set_viewport(&self, width: u32, height: u32, is_mobile: bool) -> Result<()>;

    async fn set_user_agent(&self, user_agent: &str) -> Result<()>;

    /// Registers a script evaluated before any page script on every new
    /// document in this session.
    async fn evaluate_on_new_document(&self, script: &str) -> Result<()>;

    /// Drives the session to `url` and waits per `wait_until`, bounded by
    /// `timeout`. The outcome always carries the first response observed
    /// since the session was created, even when navigation itself failed.
    async fn navigate(&self, url: &str, timeout: Duration, wait_until: WaitUntil)
    -> NavigationOutcome;

    async fn evaluate(&self, expression: &str) -> Result<serde_json::Value>;

    async fn capture_image(&self, options: &CaptureOptions) -> Result<Vec<u8>>;

    /// Polls `predicate` (a JS expression) until it evaluates to `true`.
    async fn wait_for_condition(&self, predicate: &str, timeout: Duration) -> Result<()>;

    /// Releases the underlying browsing context. Idempotent.
    async fn close(&self);
}

#[async_trait]
pub trait SessionFactory: Send + Sync {
    type Session: BrowserSession;

    /// Supplies a fresh isolated session, or `SessionUnavailable` when the
    /// browser has no capacity.
    async fn new_session(&self) -> Result<Self::Session>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_response_header_lookup_is_case_insensitive() {
        let mut headers = HashMap::new();
        headers.insert("Metadata-Flavor".to_string(), "Google".to_string());
        let response = MainResponse::new(200, headers);

        assert_eq!(response.header("metadata-flavor"), Some("Google"));
        assert_eq!(response.header("METADATA-FLAVOR"), Some("Google"));
        assert_eq!(response.header("content-type"), None);
    }

    #[test]
    fn test_navigation_outcome_response_access() {
        let response = MainResponse::new(200, HashMap::new());
        let outcome = NavigationOutcome::Failed {
            error: RenderError::NavigationTimeout(10),
            response: Some(response),
        };

        assert_eq!(outcome.response().map(|r| r.status), Some(200));
        assert_eq!(outcome.into_response().map(|r| r.status), Some(200));
    }

    #[test]
    fn test_capture_options_defaults() {
        let options = CaptureOptions::default();
        assert_eq!(options.quality, 80);
        assert!(!options.full_page);
        assert!(options.clip.is_none());
    }
}
