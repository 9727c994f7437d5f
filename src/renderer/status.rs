use crate::js_templates;
use crate::session::{BrowserSession, MainResponse};

/// Header pair identifying cloud metadata endpoints. Requests that reach one
/// must never have their content rendered back to a caller.
const METADATA_FLAVOR_HEADER: &str = "metadata-flavor";
const METADATA_FLAVOR_VALUE: &str = "Google";

pub fn is_metadata_endpoint(response: &MainResponse) -> bool {
    response.header(METADATA_FLAVOR_HEADER) == Some(METADATA_FLAVOR_VALUE)
}

/// Merges the transport status with the page-declared override.
///
/// 304 is normalized to 200 first: a repeat render may be served from cache
/// and must not be reported as "not modified". The override applies only to
/// a 200 base; a real server error is authoritative and is never masked by
/// page content.
pub fn resolve(base: u16, override_status: Option<u16>) -> u16 {
    let normalized = if base == 304 { 200 } else { base };

    match override_status {
        Some(status) if normalized == 200 => status,
        _ => normalized,
    }
}

/// Parses a status-override meta content value. Anything that is not an
/// integer in the valid HTTP range is treated as absent.
pub fn parse_override(value: &serde_json::Value) -> Option<u16> {
    value
        .as_str()?
        .trim()
        .parse::<u16>()
        .ok()
        .filter(|status| (100..=599).contains(status))
}

/// Reads the page's status-override meta tag. Lookup failures leave the base
/// status unchanged.
pub(crate) async fn lookup_override<S: BrowserSession>(session: &S) -> Option<u16> {
    match session.evaluate(js_templates::STATUS_OVERRIDE_LOOKUP).await {
        Ok(value) => parse_override(&value),
        Err(e) => {
            tracing::debug!("status override lookup failed: {}", e);
            None
        }
    }
}
