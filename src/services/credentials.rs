//! Credential extraction from inbound requests.
//!
//! Pure functions over request parts and the current [`GateSettings`]; nothing
//! here touches storage. First non-empty source wins:
//!
//! 1. the configured header, with the configured scheme stripped
//! 2. the configured header verbatim, when no scheme is configured
//! 3. the alternate single-value headers, in order, when allowed
//! 4. the `key` query parameter, only under the legacy API prefix

use std::fmt;

use axum::http::HeaderMap;

use crate::config::GateSettings;

/// Alternate credential headers, checked in this order.
pub const ALTERNATE_HEADERS: [&str; 2] = ["x-goog-api-key", "x-api-key"];

/// Query parameter accepted under the legacy prefix.
pub const QUERY_PARAM: &str = "key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialLocation {
    Header,
    Query,
}

/// A bearer token lifted from a request.
///
/// `Debug` redacts the value so a credential can never end up in a log line.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    value: String,
    pub location: CredentialLocation,
}

impl Credential {
    fn new(value: &str, location: CredentialLocation) -> Option<Self> {
        let value = value.trim();
        (!value.is_empty()).then(|| Self {
            value: value.to_string(),
            location,
        })
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("value", &"<redacted>")
            .field("location", &self.location)
            .finish()
    }
}

/// Extract the caller's credential, or `None` if the request carries nothing usable.
pub fn extract_credential(
    headers: &HeaderMap,
    path: &str,
    query: Option<&str>,
    settings: &GateSettings,
) -> Option<Credential> {
    from_primary_header(headers, settings)
        .or_else(|| {
            settings
                .allow_alternate_headers
                .then(|| from_alternate_headers(headers))
                .flatten()
        })
        .or_else(|| from_query(path, query, settings))
}

fn from_primary_header(headers: &HeaderMap, settings: &GateSettings) -> Option<Credential> {
    let raw = headers
        .get(settings.header_name.as_str())
        .and_then(|h| h.to_str().ok())?
        .trim();

    match settings.scheme.as_deref() {
        Some(scheme) => strip_scheme(raw, scheme)
            .and_then(|token| Credential::new(token, CredentialLocation::Header)),
        None => Credential::new(raw, CredentialLocation::Header),
    }
}

/// Strip `"<scheme> "` from the front of `raw`, matching the scheme case-insensitively.
fn strip_scheme<'a>(raw: &'a str, scheme: &str) -> Option<&'a str> {
    let head = raw.get(..scheme.len())?;
    if !head.eq_ignore_ascii_case(scheme) {
        return None;
    }
    let rest = &raw[scheme.len()..];
    rest.starts_with(char::is_whitespace).then_some(rest)
}

fn from_alternate_headers(headers: &HeaderMap) -> Option<Credential> {
    ALTERNATE_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|h| h.to_str().ok())
            .and_then(|v| Credential::new(v, CredentialLocation::Header))
    })
}

fn from_query(path: &str, query: Option<&str>, settings: &GateSettings) -> Option<Credential> {
    let prefix = settings.legacy_query_prefix.as_deref()?;
    if !path_has_segment_prefix(path, prefix) {
        return None;
    }

    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(name, _)| name == QUERY_PARAM)
        .and_then(|(_, value)| Credential::new(&value, CredentialLocation::Query))
}

/// True when `path` equals `prefix` or continues it with a `/`.
pub fn path_has_segment_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
