//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.
//!
//! The authentication-related subset is compiled into an immutable [`GateSettings`]
//! value. It is shared through a [`SettingsHandle`], which swaps whole snapshots so
//! a request never sees half of an update.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;

use crate::services::background::BackgroundLimits;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `AUTH_HEADER` (optional): credential header, defaults to `Authorization`
/// - `AUTH_SCHEME` (optional): scheme prefix stripped from the header, defaults to `Bearer`.
///   Set to an empty string to take the header value verbatim.
/// - `ALLOW_ALTERNATE_HEADERS` (optional): accept `X-Goog-Api-Key` / `X-Api-Key`, defaults to true
/// - `LEGACY_QUERY_PREFIX` (optional): path prefix under which `?key=` is accepted, defaults to `/v1beta`
/// - `BYPASS_PREFIXES` (optional): comma separated public path prefixes, defaults to `/health`
/// - `LEGACY_PREFIX_MATCHING` (optional): match bypass prefixes as raw string prefixes, defaults to false
/// - `BACKGROUND_QUEUE_CAPACITY` (optional): queued background jobs before new ones are dropped, defaults to 1024
/// - `BACKGROUND_CONCURRENCY` (optional): background jobs running at once, defaults to 16
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_auth_header")]
    pub auth_header: String,

    #[serde(default = "default_auth_scheme")]
    pub auth_scheme: String,

    #[serde(default = "default_true")]
    pub allow_alternate_headers: bool,

    #[serde(default = "default_legacy_query_prefix")]
    pub legacy_query_prefix: String,

    #[serde(default = "default_bypass_prefixes")]
    pub bypass_prefixes: String,

    #[serde(default)]
    pub legacy_prefix_matching: bool,

    #[serde(default = "default_background_capacity")]
    pub background_queue_capacity: usize,

    #[serde(default = "default_background_concurrency")]
    pub background_concurrency: usize,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_auth_header() -> String {
    "Authorization".to_string()
}

fn default_auth_scheme() -> String {
    "Bearer".to_string()
}

fn default_true() -> bool {
    true
}

fn default_legacy_query_prefix() -> String {
    "/v1beta".to_string()
}

fn default_bypass_prefixes() -> String {
    "/health".to_string()
}

fn default_background_capacity() -> usize {
    BackgroundLimits::default().capacity
}

fn default_background_concurrency() -> usize {
    BackgroundLimits::default().concurrency
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        envy::from_env::<Config>()
    }

    /// Reload configuration, letting values in `.env` override the current environment.
    ///
    /// Used on SIGHUP, where the process environment itself cannot have changed.
    pub fn reload() -> Result<Self, envy::Error> {
        dotenvy::dotenv_override().ok();

        envy::from_env::<Config>()
    }

    /// Build the immutable settings snapshot the authentication gate reads.
    pub fn gate_settings(&self) -> GateSettings {
        let scheme = self.auth_scheme.trim();
        let legacy_prefix = self.legacy_query_prefix.trim();

        GateSettings {
            header_name: self.auth_header.trim().to_string(),
            scheme: (!scheme.is_empty()).then(|| scheme.to_string()),
            allow_alternate_headers: self.allow_alternate_headers,
            legacy_query_prefix: (!legacy_prefix.is_empty()).then(|| legacy_prefix.to_string()),
            bypass_prefixes: self
                .bypass_prefixes
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect(),
            legacy_prefix_matching: self.legacy_prefix_matching,
        }
    }

    pub fn background_limits(&self) -> BackgroundLimits {
        BackgroundLimits {
            capacity: self.background_queue_capacity,
            concurrency: self.background_concurrency,
        }
    }
}

/// Authentication settings, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSettings {
    /// Header carrying the credential
    pub header_name: String,

    /// Scheme stripped from the header value; `None` takes the value verbatim
    pub scheme: Option<String>,

    /// Accept the fixed alternate single-value headers
    pub allow_alternate_headers: bool,

    /// Only under this prefix is the `key` query parameter accepted
    pub legacy_query_prefix: Option<String>,

    /// Public path prefixes that skip authentication entirely
    pub bypass_prefixes: Vec<String>,

    /// Compare bypass prefixes as raw string prefixes instead of on path segments
    pub legacy_prefix_matching: bool,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            header_name: default_auth_header(),
            scheme: Some(default_auth_scheme()),
            allow_alternate_headers: true,
            legacy_query_prefix: Some(default_legacy_query_prefix()),
            bypass_prefixes: vec![default_bypass_prefixes()],
            legacy_prefix_matching: false,
        }
    }
}

/// Shared handle to the current [`GateSettings`] snapshot.
#[derive(Debug, Clone)]
pub struct SettingsHandle {
    current: Arc<RwLock<Arc<GateSettings>>>,
}

impl SettingsHandle {
    pub fn new(settings: GateSettings) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(settings))),
        }
    }

    /// The snapshot in effect right now.
    pub fn load(&self) -> Arc<GateSettings> {
        self.current.read().clone()
    }

    /// Replace the snapshot. Requests already holding the old one keep it.
    pub fn store(&self, settings: GateSettings) {
        *self.current.write() = Arc::new(settings);
    }
}
