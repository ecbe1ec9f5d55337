//! Service endpoints, resolved from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `FIREBASE_AUTH_EMULATOR_HOST` - `host:port` of a local Auth emulator
//! - `FIRESTORE_EMULATOR_HOST` - `host:port` of a local Firestore emulator
//!
//! When an emulator variable is set, the corresponding client talks plain
//! HTTP to the emulator and authenticates with the emulator's fixed token
//! instead of a service account token.

use thiserror::Error;
use url::Url;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com";
const FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";
const FIREBASE_RULES_URL: &str = "https://firebaserules.googleapis.com/v1";

/// Environment variable naming the Auth emulator.
pub const AUTH_EMULATOR_ENV: &str = "FIREBASE_AUTH_EMULATOR_HOST";
/// Environment variable naming the Firestore emulator.
pub const FIRESTORE_EMULATOR_ENV: &str = "FIRESTORE_EMULATOR_HOST";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(&'static str, String),
}

/// Base URL of one remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    /// Base URL without a trailing slash.
    pub base_url: String,
    /// Whether this endpoint is a local emulator.
    pub emulated: bool,
}

impl ServiceEndpoint {
    fn production(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_owned(),
            emulated: false,
        }
    }

    fn emulator(var: &'static str, host: &str, path: &str) -> Result<Self, ConfigError> {
        let host = host.trim().trim_end_matches('/');
        let url = Url::parse(&format!("http://{host}{path}"))
            .map_err(|e| ConfigError::InvalidEnvVar(var, e.to_string()))?;
        if url.host_str().is_none_or(str::is_empty) {
            return Err(ConfigError::InvalidEnvVar(var, "missing host".to_owned()));
        }

        Ok(Self {
            base_url: url.as_str().trim_end_matches('/').to_owned(),
            emulated: true,
        })
    }
}

/// Endpoints for every service the provisioner talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Identity Toolkit (Firebase Authentication admin API).
    pub identity: ServiceEndpoint,
    /// Firestore REST API.
    pub firestore: ServiceEndpoint,
    /// Firebase security rules API. Has no emulator.
    pub rules: ServiceEndpoint,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            identity: ServiceEndpoint::production(IDENTITY_TOOLKIT_URL),
            firestore: ServiceEndpoint::production(FIRESTORE_URL),
            rules: ServiceEndpoint::production(FIREBASE_RULES_URL),
        }
    }
}

impl Endpoints {
    /// Load endpoints from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if an emulator host variable is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load endpoints using `lookup` to read variables.
    ///
    /// # Errors
    ///
    /// Returns an error if an emulator host variable is set but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut endpoints = Self::default();

        if let Some(host) = lookup(AUTH_EMULATOR_ENV).filter(|h| !h.trim().is_empty()) {
            endpoints.identity =
                ServiceEndpoint::emulator(AUTH_EMULATOR_ENV, &host, "/identitytoolkit.googleapis.com")?;
            tracing::info!(host = %host, "Using Auth emulator");
        }

        if let Some(host) = lookup(FIRESTORE_EMULATOR_ENV).filter(|h| !h.trim().is_empty()) {
            endpoints.firestore = ServiceEndpoint::emulator(FIRESTORE_EMULATOR_ENV, &host, "/v1")?;
            tracing::info!(host = %host, "Using Firestore emulator");
        }

        Ok(endpoints)
    }
}
