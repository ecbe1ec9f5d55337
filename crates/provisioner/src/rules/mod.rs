//! Firebase security rules API client.
//!
//! Deploying rules is two steps: create an immutable ruleset from source,
//! then point a release (for Firestore, `cloud.firestore`) at it.

mod client;

pub use client::RulesClient;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::auth::AuthError;
use crate::http::ApiFailure;

/// Release that activates a ruleset for Cloud Firestore.
pub const FIRESTORE_RELEASE: &str = "cloud.firestore";

/// Source file name recorded in Firestore rulesets.
pub const FIRESTORE_RULES_FILE: &str = "firestore.rules";

/// Errors that can occur when interacting with the rules API.
#[derive(Debug, Error)]
pub enum RulesError {
    /// The rules API returned an error (including compilation failures).
    #[error("Security rules API error: {0}")]
    Api(ApiFailure),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// No access token could be obtained.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// A created ruleset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ruleset {
    /// Resource name, `projects/{project}/rulesets/{id}`.
    pub name: String,
    /// When the ruleset was created.
    pub create_time: Option<DateTime<Utc>>,
}

/// A release pointing at a ruleset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    /// Resource name, `projects/{project}/releases/{release}`.
    pub name: String,
    /// Resource name of the active ruleset.
    pub ruleset_name: String,
    /// When the release last changed.
    pub update_time: Option<DateTime<Utc>>,
}
