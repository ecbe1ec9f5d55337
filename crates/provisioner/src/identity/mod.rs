//! Firebase Authentication admin API client.
//!
//! Wraps the Identity Toolkit v1 project endpoints used to look accounts up
//! by email, create accounts and reset passwords.

mod client;

pub use client::IdentityClient;

use provisioner_core::{Email, Uid};
use thiserror::Error;

use crate::auth::AuthError;
use crate::http::ApiFailure;

/// Errors that can occur when interacting with the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// No identity record matches the email or uid.
    #[error("No user record found for {0}")]
    UserNotFound(String),

    /// Another identity record already uses the email.
    #[error("Email already in use: {0}")]
    EmailExists(String),

    /// The identity provider returned an error.
    #[error("Identity API error: {0}")]
    Api(ApiFailure),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// No access token could be obtained.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The response could not be interpreted.
    #[error("Invalid identity response: {0}")]
    InvalidResponse(String),
}

impl IdentityError {
    /// Map an API failure to a specific variant where the provider's error
    /// code allows it. `subject` names the email or uid the call was about.
    #[must_use]
    pub fn from_failure(failure: ApiFailure, subject: &str) -> Self {
        match failure.code() {
            "USER_NOT_FOUND" => Self::UserNotFound(subject.to_owned()),
            "EMAIL_EXISTS" | "DUPLICATE_EMAIL" => Self::EmailExists(subject.to_owned()),
            _ => Self::Api(failure),
        }
    }
}

/// An identity record as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Unique identifier.
    pub uid: Uid,
    /// Email address, if the account has one.
    pub email: Option<Email>,
    /// Whether the email address has been verified.
    pub email_verified: bool,
    /// Whether the account is disabled.
    pub disabled: bool,
}
