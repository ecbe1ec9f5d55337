//! OAuth access tokens for the Google APIs.
//!
//! A service account authenticates by signing a short-lived JWT assertion
//! with its private key and exchanging it at the token endpoint for a bearer
//! token. The token is cached for the lifetime of the [`Authenticator`] and
//! re-minted once it is close to expiry.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::config::ServiceEndpoint;
use crate::credentials::ServiceAccountKey;
use crate::http::ApiFailure;

/// Scopes requested for the access token.
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/datastore",
    "https://www.googleapis.com/auth/firebase",
    "https://www.googleapis.com/auth/identitytoolkit",
    "https://www.googleapis.com/auth/userinfo.email",
];

/// Grant type for the JWT bearer flow (RFC 7523).
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each assertion, in seconds.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Tokens this close to expiry are treated as expired.
const EXPIRY_BUFFER_SECS: i64 = 60;

/// Token accepted by the local Firebase emulators.
pub const EMULATOR_TOKEN: &str = "owner";

/// Errors that can occur while obtaining an access token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// HTTP request to the token endpoint failed.
    #[error("Token request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The private key could not sign the assertion.
    #[error("Failed to sign token assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// The token endpoint rejected the assertion.
    #[error("Token exchange rejected: {0}")]
    Rejected(ApiFailure),
}

/// Claims of the signed assertion.
#[derive(Debug, Serialize, PartialEq, Eq)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// Response from the token endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Token lifetime in seconds.
    expires_in: i64,
}

/// A bearer token and its expiry.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// Bearer token for API requests.
    pub token: SecretString,
    /// Unix timestamp when the token expires.
    pub expires_at: i64,
}

impl AccessToken {
    /// Check if the token has expired or is about to.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        now >= self.expires_at - EXPIRY_BUFFER_SECS
    }
}

/// Mints and caches access tokens for one service account.
pub struct Authenticator {
    client: reqwest::Client,
    key: ServiceAccountKey,
    token: RwLock<Option<AccessToken>>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("client_email", &self.key.client_email)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    /// Create an authenticator for a service account key.
    #[must_use]
    pub fn new(client: reqwest::Client, key: ServiceAccountKey) -> Self {
        Self {
            client,
            key,
            token: RwLock::new(None),
        }
    }

    /// Return a valid bearer token, exchanging a new assertion if the cached
    /// one is missing or expired.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if signing or the token exchange fails.
    pub async fn bearer(&self) -> Result<SecretString, AuthError> {
        if let Some(token) = self.token.read().await.as_ref()
            && !token.is_expired()
        {
            return Ok(token.token.clone());
        }

        let mut cached = self.token.write().await;
        if let Some(token) = cached.as_ref()
            && !token.is_expired()
        {
            return Ok(token.token.clone());
        }

        let token = self.exchange().await?;
        let bearer = token.token.clone();
        *cached = Some(token);
        Ok(bearer)
    }

    /// Bearer token for requests to `endpoint`; emulators get their fixed
    /// token and never trigger an exchange.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if a service account token cannot be obtained.
    pub async fn bearer_for(&self, endpoint: &ServiceEndpoint) -> Result<SecretString, AuthError> {
        if endpoint.emulated {
            return Ok(SecretString::from(EMULATOR_TOKEN));
        }
        self.bearer().await
    }

    #[instrument(skip(self), fields(client_email = %self.key.client_email))]
    async fn exchange(&self) -> Result<AccessToken, AuthError> {
        let now = chrono::Utc::now().timestamp();
        let assertion = sign_assertion(&self.key, now)?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", JWT_BEARER_GRANT),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AuthError::Rejected(ApiFailure::from_response(response).await));
        }

        let body: TokenResponse = response.json().await?;
        tracing::debug!(expires_in = body.expires_in, "Obtained access token");

        Ok(AccessToken {
            token: SecretString::from(body.access_token),
            expires_at: now + body.expires_in,
        })
    }
}

fn assertion_claims(key: &ServiceAccountKey, now: i64) -> AssertionClaims<'_> {
    AssertionClaims {
        iss: &key.client_email,
        scope: SCOPES.join(" "),
        aud: &key.token_uri,
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECS,
    }
}

fn sign_assertion(key: &ServiceAccountKey, now: i64) -> Result<String, AuthError> {
    let mut header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256);
    header.kid.clone_from(&key.private_key_id);

    let encoding_key =
        jsonwebtoken::EncodingKey::from_rsa_pem(key.private_key.expose_secret().as_bytes())?;

    Ok(jsonwebtoken::encode(
        &header,
        &assertion_claims(key, now),
        &encoding_key,
    )?)
}
