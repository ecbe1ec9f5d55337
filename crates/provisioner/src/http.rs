//! Shared HTTP plumbing for the Google API clients.

use std::time::Duration;

use serde::Deserialize;

/// Timeout applied to every request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the HTTP client shared by all API clients.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn build_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("provisioner/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// A non-success response from a Google API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    /// HTTP status code.
    pub status: u16,
    /// Error message reported by the API, or the raw body.
    pub message: String,
}

impl std::fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {}: {}", self.status, self.message)
    }
}

/// Standard Google API error envelope.
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    /// `{"error": {"code": 400, "message": "EMAIL_EXISTS", "status": "..."}}`
    Status {
        #[serde(default)]
        message: String,
    },
    /// OAuth endpoint style: `{"error": "invalid_grant", "error_description": "..."}`
    Code(String),
}

#[derive(Deserialize)]
struct OAuthErrorDescription {
    #[serde(default)]
    error_description: Option<String>,
}

impl ApiFailure {
    /// Build a failure from an error response, consuming its body.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Self::from_body(status, &body)
    }

    /// Extract the most useful message from an error body.
    #[must_use]
    pub fn from_body(status: u16, body: &str) -> Self {
        let message = match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(ErrorEnvelope {
                error: ErrorBody::Status { message },
            }) if !message.is_empty() => message,
            Ok(ErrorEnvelope {
                error: ErrorBody::Code(code),
            }) => serde_json::from_str::<OAuthErrorDescription>(body)
                .ok()
                .and_then(|d| d.error_description)
                .map_or_else(|| code.clone(), |desc| format!("{code}: {desc}")),
            _ => body.trim().to_owned(),
        };

        Self { status, message }
    }

    /// The leading error code of an identity toolkit message, e.g.
    /// `WEAK_PASSWORD` from `WEAK_PASSWORD : Password should be at least 6 characters`.
    #[must_use]
    pub fn code(&self) -> &str {
        self.message
            .split([' ', ':'])
            .next()
            .unwrap_or_default()
    }
}
