//! Identity Toolkit REST client.

use std::sync::Arc;

use provisioner_core::{Email, Uid};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::instrument;

use super::{IdentityError, UserRecord};
use crate::auth::Authenticator;
use crate::backend::IdentityProvider;
use crate::config::ServiceEndpoint;
use crate::http::ApiFailure;

/// Identity Toolkit admin client scoped to one project.
#[derive(Clone)]
pub struct IdentityClient {
    client: reqwest::Client,
    auth: Arc<Authenticator>,
    endpoint: ServiceEndpoint,
    project_id: String,
}

impl std::fmt::Debug for IdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityClient")
            .field("endpoint", &self.endpoint)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct LookupRequest<'a> {
    email: [&'a str; 1],
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<UserInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserInfo {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    disabled: bool,
}

#[derive(Serialize)]
struct CreateRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    local_id: &'a str,
    password: &'a str,
}

/// Response of both `accounts` (create) and `accounts:update`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

impl UserInfo {
    fn into_record(self) -> Result<UserRecord, IdentityError> {
        Ok(UserRecord {
            uid: parse_uid(self.local_id)?,
            email: self.email.and_then(|e| Email::parse(&e).ok()),
            email_verified: self.email_verified,
            disabled: self.disabled,
        })
    }
}

impl AccountResponse {
    fn into_record(self) -> Result<UserRecord, IdentityError> {
        Ok(UserRecord {
            uid: parse_uid(self.local_id)?,
            email: self.email.and_then(|e| Email::parse(&e).ok()),
            email_verified: self.email_verified,
            disabled: false,
        })
    }
}

fn parse_uid(local_id: String) -> Result<Uid, IdentityError> {
    Uid::new(local_id).map_err(|e| IdentityError::InvalidResponse(e.to_string()))
}

impl IdentityClient {
    /// Create a client for `project_id`.
    #[must_use]
    pub const fn new(
        client: reqwest::Client,
        auth: Arc<Authenticator>,
        endpoint: ServiceEndpoint,
        project_id: String,
    ) -> Self {
        Self {
            client,
            auth,
            endpoint,
            project_id,
        }
    }

    fn url(&self, action: &str) -> String {
        format!(
            "{}/v1/projects/{}/{action}",
            self.endpoint.base_url, self.project_id
        )
    }

    async fn call<B, R>(&self, action: &str, body: &B, subject: &str) -> Result<R, IdentityError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let bearer = self.auth.bearer_for(&self.endpoint).await?;

        let response = self
            .client
            .post(self.url(action))
            .bearer_auth(bearer.expose_secret())
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let failure = ApiFailure::from_response(response).await;
            tracing::debug!(%failure, action, "Identity Toolkit request failed");
            return Err(IdentityError::from_failure(failure, subject));
        }

        Ok(response.json().await?)
    }
}

impl IdentityProvider for IdentityClient {
    #[instrument(skip(self), fields(email = %email))]
    async fn get_user_by_email(&self, email: &Email) -> Result<UserRecord, IdentityError> {
        let response: LookupResponse = self
            .call(
                "accounts:lookup",
                &LookupRequest {
                    email: [email.as_str()],
                },
                email.as_str(),
            )
            .await?;

        response
            .users
            .into_iter()
            .next()
            .ok_or_else(|| IdentityError::UserNotFound(email.to_string()))?
            .into_record()
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn create_user(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<UserRecord, IdentityError> {
        let response: AccountResponse = self
            .call(
                "accounts",
                &CreateRequest {
                    email: email.as_str(),
                    password: password.expose_secret(),
                },
                email.as_str(),
            )
            .await?;

        let record = response.into_record()?;
        tracing::info!(uid = %record.uid, "Identity record created");
        Ok(record)
    }

    #[instrument(skip(self, password), fields(uid = %uid))]
    async fn update_password(
        &self,
        uid: &Uid,
        password: &SecretString,
    ) -> Result<UserRecord, IdentityError> {
        let response: AccountResponse = self
            .call(
                "accounts:update",
                &UpdateRequest {
                    local_id: uid.as_str(),
                    password: password.expose_secret(),
                },
                uid.as_str(),
            )
            .await?;

        tracing::info!("Password updated");
        response.into_record()
    }
}
