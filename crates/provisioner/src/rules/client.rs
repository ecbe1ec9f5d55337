//! Firebase Rules REST client.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::instrument;

use super::{Release, Ruleset, RulesError};
use crate::auth::Authenticator;
use crate::backend::RulesStore;
use crate::config::ServiceEndpoint;
use crate::http::ApiFailure;

/// Security rules client scoped to one project.
#[derive(Clone)]
pub struct RulesClient {
    client: reqwest::Client,
    auth: Arc<Authenticator>,
    endpoint: ServiceEndpoint,
    project_id: String,
}

impl std::fmt::Debug for RulesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RulesClient")
            .field("endpoint", &self.endpoint)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct CreateRulesetRequest<'a> {
    source: RulesSource<'a>,
}

#[derive(Debug, Serialize)]
struct RulesSource<'a> {
    files: [SourceFile<'a>; 1],
}

#[derive(Debug, Serialize)]
struct SourceFile<'a> {
    name: &'a str,
    content: &'a str,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReleaseBody<'a> {
    name: &'a str,
    ruleset_name: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateReleaseRequest<'a> {
    release: ReleaseBody<'a>,
}

impl RulesClient {
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

    fn project_url(&self) -> String {
        format!("{}/projects/{}", self.endpoint.base_url, self.project_id)
    }

    fn release_name(&self, release: &str) -> String {
        format!("projects/{}/releases/{release}", self.project_id)
    }

    async fn bearer(&self) -> Result<SecretString, RulesError> {
        Ok(self.auth.bearer_for(&self.endpoint).await?)
    }

    async fn create_release(&self, body: &ReleaseBody<'_>) -> Result<Release, RulesError> {
        let response = self
            .client
            .post(format!("{}/releases", self.project_url()))
            .bearer_auth(self.bearer().await?.expose_secret())
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RulesError::Api(ApiFailure::from_response(response).await));
        }

        Ok(response.json().await?)
    }
}

impl RulesStore for RulesClient {
    #[instrument(skip(self, source), fields(file_name = %file_name, bytes = source.len()))]
    async fn create_ruleset(&self, file_name: &str, source: &str) -> Result<Ruleset, RulesError> {
        let response = self
            .client
            .post(format!("{}/rulesets", self.project_url()))
            .bearer_auth(self.bearer().await?.expose_secret())
            .json(&CreateRulesetRequest {
                source: RulesSource {
                    files: [SourceFile {
                        name: file_name,
                        content: source,
                    }],
                },
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RulesError::Api(ApiFailure::from_response(response).await));
        }

        let ruleset: Ruleset = response.json().await?;
        tracing::info!(ruleset = %ruleset.name, "Ruleset created");
        Ok(ruleset)
    }

    #[instrument(skip(self), fields(release = %release))]
    async fn release_ruleset(
        &self,
        release: &str,
        ruleset_name: &str,
    ) -> Result<Release, RulesError> {
        let name = self.release_name(release);
        let body = ReleaseBody {
            name: &name,
            ruleset_name,
        };

        let response = self
            .client
            .patch(format!("{}/releases/{release}", self.project_url()))
            .bearer_auth(self.bearer().await?.expose_secret())
            .json(&UpdateReleaseRequest { release: body })
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::info!("Release does not exist yet, creating it");
            return self.create_release(&body).await;
        }
        if !response.status().is_success() {
            return Err(RulesError::Api(ApiFailure::from_response(response).await));
        }

        Ok(response.json().await?)
    }
}
