//! Initialised Firebase project handle.

use std::sync::Arc;

use crate::auth::Authenticator;
use crate::config::Endpoints;
use crate::credentials::ServiceAccountKey;
use crate::firestore::FirestoreClient;
use crate::identity::IdentityClient;
use crate::rules::RulesClient;

/// Entry point to the project's services.
///
/// Holds one HTTP client and one token cache; the service clients it hands
/// out share both.
#[derive(Debug, Clone)]
pub struct FirebaseApp {
    client: reqwest::Client,
    auth: Arc<Authenticator>,
    endpoints: Endpoints,
    project_id: String,
}

impl FirebaseApp {
    /// Initialise the app from a service account key.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(key: ServiceAccountKey, endpoints: Endpoints) -> Result<Self, reqwest::Error> {
        let client = crate::http::build_client()?;
        let project_id = key.project_id.clone();
        let auth = Arc::new(Authenticator::new(client.clone(), key));

        tracing::debug!(project_id = %project_id, "Firebase app initialised");

        Ok(Self {
            client,
            auth,
            endpoints,
            project_id,
        })
    }

    /// The project this app administers.
    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Identity provider client.
    #[must_use]
    pub fn auth(&self) -> IdentityClient {
        IdentityClient::new(
            self.client.clone(),
            Arc::clone(&self.auth),
            self.endpoints.identity.clone(),
            self.project_id.clone(),
        )
    }

    /// Document store client.
    #[must_use]
    pub fn firestore(&self) -> FirestoreClient {
        FirestoreClient::new(
            self.client.clone(),
            Arc::clone(&self.auth),
            self.endpoints.firestore.clone(),
            self.project_id.clone(),
        )
    }

    /// Security rules client.
    #[must_use]
    pub fn security_rules(&self) -> RulesClient {
        RulesClient::new(
            self.client.clone(),
            Arc::clone(&self.auth),
            self.endpoints.rules.clone(),
            self.project_id.clone(),
        )
    }
}
