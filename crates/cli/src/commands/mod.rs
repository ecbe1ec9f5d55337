//! Command implementations.
//!
//! Every command initialises the Firebase app from the service account key,
//! runs one provisioning flow and reports its outcome on the console.

pub mod deploy_rules;
pub mod repair_profile;
pub mod reset_password;

use std::path::Path;

use provisioner::{
    ConfigError, CredentialsError, Endpoints, FirebaseApp, ProvisionError, ServiceAccountKey,
};
use thiserror::Error;

use crate::report;

/// Errors that end a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The service account key could not be loaded.
    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    /// The environment configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP client could not be built.
    #[error("Failed to initialise HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// A provisioning flow failed.
    #[error("{}", describe(.0))]
    Provision(#[from] ProvisionError),

    /// Deploying security rules failed.
    #[error("Failed to deploy rules: {0}")]
    Deploy(ProvisionError),
}

/// Flow failures that already read as a full sentence are shown as-is;
/// everything else gets a generic prefix.
fn describe(error: &ProvisionError) -> String {
    match error {
        ProvisionError::IdentityMissing(_) | ProvisionError::RulesSourceMissing(_) => {
            error.to_string()
        }
        other => format!("Error: {other}"),
    }
}

/// Load the service account key and initialise the app.
///
/// # Errors
///
/// Returns an error if the key file is missing or invalid, an emulator
/// variable is malformed, or the HTTP client cannot be built.
pub fn init_app(credentials: &Path) -> Result<FirebaseApp, CommandError> {
    let key = ServiceAccountKey::from_file(credentials)?;
    let endpoints = Endpoints::from_env()?;
    let app = FirebaseApp::new(key, endpoints)?;
    report::progress(&format!("Project: {}", app.project_id()));
    Ok(app)
}
