//! Account Provisioner - Firebase administrative clients and flows.
//!
//! This crate talks to three Firebase services through their REST admin
//! APIs, authenticated with a service account key:
//!
//! - [`identity`] - Firebase Authentication (look up, create, reset password)
//! - [`firestore`] - Cloud Firestore (get, set, masked update)
//! - [`rules`] - Firebase security rules (create ruleset, release)
//!
//! The flows in [`provision`] are written against the traits in [`backend`],
//! implemented both by the remote clients (handed out by [`FirebaseApp`])
//! and by [`memory::InMemoryBackend`].
//!
//! # Example
//!
//! ```rust,ignore
//! let key = ServiceAccountKey::from_file(Path::new("service_account.json"))?;
//! let app = FirebaseApp::new(key, Endpoints::from_env()?)?;
//! let email = Email::parse("admin@example.com")?;
//! let outcome = provision::repair_profile(&app.auth(), &app.firestore(), &email, |_| {}).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod auth;
pub mod backend;
pub mod config;
pub mod credentials;
pub mod firestore;
pub mod http;
pub mod identity;
pub mod memory;
pub mod provision;
pub mod rules;

#[cfg(test)]
mod testing;

pub use app::FirebaseApp;
pub use backend::{DocumentStore, IdentityProvider, RulesStore};
pub use config::{ConfigError, Endpoints};
pub use credentials::{CredentialsError, ServiceAccountKey};
pub use provision::{ProvisionError, RepairOutcome, ResetOutcome, RulesDeployment, Step};
