//! Integration tests for the account provisioner.
//!
//! The provisioning flows run against [`InMemoryBackend`], which enforces the
//! same uniqueness, password and document preconditions as the hosted
//! services and counts every write.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p provisioner-integration-tests
//! ```

use provisioner::Step;
use provisioner::firestore::{DocumentPath, Fields, Value};
use provisioner::memory::InMemoryBackend;
use provisioner::provision::profile_path;
use provisioner_core::{Email, Uid};

/// Email used by most scenarios.
pub const ADMIN_EMAIL: &str = "admin@example.com";

/// Parse a test email.
///
/// # Panics
///
/// Panics if `value` is not a valid email address.
#[must_use]
pub fn email(value: &str) -> Email {
    Email::parse(value).expect("test email is valid")
}

/// Backend holding one identity record for `email`.
///
/// # Panics
///
/// Panics if the backend rejects the seeded record.
#[must_use]
pub fn backend_with_user(email: &Email, password: &str) -> (InMemoryBackend, Uid) {
    let backend = InMemoryBackend::new();
    let uid = backend
        .insert_user(email, password)
        .expect("seeded uid is valid");
    (backend, uid)
}

/// Progress callback that records a short label for every step.
pub fn record_steps(steps: &mut Vec<String>) -> impl FnMut(Step<'_>) + '_ {
    move |step| {
        steps.push(match step {
            Step::IdentityFound { uid } => format!("identity-found:{uid}"),
            Step::IdentityMissing => "identity-missing".to_owned(),
            Step::ProfileFound { .. } => "profile-found".to_owned(),
            Step::ProfileMissing => "profile-missing".to_owned(),
            Step::RulesetCreated { ruleset } => format!("ruleset-created:{}", ruleset.name),
        });
    }
}

/// Progress callback that ignores every step.
pub const fn ignore_steps(_: Step<'_>) {}

/// Seed the profile document of `uid` with string fields.
pub fn seed_profile(
    backend: &InMemoryBackend,
    uid: &Uid,
    fields: &[(&str, &str)],
) -> DocumentPath {
    let path = profile_path(uid);
    let fields: Fields = fields
        .iter()
        .map(|(k, v)| ((*k).to_owned(), Value::string(*v)))
        .collect();
    backend.insert_document(&path, fields);
    path
}
