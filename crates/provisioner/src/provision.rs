//! Provisioning flows.
//!
//! Each flow is a short linear sequence of backend calls that branches only
//! on whether an identity record or document already exists. Nothing is
//! retried; the first failure ends the flow with whatever was already
//! written left in place.
//!
//! Flows report each [`Step`] to a caller-supplied callback as soon as it is
//! reached, so the caller learns what was found or created even when a later
//! call fails.

use std::path::{Path, PathBuf};

use provisioner_core::{Email, Role, Uid};
use secrecy::SecretString;
use thiserror::Error;
use tracing::instrument;

use crate::backend::{DocumentStore, IdentityProvider, RulesStore};
use crate::firestore::{Document, DocumentError, DocumentPath, Fields, Value};
use crate::identity::IdentityError;
use crate::rules::{FIRESTORE_RELEASE, FIRESTORE_RULES_FILE, Release, Ruleset, RulesError};

/// Collection holding application profile documents.
pub const USERS_COLLECTION: &str = "users";

/// Server-assigned creation timestamp field of a profile document.
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Errors that end a provisioning flow.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The profile repair needs an identity record that does not exist.
    #[error("User {0} not found in Auth. Please run reset-password first.")]
    IdentityMissing(Email),

    /// Identity provider failure.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Document store failure.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Rules API failure.
    #[error(transparent)]
    Rules(#[from] RulesError),

    /// The rules source file does not exist.
    #[error("{} not found!", .0.display())]
    RulesSourceMissing(PathBuf),

    /// The rules source file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    RulesSourceRead {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Result of resetting a password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetOutcome {
    /// An existing identity record got the new password.
    PasswordUpdated {
        /// Identifier of the existing record.
        uid: Uid,
    },
    /// No record existed, so one was created with the password.
    UserCreated {
        /// Identifier of the new record.
        uid: Uid,
    },
}

impl ResetOutcome {
    /// Identifier of the record that now holds the password.
    #[must_use]
    pub const fn uid(&self) -> &Uid {
        match self {
            Self::PasswordUpdated { uid } | Self::UserCreated { uid } => uid,
        }
    }
}

/// Result of repairing a profile document.
#[derive(Debug, Clone, PartialEq)]
pub enum RepairOutcome {
    /// The document existed; `role` and `email` were overwritten.
    Updated {
        /// Identity (and document) identifier.
        uid: Uid,
        /// Document contents before the update.
        previous: Document,
    },
    /// The document was missing and has been created.
    Created {
        /// Identity (and document) identifier.
        uid: Uid,
    },
}

impl RepairOutcome {
    /// Identifier of the identity record and its profile document.
    #[must_use]
    pub const fn uid(&self) -> &Uid {
        match self {
            Self::Updated { uid, .. } | Self::Created { uid } => uid,
        }
    }
}

/// Result of deploying security rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulesDeployment {
    /// The ruleset created from the source file.
    pub ruleset: Ruleset,
    /// The release now pointing at it.
    pub release: Release,
}

/// A milestone reached inside a flow, reported before the next backend call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step<'a> {
    /// The lookup found an identity record.
    IdentityFound {
        /// Identifier of the record.
        uid: &'a Uid,
    },
    /// The lookup found no identity record; one will be created.
    IdentityMissing,
    /// The profile document exists with these contents.
    ProfileFound {
        /// Current document.
        document: &'a Document,
    },
    /// The profile document does not exist; it will be created.
    ProfileMissing,
    /// A ruleset was created and is about to be released.
    RulesetCreated {
        /// The new ruleset.
        ruleset: &'a Ruleset,
    },
}

/// Path of the profile document belonging to an identity.
#[must_use]
pub fn profile_path(uid: &Uid) -> DocumentPath {
    DocumentPath::new(USERS_COLLECTION, uid.as_str())
}

/// Fields written to every repaired profile: admin role and the email.
#[must_use]
pub fn admin_profile_fields(email: &Email) -> Fields {
    Fields::from([
        ("email".to_owned(), Value::string(email.as_str())),
        ("role".to_owned(), Value::string(Role::Admin.as_str())),
    ])
}

/// Ensure an identity record for `email` exists with `password`.
///
/// Updates the password of an existing record, or creates the record when
/// the lookup reports it missing.
///
/// # Errors
///
/// Returns any identity provider failure other than the lookup's not-found.
#[instrument(skip(identity, password, progress), fields(email = %email))]
pub async fn reset_password<I, F>(
    identity: &I,
    email: &Email,
    password: &SecretString,
    mut progress: F,
) -> Result<ResetOutcome, ProvisionError>
where
    I: IdentityProvider,
    F: FnMut(Step<'_>),
{
    match identity.get_user_by_email(email).await {
        Ok(user) => {
            tracing::info!(uid = %user.uid, "User found, updating password");
            progress(Step::IdentityFound { uid: &user.uid });
            identity.update_password(&user.uid, password).await?;
            Ok(ResetOutcome::PasswordUpdated { uid: user.uid })
        }
        Err(IdentityError::UserNotFound(_)) => {
            tracing::info!("User not found, creating");
            progress(Step::IdentityMissing);
            let user = identity.create_user(email, password).await?;
            Ok(ResetOutcome::UserCreated { uid: user.uid })
        }
        Err(e) => Err(e.into()),
    }
}

/// Ensure the profile document of the identity for `email` exists with the
/// admin role.
///
/// An existing document always gets `role` and `email` overwritten, even when
/// they already hold those values; its other fields are left alone. A missing
/// document is created with a server-assigned `createdAt`.
///
/// # Errors
///
/// Returns `ProvisionError::IdentityMissing` without writing anything if no
/// identity record has the email, and any backend failure otherwise.
#[instrument(skip(identity, store, progress), fields(email = %email))]
pub async fn repair_profile<I, D, F>(
    identity: &I,
    store: &D,
    email: &Email,
    mut progress: F,
) -> Result<RepairOutcome, ProvisionError>
where
    I: IdentityProvider,
    D: DocumentStore,
    F: FnMut(Step<'_>),
{
    let user = identity
        .get_user_by_email(email)
        .await
        .map_err(|e| match e {
            IdentityError::UserNotFound(_) => ProvisionError::IdentityMissing(email.clone()),
            other => other.into(),
        })?;
    progress(Step::IdentityFound { uid: &user.uid });

    let path = profile_path(&user.uid);

    if let Some(previous) = store.get_document(&path).await? {
        tracing::info!(path = %path, "Profile exists, setting admin role");
        progress(Step::ProfileFound {
            document: &previous,
        });
        store
            .update_document(&path, admin_profile_fields(email))
            .await?;
        Ok(RepairOutcome::Updated {
            uid: user.uid,
            previous,
        })
    } else {
        tracing::info!(path = %path, "Profile missing, creating");
        progress(Step::ProfileMissing);
        store
            .set_document(&path, admin_profile_fields(email), &[CREATED_AT_FIELD])
            .await?;
        Ok(RepairOutcome::Created { uid: user.uid })
    }
}

/// Publish the Firestore security rules in `source_path`.
///
/// # Errors
///
/// Returns `ProvisionError::RulesSourceMissing` if the file does not exist,
/// and read or rules API failures otherwise.
#[instrument(skip(rules, progress), fields(source = %source_path.display()))]
pub async fn deploy_rules<R, F>(
    rules: &R,
    source_path: &Path,
    mut progress: F,
) -> Result<RulesDeployment, ProvisionError>
where
    R: RulesStore,
    F: FnMut(Step<'_>),
{
    let source = match tokio::fs::read_to_string(source_path).await {
        Ok(source) => source,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ProvisionError::RulesSourceMissing(source_path.to_path_buf()));
        }
        Err(source) => {
            return Err(ProvisionError::RulesSourceRead {
                path: source_path.to_path_buf(),
                source,
            });
        }
    };

    let ruleset = rules.create_ruleset(FIRESTORE_RULES_FILE, &source).await?;
    progress(Step::RulesetCreated { ruleset: &ruleset });
    let release = rules
        .release_ruleset(FIRESTORE_RELEASE, &ruleset.name)
        .await?;

    Ok(RulesDeployment { ruleset, release })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_path_uses_uid() {
        let uid = Uid::new("abc123").unwrap();
        assert_eq!(profile_path(&uid).to_string(), "users/abc123");
    }

    #[test]
    fn test_admin_fields() {
        let email = Email::parse("admin@example.com").unwrap();
        let fields = admin_profile_fields(&email);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["role"].as_str(), Some("admin"));
        assert_eq!(fields["email"].as_str(), Some("admin@example.com"));
    }

    #[test]
    fn test_identity_missing_message() {
        let err = ProvisionError::IdentityMissing(Email::parse("admin@example.com").unwrap());
        assert_eq!(
            err.to_string(),
            "User admin@example.com not found in Auth. Please run reset-password first."
        );
    }

    #[test]
    fn test_rules_source_missing_message() {
        let err = ProvisionError::RulesSourceMissing(PathBuf::from("firestore.rules"));
        assert_eq!(err.to_string(), "firestore.rules not found!");
    }
}
