//! Backend seams for the provisioning flows.
//!
//! The flows in [`crate::provision`] are written against these traits so the
//! same code drives the remote Firebase clients and the in-memory backend
//! used in tests.

use std::future::Future;

use provisioner_core::{Email, Uid};
use secrecy::SecretString;

use crate::firestore::{Document, DocumentError, DocumentPath, Fields, WriteResult};
use crate::identity::{IdentityError, UserRecord};
use crate::rules::{Release, Ruleset, RulesError};

/// Identity provider administrative operations.
pub trait IdentityProvider {
    /// Look an identity record up by email.
    ///
    /// Fails with `IdentityError::UserNotFound` when no record has the email.
    fn get_user_by_email(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<UserRecord, IdentityError>> + Send;

    /// Create an identity record with an email and password.
    fn create_user(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> impl Future<Output = Result<UserRecord, IdentityError>> + Send;

    /// Replace the password of an existing identity record.
    fn update_password(
        &self,
        uid: &Uid,
        password: &SecretString,
    ) -> impl Future<Output = Result<UserRecord, IdentityError>> + Send;
}

/// Document store operations.
pub trait DocumentStore {
    /// Fetch a document. An absent document is `Ok(None)`.
    fn get_document(
        &self,
        path: &DocumentPath,
    ) -> impl Future<Output = Result<Option<Document>, DocumentError>> + Send;

    /// Write a document, replacing any existing one.
    ///
    /// Each name in `server_timestamps` is set to the commit time by the
    /// server.
    fn set_document(
        &self,
        path: &DocumentPath,
        fields: Fields,
        server_timestamps: &[&str],
    ) -> impl Future<Output = Result<WriteResult, DocumentError>> + Send;

    /// Overwrite only the given fields of an existing document.
    ///
    /// Fails with `DocumentError::NotFound` if the document does not exist.
    fn update_document(
        &self,
        path: &DocumentPath,
        fields: Fields,
    ) -> impl Future<Output = Result<WriteResult, DocumentError>> + Send;
}

/// Security rules management.
pub trait RulesStore {
    /// Create a ruleset from a single named source file.
    fn create_ruleset(
        &self,
        file_name: &str,
        source: &str,
    ) -> impl Future<Output = Result<Ruleset, RulesError>> + Send;

    /// Point the named release at a ruleset, creating the release if needed.
    fn release_ruleset(
        &self,
        release: &str,
        ruleset_name: &str,
    ) -> impl Future<Output = Result<Release, RulesError>> + Send;
}
