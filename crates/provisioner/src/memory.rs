//! In-memory backend.
//!
//! Implements every backend trait against process-local maps, mirroring the
//! provider behaviour the provisioning flows depend on: email uniqueness,
//! password length rules, masked document updates that require an existing
//! document, and server-assigned timestamps. Every mutating call is counted
//! so tests can assert that a flow performed no writes.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use chrono::Utc;
use provisioner_core::{Email, Uid, UidError};
use secrecy::{ExposeSecret, SecretString};

use crate::backend::{DocumentStore, IdentityProvider, RulesStore};
use crate::firestore::{Document, DocumentError, DocumentPath, Fields, Value, WriteResult};
use crate::http::ApiFailure;
use crate::identity::{IdentityError, UserRecord};
use crate::rules::{Release, Ruleset, RulesError};

/// Shortest password the identity provider accepts.
pub const MIN_PASSWORD_LENGTH: usize = 6;

const PROJECT: &str = "projects/in-memory";

#[derive(Debug, Clone)]
struct StoredUser {
    email: Email,
    password: String,
}

/// Identity store, document store and rules store held in memory.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    users: Mutex<BTreeMap<Uid, StoredUser>>,
    documents: Mutex<BTreeMap<DocumentPath, Document>>,
    rulesets: Mutex<BTreeMap<String, String>>,
    releases: Mutex<BTreeMap<String, String>>,
    next_id: AtomicU64,
    writes: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl InMemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_uid(&self) -> Result<Uid, UidError> {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        Uid::new(format!("mem-uid-{n:04}"))
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    fn document_name(path: &DocumentPath) -> String {
        format!("{PROJECT}/databases/(default)/documents/{path}")
    }

    /// Seed an identity record without counting it as a write.
    ///
    /// # Errors
    ///
    /// Returns an error if the generated identifier is rejected.
    pub fn insert_user(&self, email: &Email, password: &str) -> Result<Uid, UidError> {
        let uid = self.next_uid()?;
        lock(&self.users).insert(
            uid.clone(),
            StoredUser {
                email: email.clone(),
                password: password.to_owned(),
            },
        );
        Ok(uid)
    }

    /// Seed a document without counting it as a write.
    pub fn insert_document(&self, path: &DocumentPath, fields: Fields) {
        let now = Utc::now();
        lock(&self.documents).insert(
            path.clone(),
            Document {
                name: Self::document_name(path),
                fields,
                create_time: Some(now),
                update_time: Some(now),
            },
        );
    }

    /// Number of identity records.
    #[must_use]
    pub fn user_count(&self) -> usize {
        lock(&self.users).len()
    }

    /// Stored password of the record with `email`.
    #[must_use]
    pub fn password_of(&self, email: &Email) -> Option<String> {
        lock(&self.users)
            .values()
            .find(|u| u.email.matches(email))
            .map(|u| u.password.clone())
    }

    /// Identifier of the record with `email`.
    #[must_use]
    pub fn uid_of(&self, email: &Email) -> Option<Uid> {
        lock(&self.users)
            .iter()
            .find(|(_, u)| u.email.matches(email))
            .map(|(uid, _)| uid.clone())
    }

    /// Number of stored documents.
    #[must_use]
    pub fn document_count(&self) -> usize {
        lock(&self.documents).len()
    }

    /// A stored document.
    #[must_use]
    pub fn document(&self, path: &DocumentPath) -> Option<Document> {
        lock(&self.documents).get(path).cloned()
    }

    /// Source of a created ruleset.
    #[must_use]
    pub fn ruleset_source(&self, name: &str) -> Option<String> {
        lock(&self.rulesets).get(name).cloned()
    }

    /// Ruleset a release points at.
    #[must_use]
    pub fn released_ruleset(&self, release: &str) -> Option<String> {
        lock(&self.releases).get(release).cloned()
    }

    /// Number of mutating calls made through the backend traits.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

fn weak_password() -> IdentityError {
    IdentityError::Api(ApiFailure {
        status: 400,
        message: format!(
            "WEAK_PASSWORD : Password should be at least {MIN_PASSWORD_LENGTH} characters"
        ),
    })
}

impl IdentityProvider for InMemoryBackend {
    async fn get_user_by_email(&self, email: &Email) -> Result<UserRecord, IdentityError> {
        lock(&self.users)
            .iter()
            .find(|(_, u)| u.email.matches(email))
            .map(|(uid, u)| UserRecord {
                uid: uid.clone(),
                email: Some(u.email.clone()),
                email_verified: false,
                disabled: false,
            })
            .ok_or_else(|| IdentityError::UserNotFound(email.to_string()))
    }

    async fn create_user(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<UserRecord, IdentityError> {
        let password = password.expose_secret();
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(weak_password());
        }

        let mut users = lock(&self.users);
        if users.values().any(|u| u.email.matches(email)) {
            return Err(IdentityError::EmailExists(email.to_string()));
        }

        let uid = self
            .next_uid()
            .map_err(|e| IdentityError::InvalidResponse(e.to_string()))?;
        users.insert(
            uid.clone(),
            StoredUser {
                email: email.clone(),
                password: password.to_owned(),
            },
        );
        self.record_write();

        Ok(UserRecord {
            uid,
            email: Some(email.clone()),
            email_verified: false,
            disabled: false,
        })
    }

    async fn update_password(
        &self,
        uid: &Uid,
        password: &SecretString,
    ) -> Result<UserRecord, IdentityError> {
        let password = password.expose_secret();
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(weak_password());
        }

        let mut users = lock(&self.users);
        let user = users
            .get_mut(uid)
            .ok_or_else(|| IdentityError::UserNotFound(uid.to_string()))?;
        password.clone_into(&mut user.password);
        self.record_write();

        Ok(UserRecord {
            uid: uid.clone(),
            email: Some(user.email.clone()),
            email_verified: false,
            disabled: false,
        })
    }
}

impl DocumentStore for InMemoryBackend {
    async fn get_document(&self, path: &DocumentPath) -> Result<Option<Document>, DocumentError> {
        Ok(self.document(path))
    }

    async fn set_document(
        &self,
        path: &DocumentPath,
        mut data: Fields,
        server_timestamps: &[&str],
    ) -> Result<WriteResult, DocumentError> {
        let now = Utc::now();
        for field in server_timestamps {
            data.insert((*field).to_owned(), Value::TimestampValue(now));
        }

        let mut documents = lock(&self.documents);
        let create_time = documents
            .get(path)
            .and_then(|d| d.create_time)
            .unwrap_or(now);
        documents.insert(
            path.clone(),
            Document {
                name: Self::document_name(path),
                fields: data,
                create_time: Some(create_time),
                update_time: Some(now),
            },
        );
        self.record_write();

        Ok(WriteResult {
            update_time: Some(now),
        })
    }

    async fn update_document(
        &self,
        path: &DocumentPath,
        data: Fields,
    ) -> Result<WriteResult, DocumentError> {
        let now = Utc::now();
        let mut documents = lock(&self.documents);
        let document = documents
            .get_mut(path)
            .ok_or_else(|| DocumentError::NotFound(path.to_string()))?;

        document.fields.extend(data);
        document.update_time = Some(now);
        self.record_write();

        Ok(WriteResult {
            update_time: Some(now),
        })
    }
}

impl RulesStore for InMemoryBackend {
    async fn create_ruleset(&self, file_name: &str, source: &str) -> Result<Ruleset, RulesError> {
        if source.trim().is_empty() {
            return Err(RulesError::Api(ApiFailure {
                status: 400,
                message: format!("{file_name}: ruleset source is empty"),
            }));
        }

        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let name = format!("{PROJECT}/rulesets/mem-ruleset-{n:04}");
        lock(&self.rulesets).insert(name.clone(), source.to_owned());
        self.record_write();

        Ok(Ruleset {
            name,
            create_time: Some(Utc::now()),
        })
    }

    async fn release_ruleset(
        &self,
        release: &str,
        ruleset_name: &str,
    ) -> Result<Release, RulesError> {
        if !lock(&self.rulesets).contains_key(ruleset_name) {
            return Err(RulesError::Api(ApiFailure {
                status: 404,
                message: format!("Ruleset {ruleset_name} not found"),
            }));
        }

        lock(&self.releases).insert(release.to_owned(), ruleset_name.to_owned());
        self.record_write();

        Ok(Release {
            name: format!("{PROJECT}/releases/{release}"),
            ruleset_name: ruleset_name.to_owned(),
            update_time: Some(Utc::now()),
        })
    }
}
