//! Integration tests for the profile repair flow.

#![allow(clippy::unwrap_used)]

use provisioner::backend::DocumentStore;
use provisioner::firestore::{Document, DocumentError, DocumentPath, Fields, Value, WriteResult};
use provisioner::http::ApiFailure;
use provisioner::memory::InMemoryBackend;
use provisioner::provision::{CREATED_AT_FIELD, profile_path, repair_profile};
use provisioner::{ProvisionError, RepairOutcome};
use provisioner_integration_tests::{
    ADMIN_EMAIL, backend_with_user, email, ignore_steps, record_steps, seed_profile,
};

/// Document store that serves reads from memory and rejects every write.
struct ReadOnlyStore<'a>(&'a InMemoryBackend);

fn permission_denied() -> DocumentError {
    DocumentError::Api(ApiFailure {
        status: 403,
        message: "PERMISSION_DENIED: Missing or insufficient permissions.".to_owned(),
    })
}

impl DocumentStore for ReadOnlyStore<'_> {
    async fn get_document(&self, path: &DocumentPath) -> Result<Option<Document>, DocumentError> {
        self.0.get_document(path).await
    }

    async fn set_document(
        &self,
        _path: &DocumentPath,
        _data: Fields,
        _server_timestamps: &[&str],
    ) -> Result<WriteResult, DocumentError> {
        Err(permission_denied())
    }

    async fn update_document(
        &self,
        _path: &DocumentPath,
        _data: Fields,
    ) -> Result<WriteResult, DocumentError> {
        Err(permission_denied())
    }
}

// =============================================================================
// Missing Profile
// =============================================================================

#[tokio::test]
async fn test_missing_profile_is_created() {
    let admin = email(ADMIN_EMAIL);
    let (backend, uid) = backend_with_user(&admin, "password");

    let outcome = repair_profile(&backend, &backend, &admin, ignore_steps).await.unwrap();

    assert_eq!(outcome, RepairOutcome::Created { uid: uid.clone() });
    assert_eq!(backend.document_count(), 1);
    assert_eq!(backend.write_count(), 1);

    let doc = backend.document(&profile_path(&uid)).unwrap();
    assert_eq!(doc.get("role").and_then(Value::as_str), Some("admin"));
    assert_eq!(doc.get("email").and_then(Value::as_str), Some(ADMIN_EMAIL));
    assert!(matches!(
        doc.get(CREATED_AT_FIELD),
        Some(Value::TimestampValue(_))
    ));
    assert_eq!(doc.fields.len(), 3);
}

// =============================================================================
// Existing Profile
// =============================================================================

#[tokio::test]
async fn test_existing_profile_is_promoted() {
    let admin = email(ADMIN_EMAIL);
    let (backend, uid) = backend_with_user(&admin, "password");
    let path = seed_profile(
        &backend,
        &uid,
        &[
            ("role", "user"),
            ("email", "stale@example.com"),
            ("displayName", "Site Admin"),
        ],
    );

    let outcome = repair_profile(&backend, &backend, &admin, ignore_steps).await.unwrap();

    match outcome {
        RepairOutcome::Updated {
            uid: updated,
            previous,
        } => {
            assert_eq!(updated, uid);
            assert_eq!(previous.get("role").and_then(Value::as_str), Some("user"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let doc = backend.document(&path).unwrap();
    assert_eq!(doc.get("role").and_then(Value::as_str), Some("admin"));
    assert_eq!(doc.get("email").and_then(Value::as_str), Some(ADMIN_EMAIL));
    assert_eq!(
        doc.get("displayName").and_then(Value::as_str),
        Some("Site Admin")
    );
    assert_eq!(backend.document_count(), 1);
}

#[tokio::test]
async fn test_admin_profile_is_rewritten_anyway() {
    let admin = email(ADMIN_EMAIL);
    let (backend, uid) = backend_with_user(&admin, "password");
    seed_profile(&backend, &uid, &[("role", "admin"), ("email", ADMIN_EMAIL)]);

    let outcome = repair_profile(&backend, &backend, &admin, ignore_steps).await.unwrap();

    assert!(matches!(outcome, RepairOutcome::Updated { .. }));
    assert_eq!(backend.write_count(), 1);
}

#[tokio::test]
async fn test_existing_profile_keeps_creation_timestamp() {
    let admin = email(ADMIN_EMAIL);
    let (backend, uid) = backend_with_user(&admin, "password");
    let path = profile_path(&uid);
    let created = Value::TimestampValue("2024-01-01T00:00:00Z".parse().unwrap());
    backend.insert_document(
        &path,
        Fields::from([
            ("role".to_owned(), Value::string("user")),
            (CREATED_AT_FIELD.to_owned(), created.clone()),
        ]),
    );

    repair_profile(&backend, &backend, &admin, ignore_steps).await.unwrap();

    let doc = backend.document(&path).unwrap();
    assert_eq!(doc.get(CREATED_AT_FIELD), Some(&created));
}

// =============================================================================
// Missing Identity
// =============================================================================

#[tokio::test]
async fn test_missing_identity_writes_nothing() {
    let backend = InMemoryBackend::new();
    let admin = email(ADMIN_EMAIL);

    let err = repair_profile(&backend, &backend, &admin, ignore_steps).await.unwrap_err();

    assert!(matches!(&err, ProvisionError::IdentityMissing(e) if *e == admin));
    assert_eq!(
        err.to_string(),
        "User admin@example.com not found in Auth. Please run reset-password first."
    );
    assert_eq!(backend.write_count(), 0);
    assert_eq!(backend.document_count(), 0);
    assert_eq!(backend.user_count(), 0);
}

#[tokio::test]
async fn test_other_users_profile_is_not_touched() {
    let admin = email(ADMIN_EMAIL);
    let (backend, _) = backend_with_user(&admin, "password");
    let other_uid = backend
        .insert_user(&email("other@example.com"), "password")
        .unwrap();
    let other_path = seed_profile(&backend, &other_uid, &[("role", "user")]);

    repair_profile(&backend, &backend, &admin, ignore_steps).await.unwrap();

    let other = backend.document(&other_path).unwrap();
    assert_eq!(other.get("role").and_then(Value::as_str), Some("user"));
    assert_eq!(backend.document_count(), 2);
}

// =============================================================================
// Progress
// =============================================================================

#[tokio::test]
async fn test_steps_for_missing_profile() {
    let admin = email(ADMIN_EMAIL);
    let (backend, uid) = backend_with_user(&admin, "password");
    let mut steps = Vec::new();

    repair_profile(&backend, &backend, &admin, record_steps(&mut steps))
        .await
        .unwrap();

    assert_eq!(
        steps,
        [format!("identity-found:{uid}"), "profile-missing".to_owned()]
    );
}

#[tokio::test]
async fn test_found_profile_is_reported_before_failed_write() {
    let admin = email(ADMIN_EMAIL);
    let (backend, uid) = backend_with_user(&admin, "password");
    seed_profile(&backend, &uid, &[("role", "user")]);
    let mut steps = Vec::new();

    let err = repair_profile(
        &backend,
        &ReadOnlyStore(&backend),
        &admin,
        record_steps(&mut steps),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ProvisionError::Document(DocumentError::Api(_))));
    assert_eq!(
        steps,
        [format!("identity-found:{uid}"), "profile-found".to_owned()]
    );
}

#[tokio::test]
async fn test_missing_identity_reports_no_steps() {
    let backend = InMemoryBackend::new();
    let mut steps = Vec::new();

    let result = repair_profile(
        &backend,
        &backend,
        &email(ADMIN_EMAIL),
        record_steps(&mut steps),
    )
    .await;

    assert!(result.is_err());
    assert!(steps.is_empty());
}
