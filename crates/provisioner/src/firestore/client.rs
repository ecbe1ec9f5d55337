//! Firestore REST client for the `(default)` database.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{Document, DocumentError, DocumentPath, Fields, WriteResult};
use crate::auth::Authenticator;
use crate::backend::DocumentStore;
use crate::config::ServiceEndpoint;
use crate::http::ApiFailure;

const DATABASE: &str = "(default)";

/// Firestore client scoped to one project's default database.
#[derive(Clone)]
pub struct FirestoreClient {
    client: reqwest::Client,
    auth: Arc<Authenticator>,
    endpoint: ServiceEndpoint,
    project_id: String,
}

impl std::fmt::Debug for FirestoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreClient")
            .field("endpoint", &self.endpoint)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct CommitRequest {
    writes: Vec<Write>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Write {
    update: DocumentWrite,
    #[serde(skip_serializing_if = "Option::is_none")]
    update_mask: Option<DocumentMask>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    update_transforms: Vec<FieldTransform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_document: Option<Precondition>,
}

#[derive(Debug, Serialize)]
struct DocumentWrite {
    name: String,
    fields: Fields,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentMask {
    field_paths: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldTransform {
    field_path: String,
    set_to_server_value: &'static str,
}

#[derive(Debug, Serialize)]
struct Precondition {
    exists: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitResponse {
    #[serde(default)]
    write_results: Vec<CommitWriteResult>,
    commit_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitWriteResult {
    update_time: Option<DateTime<Utc>>,
}

/// Full write: replaces the whole document, stamping `server_timestamps`
/// with the request time.
fn set_write(name: String, fields: Fields, server_timestamps: &[&str]) -> Write {
    Write {
        update: DocumentWrite { name, fields },
        update_mask: None,
        update_transforms: server_timestamps
            .iter()
            .map(|field| FieldTransform {
                field_path: (*field).to_owned(),
                set_to_server_value: "REQUEST_TIME",
            })
            .collect(),
        current_document: None,
    }
}

/// Partial write: touches only the given fields and requires the document to
/// exist.
fn update_write(name: String, fields: Fields) -> Write {
    let field_paths = fields.keys().map(|k| quote_field_path(k)).collect();
    Write {
        update: DocumentWrite { name, fields },
        update_mask: Some(DocumentMask { field_paths }),
        update_transforms: Vec::new(),
        current_document: Some(Precondition { exists: true }),
    }
}

/// Field names that are not simple identifiers must be backquoted in masks.
fn quote_field_path(field: &str) -> String {
    let simple = field
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if simple {
        field.to_owned()
    } else {
        format!("`{}`", field.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

impl FirestoreClient {
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

    /// Resource name of the database's document root.
    fn documents_root(&self) -> String {
        format!(
            "projects/{}/databases/{DATABASE}/documents",
            self.project_id
        )
    }

    /// Full resource name of a document.
    #[must_use]
    pub fn document_name(&self, path: &DocumentPath) -> String {
        format!("{}/{path}", self.documents_root())
    }

    async fn commit(&self, write: Write, path: &DocumentPath) -> Result<WriteResult, DocumentError> {
        let bearer = self.auth.bearer_for(&self.endpoint).await?;

        let response = self
            .client
            .post(format!(
                "{}/{}:commit",
                self.endpoint.base_url,
                self.documents_root()
            ))
            .bearer_auth(bearer.expose_secret())
            .json(&CommitRequest {
                writes: vec![write],
            })
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DocumentError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(DocumentError::Api(ApiFailure::from_response(response).await));
        }

        let body: CommitResponse = response.json().await?;
        let update_time = body
            .write_results
            .into_iter()
            .next()
            .and_then(|r| r.update_time)
            .or(body.commit_time);

        Ok(WriteResult { update_time })
    }
}

impl DocumentStore for FirestoreClient {
    #[instrument(skip(self), fields(path = %path))]
    async fn get_document(&self, path: &DocumentPath) -> Result<Option<Document>, DocumentError> {
        let bearer = self.auth.bearer_for(&self.endpoint).await?;

        let response = self
            .client
            .get(format!(
                "{}/{}/{}",
                self.endpoint.base_url,
                self.documents_root(),
                path.encoded()
            ))
            .bearer_auth(bearer.expose_secret())
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!("Document does not exist");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(DocumentError::Api(ApiFailure::from_response(response).await));
        }

        Ok(Some(response.json().await?))
    }

    #[instrument(skip(self, data), fields(path = %path))]
    async fn set_document(
        &self,
        path: &DocumentPath,
        data: Fields,
        server_timestamps: &[&str],
    ) -> Result<WriteResult, DocumentError> {
        let write = set_write(self.document_name(path), data, server_timestamps);
        self.commit(write, path).await
    }

    #[instrument(skip(self, data), fields(path = %path))]
    async fn update_document(
        &self,
        path: &DocumentPath,
        data: Fields,
    ) -> Result<WriteResult, DocumentError> {
        let write = update_write(self.document_name(path), data);
        self.commit(write, path).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{StubServer, emulated};
    use crate::firestore::Value;

    const NAME: &str = "projects/p/databases/(default)/documents/users/u1";

    fn admin_fields() -> Fields {
        Fields::from([
            ("email".to_owned(), Value::string("admin@example.com")),
            ("role".to_owned(), Value::string("admin")),
        ])
    }

    #[test]
    fn test_set_write_stamps_server_time() {
        let body = serde_json::to_value(CommitRequest {
            writes: vec![set_write(NAME.to_owned(), admin_fields(), &["createdAt"])],
        })
        .unwrap();

        assert_eq!(
            body,
            json!({
                "writes": [{
                    "update": {
                        "name": NAME,
                        "fields": {
                            "email": { "stringValue": "admin@example.com" },
                            "role": { "stringValue": "admin" }
                        }
                    },
                    "updateTransforms": [{
                        "fieldPath": "createdAt",
                        "setToServerValue": "REQUEST_TIME"
                    }]
                }]
            })
        );
    }

    #[test]
    fn test_update_write_is_masked_and_requires_existing() {
        let body = serde_json::to_value(update_write(NAME.to_owned(), admin_fields())).unwrap();

        assert_eq!(
            body["updateMask"],
            json!({ "fieldPaths": ["email", "role"] })
        );
        assert_eq!(body["currentDocument"], json!({ "exists": true }));
        assert!(body.get("updateTransforms").is_none());
    }

    #[test]
    fn test_quote_field_path() {
        assert_eq!(quote_field_path("role"), "role");
        assert_eq!(quote_field_path("_meta2"), "_meta2");
        assert_eq!(quote_field_path("first-name"), "`first-name`");
        assert_eq!(quote_field_path("2fa"), "`2fa`");
        assert_eq!(quote_field_path("a`b"), "`a\\`b`");
    }

    #[test]
    fn test_commit_response_prefers_write_time() {
        let body: CommitResponse = serde_json::from_value(json!({
            "writeResults": [{ "updateTime": "2024-05-01T12:30:00Z" }],
            "commitTime": "2024-05-01T12:30:01Z"
        }))
        .unwrap();
        assert_eq!(body.write_results.len(), 1);
        assert!(body.commit_time.is_some());
    }

    fn firestore_client(server: &StubServer) -> FirestoreClient {
        let (client, auth, endpoint) = emulated(format!("{}/v1", server.base_url));
        FirestoreClient::new(client, auth, endpoint, "demo-project".to_owned())
    }

    const NOT_FOUND: &str =
        r#"{"error":{"code":404,"message":"Document not found","status":"NOT_FOUND"}}"#;

    #[tokio::test]
    async fn test_get_missing_document_is_none() {
        let server = StubServer::start(vec![(404, NOT_FOUND)]).await;
        let client = firestore_client(&server);

        let doc = client
            .get_document(&DocumentPath::new("users", "u1"))
            .await
            .unwrap();
        assert_eq!(doc, None);

        let requests = server.requests().await;
        assert_eq!(requests[0].method, "GET");
        assert!(requests[0].path.ends_with("/documents/users/u1"));
        assert!(requests[0].headers.contains("authorization: bearer owner"));
    }

    #[tokio::test]
    async fn test_get_existing_document() {
        let server = StubServer::start(vec![(
            200,
            r#"{"name":"projects/demo-project/databases/(default)/documents/users/u1","fields":{"role":{"stringValue":"user"}},"createTime":"2024-05-01T12:30:00Z","updateTime":"2024-05-01T12:30:00Z"}"#,
        )])
        .await;
        let client = firestore_client(&server);

        let doc = client
            .get_document(&DocumentPath::new("users", "u1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.get("role").and_then(Value::as_str), Some("user"));
    }

    #[tokio::test]
    async fn test_update_of_missing_document_is_not_found() {
        let server = StubServer::start(vec![(404, NOT_FOUND)]).await;
        let client = firestore_client(&server);

        let err = client
            .update_document(&DocumentPath::new("users", "u1"), admin_fields())
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::NotFound(ref p) if p == "users/u1"));

        let requests = server.requests().await;
        assert_eq!(requests[0].method, "POST");
        assert!(requests[0].path.ends_with("/documents:commit"));
        let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(body["writes"][0]["currentDocument"], json!({ "exists": true }));
    }
}
