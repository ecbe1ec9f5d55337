//! Cloud Firestore REST client.
//!
//! Only the operations the provisioning flows need are covered: fetch one
//! document, and commit either a full write or a masked partial update.

mod client;
pub mod value;

pub use client::FirestoreClient;
pub use value::{Fields, Value, fields_to_json};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::auth::AuthError;
use crate::http::ApiFailure;

/// Errors that can occur when interacting with Firestore.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The document a precondition required does not exist.
    #[error("No document to update: {0}")]
    NotFound(String),

    /// Firestore returned an error.
    #[error("Firestore API error: {0}")]
    Api(ApiFailure),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// No access token could be obtained.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Location of a document: a top-level collection and a document id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath {
    collection: String,
    id: String,
}

impl DocumentPath {
    /// Path of document `id` in `collection`.
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Path relative to the database's `documents` root, with segments
    /// percent-encoded for use in a URL.
    #[must_use]
    pub fn encoded(&self) -> String {
        format!(
            "{}/{}",
            urlencoding::encode(&self.collection),
            urlencoding::encode(&self.id)
        )
    }
}

impl std::fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name.
    pub name: String,
    /// Field values; empty when the document has no fields.
    #[serde(default)]
    pub fields: Fields,
    /// When the document was created.
    pub create_time: Option<DateTime<Utc>>,
    /// When the document was last changed.
    pub update_time: Option<DateTime<Utc>>,
}

impl Document {
    /// A field's value, if set.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", fields_to_json(&self.fields))
    }
}

/// Outcome of a committed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    /// Server time of the write.
    pub update_time: Option<DateTime<Utc>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_path_display_and_encoding() {
        let path = DocumentPath::new("users", "abc 123");
        assert_eq!(path.to_string(), "users/abc 123");
        assert_eq!(path.encoded(), "users/abc%20123");
    }

    #[test]
    fn test_document_display_shows_plain_fields() {
        let doc: Document = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/users/u1",
            "fields": {
                "email": { "stringValue": "admin@example.com" },
                "role": { "stringValue": "user" }
            },
            "createTime": "2024-05-01T12:30:00Z",
            "updateTime": "2024-05-02T08:00:00Z"
        }))
        .unwrap();

        assert_eq!(doc.get("role").and_then(Value::as_str), Some("user"));
        assert_eq!(
            doc.to_string(),
            r#"{"email":"admin@example.com","role":"user"}"#
        );
    }

    #[test]
    fn test_document_without_fields() {
        let doc: Document = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/users/u1"
        }))
        .unwrap();
        assert!(doc.fields.is_empty());
        assert_eq!(doc.to_string(), "{}");
    }
}
