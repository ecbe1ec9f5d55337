//! Identity record identifier.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Uid`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UidError {
    /// The identifier is empty.
    #[error("uid cannot be empty")]
    Empty,
    /// The identifier is longer than the provider allows.
    #[error("uid must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The identifier contains a `/`, which would escape its document path.
    #[error("uid cannot contain '/'")]
    Slash,
}

/// Unique identifier of an identity record (the provider's `localId`).
///
/// Profile documents are keyed by this value, so it must be usable as a
/// single document path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uid(String);

impl Uid {
    /// Maximum length of a uid accepted by the identity provider.
    pub const MAX_LENGTH: usize = 128;

    /// Create a `Uid` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, longer than 128 characters, or
    /// contains a `/`.
    pub fn new(id: impl Into<String>) -> Result<Self, UidError> {
        let id = id.into();
        if id.is_empty() {
            return Err(UidError::Empty);
        }
        if id.chars().count() > Self::MAX_LENGTH {
            return Err(UidError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if id.contains('/') {
            return Err(UidError::Slash);
        }
        Ok(Self(id))
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Uid {
    type Error = UidError;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<Uid> for String {
    fn from(uid: Uid) -> Self {
        uid.0
    }
}

impl AsRef<str> for Uid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
