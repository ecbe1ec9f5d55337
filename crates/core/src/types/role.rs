//! Profile role stored on application user documents.

use serde::{Deserialize, Serialize};

/// Error returned when a string is not a known [`Role`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid role: {0}. Valid roles: admin, user")]
pub struct InvalidRole(pub String);

/// Application role held in a profile document's `role` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access to the application's administrative features.
    Admin,
    /// Regular application user.
    #[default]
    User,
}

impl Role {
    /// The string stored in the document store.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = InvalidRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            _ => Err(InvalidRole(s.to_owned())),
        }
    }
}
