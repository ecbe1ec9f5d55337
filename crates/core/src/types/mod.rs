//! Core types for the account provisioner.
//!
//! This module provides type-safe wrappers for the identity domain.

pub mod email;
pub mod role;
pub mod uid;

pub use email::{Email, EmailError};
pub use role::{InvalidRole, Role};
pub use uid::{Uid, UidError};
