//! Account Provisioner Core - Shared types library.
//!
//! This crate provides the types shared by the provisioning components:
//! - `provisioner` - Identity, document store and rules clients plus the
//!   provisioning operations built on them
//! - `cli` - The `provision` command-line tool
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps it
//! lightweight and lets the in-memory backend and the remote clients share
//! the same vocabulary.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for emails, identity identifiers and roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
