#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

//! `authmigrator` moves a signed-in user from a legacy authentication SDK to the current
//! session provider without asking them to sign in again.
//!
//! The host application (Swift/Kotlin) provides storage, networking and the session provider
//! through foreign traits. This crate owns the migration decision procedure: it looks up the
//! legacy credential, exchanges it with the remote authority, signs the user in with the
//! exchanged token and removes the legacy credential once the outcome is final.

/// Low level primitives implemented by the host application (storage, HTTP, sessions, logging).
pub mod primitives;

/// The application-identity context a migrator is bound to.
pub mod app;

/// The legacy credential migration flow.
pub mod migration;

/// Error handling utilities shared by every module.
pub mod error;

/// Test doubles for the foreign traits.
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub(crate) use authmigrator_macros::migrator_export;

pub use app::{default_app, set_default_app, AuthApp, AuthAppOptions};
pub use migration::{AuthMigrator, MigrationRejection, MigrationResult, RejectionKind};

uniffi::setup_scaffolding!("authmigrator");
