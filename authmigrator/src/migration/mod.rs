//! Migration of a legacy session to the current authentication scheme.
//!
//! [`AuthMigrator`] drives the flow. It reads the legacy credential through
//! [`LegacyCredentialStore`], exchanges it through [`ExchangeClient`] and signs in with the
//! result. [`InstanceRegistry`] hands out one migrator per live app.

mod error;
mod exchange;
mod legacy_store;
mod migrator;
mod registry;
mod result;

pub use error::MigratorError;
pub use exchange::{
    ExchangeClient, ExchangeEndpoint, ExchangeFailureKind, ExchangeOutcome,
    INVALID_TOKEN_MESSAGE, MALFORMED_RESPONSE_MESSAGE, UNVERIFIED_TOKEN_MESSAGE,
};
pub use legacy_store::{LegacyCredentialStore, PersistenceKey, StorageKey, DEFAULT_PERSISTENCE_KEY};
pub use migrator::AuthMigrator;
pub use registry::{global_registry, release_instance, InstanceRegistry};
pub(crate) use registry::app_id;
pub use result::{MigrationRejection, MigrationResult, RejectionKind};
