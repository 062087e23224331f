use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use chrono::Utc;

use crate::app::AuthApp;
use crate::migration::error::MigratorError;
use crate::migration::exchange::{ExchangeClient, ExchangeEndpoint, ExchangeOutcome};
use crate::migration::legacy_store::{LegacyCredentialStore, PersistenceKey, StorageKey};
use crate::migration::registry::global_registry;
use crate::migration::result::{MigrationResult, RejectionKind};
use crate::migrator_export;
use crate::primitives::config::MigratorConfig;
use crate::primitives::logger::{get_context, LOG_CONTEXT};
use crate::primitives::SessionProvider;

/// Migrates the legacy session of one app to the app's current session provider.
///
/// There is one `AuthMigrator` per live [`AuthApp`]; obtain it with
/// [`AuthMigrator::get_instance`]. Everything derived from the app's configuration (authority
/// host, exchange endpoint) is computed when the migrator is created.
///
/// The migrator keeps only a weak reference to its app, so it never keeps the app alive.
#[derive(uniffi::Object)]
pub struct AuthMigrator {
    app: Weak<AuthApp>,
    app_name: String,
    default_key: PersistenceKey,
    endpoint: ExchangeEndpoint,
    store: LegacyCredentialStore,
    exchange_client: ExchangeClient,
    session_provider: Arc<dyn SessionProvider>,
    serialize_exchanges: bool,
    key_locks: Mutex<HashMap<StorageKey, Arc<tokio::sync::Mutex<()>>>>,
}

#[migrator_export]
impl AuthMigrator {
    /// Returns the migrator of `app`, creating it on first use.
    ///
    /// # Errors
    /// Returns a [`MigratorError`] if the app's database URL cannot be turned into an exchange
    /// endpoint. This is a configuration error; retrying will fail the same way.
    #[uniffi::constructor]
    pub fn get_instance(app: Arc<AuthApp>) -> Result<Arc<Self>, MigratorError> {
        global_registry().get_instance(&app)
    }

    /// Returns the migrator of the default app (see [`crate::set_default_app`]).
    ///
    /// # Errors
    /// - `MigratorError::DefaultAppNotInitialized` if no default app was designated
    /// - any configuration error of [`AuthMigrator::get_instance`]
    #[uniffi::constructor]
    pub fn get_default_instance() -> Result<Arc<Self>, MigratorError> {
        global_registry().get_default_instance()
    }

    /// The app this migrator belongs to, while it is alive.
    #[must_use]
    pub fn app(&self) -> Option<Arc<AuthApp>> {
        self.app.upgrade()
    }

    /// Name of the app this migrator belongs to.
    #[must_use]
    pub fn app_name(&self) -> String {
        self.app_name.clone()
    }

    /// The URL legacy tokens are exchanged at.
    #[must_use]
    pub fn exchange_endpoint(&self) -> String {
        self.endpoint.url().to_string()
    }

    /// Migrates the legacy session stored under the app's default persistence key (the app's
    /// name, or `default` for the default app).
    ///
    /// See [`AuthMigrator::migrate_for_key`].
    pub async fn migrate(self: Arc<Self>) -> MigrationResult {
        let key = self.default_key.clone();
        self.spawn_migration(key).await
    }

    /// Migrates the legacy session stored under `persistence_key`.
    ///
    /// 1. If a session is already signed in, the legacy credential is removed and the existing
    ///    session is returned untouched.
    /// 2. If no usable legacy credential is stored, nothing happens.
    /// 3. Otherwise the legacy token is exchanged once with the authority.
    /// 4. A successful exchange signs the user in with the new token; the legacy credential is
    ///    removed once the sign-in succeeds. A permanent rejection removes it as well. Transient
    ///    failures and sign-in failures keep it so a later call can try again.
    ///
    /// The work runs as a background task: dropping the returned future does not stop it, and
    /// its storage side effects still apply.
    pub async fn migrate_for_key(self: Arc<Self>, persistence_key: String) -> MigrationResult {
        self.spawn_migration(PersistenceKey::new(persistence_key)).await
    }

    /// Whether a usable legacy credential is stored under the default persistence key.
    #[must_use]
    pub fn has_legacy_credential(&self) -> bool {
        self.store.contains(&self.storage_key(&self.default_key))
    }

    /// Whether a usable legacy credential is stored under `persistence_key`.
    #[must_use]
    pub fn has_legacy_credential_for_key(&self, persistence_key: String) -> bool {
        self.store
            .contains(&self.storage_key(&PersistenceKey::new(persistence_key)))
    }

    /// Removes the legacy credential stored under the default persistence key, if any.
    pub fn clear_legacy_credential(&self) {
        self.store.delete(&self.storage_key(&self.default_key));
    }

    /// Removes the legacy credential stored under `persistence_key`, if any.
    pub fn clear_legacy_credential_for_key(&self, persistence_key: String) {
        self.store
            .delete(&self.storage_key(&PersistenceKey::new(persistence_key)));
    }
}

impl AuthMigrator {
    /// Creates the migrator of `app`. Only the registry calls this.
    pub(crate) fn new(app: &Arc<AuthApp>, config: &MigratorConfig) -> Result<Self, MigratorError> {
        let options = app.options();
        let endpoint = ExchangeEndpoint::derive(&options.database_url, &config.exchange_host())?;
        let app_name = app.name();

        crate::info!(
            "migrator.created app={app_name} authority={} endpoint={}",
            endpoint.authority_id(),
            endpoint.url()
        );

        Ok(Self {
            app: Arc::downgrade(app),
            default_key: PersistenceKey::for_app_name(&app_name),
            app_name,
            endpoint,
            store: LegacyCredentialStore::new(app.key_value_store()),
            exchange_client: ExchangeClient::new(app.http_client()),
            session_provider: app.session_provider(),
            serialize_exchanges: config.serialize_exchanges(),
            key_locks: Mutex::new(HashMap::new()),
        })
    }

    fn storage_key(&self, persistence_key: &PersistenceKey) -> StorageKey {
        StorageKey::new(self.endpoint.authority_host(), persistence_key)
    }

    /// Lock serializing steps 2-4 of a migration for one storage key.
    fn key_lock(&self, key: &StorageKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.key_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    /// Gives back a lock taken with [`Self::key_lock`], forgetting it once nobody else holds it.
    ///
    /// Handles are only cloned under the map lock, so a count of one there means no migration
    /// of `key` is running or waiting.
    fn release_key_lock(&self, key: &StorageKey, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.key_locks.lock().unwrap_or_else(PoisonError::into_inner);
        drop(lock);
        if locks
            .get(key)
            .is_some_and(|remaining| Arc::strong_count(remaining) == 1)
        {
            locks.remove(key);
        }
    }

    #[cfg(test)]
    fn tracked_key_locks(&self) -> usize {
        self.key_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Runs the migration on the runtime as its own task and waits for it.
    async fn spawn_migration(self: Arc<Self>, persistence_key: PersistenceKey) -> MigrationResult {
        let context = RefCell::new(get_context());
        let task = tokio::spawn(LOG_CONTEXT.scope(context, async move {
            self.run_migration(persistence_key).await
        }));

        match task.await {
            Ok(result) => result,
            Err(e) => {
                crate::error!("migration.task_failed error={e}");
                MigrationResult::rejected(
                    RejectionKind::TransientExchangeFailure,
                    format!("migration task failed: {e}"),
                    None,
                )
            }
        }
    }

    async fn run_migration(&self, persistence_key: PersistenceKey) -> MigrationResult {
        let storage_key = self.storage_key(&persistence_key);
        let started = Utc::now();

        if let Some(session) = self.session_provider.current_session() {
            self.store.delete(&storage_key);
            crate::info!(
                "migration.already_active app={} key={persistence_key} timestamp={}",
                self.app_name,
                Utc::now().to_rfc3339()
            );
            return MigrationResult::AlreadyActive { session };
        }

        let result = if self.serialize_exchanges {
            let lock = self.key_lock(&storage_key);
            let result = {
                let _guard = lock.lock().await;
                self.exchange_and_sign_in(&persistence_key, &storage_key)
                    .await
            };
            self.release_key_lock(&storage_key, lock);
            result
        } else {
            self.exchange_and_sign_in(&persistence_key, &storage_key)
                .await
        };

        let duration_ms = (Utc::now() - started).num_milliseconds();
        match &result {
            MigrationResult::Migrated { session } => crate::info!(
                "migration.succeeded app={} key={persistence_key} uid={} duration_ms={duration_ms} timestamp={}",
                self.app_name,
                session.uid,
                Utc::now().to_rfc3339()
            ),
            MigrationResult::Rejected { reason } => crate::warn!(
                "migration.rejected app={} key={persistence_key} kind={:?} status={:?} message={} credential_kept={} duration_ms={duration_ms} timestamp={}",
                self.app_name,
                reason.kind,
                reason.status_code,
                reason.message,
                reason.is_retryable(),
                Utc::now().to_rfc3339()
            ),
            MigrationResult::AlreadyActive { .. } | MigrationResult::NoLegacyCredential => {}
        }
        result
    }

    /// Steps 2-4: look up the legacy token, exchange it and sign in with the result.
    async fn exchange_and_sign_in(
        &self,
        persistence_key: &PersistenceKey,
        storage_key: &StorageKey,
    ) -> MigrationResult {
        let Some(legacy_token) = self.store.get(storage_key) else {
            crate::info!(
                "migration.no_legacy_credential app={} key={persistence_key} timestamp={}",
                self.app_name,
                Utc::now().to_rfc3339()
            );
            return MigrationResult::NoLegacyCredential;
        };

        crate::info!(
            "migration.exchange_started app={} key={persistence_key} timestamp={}",
            self.app_name,
            Utc::now().to_rfc3339()
        );

        match self
            .exchange_client
            .exchange(&self.endpoint, &legacy_token)
            .await
        {
            ExchangeOutcome::Success { token } => {
                match self.session_provider.sign_in_with_custom_token(token).await {
                    Ok(session) => {
                        self.store.delete(storage_key);
                        MigrationResult::Migrated { session }
                    }
                    Err(e) => MigrationResult::rejected(
                        RejectionKind::SignInFailure,
                        e.message().to_string(),
                        None,
                    ),
                }
            }
            ExchangeOutcome::Failure {
                kind,
                message,
                status_code,
            } => {
                let kind = RejectionKind::from(kind);
                if kind == RejectionKind::PermanentExchangeFailure {
                    self.store.delete(storage_key);
                }
                MigrationResult::rejected(kind, message, status_code)
            }
        }
    }
}
