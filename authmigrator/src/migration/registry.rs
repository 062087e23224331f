use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use once_cell::sync::Lazy;

use crate::app::{default_app, AuthApp};
use crate::migration::error::MigratorError;
use crate::migration::migrator::AuthMigrator;
use crate::primitives::config::current_config;

static GLOBAL_REGISTRY: Lazy<InstanceRegistry> = Lazy::new(InstanceRegistry::new);

/// The registry behind [`AuthMigrator::get_instance`].
pub fn global_registry() -> &'static InstanceRegistry {
    &GLOBAL_REGISTRY
}

struct RegistryEntry {
    app: Weak<AuthApp>,
    migrator: Arc<AuthMigrator>,
}

/// Maps live apps to their migrator.
///
/// Entries are keyed by the app's identity, not its name, and hold the app weakly. Dropping an
/// app removes its entry from the global registry, so its migrator goes away with it unless a
/// caller still holds one. Other registries purge dead apps on the next lookup.
pub struct InstanceRegistry {
    entries: Mutex<HashMap<usize, RegistryEntry>>,
}

impl Default for InstanceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the migrator of `app`, creating and registering it on first use.
    ///
    /// Lookup and creation happen under one lock, so concurrent callers for the same app get
    /// the same instance. A configuration error leaves the registry untouched.
    ///
    /// # Errors
    /// Returns a [`MigratorError`] if the migrator cannot be created for `app`.
    pub fn get_instance(&self, app: &Arc<AuthApp>) -> Result<Arc<AuthMigrator>, MigratorError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Self::purge_dead(&mut entries);

        let id = app_id(app);
        if let Some(entry) = entries.get(&id) {
            return Ok(Arc::clone(&entry.migrator));
        }

        let migrator = Arc::new(AuthMigrator::new(app, &current_config())?);
        entries.insert(
            id,
            RegistryEntry {
                app: Arc::downgrade(app),
                migrator: Arc::clone(&migrator),
            },
        );
        crate::debug!("registry.registered app={} size={}", app.name(), entries.len());
        Ok(migrator)
    }

    /// Returns the migrator of the process default app.
    ///
    /// # Errors
    /// - `MigratorError::DefaultAppNotInitialized` if no default app was designated
    /// - any error of [`InstanceRegistry::get_instance`]
    pub fn get_default_instance(&self) -> Result<Arc<AuthMigrator>, MigratorError> {
        let app = default_app().ok_or(MigratorError::DefaultAppNotInitialized)?;
        self.get_instance(&app)
    }

    /// Forgets the migrator of `app`. Returns whether one was registered.
    ///
    /// Callers holding the old migrator keep using it; the next lookup creates a new one.
    pub fn release(&self, app: &Arc<AuthApp>) -> bool {
        let removed = self.forget(app_id(app));
        if removed {
            crate::debug!("registry.released app={}", app.name());
        }
        removed
    }

    /// Drops the entry registered under `id`, outside the registry lock.
    pub(crate) fn forget(&self, id: usize) -> bool {
        let entry = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        entry.is_some()
    }

    /// Number of registered migrators whose app is still alive.
    #[must_use]
    pub fn len(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Self::purge_dead(&mut entries);
        entries.len()
    }

    /// Whether no live app has a registered migrator.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn purge_dead(entries: &mut HashMap<usize, RegistryEntry>) {
        entries.retain(|_, entry| entry.app.strong_count() > 0);
    }
}

/// Forgets the migrator of `app` so the next [`AuthMigrator::get_instance`] creates a new one.
///
/// Returns whether a migrator was registered. Dropping the app has the same effect.
#[uniffi::export]
pub fn release_instance(app: Arc<AuthApp>) -> bool {
    global_registry().release(&app)
}

pub(crate) fn app_id(app: &AuthApp) -> usize {
    std::ptr::from_ref(app) as usize
}
