//! The application-identity context a migrator is bound to.
//!
//! An [`AuthApp`] mirrors one configured app instance of the current auth SDK on the host: it
//! has a name, the backend configuration the legacy SDK derived its storage keys from, and the
//! collaborators the migrator drives.

use std::sync::{Arc, Mutex, PoisonError};

use crate::migration::{app_id, global_registry};
use crate::migrator_export;
use crate::primitives::{DeviceKeyValueStore, HttpClient, SessionProvider};

/// Name the host SDK gives its default app.
pub const DEFAULT_APP_NAME: &str = "[DEFAULT]";

/// The app the host designated as the process default, used by
/// [`crate::AuthMigrator::get_default_instance`].
static DEFAULT_APP: Mutex<Option<Arc<AuthApp>>> = Mutex::new(None);

/// Backend configuration of an app.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct AuthAppOptions {
    /// URL of the app's realtime database, e.g. `https://my-app.firebaseio.com`.
    ///
    /// The leading DNS label of its host identifies the app to the exchange authority and is
    /// part of the key the legacy SDK stored its session under.
    pub database_url: String,
}

/// An application-identity context.
#[derive(uniffi::Object)]
pub struct AuthApp {
    name: String,
    options: AuthAppOptions,
    session_provider: Arc<dyn SessionProvider>,
    key_value_store: Arc<dyn DeviceKeyValueStore>,
    http_client: Arc<dyn HttpClient>,
}

#[migrator_export]
impl AuthApp {
    /// Creates a new app context.
    ///
    /// # Arguments
    /// * `name` - The app's name; [`DEFAULT_APP_NAME`] for the default app
    /// * `options` - The app's backend configuration
    /// * `session_provider` - The current auth SDK bound to this app
    /// * `key_value_store` - The storage the legacy SDK wrote its session into
    /// * `http_client` - Transport used to reach the exchange authority
    #[uniffi::constructor]
    #[must_use]
    pub fn new(
        name: String,
        options: AuthAppOptions,
        session_provider: Arc<dyn SessionProvider>,
        key_value_store: Arc<dyn DeviceKeyValueStore>,
        http_client: Arc<dyn HttpClient>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name,
            options,
            session_provider,
            key_value_store,
            http_client,
        })
    }

    /// The app's name
    #[must_use]
    pub fn name(&self) -> String {
        self.name.clone()
    }

    /// The app's backend configuration
    #[must_use]
    pub fn options(&self) -> AuthAppOptions {
        self.options.clone()
    }

    /// Whether this is the host SDK's default app
    #[must_use]
    pub fn is_default_app(&self) -> bool {
        self.name == DEFAULT_APP_NAME
    }
}

impl AuthApp {
    /// The session provider bound to this app
    #[must_use]
    pub fn session_provider(&self) -> Arc<dyn SessionProvider> {
        Arc::clone(&self.session_provider)
    }

    /// The storage the legacy SDK wrote into
    #[must_use]
    pub fn key_value_store(&self) -> Arc<dyn DeviceKeyValueStore> {
        Arc::clone(&self.key_value_store)
    }

    /// The transport used to reach the exchange authority
    #[must_use]
    pub fn http_client(&self) -> Arc<dyn HttpClient> {
        Arc::clone(&self.http_client)
    }
}

impl Drop for AuthApp {
    fn drop(&mut self) {
        if global_registry().forget(app_id(self)) {
            crate::debug!("registry.app_dropped app={}", self.name);
        }
    }
}

/// Designates `app` as the process default app, replacing any previous designation.
#[uniffi::export]
pub fn set_default_app(app: Arc<AuthApp>) {
    let name = app.name.clone();
    let previous = DEFAULT_APP
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(app);
    if previous.is_some() {
        crate::warn!("default_app.replaced name={name}");
    } else {
        crate::info!("default_app.set name={name}");
    }
}

/// Returns the process default app, if one was designated.
#[uniffi::export]
#[must_use]
pub fn default_app() -> Option<Arc<AuthApp>> {
    DEFAULT_APP
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{InMemoryDeviceKeyValueStore, ScriptedHttpClient, StubSessionProvider};
    use serial_test::serial;

    fn app(name: &str) -> Arc<AuthApp> {
        AuthApp::new(
            name.to_string(),
            AuthAppOptions {
                database_url: "https://my-app.firebaseio.com".to_string(),
            },
            Arc::new(StubSessionProvider::new()),
            Arc::new(InMemoryDeviceKeyValueStore::new()),
            Arc::new(ScriptedHttpClient::new()),
        )
    }

    #[test]
    fn test_default_app_name() {
        assert!(app(DEFAULT_APP_NAME).is_default_app());
        assert!(!app("secondary").is_default_app());
    }

    #[test]
    #[serial]
    fn test_set_default_app_replaces_previous() {
        let first = app("first");
        let second = app("second");

        set_default_app(first);
        set_default_app(second.clone());

        let current = default_app().expect("default app should be set");
        assert!(Arc::ptr_eq(&current, &second));
    }
}
