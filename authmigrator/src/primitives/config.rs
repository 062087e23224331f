use std::sync::{Arc, OnceLock};

use crate::migrator_export;

/// Host of the authority that exchanges legacy tokens when nothing else is configured.
pub const DEFAULT_EXCHANGE_HOST: &str = "auth.firebase.com";

/// Global configuration for the migrator
static CONFIG_INSTANCE: OnceLock<Arc<MigratorConfig>> = OnceLock::new();

/// Global configuration for the migrator.
///
/// Captured by each [`crate::AuthMigrator`] when it is created; changing the global
/// configuration afterwards does not affect existing migrators.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Object)]
pub struct MigratorConfig {
    exchange_host: String,
    serialize_exchanges: bool,
}

#[migrator_export]
impl MigratorConfig {
    /// Creates a new `MigratorConfig`.
    ///
    /// # Arguments
    /// * `exchange_host` - Host of the exchange authority, e.g. `auth.firebase.com`
    /// * `serialize_exchanges` - When `true`, concurrent migrations of the same persistence key
    ///   on one migrator run one after the other, so a legacy token is exchanged at most once
    ///
    /// # Examples
    ///
    /// ## Swift
    ///
    /// ```swift
    /// let config = MigratorConfig(exchangeHost: "auth.firebase.com", serializeExchanges: true)
    /// ```
    #[uniffi::constructor]
    #[must_use]
    pub fn new(exchange_host: String, serialize_exchanges: bool) -> Self {
        Self {
            exchange_host,
            serialize_exchanges,
        }
    }

    /// Host of the exchange authority
    #[must_use]
    pub fn exchange_host(&self) -> String {
        self.exchange_host.clone()
    }

    /// Whether exchanges of the same persistence key are serialized
    #[must_use]
    pub fn serialize_exchanges(&self) -> bool {
        self.serialize_exchanges
    }
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            exchange_host: DEFAULT_EXCHANGE_HOST.to_string(),
            serialize_exchanges: true,
        }
    }
}

/// Initializes the global migrator configuration.
///
/// This function should be called once at application startup before any migrator is created.
/// Subsequent calls are ignored with a warning and return `false`.
///
/// # Examples
///
/// ## Swift
///
/// ```swift
/// AuthMigrator.initMigratorConfig(config: MigratorConfig(exchangeHost: "auth.firebase.com", serializeExchanges: true))
/// ```
#[uniffi::export]
pub fn init_migrator_config(config: Arc<MigratorConfig>) -> bool {
    let exchange_host = config.exchange_host.clone();
    if CONFIG_INSTANCE.set(config).is_ok() {
        crate::info!("migrator_config.initialized exchange_host={exchange_host}");
        true
    } else {
        crate::warn!("migrator_config.already_initialized ignoring new configuration");
        false
    }
}

/// Gets the current configuration, or the defaults if none was initialized.
#[must_use]
pub fn current_config() -> Arc<MigratorConfig> {
    CONFIG_INSTANCE
        .get()
        .cloned()
        .unwrap_or_else(|| Arc::new(MigratorConfig::default()))
}

/// Checks if the global configuration has been initialized.
#[uniffi::export]
#[must_use]
pub fn is_config_initialized() -> bool {
    CONFIG_INSTANCE.get().is_some()
}
