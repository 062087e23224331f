/// Device key-value storage implemented by the host application.
pub mod key_value_store;

/// HTTP transport implemented by the host application.
pub mod http_client;

/// The current-scheme session provider implemented by the host application.
pub mod session;

/// Logging that forwards to the host application's logger.
pub mod logger;

/// Process-wide configuration.
pub mod config;

pub use http_client::{HttpClient, HttpError, HttpHeader, HttpMethod};
pub use key_value_store::{DeviceKeyValueStore, KeyValueStoreError};
pub use session::{AuthSession, SessionProvider, SessionProviderError};
