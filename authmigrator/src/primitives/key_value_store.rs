use thiserror::Error;

/// Errors that can occur when interacting with the device key-value store
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Error, uniffi::Error)]
pub enum KeyValueStoreError {
    /// The requested key was not found in the store
    #[error("key not found")]
    KeyNotFound,
    /// Failed to parse the value retrieved from the store
    #[error("failed to parse value")]
    ParsingFailure,
    /// Failed to update the value in the store
    #[error("failed to update value")]
    UpdateFailure,
    /// An unexpected error occurred in the foreign callback
    #[error("unexpected error in foreign callback: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for KeyValueStoreError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(e.reason)
    }
}

/// A trait which is implemented by the host application to expose the key-value storage the
/// legacy authentication SDK persisted its session into.
///
/// Android backs this with the `SharedPreferences` file the legacy SDK wrote
/// (`com.firebase.authentication.credentials`) and iOS with the keychain items it wrote.
/// Keys are passed through untouched: the legacy SDK chose them, so no prefix may be added.
///
/// Values are opaque strings. The legacy SDK stored JSON blobs; parsing them is done by
/// [`crate::migration::LegacyCredentialStore`].
#[uniffi::export(with_foreign)]
pub trait DeviceKeyValueStore: Send + Sync {
    /// Get a value from the key-value store
    ///
    /// # Errors
    /// - `KeyValueStoreError::KeyNotFound` if the key is not found
    /// - `KeyValueStoreError::ParsingFailure` if something goes wrong while parsing the value
    fn get(&self, key: String) -> Result<String, KeyValueStoreError>;

    /// Set a value in the key-value store
    ///
    /// # Errors
    /// - `KeyValueStoreError::UpdateFailure` if something goes wrong while updating the value
    fn set(&self, key: String, value: String) -> Result<(), KeyValueStoreError>;

    /// Delete a value from the key-value store
    ///
    /// # Errors
    /// - `KeyValueStoreError::KeyNotFound` if the key is not found
    /// - `KeyValueStoreError::UpdateFailure` if something goes wrong while updating the value
    fn delete(&self, key: String) -> Result<(), KeyValueStoreError>;
}
