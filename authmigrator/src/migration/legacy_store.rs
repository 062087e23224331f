use std::fmt::Display;
use std::sync::Arc;

use serde::Deserialize;

use crate::app::DEFAULT_APP_NAME;
use crate::primitives::{DeviceKeyValueStore, KeyValueStoreError};

/// Persistence key the legacy SDK used for the default app.
pub const DEFAULT_PERSISTENCE_KEY: &str = "default";

/// Identifies one account slot within an app.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PersistenceKey(String);

impl PersistenceKey {
    /// Wraps an explicit persistence key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The slot the legacy SDK used for an app with this name.
    #[must_use]
    pub fn for_app_name(app_name: &str) -> Self {
        if app_name == DEFAULT_APP_NAME {
            Self::new(DEFAULT_PERSISTENCE_KEY)
        } else {
            Self::new(app_name)
        }
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PersistenceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Address of a legacy credential in the device store: `<authority host>/<persistence key>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// Builds the key the legacy SDK stored the session of `persistence_key` under.
    #[must_use]
    pub fn new(authority_host: &str, persistence_key: &PersistenceKey) -> Self {
        Self(format!("{authority_host}/{persistence_key}"))
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The blob the legacy SDK persisted. Only the token is read; other fields are ignored.
#[derive(Deserialize)]
struct LegacyAuthBlob {
    token: String,
}

/// Read/delete access to the legacy SDK's persisted sessions.
///
/// This is local storage, so there are no retries: a read that fails for any reason, including
/// a corrupt blob, is reported as "no credential", and a failed delete is logged and dropped.
pub struct LegacyCredentialStore {
    kv_store: Arc<dyn DeviceKeyValueStore>,
}

impl LegacyCredentialStore {
    /// Creates a store on top of the device key-value store.
    #[must_use]
    pub fn new(kv_store: Arc<dyn DeviceKeyValueStore>) -> Self {
        Self { kv_store }
    }

    /// Returns the legacy token stored under `key`, if there is a usable one.
    #[must_use]
    pub fn get(&self, key: &StorageKey) -> Option<String> {
        let raw = match self.kv_store.get(key.as_str().to_string()) {
            Ok(raw) => raw,
            Err(KeyValueStoreError::KeyNotFound) => return None,
            Err(e) => {
                crate::warn!("legacy_store.read_failed key={key} error={e}");
                return None;
            }
        };

        match serde_json::from_str::<LegacyAuthBlob>(&raw) {
            Ok(blob) if !blob.token.is_empty() => Some(blob.token),
            Ok(_) => {
                crate::warn!("legacy_store.empty_token key={key}");
                None
            }
            Err(e) => {
                crate::warn!("legacy_store.malformed key={key} error={e}");
                None
            }
        }
    }

    /// Whether a usable legacy token is stored under `key`.
    #[must_use]
    pub fn contains(&self, key: &StorageKey) -> bool {
        self.get(key).is_some()
    }

    /// Removes the entry under `key`. Deleting an absent key is a no-op.
    pub fn delete(&self, key: &StorageKey) {
        match self.kv_store.delete(key.as_str().to_string()) {
            Ok(()) => crate::debug!("legacy_store.deleted key={key}"),
            Err(KeyValueStoreError::KeyNotFound) => {}
            Err(e) => crate::warn!("legacy_store.delete_failed key={key} error={e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::InMemoryDeviceKeyValueStore;

    /// Key-value store whose every operation fails
    struct FailingKvStore;

    impl DeviceKeyValueStore for FailingKvStore {
        fn get(&self, _key: String) -> Result<String, KeyValueStoreError> {
            Err(KeyValueStoreError::ParsingFailure)
        }

        fn set(&self, _key: String, _value: String) -> Result<(), KeyValueStoreError> {
            Err(KeyValueStoreError::UpdateFailure)
        }

        fn delete(&self, _key: String) -> Result<(), KeyValueStoreError> {
            Err(KeyValueStoreError::UpdateFailure)
        }
    }

    /// Store that reports `KeyNotFound` on delete, like `SharedPreferences` wrappers often do
    struct StrictDeleteKvStore(InMemoryDeviceKeyValueStore);

    impl DeviceKeyValueStore for StrictDeleteKvStore {
        fn get(&self, key: String) -> Result<String, KeyValueStoreError> {
            self.0.get(key)
        }

        fn set(&self, key: String, value: String) -> Result<(), KeyValueStoreError> {
            self.0.set(key, value)
        }

        fn delete(&self, key: String) -> Result<(), KeyValueStoreError> {
            self.0.get(key.clone())?;
            self.0.delete(key)
        }
    }

    fn setup() -> (Arc<InMemoryDeviceKeyValueStore>, LegacyCredentialStore, StorageKey) {
        let kv = Arc::new(InMemoryDeviceKeyValueStore::new());
        let store = LegacyCredentialStore::new(kv.clone());
        let key = StorageKey::new("my-app.firebaseio.com", &PersistenceKey::new("default"));
        (kv, store, key)
    }

    #[test]
    fn test_storage_key_format() {
        let key = StorageKey::new("my-app.firebaseio.com", &PersistenceKey::new("work"));
        assert_eq!(key.as_str(), "my-app.firebaseio.com/work");
    }

    #[test]
    fn test_persistence_key_for_default_app() {
        assert_eq!(
            PersistenceKey::for_app_name(DEFAULT_APP_NAME).as_str(),
            DEFAULT_PERSISTENCE_KEY
        );
        assert_eq!(PersistenceKey::for_app_name("secondary").as_str(), "secondary");
    }

    #[test]
    fn test_get_reads_token_field() {
        let (kv, store, key) = setup();
        kv.set(
            key.as_str().to_string(),
            r#"{"token":"legacy-token","uid":"simplelogin:1","provider":"password"}"#.to_string(),
        )
        .unwrap();

        assert_eq!(store.get(&key).as_deref(), Some("legacy-token"));
        assert!(store.contains(&key));
    }

    #[test]
    fn test_get_absent_key() {
        let (_kv, store, key) = setup();
        assert_eq!(store.get(&key), None);
        assert!(!store.contains(&key));
    }

    #[test]
    fn test_malformed_blobs_are_absent() {
        let (kv, store, key) = setup();
        for raw in [
            "{not json",
            r#"{"uid":"simplelogin:1"}"#,
            r#"{"token":42}"#,
            r#"{"token":""}"#,
            r#""just a string""#,
        ] {
            kv.set(key.as_str().to_string(), raw.to_string()).unwrap();
            assert_eq!(store.get(&key), None, "blob {raw} should be treated as absent");
        }
        // Malformed data is left in place; only the migration flow deletes
        assert!(kv.get(key.as_str().to_string()).is_ok());
    }

    #[test]
    fn test_store_errors_are_absent() {
        let store = LegacyCredentialStore::new(Arc::new(FailingKvStore));
        let key = StorageKey::new("my-app.firebaseio.com", &PersistenceKey::new("default"));

        assert_eq!(store.get(&key), None);
        // Must not panic
        store.delete(&key);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (kv, store, key) = setup();
        kv.set(key.as_str().to_string(), r#"{"token":"t"}"#.to_string())
            .unwrap();

        store.delete(&key);
        store.delete(&key);

        assert!(matches!(
            kv.get(key.as_str().to_string()),
            Err(KeyValueStoreError::KeyNotFound)
        ));
    }

    #[test]
    fn test_delete_absent_key_on_strict_store() {
        let store = LegacyCredentialStore::new(Arc::new(StrictDeleteKvStore(
            InMemoryDeviceKeyValueStore::new(),
        )));
        let key = StorageKey::new("my-app.firebaseio.com", &PersistenceKey::new("default"));

        store.delete(&key);
        assert_eq!(store.get(&key), None);
    }

    #[test]
    fn test_keys_do_not_collide() {
        let (kv, store, _) = setup();
        let first = StorageKey::new("my-app.firebaseio.com", &PersistenceKey::new("one"));
        let second = StorageKey::new("my-app.firebaseio.com", &PersistenceKey::new("two"));
        kv.set(first.as_str().to_string(), r#"{"token":"t1"}"#.to_string())
            .unwrap();
        kv.set(second.as_str().to_string(), r#"{"token":"t2"}"#.to_string())
            .unwrap();

        store.delete(&first);

        assert_eq!(store.get(&first), None);
        assert_eq!(store.get(&second).as_deref(), Some("t2"));
    }
}
