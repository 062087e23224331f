#![allow(dead_code)]

use std::sync::Arc;

use authmigrator::{
    primitives::{AuthSession, DeviceKeyValueStore},
    test_utils::{InMemoryDeviceKeyValueStore, ScriptedHttpClient, StubSessionProvider},
    AuthApp, AuthAppOptions,
};
use serde_json::json;

pub const DATABASE_URL: &str = "https://my-app.firebaseio.com";
pub const AUTHORITY_HOST: &str = "my-app.firebaseio.com";
pub const EXCHANGE_URL: &str = "https://auth.firebase.com/v2/my-app/sessions";

/// An app wired to in-memory collaborators the test can inspect.
pub struct TestApp {
    pub app: Arc<AuthApp>,
    pub kv: Arc<InMemoryDeviceKeyValueStore>,
    pub http: Arc<ScriptedHttpClient>,
    pub sessions: Arc<StubSessionProvider>,
}

impl TestApp {
    pub fn new(name: &str) -> Self {
        Self::with_database_url(name, DATABASE_URL)
    }

    pub fn with_database_url(name: &str, database_url: &str) -> Self {
        let kv = Arc::new(InMemoryDeviceKeyValueStore::new());
        let http = Arc::new(ScriptedHttpClient::new());
        let sessions = Arc::new(StubSessionProvider::new());
        let app = AuthApp::new(
            name.to_string(),
            AuthAppOptions {
                database_url: database_url.to_string(),
            },
            sessions.clone(),
            kv.clone(),
            http.clone(),
        );
        Self {
            app,
            kv,
            http,
            sessions,
        }
    }

    /// Writes a blob the way the legacy SDK persisted it.
    pub fn store_legacy_session(&self, persistence_key: &str, token: &str) {
        let blob = json!({
            "token": token,
            "uid": "simplelogin:42",
            "provider": "password",
            "auth": { "uid": "simplelogin:42" },
        });
        self.kv
            .set(format!("{AUTHORITY_HOST}/{persistence_key}"), blob.to_string())
            .unwrap();
    }

    pub fn raw_legacy_entry(&self, persistence_key: &str) -> Option<String> {
        self.kv
            .get(format!("{AUTHORITY_HOST}/{persistence_key}"))
            .ok()
    }
}

pub fn session(uid: &str) -> AuthSession {
    AuthSession {
        uid: uid.to_string(),
        provider_id: Some("custom".to_string()),
    }
}
