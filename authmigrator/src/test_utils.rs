//! Test doubles for the foreign traits, usable from unit tests and from `tests/`.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::primitives::{
    AuthSession, DeviceKeyValueStore, HttpClient, HttpError, HttpHeader, HttpMethod,
    KeyValueStoreError, SessionProvider, SessionProviderError,
};

/// In-memory implementation of [`DeviceKeyValueStore`].
#[derive(Default)]
pub struct InMemoryDeviceKeyValueStore {
    store: Mutex<HashMap<String, String>>,
}

impl InMemoryDeviceKeyValueStore {
    /// Creates a new empty in-memory key-value store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the store holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DeviceKeyValueStore for InMemoryDeviceKeyValueStore {
    fn get(&self, key: String) -> Result<String, KeyValueStoreError> {
        let value = self
            .store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        value.ok_or(KeyValueStoreError::KeyNotFound)
    }

    fn set(&self, key: String, value: String) -> Result<(), KeyValueStoreError> {
        self.store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value);
        Ok(())
    }

    fn delete(&self, key: String) -> Result<(), KeyValueStoreError> {
        self.store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        Ok(())
    }
}

/// A request seen by [`ScriptedHttpClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Requested URL
    pub url: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Request headers
    pub headers: Vec<HttpHeader>,
    /// Request body
    pub body: Option<Vec<u8>>,
}

/// [`HttpClient`] that answers from a queue of scripted responses and records every request.
///
/// Requests beyond the scripted ones fail with `HttpError::NoConnectivity`.
#[derive(Default)]
pub struct ScriptedHttpClient {
    responses: Mutex<VecDeque<Result<Vec<u8>, HttpError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedHttpClient {
    /// Creates a client with no scripted responses
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response with `status` and a JSON body. Any status other than 200 is delivered
    /// as `HttpError::BadStatusCode`, the way host implementations report it.
    pub fn push_json(&self, status: u64, body: serde_json::Value) {
        let bytes = body.to_string().into_bytes();
        let response = if status == 200 {
            Ok(bytes)
        } else {
            Err(HttpError::BadStatusCode {
                code: status,
                response_body: bytes,
            })
        };
        self.push_response(response);
    }

    /// Queues a transport error
    pub fn push_error(&self, error: HttpError) {
        self.push_response(Err(error));
    }

    /// Makes every subsequent response arrive after `delay`
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap_or_else(PoisonError::into_inner) = Some(delay);
    }

    /// All requests received so far, oldest first
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests received so far
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn push_response(&self, response: Result<Vec<u8>, HttpError>) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
    }
}

#[async_trait::async_trait]
impl HttpClient for ScriptedHttpClient {
    async fn fetch(
        &self,
        url: String,
        method: HttpMethod,
        headers: Vec<HttpHeader>,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, HttpError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                url,
                method,
                headers,
                body,
            });

        let delay = *self.delay.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(Err(HttpError::NoConnectivity))
    }
}

/// [`SessionProvider`] with a settable current session and scripted sign-in behavior.
///
/// A successful sign-in becomes the current session. Tokens that were not registered with
/// [`StubSessionProvider::accept_token`] are rejected.
#[derive(Default)]
pub struct StubSessionProvider {
    current: Mutex<Option<AuthSession>>,
    accepted: Mutex<HashMap<String, AuthSession>>,
    rejection: Mutex<Option<String>>,
    attempts: Mutex<Vec<String>>,
}

impl StubSessionProvider {
    /// Creates a provider with no session and no accepted tokens
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current session
    pub fn set_current_session(&self, session: Option<AuthSession>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = session;
    }

    /// Makes signing in with `token` succeed with `session`
    pub fn accept_token(&self, token: &str, session: AuthSession) {
        self.accepted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.to_string(), session);
    }

    /// Makes every sign-in fail with `message`
    pub fn reject_sign_in(&self, message: &str) {
        *self.rejection.lock().unwrap_or_else(PoisonError::into_inner) = Some(message.to_string());
    }

    /// Tokens passed to `sign_in_with_custom_token`, oldest first
    #[must_use]
    pub fn sign_in_attempts(&self) -> Vec<String> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait::async_trait]
impl SessionProvider for StubSessionProvider {
    fn current_session(&self) -> Option<AuthSession> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn sign_in_with_custom_token(
        &self,
        token: String,
    ) -> Result<AuthSession, SessionProviderError> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(token.clone());

        if let Some(message) = self
            .rejection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(SessionProviderError::SignInRejected { message });
        }

        let session = self
            .accepted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&token)
            .cloned()
            .ok_or_else(|| SessionProviderError::SignInRejected {
                message: "unknown custom token".to_string(),
            })?;
        self.set_current_session(Some(session.clone()));
        Ok(session)
    }
}
