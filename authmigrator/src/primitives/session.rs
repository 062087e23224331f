/// A session in the current authentication scheme, as reported by the host's session provider.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct AuthSession {
    /// Stable identifier of the signed-in user
    pub uid: String,
    /// Identifier of the provider that produced the session (e.g. `custom`), if known
    pub provider_id: Option<String>,
}

/// Errors raised by the host's session provider.
///
/// The migrator does not interpret them beyond success/failure; the message is carried into
/// the rejection returned to the caller.
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum SessionProviderError {
    /// The provider refused the custom token
    #[error("sign-in rejected: {message}")]
    SignInRejected {
        /// Reason reported by the provider
        message: String,
    },
    /// The provider could not be reached or failed internally
    #[error("session provider unavailable: {message}")]
    Unavailable {
        /// Reason reported by the provider
        message: String,
    },
    /// An unexpected error occurred in the foreign callback
    #[error("unexpected error in foreign callback: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for SessionProviderError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(e.reason)
    }
}

impl SessionProviderError {
    /// The provider's message without the variant prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::SignInRejected { message } | Self::Unavailable { message } => message,
            Self::UnexpectedUniFFICallbackError(reason) => reason,
        }
    }
}

/// The session provider of the current authentication scheme, implemented by the host app.
///
/// On Android/iOS this wraps the current auth SDK of the application context the migrator was
/// created for.
#[uniffi::export(with_foreign)]
#[async_trait::async_trait]
pub trait SessionProvider: Send + Sync {
    /// Returns the session that is currently signed in, if any.
    fn current_session(&self) -> Option<AuthSession>;

    /// Signs in with a custom token issued by the exchange authority and returns the new session.
    ///
    /// # Errors
    /// Any error means the session was not established.
    async fn sign_in_with_custom_token(
        &self,
        token: String,
    ) -> Result<AuthSession, SessionProviderError>;
}
