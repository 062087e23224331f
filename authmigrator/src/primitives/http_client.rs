/// HTTP client interface that native applications must implement for authmigrator to reach the
/// exchange authority.
///
/// This trait allows authmigrator to make HTTP requests through the native app's networking
/// stack, so platform concerns like proxies, certificate pinning and timeouts stay with the app.
///
/// Native implementations should map platform-specific errors to the appropriate `HttpError`
/// variants for consistent error handling across platforms.
#[uniffi::export(with_foreign)]
#[async_trait::async_trait]
pub trait HttpClient: Send + Sync {
    /// Performs a single HTTP request. Implementations must not retry.
    ///
    /// # Arguments
    /// * `url` - The absolute URL to request
    /// * `method` - The HTTP method to use for the request
    /// * `headers` - Headers to send with the request
    /// * `body` - Optional request body data for POST requests
    ///
    /// # Returns
    /// * `Result<Vec<u8>, HttpError>` - The response body when the server answered `200 OK`
    ///
    /// # Errors
    /// * `HttpError::BadStatusCode` - For every status other than 200, with the response body
    /// * `HttpError::NoConnectivity` - When no internet connection is available
    /// * `HttpError::Timeout` - When the request times out
    /// * `HttpError::DnsResolutionFailed` - When DNS lookup fails
    /// * `HttpError::ConnectionRefused` - When the server refuses the connection
    /// * `HttpError::SslError` - When SSL/TLS validation fails
    /// * `HttpError::Cancelled` - When the request is cancelled
    /// * `HttpError::Generic` - For other unexpected errors
    async fn fetch(
        &self,
        url: String,
        method: HttpMethod,
        headers: Vec<HttpHeader>,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, HttpError>;
}

/// HTTP methods supported by the HTTP client.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum HttpMethod {
    /// HTTP GET method for retrieving data
    Get,
    /// HTTP POST method for sending data
    Post,
}

/// A single HTTP request header.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct HttpHeader {
    /// Header name
    pub name: String,
    /// Header value
    pub value: String,
}

/// Represents HTTP-related errors that can occur during network requests.
///
/// Not declared with `#[auth_error]`: foreign implementations raise this error, so it must
/// cross the FFI boundary with its fields intact.
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum HttpError {
    /// The server answered with a status other than 200
    #[error("Bad status code {code}")]
    BadStatusCode {
        /// The HTTP status code that was returned
        code: u64,
        /// The response body, which may contain error details
        response_body: Vec<u8>,
    },
    /// No internet connectivity available
    #[error("No internet connectivity")]
    NoConnectivity,
    /// Request timed out
    #[error("Request timed out after {seconds} seconds")]
    Timeout {
        /// Number of seconds before timeout occurred
        seconds: u64,
    },
    /// DNS resolution failed for the hostname
    #[error("DNS resolution failed for {hostname}")]
    DnsResolutionFailed {
        /// The hostname that failed to resolve
        hostname: String,
    },
    /// Connection was refused by the server
    #[error("Connection refused by {host}")]
    ConnectionRefused {
        /// The host that refused the connection
        host: String,
    },
    /// SSL/TLS certificate validation failed
    #[error("SSL certificate validation failed: {reason}")]
    SslError {
        /// Reason for the SSL failure
        reason: String,
    },
    /// The request was cancelled before completion
    #[error("Request was cancelled")]
    Cancelled,
    /// Generic error for unexpected errors
    #[error("Generic error: {message}")]
    Generic {
        /// The error message
        message: String,
    },
}

/// Converts unexpected UniFFI callback errors to `HttpError`.
///
/// When native apps implement `HttpClient` and throw something unexpected, UniFFI hands us this
/// error instead of panicking. It never carries a server response, so it is always `Generic`
/// even if the reason looks like a status code.
impl From<uniffi::UnexpectedUniFFICallbackError> for HttpError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::Generic {
            message: error.reason,
        }
    }
}
