use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::migration::error::MigratorError;
use crate::primitives::{HttpClient, HttpError, HttpHeader, HttpMethod};

/// Rejection message when the authority refuses a token without explaining why.
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid auth token.";
/// Rejection message when the authority could not be reached or failed without explanation.
pub const UNVERIFIED_TOKEN_MESSAGE: &str = "Unable to verify auth token.";
/// Rejection message when a `200 OK` does not carry a token.
pub const MALFORMED_RESPONSE_MESSAGE: &str = "Invalid response from the exchange authority.";

/// Whether a failed exchange may succeed if attempted again with the same legacy token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum ExchangeFailureKind {
    /// The legacy token itself was refused (HTTP 400/403); retrying will not help
    Permanent,
    /// Network faults, 401, 5xx or an unusable success body; a later attempt may succeed
    Transient,
}

/// Result of one exchange attempt.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum ExchangeOutcome {
    /// The authority issued a token for the current scheme
    Success {
        /// Custom token for the session provider
        token: String,
    },
    /// The exchange failed
    Failure {
        /// Whether retrying can help
        kind: ExchangeFailureKind,
        /// The authority's `error.message`, or a fallback description
        message: String,
        /// HTTP status of the response; `None` when no response was received
        status_code: Option<u16>,
    },
}

/// Where legacy tokens of one app are exchanged, derived once from the app's configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeEndpoint {
    authority_host: String,
    authority_id: String,
    url: String,
}

impl ExchangeEndpoint {
    /// Derives the endpoint from the app's database URL.
    ///
    /// The authority id is the leading DNS label of the database host
    /// (`my-app` for `https://my-app.firebaseio.com`), and the endpoint is
    /// `https://<exchange_host>/v2/<authority id>/sessions`.
    ///
    /// # Errors
    /// - `MigratorError::InvalidDatabaseUrl` if the URL cannot be parsed
    /// - `MigratorError::MissingAuthorityHost` if it has no host or an empty leading label
    /// - `MigratorError::InvalidExchangeEndpoint` if the resulting endpoint is not a valid URL
    pub fn derive(database_url: &str, exchange_host: &str) -> Result<Self, MigratorError> {
        let parsed = Url::parse(database_url).map_err(|_| MigratorError::InvalidDatabaseUrl {
            url: database_url.to_string(),
        })?;

        let missing_host = || MigratorError::MissingAuthorityHost {
            url: database_url.to_string(),
        };
        let parsed_host = parsed.host_str().ok_or_else(missing_host)?;
        // Legacy storage keys use the host exactly as configured, before any case folding.
        let authority_host = configured_host(database_url)
            .filter(|raw| raw.eq_ignore_ascii_case(parsed_host))
            .unwrap_or(parsed_host)
            .to_string();
        let authority_id = authority_host
            .split('.')
            .next()
            .filter(|label| !label.is_empty())
            .ok_or_else(missing_host)?
            .to_string();

        let url = format!("https://{exchange_host}/v2/{authority_id}/sessions");
        Url::parse(&url).map_err(|_| MigratorError::InvalidExchangeEndpoint {
            endpoint: url.clone(),
        })?;

        Ok(Self {
            authority_host,
            authority_id,
            url,
        })
    }

    /// Full host of the app's database; prefix of every storage key.
    #[must_use]
    pub fn authority_host(&self) -> &str {
        &self.authority_host
    }

    /// Identifier of the app at the exchange authority.
    #[must_use]
    pub fn authority_id(&self) -> &str {
        &self.authority_id
    }

    /// The exchange URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Host part of `url` as written, without userinfo or port.
fn configured_host(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_and_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    if host_and_port.starts_with('[') {
        return host_and_port
            .find(']')
            .map(|end| &host_and_port[..=end]);
    }
    host_and_port.split(':').next()
}

#[derive(Serialize)]
struct ExchangeRequest<'a> {
    token: &'a str,
}

#[derive(Deserialize)]
struct ExchangeResponse {
    token: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Converts legacy tokens into current-scheme tokens with a single request per call.
///
/// Retry policy belongs to the caller; this client never retries.
pub struct ExchangeClient {
    http_client: Arc<dyn HttpClient>,
}

impl ExchangeClient {
    /// Creates a client that sends requests through `http_client`.
    #[must_use]
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self { http_client }
    }

    /// Exchanges `legacy_token` at `endpoint` and classifies the result.
    pub async fn exchange(&self, endpoint: &ExchangeEndpoint, legacy_token: &str) -> ExchangeOutcome {
        let body = match serde_json::to_vec(&ExchangeRequest {
            token: legacy_token,
        }) {
            Ok(body) => body,
            Err(e) => {
                crate::error!("exchange.encode_failed error={e}");
                return ExchangeOutcome::Failure {
                    kind: ExchangeFailureKind::Transient,
                    message: UNVERIFIED_TOKEN_MESSAGE.to_string(),
                    status_code: None,
                };
            }
        };

        let headers = vec![HttpHeader {
            name: "Content-Type".to_string(),
            value: "application/json".to_string(),
        }];

        let started = Utc::now();
        crate::debug!(
            "exchange.started authority={} timestamp={}",
            endpoint.authority_id(),
            started.to_rfc3339()
        );

        let response = self
            .http_client
            .fetch(endpoint.url().to_string(), HttpMethod::Post, headers, Some(body))
            .await;

        let outcome = classify_response(response);
        let duration_ms = (Utc::now() - started).num_milliseconds();
        match &outcome {
            ExchangeOutcome::Success { .. } => crate::info!(
                "exchange.succeeded authority={} duration_ms={duration_ms}",
                endpoint.authority_id()
            ),
            ExchangeOutcome::Failure {
                kind,
                message,
                status_code,
            } => crate::warn!(
                "exchange.failed authority={} kind={kind:?} status={status_code:?} message={message} duration_ms={duration_ms}",
                endpoint.authority_id()
            ),
        }
        outcome
    }
}

/// Maps a transport result to an [`ExchangeOutcome`].
fn classify_response(response: Result<Vec<u8>, HttpError>) -> ExchangeOutcome {
    match response {
        Ok(body) => match serde_json::from_slice::<ExchangeResponse>(&body) {
            Ok(ExchangeResponse { token }) if !token.is_empty() => ExchangeOutcome::Success { token },
            _ => ExchangeOutcome::Failure {
                kind: ExchangeFailureKind::Transient,
                message: MALFORMED_RESPONSE_MESSAGE.to_string(),
                status_code: Some(200),
            },
        },
        Err(HttpError::BadStatusCode {
            code,
            response_body,
        }) => {
            let kind = if code == 400 || code == 403 {
                ExchangeFailureKind::Permanent
            } else {
                ExchangeFailureKind::Transient
            };
            let message = serde_json::from_slice::<ErrorEnvelope>(&response_body)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| match kind {
                    ExchangeFailureKind::Permanent => INVALID_TOKEN_MESSAGE.to_string(),
                    ExchangeFailureKind::Transient => UNVERIFIED_TOKEN_MESSAGE.to_string(),
                });
            ExchangeOutcome::Failure {
                kind,
                message,
                status_code: u16::try_from(code).ok(),
            }
        }
        Err(e) => {
            crate::debug!("exchange.transport_error error={e}");
            ExchangeOutcome::Failure {
                kind: ExchangeFailureKind::Transient,
                message: UNVERIFIED_TOKEN_MESSAGE.to_string(),
                status_code: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedHttpClient;
    use serde_json::json;

    fn endpoint() -> ExchangeEndpoint {
        ExchangeEndpoint::derive("https://my-app.firebaseio.com", "auth.firebase.com").unwrap()
    }

    #[test]
    fn test_endpoint_derivation() {
        let endpoint = endpoint();
        assert_eq!(endpoint.authority_host(), "my-app.firebaseio.com");
        assert_eq!(endpoint.authority_id(), "my-app");
        assert_eq!(
            endpoint.url(),
            "https://auth.firebase.com/v2/my-app/sessions"
        );
    }

    #[test]
    fn test_endpoint_derivation_ignores_path_and_port() {
        let endpoint =
            ExchangeEndpoint::derive("https://other-app.example.org:8443/some/path", "exchange.test")
                .unwrap();
        assert_eq!(endpoint.authority_host(), "other-app.example.org");
        assert_eq!(endpoint.url(), "https://exchange.test/v2/other-app/sessions");
    }

    #[test]
    fn test_endpoint_derivation_errors() {
        assert!(matches!(
            ExchangeEndpoint::derive("not a url", "auth.firebase.com"),
            Err(MigratorError::InvalidDatabaseUrl { .. })
        ));
        assert!(matches!(
            ExchangeEndpoint::derive("my-app.firebaseio.com", "auth.firebase.com"),
            Err(MigratorError::InvalidDatabaseUrl { .. })
        ));
        assert!(matches!(
            ExchangeEndpoint::derive("mailto:someone@example.com", "auth.firebase.com"),
            Err(MigratorError::MissingAuthorityHost { .. })
        ));
        assert!(matches!(
            ExchangeEndpoint::derive("https://my-app.firebaseio.com", "bad host"),
            Err(MigratorError::InvalidExchangeEndpoint { .. })
        ));
    }

    #[test]
    fn test_endpoint_keeps_configured_host_case() {
        let endpoint =
            ExchangeEndpoint::derive("https://My-App.FirebaseIO.com/", "auth.firebase.com").unwrap();
        assert_eq!(endpoint.authority_host(), "My-App.FirebaseIO.com");
        assert_eq!(endpoint.authority_id(), "My-App");
        assert_eq!(
            endpoint.url(),
            "https://auth.firebase.com/v2/My-App/sessions"
        );

        let with_userinfo =
            ExchangeEndpoint::derive("https://user@Mixed.firebaseio.com:443", "auth.firebase.com")
                .unwrap();
        assert_eq!(with_userinfo.authority_host(), "Mixed.firebaseio.com");
    }

    #[tokio::test]
    async fn test_request_shape() {
        let http = Arc::new(ScriptedHttpClient::new());
        http.push_json(200, json!({ "token": "new-token" }));
        let client = ExchangeClient::new(http.clone());

        let outcome = client.exchange(&endpoint(), "legacy-token").await;
        assert_eq!(
            outcome,
            ExchangeOutcome::Success {
                token: "new-token".to_string()
            }
        );

        let requests = http.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.url, "https://auth.firebase.com/v2/my-app/sessions");
        assert_eq!(request.method, HttpMethod::Post);
        assert!(request
            .headers
            .iter()
            .any(|h| h.name == "Content-Type" && h.value == "application/json"));
        let body: serde_json::Value =
            serde_json::from_slice(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({ "token": "legacy-token" }));
    }

    #[test]
    fn test_success_body_with_extra_fields() {
        let body = serde_json::to_vec(&json!({ "token": "t2", "uid": "u", "expires": 3600 })).unwrap();
        assert_eq!(
            classify_response(Ok(body)),
            ExchangeOutcome::Success {
                token: "t2".to_string()
            }
        );
    }

    #[test]
    fn test_success_without_token_is_transient() {
        for body in [b"{}".to_vec(), b"not json".to_vec(), br#"{"token":""}"#.to_vec()] {
            assert_eq!(
                classify_response(Ok(body)),
                ExchangeOutcome::Failure {
                    kind: ExchangeFailureKind::Transient,
                    message: MALFORMED_RESPONSE_MESSAGE.to_string(),
                    status_code: Some(200),
                }
            );
        }
    }

    #[test]
    fn test_permanent_statuses() {
        for code in [400, 403] {
            let response_body =
                serde_json::to_vec(&json!({ "error": { "message": "invalid", "code": "INVALID_TOKEN" } }))
                    .unwrap();
            assert_eq!(
                classify_response(Err(HttpError::BadStatusCode {
                    code,
                    response_body
                })),
                ExchangeOutcome::Failure {
                    kind: ExchangeFailureKind::Permanent,
                    message: "invalid".to_string(),
                    status_code: Some(u16::try_from(code).unwrap()),
                }
            );
        }
    }

    #[test]
    fn test_transient_statuses() {
        for code in [401, 404, 429, 500, 503] {
            let outcome = classify_response(Err(HttpError::BadStatusCode {
                code,
                response_body: Vec::new(),
            }));
            assert_eq!(
                outcome,
                ExchangeOutcome::Failure {
                    kind: ExchangeFailureKind::Transient,
                    message: UNVERIFIED_TOKEN_MESSAGE.to_string(),
                    status_code: Some(u16::try_from(code).unwrap()),
                }
            );
        }
    }

    #[test]
    fn test_permanent_without_error_body_uses_fallback_message() {
        let outcome = classify_response(Err(HttpError::BadStatusCode {
            code: 403,
            response_body: b"<html>Forbidden</html>".to_vec(),
        }));
        assert_eq!(
            outcome,
            ExchangeOutcome::Failure {
                kind: ExchangeFailureKind::Permanent,
                message: INVALID_TOKEN_MESSAGE.to_string(),
                status_code: Some(403),
            }
        );
    }

    #[test]
    fn test_network_failures_are_transient_without_status() {
        for error in [
            HttpError::NoConnectivity,
            HttpError::Timeout { seconds: 30 },
            HttpError::Cancelled,
            HttpError::SslError {
                reason: "pinning".to_string(),
            },
        ] {
            assert_eq!(
                classify_response(Err(error)),
                ExchangeOutcome::Failure {
                    kind: ExchangeFailureKind::Transient,
                    message: UNVERIFIED_TOKEN_MESSAGE.to_string(),
                    status_code: None,
                }
            );
        }
    }

    #[test]
    fn test_out_of_range_status_has_no_code() {
        let outcome = classify_response(Err(HttpError::BadStatusCode {
            code: 70_000,
            response_body: Vec::new(),
        }));
        assert!(matches!(
            outcome,
            ExchangeOutcome::Failure {
                kind: ExchangeFailureKind::Transient,
                status_code: None,
                ..
            }
        ));
    }

    #[test]
    fn test_unexpected_callback_error_is_transient() {
        let error = HttpError::from(uniffi::UnexpectedUniFFICallbackError {
            reason: "403".to_string(),
        });
        assert_eq!(
            classify_response(Err(error)),
            ExchangeOutcome::Failure {
                kind: ExchangeFailureKind::Transient,
                message: UNVERIFIED_TOKEN_MESSAGE.to_string(),
                status_code: None,
            }
        );
    }
}
