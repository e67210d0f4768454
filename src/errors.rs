use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for Slack Manager client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the Slack Manager API
#[derive(Debug, Error)]
pub enum Error {
    /// The client was created without a base URL
    #[error("base URL must be set")]
    EmptyBaseUrl,

    /// The base URL (joined with an endpoint) is not a valid URL
    #[error("invalid base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Options failed validation at connect time
    #[error("invalid options: {0}")]
    InvalidOptions(#[source] OptionsError),

    /// A configured header name or value is not valid HTTP
    #[error("invalid request header '{name}'")]
    InvalidHeader { name: String },

    /// A required environment variable is missing or empty
    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),

    /// Failed to build HTTP client
    #[error("Failed to build HTTP client: {0}")]
    BuildHttpClient(#[source] reqwest::Error),

    /// The health check request could not be completed
    #[error("failed to ping alerts API: {0}")]
    Ping(#[source] TransportError),

    /// The health check returned a non-success status code
    #[error("failed to ping alerts API: HTTP {status} - {message}")]
    PingStatus { status: u16, message: String },

    /// The client handle passed to [`send_alerts`](crate::send_alerts) was absent
    #[error("alert client is not set")]
    ClientUnset,

    /// `send` was called before a successful `connect`
    #[error("client not connected - call connect() first")]
    NotConnected,

    /// `send` was called without any alerts
    #[error("alerts list cannot be empty")]
    EmptyAlerts,

    /// An entry of the alerts list was absent
    #[error("alert at index {index} is missing")]
    MissingAlert { index: usize },

    /// Failed to serialize alerts
    #[error("Failed to serialize alerts: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The alerts request could not be completed
    #[error("{method} request to alerts API failed: {source}")]
    Request {
        /// HTTP method of the failed request
        method: reqwest::Method,
        #[source]
        source: TransportError,
    },

    /// Slack Manager API returned an error response
    #[error("alerts API error: HTTP {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message extracted from the response body
        message: String,
    },

    /// The request context was cancelled
    #[error("operation cancelled")]
    Cancelled,

    /// The request context deadline passed
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl Error {
    /// Check if the error is transient
    ///
    /// Returns `true` for:
    /// - Connection errors other than DNS failures and timeouts
    /// - Rate limiting (429) and server errors (5xx)
    ///
    /// These are the failures the default retry policy would have retried;
    /// seeing one here means the retry budget was exhausted.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Ping(source) | Self::Request { source, .. } => matches!(
                source.kind(),
                TransportErrorKind::Connect | TransportErrorKind::Other
            ),
            Self::Api { status, .. } | Self::PingStatus { status, .. } => {
                *status == 429 || *status >= 500
            }
            _ => false,
        }
    }

    /// Check if the error came from the request context being cancelled or
    /// running past its deadline
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

/// A violated [`Options`](crate::Options) invariant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("retryCount ({value}) must not exceed {max}")]
    RetryCountTooLarge { value: u32, max: u32 },

    #[error("retryWaitTime ({value:?}) must be at least {min:?}")]
    RetryWaitTimeTooShort { value: Duration, min: Duration },

    #[error("retryWaitTime ({value:?}) must not exceed {max:?}")]
    RetryWaitTimeTooLong { value: Duration, max: Duration },

    #[error("retryMaxWaitTime ({value:?}) must be at least {min:?}")]
    RetryMaxWaitTimeTooShort { value: Duration, min: Duration },

    #[error("retryMaxWaitTime ({value:?}) must not exceed {max:?}")]
    RetryMaxWaitTimeTooLong { value: Duration, max: Duration },

    #[error("retryMaxWaitTime ({max_wait:?}) must be greater than or equal to retryWaitTime ({wait:?})")]
    RetryMaxWaitTimeBelowWaitTime { max_wait: Duration, wait: Duration },

    #[error("requestLogger must be set")]
    MissingRequestLogger,

    #[error("retryPolicy must be set")]
    MissingRetryPolicy,

    #[error("cannot use both basic auth and token auth - choose one")]
    ConflictingAuth,

    #[error("timeout ({value:?}) must be at least {min:?}")]
    TimeoutTooShort { value: Duration, min: Duration },

    #[error("timeout ({value:?}) must not exceed {max:?}")]
    TimeoutTooLong { value: Duration, max: Duration },

    #[error("userAgent must not be empty")]
    EmptyUserAgent,

    #[error("maxIdleConns ({value}) must be at least {min}")]
    MaxIdleConnsTooSmall { value: usize, min: usize },

    #[error("maxConnsPerHost ({value}) must be at least {min}")]
    MaxConnsPerHostTooSmall { value: usize, min: usize },

    #[error("maxConnsPerHost ({value}) must not exceed {max}")]
    MaxConnsPerHostTooLarge { value: usize, max: usize },

    #[error("idleConnTimeout ({value:?}) must be at least {min:?}")]
    IdleConnTimeoutTooShort { value: Duration, min: Duration },

    #[error("idleConnTimeout ({value:?}) must not exceed {max:?}")]
    IdleConnTimeoutTooLong { value: Duration, max: Duration },

    #[error("maxRedirects ({value}) must not exceed {max}")]
    MaxRedirectsTooLarge { value: usize, max: usize },

    #[error("alertsEndpoint must not be empty")]
    EmptyAlertsEndpoint,

    #[error("pingEndpoint must not be empty")]
    EmptyPingEndpoint,
}

/// Coarse category of a transport-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The per-request timeout elapsed
    Timeout,
    /// The host name could not be resolved
    Dns,
    /// The connection could not be established or was dropped
    Connect,
    /// Anything else (body, decode, middleware errors)
    Other,
}

/// A request that failed before a response status was received
///
/// Displays the request error followed by its chain of causes, e.g.
/// `error sending request for url (...): client error (Connect): tcp connect error: Connection refused`.
#[derive(Debug, Error)]
pub struct TransportError {
    kind: TransportErrorKind,
    #[source]
    source: reqwest_middleware::Error,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut message = self.source.to_string();
        let mut cause = StdError::source(&self.source);
        while let Some(err) = cause {
            let text = err.to_string();
            // Wrappers often repeat their inner error's text.
            if !text.is_empty() && !message.contains(&text) {
                message.push_str(": ");
                message.push_str(&text);
            }
            cause = err.source();
        }
        f.write_str(&message)
    }
}

impl TransportError {
    pub(crate) fn new(source: reqwest_middleware::Error) -> Self {
        Self {
            kind: classify(&source),
            source,
        }
    }

    /// Category of the failure
    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    /// The underlying middleware/reqwest error
    pub fn inner(&self) -> &reqwest_middleware::Error {
        &self.source
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(reqwest_middleware::Error::Reqwest(err))
    }
}

fn classify(err: &reqwest_middleware::Error) -> TransportErrorKind {
    match err {
        reqwest_middleware::Error::Reqwest(err) => {
            if err.is_timeout() {
                TransportErrorKind::Timeout
            } else if chain_mentions_dns(err) {
                TransportErrorKind::Dns
            } else if err.is_connect() {
                TransportErrorKind::Connect
            } else {
                TransportErrorKind::Other
            }
        }
        reqwest_middleware::Error::Middleware(_) if chain_mentions_dns(err) => {
            TransportErrorKind::Dns
        }
        reqwest_middleware::Error::Middleware(_) => TransportErrorKind::Other,
    }
}

// hyper-util does not expose a typed resolver error, so resolution failures
// are recognised by the "dns error" text it puts in the source chain.
fn chain_mentions_dns(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if err.to_string().to_ascii_lowercase().starts_with("dns error") {
            return true;
        }
        current = err.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn middleware_error(message: &str) -> TransportError {
        TransportError::new(reqwest_middleware::Error::middleware(io::Error::new(
            io::ErrorKind::Other,
            message.to_string(),
        )))
    }

    #[derive(Debug)]
    struct ChainedError(&'static str, io::Error);

    impl fmt::Display for ChainedError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl StdError for ChainedError {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.1)
        }
    }

    fn middleware_error_from(err: io::Error) -> TransportError {
        TransportError::new(reqwest_middleware::Error::middleware(err))
    }

    #[test]
    fn test_api_error_retryable_5xx_and_429() {
        for status in [429, 500, 502, 503] {
            let error = Error::Api {
                status,
                message: "unavailable".to_string(),
            };
            assert!(error.is_retryable(), "status {status} should be retryable");
        }
    }

    #[test]
    fn test_api_error_not_retryable_4xx() {
        for status in [400, 401, 404] {
            let error = Error::Api {
                status,
                message: "client error".to_string(),
            };
            assert!(!error.is_retryable(), "status {status} should not be retryable");
        }
    }

    #[test]
    fn test_error_display() {
        let error = Error::Api {
            status: 500,
            message: "Internal server error".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "alerts API error: HTTP 500 - Internal server error"
        );
        assert_eq!(
            Error::MissingAlert { index: 2 }.to_string(),
            "alert at index 2 is missing"
        );
    }

    #[test]
    fn test_invalid_options_wraps_message() {
        let error = Error::InvalidOptions(OptionsError::RetryMaxWaitTimeBelowWaitTime {
            max_wait: Duration::from_millis(500),
            wait: Duration::from_secs(1),
        });
        assert_eq!(
            error.to_string(),
            "invalid options: retryMaxWaitTime (500ms) must be greater than or equal to retryWaitTime (1s)"
        );
        assert!(StdError::source(&error).is_some());
    }

    #[test]
    fn test_serialize_error_not_retryable() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let error = Error::Serialize(json_err);
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_interrupted_errors() {
        assert!(Error::Cancelled.is_interrupted());
        assert!(Error::DeadlineExceeded.is_interrupted());
        assert!(!Error::Cancelled.is_retryable());
        assert!(!Error::NotConnected.is_interrupted());
    }

    #[test]
    fn test_dns_text_in_chain_classified_as_dns() {
        let err = middleware_error("dns error: failed to lookup address information");
        assert_eq!(err.kind(), TransportErrorKind::Dns);
    }

    #[test]
    fn test_other_middleware_error_classified_as_other() {
        let err = middleware_error("connection reset by peer");
        assert_eq!(err.kind(), TransportErrorKind::Other);
        assert!(err.to_string().contains("connection reset by peer"));
    }

    #[test]
    fn test_transport_error_display_includes_causes() {
        let inner = io::Error::new(io::ErrorKind::ConnectionRefused, "Connection refused");
        let outer = io::Error::new(io::ErrorKind::Other, ChainedError("tcp connect error", inner));
        let err = middleware_error_from(outer);

        let message = err.to_string();
        assert!(message.contains("tcp connect error"), "{message}");
        assert!(message.ends_with(": Connection refused"), "{message}");
        assert_eq!(message.matches("tcp connect error").count(), 1, "{message}");
    }

    #[tokio::test]
    async fn test_refused_connection_classified_as_connect() {
        let err = reqwest::Client::new()
            .get("http://127.0.0.1:1/")
            .send()
            .await
            .unwrap_err();
        let err = TransportError::from(err);
        assert_eq!(err.kind(), TransportErrorKind::Connect);

        let error = Error::Request {
            method: reqwest::Method::POST,
            source: err,
        };
        let message = error.to_string();
        assert!(message.starts_with("POST request to alerts API failed"));
        assert!(message.to_ascii_lowercase().contains("connect"), "{message}");
        assert!(error.is_retryable());
    }
}
