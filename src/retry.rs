use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use std::time::Duration;

use crate::errors::{TransportError, TransportErrorKind};

/// Outcome of a single failed request attempt, as seen by a [`RetryPolicy`]
#[derive(Debug, Clone, Copy)]
pub enum Attempt<'a> {
    /// A response with a non-success status was received
    Response {
        status: StatusCode,
        headers: &'a HeaderMap,
    },
    /// The request failed before a response was received
    Failed(&'a TransportError),
}

/// Decides whether a failed attempt should be retried
///
/// The client consults the policy after every failed attempt until
/// `retry_count` retries have been made. Cancellation and deadline expiry of
/// the request [`Context`](crate::Context) end the request without consulting
/// the policy.
///
/// Any `Fn(Attempt<'_>) -> bool` closure is a policy:
///
/// ```rust
/// use slack_manager_client::{Attempt, Options};
/// use std::sync::Arc;
///
/// let only_503 = |attempt: Attempt<'_>| {
///     matches!(attempt, Attempt::Response { status, .. } if status.as_u16() == 503)
/// };
/// let options = Options::default().with_retry_policy(Some(Arc::new(only_503)));
/// ```
pub trait RetryPolicy: Send + Sync {
    fn should_retry(&self, attempt: Attempt<'_>) -> bool;
}

impl<F> RetryPolicy for F
where
    F: Fn(Attempt<'_>) -> bool + Send + Sync,
{
    fn should_retry(&self, attempt: Attempt<'_>) -> bool {
        self(attempt)
    }
}

/// Retries rate limiting (429), server errors (5xx) and transient connection
/// errors. Timeouts and DNS resolution failures are not retried.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRetryPolicy;

impl RetryPolicy for DefaultRetryPolicy {
    fn should_retry(&self, attempt: Attempt<'_>) -> bool {
        match attempt {
            Attempt::Failed(err) => !matches!(
                err.kind(),
                TransportErrorKind::Timeout | TransportErrorKind::Dns
            ),
            Attempt::Response { status, .. } => {
                status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
        }
    }
}

/// Wait before retry number `retry` (0-based): exponential growth from
/// `wait`, capped at `max_wait`. A `Retry-After` value in seconds takes
/// precedence, still capped at `max_wait`.
pub(crate) fn backoff(
    retry: u32,
    wait: Duration,
    max_wait: Duration,
    retry_after: Option<Duration>,
) -> Duration {
    if let Some(retry_after) = retry_after {
        return retry_after.min(max_wait);
    }
    let multiplier = 1u32 << retry.min(16);
    wait.saturating_mul(multiplier).min(max_wait)
}

/// Parse a `Retry-After` header given in delta-seconds
pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use std::io;

    fn response(status: u16) -> bool {
        let headers = HeaderMap::new();
        DefaultRetryPolicy.should_retry(Attempt::Response {
            status: StatusCode::from_u16(status).unwrap(),
            headers: &headers,
        })
    }

    #[test]
    fn test_default_policy_retries_429_and_5xx() {
        for status in [429, 500, 502, 503, 504] {
            assert!(response(status), "status {status} should be retried");
        }
    }

    #[test]
    fn test_default_policy_skips_client_errors() {
        for status in [400, 401, 403, 404, 409, 422] {
            assert!(!response(status), "status {status} should not be retried");
        }
    }

    #[test]
    fn test_default_policy_skips_dns_errors() {
        let err = TransportError::new(reqwest_middleware::Error::middleware(io::Error::new(
            io::ErrorKind::Other,
            "dns error: failed to lookup address information",
        )));
        assert!(!DefaultRetryPolicy.should_retry(Attempt::Failed(&err)));
    }

    #[tokio::test]
    async fn test_default_policy_skips_unresolvable_host() {
        let err = reqwest::Client::new()
            .get("http://no-such-host.invalid/")
            .send()
            .await
            .unwrap_err();
        let err = TransportError::from(err);
        assert_eq!(err.kind(), TransportErrorKind::Dns, "{err}");
        assert!(!DefaultRetryPolicy.should_retry(Attempt::Failed(&err)));
    }

    #[test]
    fn test_default_policy_retries_other_transport_errors() {
        let err = TransportError::new(reqwest_middleware::Error::middleware(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        )));
        assert!(DefaultRetryPolicy.should_retry(Attempt::Failed(&err)));
    }

    #[tokio::test]
    async fn test_default_policy_retries_refused_connection() {
        let err = reqwest::Client::new()
            .get("http://127.0.0.1:1/")
            .send()
            .await
            .unwrap_err();
        let err = TransportError::from(err);
        assert!(DefaultRetryPolicy.should_retry(Attempt::Failed(&err)));
    }

    #[test]
    fn test_closure_is_a_policy() {
        let never = |_: Attempt<'_>| false;
        let headers = HeaderMap::new();
        assert!(!never.should_retry(Attempt::Response {
            status: StatusCode::SERVICE_UNAVAILABLE,
            headers: &headers,
        }));
    }

    #[test]
    fn test_backoff_grows_exponentially_and_caps() {
        let wait = Duration::from_millis(500);
        let max = Duration::from_secs(3);
        assert_eq!(backoff(0, wait, max, None), Duration::from_millis(500));
        assert_eq!(backoff(1, wait, max, None), Duration::from_secs(1));
        assert_eq!(backoff(2, wait, max, None), Duration::from_secs(2));
        assert_eq!(backoff(3, wait, max, None), max);
        assert_eq!(backoff(90, wait, max, None), max);
    }

    #[test]
    fn test_backoff_honours_retry_after_within_cap() {
        let wait = Duration::from_millis(500);
        let max = Duration::from_secs(3);
        assert_eq!(
            backoff(0, wait, max, Some(Duration::from_secs(2))),
            Duration::from_secs(2)
        );
        assert_eq!(backoff(0, wait, max, Some(Duration::from_secs(60))), max);
    }

    #[test]
    fn test_retry_after_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static(" 7 "));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(7)));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after(&headers), None);
    }
}
