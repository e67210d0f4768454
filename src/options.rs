use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::OptionsError;
use crate::logger::{NoopLogger, RequestLogger};
use crate::retry::{DefaultRetryPolicy, RetryPolicy};
#[cfg(any(feature = "native-tls", feature = "rustls-tls"))]
use crate::tls::TlsConfig;

pub(crate) const MAX_RETRY_COUNT: u32 = 100;
pub(crate) const MIN_RETRY_WAIT_TIME: Duration = Duration::from_millis(100);
pub(crate) const MAX_RETRY_WAIT_TIME: Duration = Duration::from_secs(60);
pub(crate) const MIN_RETRY_MAX_WAIT_TIME: Duration = Duration::from_millis(100);
pub(crate) const MAX_RETRY_MAX_WAIT_TIME: Duration = Duration::from_secs(5 * 60);
pub(crate) const MIN_TIMEOUT: Duration = Duration::from_secs(1);
pub(crate) const MAX_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub(crate) const MIN_MAX_IDLE_CONNS: usize = 1;
pub(crate) const MIN_MAX_CONNS_PER_HOST: usize = 1;
pub(crate) const MAX_MAX_CONNS_PER_HOST: usize = 100;
pub(crate) const MIN_IDLE_CONN_TIMEOUT: Duration = Duration::from_secs(1);
pub(crate) const MAX_IDLE_CONN_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub(crate) const MAX_MAX_REDIRECTS: usize = 20;

const CONTENT_TYPE: &str = "Content-Type";
const ACCEPT: &str = "Accept";
const APPLICATION_JSON: &str = "application/json";

/// User-Agent sent when none is configured
pub const DEFAULT_USER_AGENT: &str = concat!("slack-manager-client/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_AUTH_SCHEME: &str = "Bearer";
pub const DEFAULT_ALERTS_ENDPOINT: &str = "alerts";
pub const DEFAULT_PING_ENDPOINT: &str = "ping";

/// Authentication resolved from [`Options`] once they have been validated
#[derive(Clone, PartialEq, Eq)]
pub(crate) enum Auth {
    None,
    Basic { username: String, password: String },
    Token { scheme: String, token: String },
}

/// Configuration for a [`Client`](crate::Client)
///
/// Start from [`Options::default`] and chain `with_*` calls. Each call checks
/// its own input and silently keeps the current value when the input is out of
/// range; cross-field rules are checked by [`Options::validate`], which the
/// client runs when connecting.
///
/// ```rust
/// use slack_manager_client::Options;
/// use std::time::Duration;
///
/// let options = Options::default()
///     .with_retry_count(5)
///     .with_retry_wait_time(Duration::from_secs(1))
///     .with_auth_token("my-token")
///     .with_request_header("X-Team", "platform");
///
/// assert_eq!(options.retry_count(), 5);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct Options {
    pub(crate) retry_count: u32,
    pub(crate) retry_wait_time: Duration,
    pub(crate) retry_max_wait_time: Duration,
    pub(crate) request_logger: Option<Arc<dyn RequestLogger>>,
    pub(crate) retry_policy: Option<Arc<dyn RetryPolicy>>,
    pub(crate) request_headers: HashMap<String, String>,
    pub(crate) basic_auth_username: String,
    pub(crate) basic_auth_password: String,
    pub(crate) auth_scheme: String,
    pub(crate) auth_token: String,
    pub(crate) timeout: Duration,
    pub(crate) user_agent: String,
    pub(crate) max_idle_conns: usize,
    pub(crate) max_conns_per_host: usize,
    pub(crate) idle_conn_timeout: Duration,
    pub(crate) disable_keep_alive: bool,
    pub(crate) max_redirects: usize,
    #[cfg(any(feature = "native-tls", feature = "rustls-tls"))]
    pub(crate) tls_config: Option<TlsConfig>,
    pub(crate) alerts_endpoint: String,
    pub(crate) ping_endpoint: String,
}

impl Default for Options {
    fn default() -> Self {
        let mut request_headers = HashMap::new();
        request_headers.insert(CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string());
        request_headers.insert(ACCEPT.to_string(), APPLICATION_JSON.to_string());

        Self {
            retry_count: 3,
            retry_wait_time: Duration::from_millis(500),
            retry_max_wait_time: Duration::from_secs(3),
            request_logger: Some(Arc::new(NoopLogger)),
            retry_policy: Some(Arc::new(DefaultRetryPolicy)),
            request_headers,
            basic_auth_username: String::new(),
            basic_auth_password: String::new(),
            auth_scheme: DEFAULT_AUTH_SCHEME.to_string(),
            auth_token: String::new(),
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_idle_conns: 100,
            max_conns_per_host: 10,
            idle_conn_timeout: Duration::from_secs(90),
            disable_keep_alive: false,
            max_redirects: 10,
            #[cfg(any(feature = "native-tls", feature = "rustls-tls"))]
            tls_config: None,
            alerts_endpoint: DEFAULT_ALERTS_ENDPOINT.to_string(),
            ping_endpoint: DEFAULT_PING_ENDPOINT.to_string(),
        }
    }
}

fn in_range<T: PartialOrd>(value: T, min: T, max: T) -> bool {
    value >= min && value <= max
}

fn is_protected_header(name: &str) -> bool {
    name.eq_ignore_ascii_case(CONTENT_TYPE) || name.eq_ignore_ascii_case(ACCEPT)
}

impl Options {
    /// Number of retries after the first attempt, `0..=100`. Default 3.
    #[must_use]
    pub fn with_retry_count(mut self, count: u32) -> Self {
        if count <= MAX_RETRY_COUNT {
            self.retry_count = count;
        }
        self
    }

    /// Wait before the first retry, `100ms..=1min`. Default 500ms.
    /// Later retries double it, up to the max wait time.
    #[must_use]
    pub fn with_retry_wait_time(mut self, wait: Duration) -> Self {
        if in_range(wait, MIN_RETRY_WAIT_TIME, MAX_RETRY_WAIT_TIME) {
            self.retry_wait_time = wait;
        }
        self
    }

    /// Upper bound for any single retry wait, `100ms..=5min`. Default 3s.
    /// Must not be below the retry wait time; checked by [`Options::validate`].
    #[must_use]
    pub fn with_retry_max_wait_time(mut self, max_wait: Duration) -> Self {
        if in_range(max_wait, MIN_RETRY_MAX_WAIT_TIME, MAX_RETRY_MAX_WAIT_TIME) {
            self.retry_max_wait_time = max_wait;
        }
        self
    }

    /// Logger receiving request and error messages. `None` is ignored.
    #[must_use]
    pub fn with_request_logger(mut self, logger: Option<Arc<dyn RequestLogger>>) -> Self {
        if logger.is_some() {
            self.request_logger = logger;
        }
        self
    }

    /// Replace the [`DefaultRetryPolicy`]. `None` is ignored.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: Option<Arc<dyn RetryPolicy>>) -> Self {
        if policy.is_some() {
            self.retry_policy = policy;
        }
        self
    }

    /// Add a header to every request
    ///
    /// Name and value are trimmed. Empty names and the protected
    /// `Content-Type` and `Accept` headers (any case) are ignored. A header
    /// with the same name in a different case is replaced.
    #[must_use]
    pub fn with_request_header(mut self, name: &str, value: &str) -> Self {
        let name = name.trim();
        if name.is_empty() || is_protected_header(name) {
            return self;
        }
        self.request_headers
            .retain(|existing, _| !existing.eq_ignore_ascii_case(name));
        self.request_headers
            .insert(name.to_string(), value.trim().to_string());
        self
    }

    /// HTTP Basic authentication. Cannot be combined with a token.
    #[must_use]
    pub fn with_basic_auth(mut self, username: &str, password: &str) -> Self {
        self.basic_auth_username = username.to_string();
        self.basic_auth_password = password.to_string();
        self
    }

    /// Scheme placed before the token in the `Authorization` header. Default `Bearer`.
    #[must_use]
    pub fn with_auth_scheme(mut self, scheme: &str) -> Self {
        let scheme = scheme.trim();
        if !scheme.is_empty() {
            self.auth_scheme = scheme.to_string();
        }
        self
    }

    /// Token sent as `Authorization: <scheme> <token>`. Cannot be combined with basic auth.
    #[must_use]
    pub fn with_auth_token(mut self, token: &str) -> Self {
        self.auth_token = token.to_string();
        self
    }

    /// Per-request timeout, `1s..=5min`. Default 30s.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if in_range(timeout, MIN_TIMEOUT, MAX_TIMEOUT) {
            self.timeout = timeout;
        }
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        let user_agent = user_agent.trim();
        if !user_agent.is_empty() {
            self.user_agent = user_agent.to_string();
        }
        self
    }

    /// Idle connections kept in the pool, at least 1. Default 100.
    #[must_use]
    pub fn with_max_idle_conns(mut self, n: usize) -> Self {
        if n >= MIN_MAX_IDLE_CONNS {
            self.max_idle_conns = n;
        }
        self
    }

    /// Concurrent requests in flight, `1..=100`. Default 10.
    #[must_use]
    pub fn with_max_conns_per_host(mut self, n: usize) -> Self {
        if in_range(n, MIN_MAX_CONNS_PER_HOST, MAX_MAX_CONNS_PER_HOST) {
            self.max_conns_per_host = n;
        }
        self
    }

    /// How long an idle connection stays pooled, `1s..=5min`. Default 90s.
    #[must_use]
    pub fn with_idle_conn_timeout(mut self, timeout: Duration) -> Self {
        if in_range(timeout, MIN_IDLE_CONN_TIMEOUT, MAX_IDLE_CONN_TIMEOUT) {
            self.idle_conn_timeout = timeout;
        }
        self
    }

    /// Open a new connection for every request
    #[must_use]
    pub fn with_disable_keep_alive(mut self, disable: bool) -> Self {
        self.disable_keep_alive = disable;
        self
    }

    /// Redirects to follow, `0..=20` where 0 disables them. Default 10.
    #[must_use]
    pub fn with_max_redirects(mut self, n: usize) -> Self {
        if n <= MAX_MAX_REDIRECTS {
            self.max_redirects = n;
        }
        self
    }

    /// Custom TLS settings. `None` is ignored.
    #[cfg(any(feature = "native-tls", feature = "rustls-tls"))]
    #[must_use]
    pub fn with_tls_config(mut self, config: Option<TlsConfig>) -> Self {
        if config.is_some() {
            self.tls_config = config;
        }
        self
    }

    /// Path of the alerts endpoint, relative to the base URL. Default `alerts`.
    #[must_use]
    pub fn with_alerts_endpoint(mut self, endpoint: &str) -> Self {
        let endpoint = endpoint.trim();
        if !endpoint.is_empty() {
            self.alerts_endpoint = endpoint.to_string();
        }
        self
    }

    /// Path of the health check endpoint, relative to the base URL. Default `ping`.
    #[must_use]
    pub fn with_ping_endpoint(mut self, endpoint: &str) -> Self {
        let endpoint = endpoint.trim();
        if !endpoint.is_empty() {
            self.ping_endpoint = endpoint.to_string();
        }
        self
    }

    /// Get the number of retries after the first attempt
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Get the base wait before the first retry
    pub fn retry_wait_time(&self) -> Duration {
        self.retry_wait_time
    }

    /// Get the upper bound on any single retry wait
    pub fn retry_max_wait_time(&self) -> Duration {
        self.retry_max_wait_time
    }

    /// Configured value of a request header, matched case-insensitively
    pub fn request_header(&self, name: &str) -> Option<&str> {
        self.request_headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Get all headers sent with every request
    pub fn request_headers(&self) -> &HashMap<String, String> {
        &self.request_headers
    }

    /// Get the scheme used with token authentication
    pub fn auth_scheme(&self) -> &str {
        &self.auth_scheme
    }

    /// Get the per-request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the User-Agent header value
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Get the idle connection pool size
    pub fn max_idle_conns(&self) -> usize {
        self.max_idle_conns
    }

    /// Get the limit on concurrent requests to the API host
    pub fn max_conns_per_host(&self) -> usize {
        self.max_conns_per_host
    }

    /// Get how long idle connections are kept open
    pub fn idle_conn_timeout(&self) -> Duration {
        self.idle_conn_timeout
    }

    /// Check whether connection reuse is disabled
    pub fn disable_keep_alive(&self) -> bool {
        self.disable_keep_alive
    }

    /// Get the number of redirects followed
    pub fn max_redirects(&self) -> usize {
        self.max_redirects
    }

    /// Get the custom TLS settings, if any
    #[cfg(any(feature = "native-tls", feature = "rustls-tls"))]
    pub fn tls_config(&self) -> Option<&TlsConfig> {
        self.tls_config.as_ref()
    }

    /// Get the alerts endpoint path
    pub fn alerts_endpoint(&self) -> &str {
        &self.alerts_endpoint
    }

    /// Get the health check endpoint path
    pub fn ping_endpoint(&self) -> &str {
        &self.ping_endpoint
    }

    /// Check every setting, returning the first violation
    ///
    /// # Errors
    ///
    /// Returns the [`OptionsError`] describing the first invalid setting, in
    /// the order: retry settings, logger, retry policy, authentication,
    /// timeout, user agent, connection pool, redirects, endpoints.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.retry_count > MAX_RETRY_COUNT {
            return Err(OptionsError::RetryCountTooLarge {
                value: self.retry_count,
                max: MAX_RETRY_COUNT,
            });
        }

        if self.retry_wait_time < MIN_RETRY_WAIT_TIME {
            return Err(OptionsError::RetryWaitTimeTooShort {
                value: self.retry_wait_time,
                min: MIN_RETRY_WAIT_TIME,
            });
        }
        if self.retry_wait_time > MAX_RETRY_WAIT_TIME {
            return Err(OptionsError::RetryWaitTimeTooLong {
                value: self.retry_wait_time,
                max: MAX_RETRY_WAIT_TIME,
            });
        }

        if self.retry_max_wait_time < MIN_RETRY_MAX_WAIT_TIME {
            return Err(OptionsError::RetryMaxWaitTimeTooShort {
                value: self.retry_max_wait_time,
                min: MIN_RETRY_MAX_WAIT_TIME,
            });
        }
        if self.retry_max_wait_time > MAX_RETRY_MAX_WAIT_TIME {
            return Err(OptionsError::RetryMaxWaitTimeTooLong {
                value: self.retry_max_wait_time,
                max: MAX_RETRY_MAX_WAIT_TIME,
            });
        }
        if self.retry_max_wait_time < self.retry_wait_time {
            return Err(OptionsError::RetryMaxWaitTimeBelowWaitTime {
                max_wait: self.retry_max_wait_time,
                wait: self.retry_wait_time,
            });
        }

        if self.request_logger.is_none() {
            return Err(OptionsError::MissingRequestLogger);
        }
        if self.retry_policy.is_none() {
            return Err(OptionsError::MissingRetryPolicy);
        }

        if !self.basic_auth_username.is_empty() && !self.auth_token.is_empty() {
            return Err(OptionsError::ConflictingAuth);
        }

        if self.timeout < MIN_TIMEOUT {
            return Err(OptionsError::TimeoutTooShort {
                value: self.timeout,
                min: MIN_TIMEOUT,
            });
        }
        if self.timeout > MAX_TIMEOUT {
            return Err(OptionsError::TimeoutTooLong {
                value: self.timeout,
                max: MAX_TIMEOUT,
            });
        }

        if self.user_agent.is_empty() {
            return Err(OptionsError::EmptyUserAgent);
        }

        if self.max_idle_conns < MIN_MAX_IDLE_CONNS {
            return Err(OptionsError::MaxIdleConnsTooSmall {
                value: self.max_idle_conns,
                min: MIN_MAX_IDLE_CONNS,
            });
        }
        if self.max_conns_per_host < MIN_MAX_CONNS_PER_HOST {
            return Err(OptionsError::MaxConnsPerHostTooSmall {
                value: self.max_conns_per_host,
                min: MIN_MAX_CONNS_PER_HOST,
            });
        }
        if self.max_conns_per_host > MAX_MAX_CONNS_PER_HOST {
            return Err(OptionsError::MaxConnsPerHostTooLarge {
                value: self.max_conns_per_host,
                max: MAX_MAX_CONNS_PER_HOST,
            });
        }

        if self.idle_conn_timeout < MIN_IDLE_CONN_TIMEOUT {
            return Err(OptionsError::IdleConnTimeoutTooShort {
                value: self.idle_conn_timeout,
                min: MIN_IDLE_CONN_TIMEOUT,
            });
        }
        if self.idle_conn_timeout > MAX_IDLE_CONN_TIMEOUT {
            return Err(OptionsError::IdleConnTimeoutTooLong {
                value: self.idle_conn_timeout,
                max: MAX_IDLE_CONN_TIMEOUT,
            });
        }

        if self.max_redirects > MAX_MAX_REDIRECTS {
            return Err(OptionsError::MaxRedirectsTooLarge {
                value: self.max_redirects,
                max: MAX_MAX_REDIRECTS,
            });
        }

        if self.alerts_endpoint.is_empty() {
            return Err(OptionsError::EmptyAlertsEndpoint);
        }
        if self.ping_endpoint.is_empty() {
            return Err(OptionsError::EmptyPingEndpoint);
        }

        Ok(())
    }

    /// Authentication mode. Only meaningful after [`Options::validate`] passed.
    pub(crate) fn auth(&self) -> Auth {
        if !self.basic_auth_username.is_empty() {
            Auth::Basic {
                username: self.basic_auth_username.clone(),
                password: self.basic_auth_password.clone(),
            }
        } else if !self.auth_token.is_empty() {
            Auth::Token {
                scheme: self.auth_scheme.clone(),
                token: self.auth_token.clone(),
            }
        } else {
            Auth::None
        }
    }

    pub(crate) fn logger(&self) -> Arc<dyn RequestLogger> {
        self.request_logger
            .clone()
            .unwrap_or_else(|| Arc::new(NoopLogger))
    }

    pub(crate) fn policy(&self) -> Arc<dyn RetryPolicy> {
        self.retry_policy
            .clone()
            .unwrap_or_else(|| Arc::new(DefaultRetryPolicy))
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Options");
        debug
            .field("retry_count", &self.retry_count)
            .field("retry_wait_time", &self.retry_wait_time)
            .field("retry_max_wait_time", &self.retry_max_wait_time)
            .field("request_headers", &self.request_headers)
            .field("basic_auth_username", &self.basic_auth_username)
            .field("basic_auth_password", &"<redacted>")
            .field("auth_scheme", &self.auth_scheme)
            .field("auth_token", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("max_idle_conns", &self.max_idle_conns)
            .field("max_conns_per_host", &self.max_conns_per_host)
            .field("idle_conn_timeout", &self.idle_conn_timeout)
            .field("disable_keep_alive", &self.disable_keep_alive)
            .field("max_redirects", &self.max_redirects)
            .field("alerts_endpoint", &self.alerts_endpoint)
            .field("ping_endpoint", &self.ping_endpoint);
        #[cfg(any(feature = "native-tls", feature = "rustls-tls"))]
        debug.field("tls_config", &self.tls_config);
        debug.finish_non_exhaustive()
    }
}
