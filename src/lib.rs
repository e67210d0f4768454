//! # Slack Manager Client
//!
//! A Rust client library for submitting alerts to a Slack Manager API server.
//!
//! ## Features
//!
//! - Connect once (options validation plus a ping), then send from many tasks
//! - Batch submission: one request carries any number of alerts
//! - Retries with exponential backoff and pluggable retry policies
//! - Basic or token authentication, custom headers, TLS and pooling options
//! - Cancellation and deadlines through [`Context`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use slack_manager_client::{Alert, AlertSeverity, Client, Context, Options};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = Options::default()
//!         .with_auth_token("my-token")
//!         .with_retry_count(5)
//!         .with_timeout(Duration::from_secs(10));
//!
//!     let client = Client::new("https://slack-manager.example.com", options);
//!
//!     let ctx = Context::background().with_timeout(Duration::from_secs(30));
//!     client.connect(&ctx).await?;
//!
//!     let alert = Alert::new("HighMemoryUsage")
//!         .with_text("Memory usage is above 90%")
//!         .with_severity(AlertSeverity::Warning)
//!         .with_correlation_id("memory-my-app")
//!         .with_route_key("backend");
//!
//!     client.send_one(&ctx, &alert).await?;
//!     Ok(())
//! }
//! ```

mod client;
mod context;
mod errors;
mod extract;
mod logger;
mod options;
mod retry;
#[cfg(any(feature = "native-tls", feature = "rustls-tls"))]
mod tls;
mod transport;
mod types;

pub use client::{send_alerts, Client, API_URL_ENV, AUTH_TOKEN_ENV};
pub use context::Context;
pub use errors::{Error, OptionsError, Result, TransportError, TransportErrorKind};
pub use extract::{extract_error_message, EMPTY_ERROR_BODY};
pub use logger::{NoopLogger, RequestLogger, TracingLogger};
pub use options::{
    Options, DEFAULT_ALERTS_ENDPOINT, DEFAULT_AUTH_SCHEME, DEFAULT_PING_ENDPOINT,
    DEFAULT_USER_AGENT,
};
pub use retry::{Attempt, DefaultRetryPolicy, RetryPolicy};
#[cfg(any(feature = "native-tls", feature = "rustls-tls"))]
pub use tls::TlsConfig;
pub use types::{Alert, AlertField, AlertSeverity};

// Re-exported so callers can build a `Context` from their own token.
pub use tokio_util::sync::CancellationToken;
