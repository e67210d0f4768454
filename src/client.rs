use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Response};
use serde::Serialize;
use std::fmt;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use crate::context::Context;
use crate::errors::{Error, Result};
use crate::extract::extract_error_message;
use crate::options::Options;
use crate::transport::Transport;
use crate::types::Alert;

/// Environment variable holding the Slack Manager API base URL
pub const API_URL_ENV: &str = "SLACK_MANAGER_API_URL";
/// Environment variable holding an optional auth token
pub const AUTH_TOKEN_ENV: &str = "SLACK_MANAGER_AUTH_TOKEN";

#[derive(Serialize)]
struct AlertsPayload<'a> {
    alerts: &'a [&'a Alert],
}

/// Client for submitting alerts to the Slack Manager API
///
/// A client starts out unconnected. [`Client::connect`] validates the options,
/// builds the HTTP transport and pings the API once; after that, any number of
/// concurrent [`Client::send`] calls may share the client.
///
/// # Example
///
/// ```rust,no_run
/// use slack_manager_client::{Alert, AlertSeverity, Client, Context, Options};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = Client::new(
///         "https://slack-manager.example.com",
///         Options::default().with_auth_token("my-token"),
///     );
///
///     let ctx = Context::background();
///     client.connect(&ctx).await?;
///
///     let alert = Alert::new("Disk almost full")
///         .with_text("/var is at 93%")
///         .with_severity(AlertSeverity::Warning)
///         .with_route_key("infra");
///
///     client.send_one(&ctx, &alert).await?;
///     Ok(())
/// }
/// ```
pub struct Client {
    base_url: String,
    options: Options,
    transport: OnceCell<Transport>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("options", &self.options)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Client {
    /// Create an unconnected client
    ///
    /// Nothing is validated and no request is made until [`Client::connect`].
    pub fn new(base_url: impl Into<String>, options: Options) -> Self {
        Self {
            base_url: base_url.into(),
            options,
            transport: OnceCell::new(),
        }
    }

    /// Create a client from the environment with default options
    ///
    /// See [`Client::from_env_with`].
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(Options::default())
    }

    /// Create a client from the environment
    ///
    /// Reads:
    /// - `SLACK_MANAGER_API_URL`: base URL of the API (required)
    /// - `SLACK_MANAGER_AUTH_TOKEN`: token for the `Authorization` header (optional)
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingEnv`] if the base URL is missing or blank.
    pub fn from_env_with(options: Options) -> Result<Self> {
        let base_url = std::env::var(API_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .ok_or(Error::MissingEnv(API_URL_ENV))?;

        let options = match std::env::var(AUTH_TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => options.with_auth_token(token.trim()),
            _ => options,
        };

        Ok(Self::new(base_url.trim(), options))
    }

    /// Validate the options and check that the API is reachable
    ///
    /// Only the first successful call pings the API; later calls return
    /// `Ok(())` immediately. Concurrent calls wait for the one in progress.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The base URL is empty or invalid
    /// - The options fail [`Options::validate`]
    /// - The ping request fails or returns a non-success status code
    /// - The context is cancelled or its deadline passes
    #[instrument(name = "Client::connect", skip_all, fields(base_url = %self.base_url))]
    pub async fn connect(&self, ctx: &Context) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::EmptyBaseUrl);
        }

        self.options.validate().map_err(Error::InvalidOptions)?;

        if self.is_connected() {
            debug!("Already connected");
            return Ok(());
        }

        self.transport.get_or_try_init(|| self.open(ctx)).await?;
        Ok(())
    }

    async fn open(&self, ctx: &Context) -> Result<Transport> {
        let transport = Transport::build(&self.base_url, &self.options)?;
        let url = transport.ping_url().clone();

        debug!(url = %url, "Pinging alerts API");

        let response = match transport.execute(ctx, Method::GET, &url, None).await? {
            Ok(response) => response,
            Err(err) => {
                transport
                    .logger()
                    .error(format_args!("failed to ping alerts API at {url}: {err}"));
                return Err(Error::Ping(err));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let message = error_message(ctx, response).await?;
            transport.logger().error(format_args!(
                "failed to ping alerts API at {url}: HTTP {} - {message}",
                status.as_u16()
            ));
            return Err(Error::PingStatus {
                status: status.as_u16(),
                message,
            });
        }

        debug!("Connected to alerts API");
        Ok(transport)
    }

    /// Send one or more alerts in a single request
    ///
    /// `alerts` may yield `&Alert` or `Option<&Alert>`; a `None` entry is
    /// reported as [`Error::MissingAlert`]. Either all alerts are accepted by
    /// the API or the call fails.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The client is not connected
    /// - `alerts` is empty or contains a `None` entry
    /// - The request fails or the API returns a non-success status code
    ///   (after retries, for failures the retry policy accepts)
    /// - The context is cancelled or its deadline passes
    ///
    /// No request is made when a precondition fails.
    #[instrument(
        name = "Client::send",
        skip_all,
        fields(alert_count = tracing::field::Empty)
    )]
    pub async fn send<'a, I>(&self, ctx: &Context, alerts: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Option<&'a Alert>>,
    {
        let transport = self.transport.get().ok_or(Error::NotConnected)?;

        let alerts: Vec<Option<&Alert>> = alerts.into_iter().map(Into::into).collect();
        if alerts.is_empty() {
            return Err(Error::EmptyAlerts);
        }

        let alerts = alerts
            .into_iter()
            .enumerate()
            .map(|(index, alert)| alert.ok_or(Error::MissingAlert { index }))
            .collect::<Result<Vec<&Alert>>>()?;

        tracing::Span::current().record("alert_count", alerts.len());

        let body =
            serde_json::to_vec(&AlertsPayload { alerts: &alerts }).map_err(Error::Serialize)?;

        let url = transport.alerts_url();
        debug!(url = %url, "Sending alerts to Slack Manager");

        let response = match transport
            .execute(ctx, Method::POST, url, Some(&body))
            .await?
        {
            Ok(response) => response,
            Err(source) => {
                transport.logger().error(format_args!(
                    "failed to send {} alert(s): {source}",
                    alerts.len()
                ));
                return Err(Error::Request {
                    method: Method::POST,
                    source,
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            let message = error_message(ctx, response).await?;
            transport.logger().error(format_args!(
                "alerts API rejected {} alert(s): HTTP {} - {message}",
                alerts.len(),
                status.as_u16()
            ));
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!("Alerts sent successfully");
        Ok(())
    }

    /// Send a single alert
    ///
    /// Convenience method that wraps `send` for a single alert.
    pub async fn send_one(&self, ctx: &Context, alert: &Alert) -> Result<()> {
        self.send(ctx, [alert]).await
    }

    /// Check whether `connect` has succeeded
    pub fn is_connected(&self) -> bool {
        self.transport.initialized()
    }

    /// Get the base API URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the client options
    pub fn options(&self) -> &Options {
        &self.options
    }
}

/// Send alerts through a client handle that may be absent
///
/// For callers holding an optional client (e.g. one created lazily):
/// an absent handle is reported as [`Error::ClientUnset`] instead of being
/// silently skipped.
pub async fn send_alerts<'a, I>(client: Option<&Client>, ctx: &Context, alerts: I) -> Result<()>
where
    I: IntoIterator,
    I::Item: Into<Option<&'a Alert>>,
{
    client.ok_or(Error::ClientUnset)?.send(ctx, alerts).await
}

async fn error_message(ctx: &Context, response: Response) -> Result<String> {
    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let body = ctx.run(response.text()).await?.unwrap_or_default();
    Ok(extract_error_message(status, content_type.as_deref(), &body))
}
