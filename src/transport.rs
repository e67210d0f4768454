use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{redirect, Method, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

use crate::context::Context;
use crate::errors::{Error, Result, TransportError};
use crate::logger::RequestLogger;
use crate::options::{Auth, Options};
use crate::retry::{self, Attempt, RetryPolicy};

/// Result of the last attempt made for a request: either a response (any
/// status) or the transport error that prevented one
pub(crate) type Attempted = std::result::Result<Response, TransportError>;

enum Authorization {
    None,
    Basic { username: String, password: String },
    Header(HeaderValue),
}

/// HTTP handle created by [`Client::connect`](crate::Client::connect)
///
/// Holds the pooled `reqwest` client, resolved endpoint URLs, credentials and
/// retry settings. Shared read-only by every `send` once connected.
pub(crate) struct Transport {
    http: ClientWithMiddleware,
    ping_url: Url,
    alerts_url: Url,
    authorization: Authorization,
    retry_count: u32,
    retry_wait_time: Duration,
    retry_max_wait_time: Duration,
    policy: Arc<dyn RetryPolicy>,
    logger: Arc<dyn RequestLogger>,
    permits: Semaphore,
}

impl Transport {
    /// Build the transport from validated options
    pub(crate) fn build(base_url: &str, options: &Options) -> Result<Self> {
        let ping_url = endpoint_url(base_url, &options.ping_endpoint)?;
        let alerts_url = endpoint_url(base_url, &options.alerts_endpoint)?;

        let idle_per_host = if options.disable_keep_alive {
            0
        } else {
            options.max_idle_conns.min(options.max_conns_per_host)
        };

        let redirect_policy = if options.max_redirects == 0 {
            redirect::Policy::none()
        } else {
            redirect::Policy::limited(options.max_redirects)
        };

        let builder = reqwest::Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent.as_str())
            .default_headers(default_headers(&options.request_headers)?)
            .pool_idle_timeout(options.idle_conn_timeout)
            .pool_max_idle_per_host(idle_per_host)
            .redirect(redirect_policy);

        #[cfg(any(feature = "native-tls", feature = "rustls-tls"))]
        let builder = match &options.tls_config {
            Some(tls) => tls.apply(builder),
            None => builder,
        };

        let client = builder.build().map_err(Error::BuildHttpClient)?;
        let http = ClientBuilder::new(client).build();

        Ok(Self {
            http,
            ping_url,
            alerts_url,
            authorization: authorization(options.auth())?,
            retry_count: options.retry_count,
            retry_wait_time: options.retry_wait_time,
            retry_max_wait_time: options.retry_max_wait_time,
            policy: options.policy(),
            logger: options.logger(),
            permits: Semaphore::new(options.max_conns_per_host),
        })
    }

    pub(crate) fn ping_url(&self) -> &Url {
        &self.ping_url
    }

    pub(crate) fn alerts_url(&self) -> &Url {
        &self.alerts_url
    }

    pub(crate) fn logger(&self) -> &dyn RequestLogger {
        self.logger.as_ref()
    }

    /// Issue a request, retrying failed attempts the policy marks as
    /// retryable until the retry budget is spent
    ///
    /// # Errors
    ///
    /// Only [`Error::Cancelled`] and [`Error::DeadlineExceeded`]; request
    /// failures are reported through the returned [`Attempted`].
    pub(crate) async fn execute(
        &self,
        ctx: &Context,
        method: Method,
        url: &Url,
        body: Option<&[u8]>,
    ) -> Result<Attempted> {
        let mut retries = 0u32;
        loop {
            self.logger
                .debug(format_args!("{method} {url} (attempt {})", retries + 1));

            let outcome = ctx.run(self.attempt(method.clone(), url, body)).await?;

            let decision = match &outcome {
                Ok(response) if response.status().is_success() => None,
                Ok(response) => Some((
                    self.policy.should_retry(Attempt::Response {
                        status: response.status(),
                        headers: response.headers(),
                    }),
                    retry::retry_after(response.headers()),
                )),
                Err(err) => Some((self.policy.should_retry(Attempt::Failed(err)), None)),
            };

            let Some((should_retry, retry_after)) = decision else {
                return Ok(outcome);
            };
            if !should_retry || retries >= self.retry_count {
                return Ok(outcome);
            }

            let wait = retry::backoff(
                retries,
                self.retry_wait_time,
                self.retry_max_wait_time,
                retry_after,
            );
            let reason = match &outcome {
                Ok(response) => format!("HTTP {}", response.status().as_u16()),
                Err(err) => err.to_string(),
            };
            warn!(%method, %url, retry = retries + 1, ?wait, %reason, "Retrying request");
            self.logger.warn(format_args!(
                "{method} {url} failed ({reason}), retry {} of {} in {wait:?}",
                retries + 1,
                self.retry_count
            ));

            drop(outcome);
            ctx.run(tokio::time::sleep(wait)).await?;
            retries += 1;
        }
    }

    async fn attempt(&self, method: Method, url: &Url, body: Option<&[u8]>) -> Attempted {
        // The semaphore is never closed, so acquiring cannot fail.
        let _permit = self.permits.acquire().await.ok();

        let mut request = self.http.request(method, url.clone());
        if let Some(body) = body {
            request = request.body(body.to_vec());
        }

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(TransportError::new)?;

        debug!(status = response.status().as_u16(), "Received response");
        Ok(response)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.authorization {
            Authorization::None => request,
            Authorization::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            Authorization::Header(value) => request.header(AUTHORIZATION, value.clone()),
        }
    }
}

/// `{base}/{endpoint}` with exactly one slash between the two
fn endpoint_url(base_url: &str, endpoint: &str) -> Result<Url> {
    let joined = format!(
        "{}/{}",
        base_url.trim().trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|source| Error::InvalidBaseUrl {
        url: base_url.to_string(),
        source,
    })
}

fn default_headers(headers: &HashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let invalid = || Error::InvalidHeader { name: name.clone() };
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

fn authorization(auth: Auth) -> Result<Authorization> {
    Ok(match auth {
        Auth::None => Authorization::None,
        Auth::Basic { username, password } => Authorization::Basic { username, password },
        Auth::Token { scheme, token } => {
            let mut value = HeaderValue::from_str(&format!("{scheme} {token}")).map_err(|_| {
                Error::InvalidHeader {
                    name: AUTHORIZATION.to_string(),
                }
            })?;
            value.set_sensitive(true);
            Authorization::Header(value)
        }
    })
}
