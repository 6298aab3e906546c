//! Resilient HTTP transport
//!
//! Wraps a [`reqwest::Client`] with a bounded retry loop. Each call is
//! retried up to `max_tries` times; a pluggable [`RetryPolicy`] decides
//! whether an outcome is worth another try and a pluggable [`Backoff`]
//! decides how long to wait between tries. Once the try budget is spent
//! the last response or error is handed back to the caller unchanged.
//!
//! These retries sit below request signing: a single signed request may
//! be delivered several times, but its headers are never recomputed
//! here. Callers that need to re-sign between attempts (expired `Date`,
//! retryable server error codes) layer an
//! [`Attempt`](crate::attempt::Attempt) loop on top.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Request, Response, StatusCode};
use tracing::debug;

use crate::error::{CoreError, Result};

/// Decides whether a delivery outcome should be retried.
///
/// Exactly one of `status` and `error` is populated: `status` when the
/// server produced a response, `error` when the request never completed.
pub trait RetryPolicy: Send + Sync {
    fn should_retry(
        &self,
        request: &Request,
        status: Option<StatusCode>,
        error: Option<&reqwest::Error>,
    ) -> bool;
}

/// Waits between delivery tries. `tries` is the number of tries already
/// made, starting at zero.
#[async_trait]
pub trait Backoff: Send + Sync {
    async fn wait(&self, tries: u32);
}

/// Retry on temporary network failures and 5xx responses.
///
/// A response that arrived with any non-5xx status is final, as is an
/// error that is not connect- or timeout-shaped (those indicate the
/// request itself is broken rather than the network).
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultRetryPolicy;

impl RetryPolicy for DefaultRetryPolicy {
    fn should_retry(
        &self,
        _request: &Request,
        status: Option<StatusCode>,
        error: Option<&reqwest::Error>,
    ) -> bool {
        if let Some(status) = status {
            return status.is_server_error();
        }
        match error {
            Some(err) => err.is_connect() || err.is_timeout(),
            None => false,
        }
    }
}

/// Exponential backoff: `base * 2^tries`
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    pub base: Duration,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(100),
        }
    }
}

#[async_trait]
impl Backoff for ExponentialBackoff {
    async fn wait(&self, tries: u32) {
        tokio::time::sleep(self.base * 2u32.saturating_pow(tries)).await;
    }
}

/// Linear backoff: `base * tries` (no wait before the second try)
#[derive(Debug, Clone, Copy)]
pub struct LinearBackoff {
    pub base: Duration,
}

impl Default for LinearBackoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(100),
        }
    }
}

#[async_trait]
impl Backoff for LinearBackoff {
    async fn wait(&self, tries: u32) {
        tokio::time::sleep(self.base * tries).await;
    }
}

/// Transport configuration
#[derive(Clone, Debug)]
pub struct TransportOptions {
    /// Maximum delivery tries per request (at least one)
    pub max_tries: u32,
    /// Connection establishment timeout
    pub connect_timeout: Duration,
    /// Total per-request timeout
    pub timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            max_tries: 3,
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client with bounded internal retries
#[derive(Clone)]
pub struct RetryingTransport {
    http: Client,
    options: TransportOptions,
    policy: Arc<dyn RetryPolicy>,
    backoff: Arc<dyn Backoff>,
}

impl RetryingTransport {
    /// Build a transport with the default retry policy and exponential backoff
    pub fn new(options: TransportOptions) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(options.connect_timeout)
            .timeout(options.timeout)
            .build()?;

        Ok(Self {
            http,
            options,
            policy: Arc::new(DefaultRetryPolicy),
            backoff: Arc::new(ExponentialBackoff::default()),
        })
    }

    /// Replace the retryability predicate
    pub fn with_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Replace the inter-try wait strategy
    pub fn with_backoff(mut self, backoff: impl Backoff + 'static) -> Self {
        self.backoff = Arc::new(backoff);
        self
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    /// Deliver `request`, retrying up to `max_tries` times.
    ///
    /// The request body must be buffered (`Bytes`-backed) so it can be
    /// replayed; a streaming body fails with
    /// [`CoreError::UnreplayableBody`] before the first try. A response
    /// received for a retried try has its body discarded before the
    /// backoff wait.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let max_tries = self.options.max_tries.max(1);
        let mut tries = 0;

        loop {
            let attempt = request.try_clone().ok_or(CoreError::UnreplayableBody)?;
            let last_try = tries + 1 >= max_tries;

            match self.http.execute(attempt).await {
                Ok(response) => {
                    if last_try
                        || !self
                            .policy
                            .should_retry(&request, Some(response.status()), None)
                    {
                        return Ok(response);
                    }
                    debug!(
                        status = %response.status(),
                        tries,
                        url = %request.url(),
                        "retrying after response"
                    );
                    drop(response);
                }
                Err(err) => {
                    if last_try || !self.policy.should_retry(&request, None, Some(&err)) {
                        return Err(err.into());
                    }
                    debug!(error = %err, tries, url = %request.url(), "retrying after error");
                }
            }

            self.backoff.wait(tries).await;
            tries += 1;
        }
    }

    /// The underlying client, for building requests
    pub fn http(&self) -> &Client {
        &self.http
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct AlwaysRetry;

    impl RetryPolicy for AlwaysRetry {
        fn should_retry(
            &self,
            _request: &Request,
            _status: Option<StatusCode>,
            _error: Option<&reqwest::Error>,
        ) -> bool {
            true
        }
    }

    fn transport(max_tries: u32) -> RetryingTransport {
        RetryingTransport::new(TransportOptions {
            max_tries,
            ..Default::default()
        })
        .unwrap()
        .with_backoff(LinearBackoff {
            base: Duration::from_millis(1),
        })
    }

    #[tokio::test]
    async fn always_retry_stops_at_max_tries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(3)
            .mount(&server)
            .await;

        let transport = transport(3).with_policy(AlwaysRetry);
        let request = transport.http().get(server.uri()).build().unwrap();
        let response = transport.execute(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn server_errors_are_retried_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport(3);
        let request = transport
            .http()
            .get(format!("{}/flaky", server.uri()))
            .build()
            .unwrap();
        let response = transport.execute(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn exhausted_tries_return_the_last_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let transport = transport(3);
        let request = transport
            .http()
            .get(format!("{}/down", server.uri()))
            .build()
            .unwrap();
        let response = transport.execute(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn success_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport(3);
        let request = transport
            .http()
            .get(format!("{}/ok", server.uri()))
            .build()
            .unwrap();
        let response = transport.execute(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn client_errors_are_final() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport(3);
        let request = transport
            .http()
            .get(format!("{}/missing", server.uri()))
            .build()
            .unwrap();
        let response = transport.execute(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn connection_refused_retries_then_surfaces() {
        // Bind a port, then free it so connections are refused.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = transport(2);
        let request = transport
            .http()
            .get(format!("http://{addr}/"))
            .build()
            .unwrap();
        let err = transport.execute(request).await.unwrap_err();
        assert!(matches!(err, CoreError::Http(_)));
    }
}
