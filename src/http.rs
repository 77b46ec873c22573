//! Outbound HTTP capability.
//!
//! The pipeline never talks to `reqwest` directly. It goes through
//! [`HttpFetch`], so every step can be driven by a scripted fake in tests and
//! the retry policy stays separate from the transport.
//!
//! - [`HttpFetch`]: Core trait, one GET returning the response body as text
//! - [`ReqwestFetcher`]: The production implementation over a shared client

use crate::error::FetchError;
use reqwest::header::USER_AGENT;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Trait for a single outbound GET.
///
/// Implementations must treat a non-2xx status as an error and honor the
/// per-call `timeout`.
pub trait HttpFetch {
    async fn get_text(
        &self,
        url: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<String, FetchError>;
}

impl<T: HttpFetch + ?Sized> HttpFetch for &T {
    async fn get_text(
        &self,
        url: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<String, FetchError> {
        (**self).get_text(url, user_agent, timeout).await
    }
}

/// [`HttpFetch`] over a `reqwest::Client`.
///
/// Cloning is cheap; clones share the client's connection pool.
#[derive(Debug, Clone, Default)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpFetch for ReqwestFetcher {
    #[instrument(level = "debug", skip(self, user_agent, timeout))]
    async fn get_text(
        &self,
        url: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| classify(url, e))?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched body"
        );
        Ok(body)
    }
}

fn classify(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else {
        FetchError::Transport(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_sends_user_agent_and_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .and(header("user-agent", "TestAgent/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<urlset/>"))
            .mount(&server)
            .await;

        let fetcher = ReqwestFetcher::default();
        let body = fetcher
            .get_text(
                &format!("{}/sitemap.xml", server.uri()),
                "TestAgent/1.0",
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert_eq!(body, "<urlset/>");
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = ReqwestFetcher::default();
        let err = fetcher
            .get_text(&server.uri(), "TestAgent/1.0", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_timeout_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let fetcher = ReqwestFetcher::default();
        let err = fetcher
            .get_text(&server.uri(), "TestAgent/1.0", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)));
    }
}
