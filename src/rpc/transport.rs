//! Request transport: one serialized call document in, one response body out.
//!
//! The engine never talks to the network directly. Everything goes through
//! [`Transport`], so tests can swap in a closure and deployments can point at
//! a primary node with failover endpoints.

use std::time::Duration;

use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio::time::timeout;
use url::Url;

/// Transport-level failures.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid endpoint URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("request to {endpoint} failed: {reason}")]
    Request { endpoint: String, reason: String },

    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("all {attempted} endpoints failed")]
    Exhausted { attempted: usize },
}

/// Sends one call document and returns the raw response text.
pub trait Transport: Send + Sync {
    fn execute(&self, body: String) -> BoxFuture<'_, Result<String, TransportError>>;
}

/// JSON-RPC over HTTP POST with ordered failover.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoints: Vec<Url>,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport for a primary endpoint plus failovers.
    ///
    /// The primary URL must parse. Invalid failover URLs are skipped with a warning.
    pub fn new(primary: &str, failovers: &[String], request_timeout: Duration) -> Result<Self, TransportError> {
        let primary_url: Url = primary.parse().map_err(|e: url::ParseError| TransportError::InvalidUrl {
            url: primary.to_string(),
            reason: e.to_string(),
        })?;

        let mut endpoints = vec![primary_url];
        for url_str in failovers {
            match url_str.parse() {
                Ok(url) => endpoints.push(url),
                Err(_) => tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL"),
            }
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self {
            client,
            endpoints,
            timeout: request_timeout,
        })
    }

    pub fn endpoints(&self) -> &[Url] {
        &self.endpoints
    }

    async fn post(&self, endpoint: &Url, body: String) -> Result<String, TransportError> {
        let response = self
            .client
            .post(endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::Request {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Request {
                endpoint: endpoint.to_string(),
                reason: format!("HTTP status {}", status),
            });
        }

        response.text().await.map_err(|e| TransportError::Request {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }
}

impl Transport for HttpTransport {
    fn execute(&self, body: String) -> BoxFuture<'_, Result<String, TransportError>> {
        Box::pin(async move {
            for (i, endpoint) in self.endpoints.iter().enumerate() {
                match timeout(self.timeout, self.post(endpoint, body.clone())).await {
                    Ok(Ok(text)) => return Ok(text),
                    Ok(Err(e)) => {
                        tracing::warn!(provider_idx = i, error = %e, "RPC error, trying next provider");
                    }
                    Err(_) => {
                        let e = TransportError::Timeout {
                            endpoint: endpoint.to_string(),
                        };
                        tracing::warn!(provider_idx = i, error = %e, "RPC timeout, trying next provider");
                    }
                }
            }
            Err(TransportError::Exhausted {
                attempted: self.endpoints.len(),
            })
        })
    }
}

/// Closure-backed transport for unit tests.
#[cfg(test)]
pub(crate) struct FnTransport<F>(pub F);

#[cfg(test)]
impl<F> Transport for FnTransport<F>
where
    F: Fn(serde_json::Value) -> Result<serde_json::Value, TransportError> + Send + Sync,
{
    fn execute(&self, body: String) -> BoxFuture<'_, Result<String, TransportError>> {
        let request: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
        let result = (self.0)(request).map(|response| response.to_string());
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_primary_rejected() {
        let result = HttpTransport::new("not a url", &[], Duration::from_secs(1));
        assert!(matches!(result, Err(TransportError::InvalidUrl { .. })));
    }

    #[test]
    fn test_invalid_failover_skipped() {
        let failovers = vec!["::::".to_string(), "http://127.0.0.1:9545".to_string()];
        let transport = HttpTransport::new("http://127.0.0.1:8545", &failovers, Duration::from_secs(1)).unwrap();
        assert_eq!(transport.endpoints().len(), 2);
    }

    #[tokio::test]
    async fn test_all_endpoints_fail() {
        // Port 9 (discard) is closed on test hosts; both attempts fail fast.
        let failovers = vec!["http://127.0.0.1:9".to_string()];
        let transport = HttpTransport::new("http://127.0.0.1:9", &failovers, Duration::from_secs(2)).unwrap();
        let result = transport.execute("{}".to_string()).await;
        assert!(matches!(result, Err(TransportError::Exhausted { attempted: 2 })));
    }
}
