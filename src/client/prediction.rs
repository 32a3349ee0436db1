//! HTTP client for team prediction endpoints.
//!
//! One JSON POST per attempt, attempts run sequentially under a [`RetryPolicy`].
//! Only a 2xx response with a JSON body counts as success; the latency of that
//! attempt is attached to the returned response.

use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::retry::RetryPolicy;

/// Successful endpoint response.
#[derive(Debug, Clone)]
pub struct EndpointResponse {
    pub body: serde_json::Value,
    /// Wall-clock latency of the attempt that succeeded
    pub latency_ms: f64,
    /// Attempts made, including the successful one
    pub attempts: u32,
}

/// Why a single attempt did not produce a usable response
#[derive(Debug)]
enum AttemptError {
    Status(reqwest::StatusCode),
    Timeout,
    Transport(reqwest::Error),
    Body(reqwest::Error),
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptError::Status(code) => write!(f, "endpoint returned status {}", code),
            AttemptError::Timeout => write!(f, "request timed out"),
            AttemptError::Transport(e) => write!(f, "transport error: {}", e),
            AttemptError::Body(e) => write!(f, "invalid response body: {}", e),
        }
    }
}

/// Outcome of a reachability probe made at submission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reachable,
    Unreachable(String),
}

#[derive(Clone)]
pub struct PredictionClient {
    http: reqwest::Client,
}

impl Default for PredictionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictionClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .pool_idle_timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Call a team endpoint. Returns `None` once every attempt has failed.
    pub async fn call<P: Serialize + ?Sized>(
        &self,
        endpoint_url: &str,
        payload: &P,
        timeout: Duration,
        policy: &RetryPolicy,
    ) -> Option<EndpointResponse> {
        let total = policy.total_attempts();

        for attempt in 0..total {
            let delay = policy.delay_before(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match self.attempt(endpoint_url, payload, timeout).await {
                Ok((body, latency_ms)) => {
                    debug!(
                        "Endpoint {} answered in {:.1}ms (attempt {}/{})",
                        endpoint_url,
                        latency_ms,
                        attempt + 1,
                        total
                    );
                    return Some(EndpointResponse {
                        body,
                        latency_ms,
                        attempts: attempt + 1,
                    });
                }
                Err(e) => {
                    warn!(
                        "Attempt {}/{} to {} failed: {}",
                        attempt + 1,
                        total,
                        endpoint_url,
                        e
                    );
                }
            }
        }

        None
    }

    async fn attempt<P: Serialize + ?Sized>(
        &self,
        endpoint_url: &str,
        payload: &P,
        timeout: Duration,
    ) -> Result<(serde_json::Value, f64), AttemptError> {
        let start = Instant::now();
        let response = self
            .http
            .post(endpoint_url)
            .timeout(timeout)
            .json(payload)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status));
        }

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AttemptError::Timeout
                } else {
                    AttemptError::Body(e)
                }
            })?;
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        Ok((body, latency_ms))
    }

    /// Check that an endpoint answers before it is queued.
    ///
    /// A POST with a one-record probe must return 200/201. Endpoints that reject
    /// POST with 405 get a second chance through GET.
    pub async fn probe(&self, endpoint_url: &str, timeout: Duration) -> ProbeOutcome {
        let probe = serde_json::json!({ "inputs": [{ "test": 1 }] });

        let response = match self
            .http
            .post(endpoint_url)
            .timeout(timeout)
            .json(&probe)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return probe_error(e),
        };

        match response.status().as_u16() {
            200 | 201 => ProbeOutcome::Reachable,
            405 => match self.http.get(endpoint_url).timeout(timeout).send().await {
                Ok(r) if r.status().as_u16() == 200 => ProbeOutcome::Reachable,
                Ok(r) => ProbeOutcome::Unreachable(format!(
                    "Endpoint returned status code {}",
                    r.status().as_u16()
                )),
                Err(e) => probe_error(e),
            },
            code => ProbeOutcome::Unreachable(format!("Endpoint returned status code {}", code)),
        }
    }
}

fn classify(e: reqwest::Error) -> AttemptError {
    if e.is_timeout() {
        AttemptError::Timeout
    } else {
        AttemptError::Transport(e)
    }
}

fn probe_error(e: reqwest::Error) -> ProbeOutcome {
    if e.is_timeout() {
        ProbeOutcome::Unreachable("Endpoint request timed out".to_string())
    } else {
        ProbeOutcome::Unreachable(format!("Cannot reach endpoint: {}", e))
    }
}
