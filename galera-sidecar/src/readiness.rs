//! Readiness probing against the node's own initialization endpoint.
//!
//! A running process is not necessarily a synced cluster member. The node
//! exposes an HTTP endpoint that only answers 200 once it has finished
//! joining or bootstrapping.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::errors::{Result, SidecarError};

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The endpoint answered HTTP 200.
    Ready,
    /// The endpoint answered with anything other than 200.
    Rejected { status: u16, reason: String },
    /// No answer: connection refused, reset, or timed out.
    Unreachable(String),
}

pub trait ReadinessProbe: Send + Sync {
    /// host:port being probed, for logs and error context
    fn address(&self) -> &str;

    fn probe(&self) -> impl Future<Output = ProbeOutcome> + Send;
}

/// Probes `http://{address}/` with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpReadinessProbe {
    http: reqwest::Client,
    address: String,
    url: String,
}

impl HttpReadinessProbe {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Result<Self> {
        let address = address.into();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SidecarError::HttpClient)?;

        Ok(Self {
            http,
            url: format!("http://{}/", address),
            address,
        })
    }
}

impl ReadinessProbe for HttpReadinessProbe {
    fn address(&self) -> &str {
        &self.address
    }

    async fn probe(&self) -> ProbeOutcome {
        let response = match self.http.get(&self.url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("Readiness probe to {} failed: {}", self.url, e);
                return ProbeOutcome::Unreachable(e.to_string());
            }
        };

        let status = response.status();
        if status == reqwest::StatusCode::OK {
            ProbeOutcome::Ready
        } else {
            ProbeOutcome::Rejected {
                status: status.as_u16(),
                reason: status.to_string(),
            }
        }
    }
}
