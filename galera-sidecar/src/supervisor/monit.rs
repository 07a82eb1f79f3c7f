//! Supervisor adapter for monit's HTTP interface.
//!
//! Start and stop are form posts to `/{service}`. Status comes from the
//! plain-text `/_status` report, which lists one block per monitored service.

use std::time::Duration;
use tracing::debug;

use super::{ProcessState, Supervisor, SupervisorError};
use crate::config::MonitConfig;
use crate::errors::{Result, SidecarError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct MonitClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl MonitClient {
    pub fn new(config: &MonitConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(SidecarError::HttpClient)?;

        Ok(Self {
            http,
            base_url: format!("http://{}:{}", config.host, config.port),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send_action(
        &self,
        service: &str,
        action: &'static str,
    ) -> std::result::Result<(), SupervisorError> {
        let url = format!("{}/{}", self.base_url, service);
        debug!("Sending monit {} for {} to {}", action, service, url);

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .form(&[("action", action)])
            .send()
            .await
            .map_err(|source| SupervisorError::Request {
                service: service.to_string(),
                action,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SupervisorError::Rejected {
                service: service.to_string(),
                action,
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}

impl Supervisor for MonitClient {
    async fn start(&self, service: &str) -> std::result::Result<(), SupervisorError> {
        self.send_action(service, "start").await
    }

    async fn stop(&self, service: &str) -> std::result::Result<(), SupervisorError> {
        self.send_action(service, "stop").await
    }

    async fn status(&self, service: &str) -> std::result::Result<ProcessState, SupervisorError> {
        let url = format!("{}/_status", self.base_url);
        let request_error = |source: reqwest::Error| SupervisorError::Request {
            service: service.to_string(),
            action: "query status of",
            source,
        };

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SupervisorError::Rejected {
                service: service.to_string(),
                action: "query status of",
                status: status.as_u16(),
            });
        }

        let report = response.text().await.map_err(request_error)?;
        parse_status_report(&report, service)
            .ok_or_else(|| SupervisorError::UnknownService(service.to_string()))
    }
}

/// Extract the state of `service` from a monit plain-text status report.
///
/// Returns `None` when the report has no block for the service.
pub fn parse_status_report(report: &str, service: &str) -> Option<ProcessState> {
    let mut in_block = false;
    let mut found = false;
    let mut status = None;
    let mut monitoring = None;

    for line in report.lines() {
        if let Some(name) = block_name(line) {
            if found {
                break;
            }
            in_block = name == service;
            found = in_block;
            continue;
        }

        if !in_block {
            continue;
        }

        match split_field(line) {
            Some(("status", value)) => status = Some(value),
            Some(("monitoring status", value)) => monitoring = Some(value),
            _ => {}
        }
    }

    found.then(|| classify(status.unwrap_or(""), monitoring.unwrap_or("")))
}

/// `Process 'mysql'` -> `mysql`. Block headers are the only unindented
/// lines that carry a quoted name.
fn block_name(line: &str) -> Option<&str> {
    if line.starts_with(char::is_whitespace) {
        return None;
    }
    let open = line.find('\'')?;
    let close = line.rfind('\'')?;
    (close > open).then(|| &line[open + 1..close])
}

/// Fields are `key<two or more spaces>value`; keys may contain single spaces.
fn split_field(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    let split = trimmed.find("  ")?;
    Some((trimmed[..split].trim(), trimmed[split..].trim()))
}

/// Report values differ in case between monit releases (5.2 prints
/// `running`, later ones `OK`), so matching ignores ASCII case.
fn classify(status: &str, monitoring: &str) -> ProcessState {
    let status = status.to_ascii_lowercase();
    let monitoring = monitoring.to_ascii_lowercase();

    if status.contains("pending") || monitoring.starts_with("initializing") || monitoring == "waiting"
    {
        return ProcessState::Pending;
    }

    if monitoring.starts_with("not monitored") || status.starts_with("not monitored") {
        return ProcessState::Stopped;
    }

    match status.as_str() {
        "running" | "ok" => ProcessState::Running,
        _ => ProcessState::Failing,
    }
}
