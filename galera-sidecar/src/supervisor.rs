//! Process supervisor capability consumed by the orchestrator.
//!
//! The orchestrator only needs to start, stop, and query a named service.
//! Adapters translate the supervisor's own status vocabulary into
//! [`ProcessState`] before anything else sees it.

pub mod monit;

use std::fmt;
use std::future::Future;
use thiserror::Error;

pub use monit::MonitClient;

/// Run state of the supervised service as reported by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Stopped,
    Pending,
    Failing,
    Unknown(String),
}

impl ProcessState {
    /// Parse the supervisor vocabulary. Matching is exact, with no case or
    /// whitespace normalization.
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "running" => ProcessState::Running,
            "stopped" => ProcessState::Stopped,
            "pending" => ProcessState::Pending,
            "failing" => ProcessState::Failing,
            other => ProcessState::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProcessState::Running => "running",
            ProcessState::Stopped => "stopped",
            ProcessState::Pending => "pending",
            ProcessState::Failing => "failing",
            ProcessState::Unknown(raw) => raw,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ProcessState::Running)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to {action} service {service}: {source}")]
    Request {
        service: String,
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("supervisor rejected {action} for service {service}: HTTP {status}")]
    Rejected {
        service: String,
        action: &'static str,
        status: u16,
    },

    #[error("supervisor does not know service {0}")]
    UnknownService(String),

    #[error("supervisor unavailable: {0}")]
    Unavailable(String),
}

/// Start, stop, and status for a named service.
pub trait Supervisor: Send + Sync {
    fn start(&self, service: &str) -> impl Future<Output = Result<(), SupervisorError>> + Send;

    fn stop(&self, service: &str) -> impl Future<Output = Result<(), SupervisorError>> + Send;

    fn status(
        &self,
        service: &str,
    ) -> impl Future<Output = Result<ProcessState, SupervisorError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_recognizes_vocabulary() {
        assert_eq!(ProcessState::from_raw("running"), ProcessState::Running);
        assert_eq!(ProcessState::from_raw("stopped"), ProcessState::Stopped);
        assert_eq!(ProcessState::from_raw("pending"), ProcessState::Pending);
        assert_eq!(ProcessState::from_raw("failing"), ProcessState::Failing);
    }

    #[test]
    fn test_from_raw_does_not_normalize() {
        assert_eq!(
            ProcessState::from_raw("Running"),
            ProcessState::Unknown("Running".to_string())
        );
        assert_eq!(
            ProcessState::from_raw(" running"),
            ProcessState::Unknown(" running".to_string())
        );
        assert!(!ProcessState::from_raw("RUNNING").is_running());
    }

    #[test]
    fn test_raw_string_survives_display() {
        assert_eq!(ProcessState::Running.to_string(), "running");
        assert_eq!(ProcessState::from_raw("unmonitored").to_string(), "unmonitored");
    }
}
