//! Error types for lifecycle operations

use std::path::PathBuf;
use std::time::Duration;

use crate::config::duration::format_duration;
use crate::intent::LifecycleIntent;
use crate::supervisor::{ProcessState, SupervisorError};

/// Errors that end a lifecycle operation
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("{intent} is not allowed for service {service}: bootstrapping arbitrator not allowed")]
    InvalidIntent {
        service: String,
        intent: LifecycleIntent,
    },

    #[error("failed to initialize state file {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    #[error("error fetching status for service {service:?}: {source}")]
    StatusQueryFailed {
        service: String,
        #[source]
        source: SupervisorError,
    },

    #[error("job failed during startup: service {service} is {state}")]
    ProcessNotRunning { service: String, state: ProcessState },

    #[error("unexpected response from node at {address}: {reason}")]
    ReadinessRejected {
        address: String,
        status: u16,
        reason: String,
    },

    #[error("wait for service {service} was cancelled after {ticks} checks")]
    Cancelled { service: String, ticks: u64 },

    #[error("service {service} was not ready within {} ({ticks} checks)", format_duration(.waited))]
    Timeout {
        service: String,
        waited: Duration,
        ticks: u64,
    },
}

/// Classification of a [`LifecycleError`] without its context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidIntent,
    PersistenceFailure,
    SupervisorFailure,
    StatusQueryFailed,
    ProcessNotRunning,
    ReadinessRejected,
    Cancelled,
    Timeout,
}

impl LifecycleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::InvalidIntent { .. } => ErrorKind::InvalidIntent,
            LifecycleError::Persistence { .. } => ErrorKind::PersistenceFailure,
            LifecycleError::Supervisor(_) => ErrorKind::SupervisorFailure,
            LifecycleError::StatusQueryFailed { .. } => ErrorKind::StatusQueryFailed,
            LifecycleError::ProcessNotRunning { .. } => ErrorKind::ProcessNotRunning,
            LifecycleError::ReadinessRejected { .. } => ErrorKind::ReadinessRejected,
            LifecycleError::Cancelled { .. } => ErrorKind::Cancelled,
            LifecycleError::Timeout { .. } => ErrorKind::Timeout,
        }
    }
}
