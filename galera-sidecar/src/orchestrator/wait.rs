//! Readiness wait protocol.
//!
//! After a start command, each tick asks the supervisor whether the process
//! is alive and, if it is, asks the node whether it has finished
//! initializing. A dead process or an explicit "no" from the node ends the
//! wait; an unreachable readiness endpoint is expected during early startup
//! and is retried on the next tick.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::LifecycleError;
use crate::config::ReadinessConfig;
use crate::config::duration::format_duration;
use crate::readiness::{ProbeOutcome, ReadinessProbe};
use crate::supervisor::Supervisor;

/// Cadence and overall bound of the wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSettings {
    pub tick_interval: Duration,
    pub max_wait: Option<Duration>,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            max_wait: None,
        }
    }
}

impl From<&ReadinessConfig> for WaitSettings {
    fn from(config: &ReadinessConfig) -> Self {
        Self {
            tick_interval: config.tick_interval,
            max_wait: config.max_wait,
        }
    }
}

/// How a successful wait went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitReport {
    pub ticks: u64,
    pub elapsed: Duration,
}

/// Block until `service` is running and its readiness endpoint answers 200.
///
/// The first check happens one `tick_interval` after the call. Cancellation
/// and `max_wait` interrupt the tick sleep as well as in-flight status
/// queries and probes.
pub async fn wait_for_readiness<S, P>(
    supervisor: &S,
    probe: &P,
    service: &str,
    settings: &WaitSettings,
    cancel: &CancellationToken,
) -> Result<WaitReport, LifecycleError>
where
    S: Supervisor,
    P: ReadinessProbe,
{
    let started = Instant::now();
    let guard = Interruptions {
        service,
        cancel,
        deadline: settings.max_wait.map(|max| started + max),
        started,
    };

    let mut ticker = interval_at(started + settings.tick_interval, settings.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks: u64 = 0;

    loop {
        guard.run(ticks, ticker.tick()).await?;
        ticks += 1;

        let state = guard
            .run(ticks, supervisor.status(service))
            .await?
            .map_err(|source| LifecycleError::StatusQueryFailed {
                service: service.to_string(),
                source,
            })?;

        info!("Service {} is {} (check {})", service, state, ticks);

        if !state.is_running() {
            warn!("Service {} left the running state during startup", service);
            return Err(LifecycleError::ProcessNotRunning {
                service: service.to_string(),
                state,
            });
        }

        debug!("Probing readiness of {} at {}", service, probe.address());
        match guard.run(ticks, probe.probe()).await? {
            ProbeOutcome::Ready => {
                let elapsed = started.elapsed();
                info!(
                    "Service {} ready after {} checks ({})",
                    service,
                    ticks,
                    format_duration(&elapsed)
                );
                return Ok(WaitReport { ticks, elapsed });
            }
            ProbeOutcome::Rejected { status, reason } => {
                warn!(
                    "Readiness endpoint {} rejected {}: {}",
                    probe.address(),
                    service,
                    reason
                );
                return Err(LifecycleError::ReadinessRejected {
                    address: probe.address().to_string(),
                    status,
                    reason,
                });
            }
            ProbeOutcome::Unreachable(e) => {
                warn!(
                    "Readiness endpoint {} not answering yet: {}",
                    probe.address(),
                    e
                );
            }
        }
    }
}

struct Interruptions<'a> {
    service: &'a str,
    cancel: &'a CancellationToken,
    deadline: Option<Instant>,
    started: Instant,
}

impl Interruptions<'_> {
    /// Drive `fut` unless cancellation or the deadline fires first.
    async fn run<F: Future>(&self, ticks: u64, fut: F) -> Result<F::Output, LifecycleError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                info!("Wait for {} cancelled", self.service);
                Err(LifecycleError::Cancelled {
                    service: self.service.to_string(),
                    ticks,
                })
            }
            _ = until(self.deadline) => {
                warn!(
                    "Wait for {} hit its deadline after {}",
                    self.service,
                    format_duration(&self.started.elapsed())
                );
                Err(LifecycleError::Timeout {
                    service: self.service.to_string(),
                    waited: self.started.elapsed(),
                    ticks,
                })
            }
            output = fut => Ok(output),
        }
    }
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
