//! Lifecycle orchestration for the local database node.
//!
//! The `LifecycleOrchestrator` turns a lifecycle intent into three steps:
//! record the declared state, tell the supervisor to start the service, and
//! hold the caller until the node is confirmed ready. Each step fails closed:
//! nothing after a failed step runs.

mod error;
mod wait;

pub use error::{ErrorKind, LifecycleError};
pub use wait::{WaitReport, WaitSettings, wait_for_readiness};

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::SidecarConfig;
use crate::intent::{DeclaredState, LifecycleIntent, ServiceName};
use crate::readiness::{HttpReadinessProbe, ReadinessProbe};
use crate::state_file::StateFile;
use crate::supervisor::{MonitClient, Supervisor};

/// Success message or classified failure of a lifecycle operation
pub type Outcome = Result<String, LifecycleError>;

/// Drives one local service through its lifecycle.
///
/// Operations are meant to be called one at a time. Serializing concurrent
/// callers is up to whoever fronts the orchestrator.
pub struct LifecycleOrchestrator<S, P> {
    service: ServiceName,
    state_file: StateFile,
    supervisor: S,
    probe: P,
    settings: WaitSettings,
}

impl LifecycleOrchestrator<MonitClient, HttpReadinessProbe> {
    /// Wire up the monit adapter and HTTP readiness probe from config
    pub fn from_config(config: &SidecarConfig) -> crate::errors::Result<Self> {
        let supervisor = MonitClient::new(&config.monit)?;
        let probe = HttpReadinessProbe::new(
            config.galera_init_address.clone(),
            config.readiness.probe_timeout,
        )?;

        Ok(Self::new(
            ServiceName::new(config.service_name.clone()),
            StateFile::new(config.state_file_path.clone()),
            supervisor,
            probe,
            WaitSettings::from(&config.readiness),
        ))
    }
}

impl<S, P> LifecycleOrchestrator<S, P>
where
    S: Supervisor,
    P: ReadinessProbe,
{
    pub fn new(
        service: ServiceName,
        state_file: StateFile,
        supervisor: S,
        probe: P,
        settings: WaitSettings,
    ) -> Self {
        Self {
            service,
            state_file,
            supervisor,
            probe,
            settings,
        }
    }

    pub fn service(&self) -> &ServiceName {
        &self.service
    }

    pub fn state_file(&self) -> &StateFile {
        &self.state_file
    }

    pub fn supervisor(&self) -> &S {
        &self.supervisor
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    pub fn settings(&self) -> &WaitSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: WaitSettings) {
        self.settings = settings;
    }

    /// Dispatch an intent to its operation
    pub async fn run(&self, intent: LifecycleIntent, cancel: &CancellationToken) -> Outcome {
        match intent {
            LifecycleIntent::Bootstrap => self.bootstrap(cancel).await,
            LifecycleIntent::Join => self.join(cancel).await,
            LifecycleIntent::SingleNode => self.single_node(cancel).await,
            LifecycleIntent::Stop => self.stop().await,
        }
    }

    /// Seed a new cluster from this node. Refused on arbitrators.
    pub async fn bootstrap(&self, cancel: &CancellationToken) -> Outcome {
        if self.service.is_arbitrator() {
            warn!("Refusing to bootstrap arbitrator service {}", self.service);
            return Err(LifecycleError::InvalidIntent {
                service: self.service.to_string(),
                intent: LifecycleIntent::Bootstrap,
            });
        }

        self.start_declared(LifecycleIntent::Bootstrap, DeclaredState::NeedsBootstrap, cancel)
            .await
    }

    /// Start the node so that it joins the existing cluster
    pub async fn join(&self, cancel: &CancellationToken) -> Outcome {
        self.start_declared(LifecycleIntent::Join, DeclaredState::Clustered, cancel)
            .await
    }

    /// Start the node outside of any cluster
    pub async fn single_node(&self, cancel: &CancellationToken) -> Outcome {
        self.start_declared(LifecycleIntent::SingleNode, DeclaredState::SingleNode, cancel)
            .await
    }

    /// Stop the service. No marker is written and nothing is awaited.
    pub async fn stop(&self) -> Outcome {
        info!("Stopping service {}", self.service);
        self.supervisor.stop(self.service.as_str()).await.map_err(|e| {
            error!("Failed to stop service {}: {}", self.service, e);
            LifecycleError::from(e)
        })?;

        Ok(LifecycleIntent::Stop.success_message().to_string())
    }

    /// Raw supervisor status of the service
    pub async fn status(&self) -> Outcome {
        let state = self.supervisor.status(self.service.as_str()).await?;
        Ok(state.to_string())
    }

    async fn start_declared(
        &self,
        intent: LifecycleIntent,
        declared: DeclaredState,
        cancel: &CancellationToken,
    ) -> Outcome {
        info!(
            "Starting service {} for {} (declared state {})",
            self.service, intent, declared
        );

        self.state_file.write(declared).map_err(|source| {
            error!(
                "Failed to write declared state to {:?}: {}",
                self.state_file.path(),
                source
            );
            LifecycleError::Persistence {
                path: self.state_file.path().to_path_buf(),
                source,
            }
        })?;

        self.supervisor.start(self.service.as_str()).await.map_err(|e| {
            error!("Failed to start service {}: {}", self.service, e);
            LifecycleError::from(e)
        })?;

        let report = wait_for_readiness(
            &self.supervisor,
            &self.probe,
            self.service.as_str(),
            &self.settings,
            cancel,
        )
        .await?;

        info!(
            "{} of {} completed after {} checks",
            intent, self.service, report.ticks
        );
        Ok(intent.success_message().to_string())
    }
}
