pub mod config;
pub mod errors;
pub mod intent;
pub mod orchestrator;
pub mod readiness;
pub mod state_file;
pub mod supervisor;

/// The arbitrator role never holds data and must never seed a cluster.
pub const ARBITRATOR_SERVICE: &str = "garbd";

/// Default location of the sidecar config file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/galera-sidecar/sidecar.yml";
