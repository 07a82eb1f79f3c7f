use anyhow::Result;
use clap::{Parser, Subcommand};
use galera_sidecar::DEFAULT_CONFIG_PATH;
use galera_sidecar::config::SidecarConfig;
use galera_sidecar::config::duration::parse_duration;
use galera_sidecar::intent::LifecycleIntent;
use galera_sidecar::orchestrator::{LifecycleOrchestrator, WaitSettings};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Galera sidecar - drive the local database node through its lifecycle
#[derive(Parser, Debug)]
#[command(name = "galera-sidecar")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the sidecar configuration file
    #[arg(short = 'f', long = "file", global = true, default_value = DEFAULT_CONFIG_PATH)]
    file: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seed a new cluster from this node
    Bootstrap {
        /// Give up if the node is not ready in time (e.g. "10m")
        #[arg(long, value_parser = parse_duration)]
        max_wait: Option<Duration>,
    },
    /// Start the node and join the existing cluster
    Join {
        #[arg(long, value_parser = parse_duration)]
        max_wait: Option<Duration>,
    },
    /// Start the node outside of any cluster
    SingleNode {
        #[arg(long, value_parser = parse_duration)]
        max_wait: Option<Duration>,
    },
    /// Stop the database service
    Stop,
    /// Print the supervisor's status for the database service
    Status,
}

impl Command {
    fn intent(&self) -> Option<LifecycleIntent> {
        match self {
            Command::Bootstrap { .. } => Some(LifecycleIntent::Bootstrap),
            Command::Join { .. } => Some(LifecycleIntent::Join),
            Command::SingleNode { .. } => Some(LifecycleIntent::SingleNode),
            Command::Stop => Some(LifecycleIntent::Stop),
            Command::Status => None,
        }
    }

    fn max_wait(&self) -> Option<Duration> {
        match self {
            Command::Bootstrap { max_wait }
            | Command::Join { max_wait }
            | Command::SingleNode { max_wait } => *max_wait,
            Command::Stop | Command::Status => None,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = SidecarConfig::load(&cli.file)?;
    let mut orchestrator = LifecycleOrchestrator::from_config(&config)?;

    if let Some(max_wait) = cli.command.max_wait() {
        orchestrator.set_settings(WaitSettings {
            max_wait: Some(max_wait),
            ..*orchestrator.settings()
        });
    }

    let Some(intent) = cli.command.intent() else {
        println!("{}", orchestrator.status().await?);
        return Ok(());
    };

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, abandoning wait");
            signal_cancel.cancel();
        }
    });

    info!("Running {} for {}", intent, orchestrator.service());
    let message = orchestrator.run(intent, &cancel).await?;
    println!("{}", message);
    Ok(())
}
