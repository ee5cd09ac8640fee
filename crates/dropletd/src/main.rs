// # dropletd - Droplet Manager CLI
//
// Thin integration layer: all lifecycle and zone logic lives in droplet-core.
//
// The binary is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging
// 3. Wiring the DigitalOcean client, controller, reconciler and reloader
// 4. Running exactly one subcommand and mapping its outcome to an exit code
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// - `DO_API_TOKEN`: DigitalOcean API token (required)
// - `AI_MANAGER_API_BASE`: API base URL
// - `AI_MANAGER_HTTP_TIMEOUT_SECS`: Request timeout (1-300)
// - `AI_MANAGER_DROPLET_NAME`, `AI_MANAGER_REGION`, `AI_MANAGER_SIZE`,
//   `AI_MANAGER_IMAGE`, `AI_MANAGER_SSH_KEYS`, `AI_MANAGER_TAGS`: Droplet parameters
// - `AI_MANAGER_ZONE_FILE`, `AI_MANAGER_ZONE_NAME`: Managed zone file and record label
// - `AI_MANAGER_RELOAD_COMMAND`: DNS service reload command
// - `AI_MANAGER_MODE`: `live` or `dry-run`
// - `AI_MANAGER_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export DO_API_TOKEN=your_token
//
// dropletd status
// dropletd start
// dropletd sync-dns      # cron entry point
// dropletd stop
// ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use droplet_core::{
    CommandReloader, DropletController, ManagerConfig, ReconcileOutcome, StatusSurface,
    Transition, ZoneReconciler,
};
use droplet_provider_digitalocean::DigitalOceanClient;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for the supported outcomes
///
/// - 0: Success (including no-op runs)
/// - 1: Configuration or startup error
/// - 2: Runtime error (API, zone file or reload failure)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DropletExitCode {
    /// Command completed
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Command failed
    RuntimeError = 2,
}

impl From<DropletExitCode> for ExitCode {
    fn from(code: DropletExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Parser)]
#[command(name = "dropletd")]
#[command(about = "On-demand GPU droplet lifecycle and DNS zone sync", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level (overrides AI_MANAGER_LOG_LEVEL)
    #[arg(long, value_parser = ["trace", "debug", "info", "warn", "error"])]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Print the droplet status as JSON
    Status,
    /// Create the droplet unless it already exists
    Start,
    /// Destroy the droplet if it exists
    Stop,
    /// Point the zone's A record at the droplet and reload DNS if it changed
    SyncDns,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration from environment
    let mut config = match ManagerConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DropletExitCode::ConfigError.into();
        }
    };

    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout is reserved for command output
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DropletExitCode::ConfigError.into();
    }

    let app = match App::wire(&config) {
        Ok(app) => app,
        Err(e) => {
            error!("Startup error: {:#}", e);
            return DropletExitCode::ConfigError.into();
        }
    };

    info!(
        "dropletd {:?} (droplet='{}', mode={:?})",
        cli.command, config.droplet.name, config.mode
    );

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DropletExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match app.run(cli.command).await {
            Ok(()) => DropletExitCode::Success,
            Err(e) => {
                if is_transient(&e) {
                    warn!("{:#} (transient, a later run may succeed)", e);
                } else {
                    error!("{:#}", e);
                }
                DropletExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Whether the failure came from a condition that may clear on its own
/// (network trouble, rate limiting, provider 5xx)
fn is_transient(err: &anyhow::Error) -> bool {
    err.downcast_ref::<droplet_core::Error>()
        .is_some_and(droplet_core::Error::is_transient)
}

/// Components wired from the configuration
struct App {
    controller: Arc<DropletController>,
    reconciler: ZoneReconciler,
}

impl App {
    fn wire(config: &ManagerConfig) -> Result<Self> {
        let client = DigitalOceanClient::from_config(config)
            .context("Failed to create DigitalOcean client")?;
        let api: Arc<dyn droplet_core::CloudApi> = Arc::new(client);

        let reloader = CommandReloader::new(&config.zone.reload_command)
            .context("Invalid reload command")?;

        let controller = Arc::new(DropletController::new(
            Arc::clone(&api),
            config.droplet.clone(),
        ));
        let reconciler = ZoneReconciler::new(
            api,
            config.droplet.name.clone(),
            config.zone.clone(),
            Arc::new(reloader),
        );

        Ok(Self {
            controller,
            reconciler,
        })
    }

    async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Status => {
                let surface = StatusSurface::new(Arc::clone(&self.controller));
                let response = surface.get_status().await;
                println!("{}", serde_json::to_string(&response)?);
            }
            Command::Start => {
                match self.controller.ensure_running().await.context("Start failed")? {
                    Transition::AlreadyRunning { id, status } => {
                        info!("Droplet already exists (id={}, status={})", id, status)
                    }
                    transition => info!("Start: {:?}", transition),
                }
            }
            Command::Stop => {
                let transition = self.controller.ensure_stopped().await.context("Stop failed")?;
                info!("Stop: {:?}", transition);
            }
            Command::SyncDns => {
                let outcome = self
                    .reconciler
                    .sync()
                    .await
                    .with_context(|| {
                        format!(
                            "Zone sync for {} failed",
                            self.reconciler.zone_file().display()
                        )
                    })?;

                match outcome {
                    ReconcileOutcome::RecordMissing => {
                        warn!("Zone sync skipped: managed record not found")
                    }
                    outcome => info!("Zone sync: {:?}", outcome),
                }
            }
        }

        Ok(())
    }
}
