//! Background sync daemon for one branch.
//!
//! Loads the branch's sync config, opens the local store and runs one
//! sync cycle per poll interval until interrupted. The interactive POS
//! app embeds the same orchestrator; this binary exists for headless
//! installs where the register app is not always running.
//!
//! ```text
//! sucursal-syncd [CONFIG_PATH]
//! ```
//!
//! With no argument the platform config path is used
//! (`~/.config/sucursal-pos/sync.toml` on Linux).

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sucursal_db::{Database, DbConfig};
use sucursal_sync::{FirebaseLog, SyncConfig, SyncOrchestrator};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "Daemon failed");
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = match std::env::args().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => SyncConfig::default_path()?,
    };

    info!(path = %config_path.display(), "Loading sync config");
    let config = SyncConfig::load(&config_path)?;
    config.validate()?;

    if !config.sync.enabled {
        warn!("Sync is disabled in the config; nothing to do");
        return Ok(());
    }

    let db = Database::new(DbConfig::new(database_path()?)).await?;
    let log = FirebaseLog::new(&config.remote.base_url, &config.remote.auth_token);

    let poll_interval = Duration::from_secs(config.sync.poll_interval_mins * 60);
    let orchestrator = SyncOrchestrator::new(config, db.clone(), log)?;

    info!(
        branch = %orchestrator.branch(),
        interval_mins = poll_interval.as_secs() / 60,
        "Sync daemon started"
    );

    let mut ticker = tokio::time::interval(poll_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match orchestrator.run_cycle().await {
                    Ok(summary) => info!(%summary, "Cycle finished"),
                    // A failed cycle is retried at the next tick; local
                    // state is never left half-applied (each record
                    // applies atomically).
                    Err(e) => error!(error = %e, "Cycle failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    db.close().await;
    info!("Sync daemon stopped");
    Ok(())
}

/// Local store location: `{data_dir}/sucursal-pos/sucursal.db`.
fn database_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let dirs = directories::ProjectDirs::from("", "", "sucursal-pos")
        .ok_or("Cannot resolve data directory")?;
    std::fs::create_dir_all(dirs.data_dir())?;
    Ok(dirs.data_dir().join("sucursal.db"))
}
