//! Lifecast server binary.
//!
//! Wires the simulation loop to the observer and runs until interrupted.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (`lifecast-config.yaml`, or the path given as the
//!    first argument)
//! 2. Initialize structured logging (tracing)
//! 3. Build the toroidal plane
//! 4. Create the simulation and queue the initial seed
//! 5. Start the observer (HTTP + `WebSocket`)
//! 6. Run the simulation loop on the main task until `Ctrl-C`

mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lifecast_core::{LifecastConfig, SessionSettings, Simulation, SimulationSettings};
use lifecast_grid::{Grid, Torus};
use lifecast_observer::{AppState, ServerConfig, spawn_observer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::ServerError;

const DEFAULT_CONFIG_PATH: &str = "lifecast-config.yaml";

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // 1. Load configuration. Logging is not up yet, so remember where it
    //    came from and report it once it is.
    let config_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, from_file) = load_config(&config_path)?;

    // 2. Initialize structured logging. RUST_LOG wins over the config file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        path = %config_path.display(),
        from_file,
        "lifecast-server starting"
    );
    info!(
        width = config.grid.width,
        height = config.grid.height,
        tick_interval_ms = config.timing.tick_interval_ms,
        snapshot_interval_ms = config.timing.snapshot_interval_ms,
        "Configuration loaded"
    );

    // 3. Build the plane.
    let torus = Torus::new(config.grid.width, config.grid.height)?;
    let grid = Grid::new(torus);

    // 4. Create the simulation and queue the initial population. The loop
    //    is not running yet; the seed waits in the command stream.
    let (simulation, handle) = Simulation::new(grid, SimulationSettings::from_config(&config));
    let seeded = handle
        .seed(config.seed.cell_count, config.seed.spread)
        .await;
    info!(
        cell_count = config.seed.cell_count,
        spread = config.seed.spread,
        outcome = ?seeded,
        "Initial seed queued"
    );

    // 5. Start the observer.
    let app_state = Arc::new(AppState::new(
        handle,
        SessionSettings::from(&config.timing),
        config.server.static_dir.clone(),
    ));
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    let observer = spawn_observer(&server_config, app_state).await?;
    info!(addr = %observer.local_addr, "Observer started");

    // 6. Run the loop until interrupted.
    tokio::select! {
        summary = simulation.run() => {
            info!(
                generation = summary.generation,
                live_cells = summary.live_cells,
                commands_applied = summary.commands_applied,
                "Simulation loop ended"
            );
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "Failed to listen for Ctrl-C");
            }
            info!("Shutdown requested");
        }
    }

    observer.task.abort();
    info!("lifecast-server shutdown complete");
    Ok(())
}

/// Load and validate configuration, falling back to defaults when the file
/// does not exist.
fn load_config(path: &Path) -> Result<(LifecastConfig, bool), ServerError> {
    let (config, from_file) = if path.exists() {
        (LifecastConfig::from_file(path)?, true)
    } else {
        (LifecastConfig::parse("")?, false)
    };
    config.validate()?;
    Ok((config, from_file))
}
