//! meridian-land-server binary
//!
//! Starts the land engine for one region and runs its maintenance loop
//! (prim-count taint resolution, access-list expiry, parcel-info cache
//! eviction) until shutdown.
//!
//! ## Configuration (CLI / env, with TOML fallback via the `config` crate)
//!
//! | Key                       | Default       | Description                      |
//! |---------------------------|---------------|----------------------------------|
//! | `LAND_REGION_NAME`        | `Meridian`    | Region display name              |
//! | `LAND_GRID_X`             | `1000`        | Region grid X coordinate         |
//! | `LAND_GRID_Y`             | `1000`        | Region grid Y coordinate         |
//! | `LAND_ESTATE_OWNER`       | *(random)*    | Estate owner uuid                |
//! | `LAND_FORCEFUL_BANS`      | `true`        | Reposition banned avatars        |
//! | `LAND_BAN_SAFETY_HEIGHT`  | `100.0`       | Ban-line altitude (metres)       |
//! | `LAND_TICK_RATE_HZ`       | `1`           | Maintenance tick rate            |
//! | `LAND_INFO_TTL_SECS`      | `30`          | Remote parcel-info cache TTL     |
//! | `LAND_INFO_CAPACITY`      | `128`         | Remote parcel-info cache size    |
//! | `LAND_CONFIG`             | `land`        | TOML config file (no extension)  |

use anyhow::Result;
use clap::Parser;
use meridian_land::{
    scene::{EstateGate, MemoryStore, NoNeighbors, NullListener, StaticCensus},
    AgentId, LandServiceConfig, LandService,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "meridian-land-server", about = "Meridian Land Engine", version)]
struct Args {
    /// Region display name
    #[arg(long, env = "LAND_REGION_NAME")]
    region_name: Option<String>,

    /// Region grid X coordinate
    #[arg(long, env = "LAND_GRID_X")]
    grid_x: Option<u32>,

    /// Region grid Y coordinate
    #[arg(long, env = "LAND_GRID_Y")]
    grid_y: Option<u32>,

    /// Estate owner uuid (bootstrap parcel owner)
    #[arg(long, env = "LAND_ESTATE_OWNER")]
    estate_owner: Option<Uuid>,

    /// Reposition banned avatars instead of only warning them
    #[arg(long, env = "LAND_FORCEFUL_BANS")]
    forceful_bans: Option<bool>,

    /// Altitude below which ban lines apply
    #[arg(long, env = "LAND_BAN_SAFETY_HEIGHT")]
    ban_safety_height: Option<f32>,

    /// Maintenance tick rate (Hz)
    #[arg(long, env = "LAND_TICK_RATE_HZ")]
    tick_rate_hz: Option<f32>,

    /// Remote parcel-info cache TTL in seconds
    #[arg(long, env = "LAND_INFO_TTL_SECS")]
    info_ttl_secs: Option<u64>,

    /// Remote parcel-info cache capacity
    #[arg(long, env = "LAND_INFO_CAPACITY")]
    info_capacity: Option<usize>,

    /// TOML config file name, without extension
    #[arg(long, env = "LAND_CONFIG", default_value = "land")]
    config: String,
}

/// Optional TOML-file settings, overridden by CLI/env.
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    region_name: Option<String>,
    grid_x: Option<u32>,
    grid_y: Option<u32>,
    estate_owner: Option<Uuid>,
    forceful_bans: Option<bool>,
    ban_safety_height: Option<f32>,
    tick_rate_hz: Option<f32>,
    info_ttl_secs: Option<u64>,
    info_capacity: Option<usize>,
}

fn load_file_settings(name: &str) -> FileSettings {
    config::Config::builder()
        .add_source(config::File::with_name(name).required(false))
        .build()
        .and_then(|c| c.try_deserialize())
        .unwrap_or_else(|e| {
            tracing::warn!("ignoring config file '{}': {}", name, e);
            FileSettings::default()
        })
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("meridian_land=debug".parse()?),
        )
        .init();

    let args = Args::parse();
    let file = load_file_settings(&args.config);

    let region_name = args
        .region_name
        .or(file.region_name)
        .unwrap_or_else(|| "Meridian".to_string());
    let grid_x = args.grid_x.or(file.grid_x).unwrap_or(1000);
    let grid_y = args.grid_y.or(file.grid_y).unwrap_or(1000);
    let estate_owner = AgentId(
        args.estate_owner
            .or(file.estate_owner)
            .unwrap_or_else(Uuid::new_v4),
    );
    let tick_rate_hz = args.tick_rate_hz.or(file.tick_rate_hz).unwrap_or(1.0);

    let service_config = LandServiceConfig {
        region_name: region_name.clone(),
        region_handle: meridian_land::types::region_handle(grid_x, grid_y),
        estate_owner,
        forceful_bans: args.forceful_bans.or(file.forceful_bans).unwrap_or(true),
        ban_line_safety_height: args
            .ban_safety_height
            .or(file.ban_safety_height)
            .unwrap_or(100.0),
        parcel_info_ttl_secs: args.info_ttl_secs.or(file.info_ttl_secs).unwrap_or(30),
        parcel_info_capacity: args.info_capacity.or(file.info_capacity).unwrap_or(128),
        ..Default::default()
    };

    tracing::info!(
        "Starting meridian-land-server (region='{}' at {},{}, estate owner {}, forceful_bans={})",
        region_name,
        grid_x,
        grid_y,
        estate_owner,
        service_config.forceful_bans,
    );

    // Build the engine with in-memory collaborators. A production deploy
    // swaps the store and directory for database/grid-backed ones.
    let mut service = LandService::new(
        service_config,
        Arc::new(EstateGate::new(estate_owner)),
        Arc::new(MemoryStore::new()),
        Arc::new(NoNeighbors),
        Arc::new(StaticCensus::new()),
        Arc::new(NullListener),
    );
    service.bootstrap();

    let service = Arc::new(parking_lot::Mutex::new(service));

    // -----------------------------------------------------------------------
    // Maintenance tick loop
    // -----------------------------------------------------------------------

    let tick_service = service.clone();
    let tick_handle = tokio::spawn(async move {
        let interval = std::time::Duration::from_secs_f32(1.0 / tick_rate_hz.max(0.01));
        let mut timer = tokio::time::interval(interval);
        let mut ticks: u64 = 0;
        loop {
            timer.tick().await;
            ticks += 1;

            // Hold the lock only long enough for one maintenance pass.
            let stats = {
                let mut svc = tick_service.lock();
                svc.refresh_prim_counts();
                svc.prune_access_lists();
                svc.purge_parcel_info_cache();
                svc.stats()
            };

            if ticks % 30 == 0 {
                tracing::info!(
                    "land: {} parcels, {} avatars tracked, {} movement events, {} cached remote lookups",
                    stats.parcels,
                    stats.tracked_avatars,
                    stats.movement_events,
                    stats.cached_parcel_info,
                );
            }
        }
    });

    // -----------------------------------------------------------------------
    // Wait for shutdown signal
    // -----------------------------------------------------------------------

    tokio::select! {
        _ = tick_handle => {
            tracing::error!("land maintenance loop exited unexpectedly");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("meridian-land-server shutting down (SIGINT)");
        }
    }

    Ok(())
}
