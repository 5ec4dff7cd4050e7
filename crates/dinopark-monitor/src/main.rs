//! Service entry point for the DinoPark monitor.
//!
//! Wires together the data layer, the feed poller, and the observer
//! API server. The poller pulls the park event feed on a fixed
//! interval and reconciles it into `PostgreSQL`; the observer serves
//! zone safety derived live from the same store.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `dinopark-config.yaml` (env overrides
//!    for `DATABASE_URL` and `FEED_URL`)
//! 2. Initialize structured logging (tracing)
//! 3. Connect to `PostgreSQL` and run migrations
//! 4. Seed the fixed 416-zone grid
//! 5. Build the feed client and poller
//! 6. Spawn the poll loop and run the observer server

mod error;
mod feed;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use dinopark_core::config::MonitorConfig;
use dinopark_core::poller::Poller;
use dinopark_core::store::EntityStore;
use dinopark_db::{PostgresConfig, PostgresPool};
use dinopark_observer::state::AppState;
use dinopark_observer::{ServerConfig, start_server};
use dinopark_types::ZoneCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::feed::FeedClient;

/// Default configuration file path, overridable via `DINOPARK_CONFIG`.
const DEFAULT_CONFIG_PATH: &str = "dinopark-config.yaml";

/// Load configuration from the configured path, falling back to
/// defaults when no file exists (local development against Docker).
fn load_config() -> Result<MonitorConfig, error::MonitorError> {
    let path = std::env::var("DINOPARK_CONFIG")
        .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
    if Path::new(&path).exists() {
        Ok(MonitorConfig::from_file(Path::new(&path))?)
    } else {
        Ok(MonitorConfig::default())
    }
}

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step or the server itself
/// fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging. RUST_LOG wins over the config
    //    file so operators can crank verbosity without redeploying.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.filter.clone())),
        )
        .with_target(true)
        .init();

    info!("dinopark-monitor starting");
    info!(
        feed_url = config.feed.url,
        poll_interval_secs = config.feed.poll_interval_secs,
        server_port = config.server.port,
        "configuration loaded"
    );

    // 3. Connect to PostgreSQL and run migrations.
    let pg_config = PostgresConfig::new(&config.database.url)
        .with_max_connections(config.database.max_connections);
    let pool = PostgresPool::connect(&pg_config).await?;
    pool.run_migrations().await?;
    let store = Arc::new(pool.entity_store());

    // 4. Seed the fixed zone grid. Idempotent across restarts.
    store.seed_zones(&ZoneCode::all()).await?;
    info!("zone grid ready");

    // 5. Build the feed client and poller.
    let feed_client = FeedClient::new(
        &config.feed.url,
        Duration::from_secs(config.feed.fetch_timeout_secs),
    )?;
    let poller = Poller::new(
        Arc::clone(&store),
        feed_client,
        Duration::from_secs(config.feed.poll_interval_secs),
    );
    let poller_state = poller.state();

    // 6. Spawn the poll loop and run the observer server.
    let poller_handle = tokio::spawn(poller.run());

    let app_state = Arc::new(AppState::with_poller(store, Arc::clone(&poller_state)));
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    let served = start_server(&server_config, app_state).await;

    // Server returned (shutdown or fatal error): stop submitting new
    // batches before exiting.
    poller_state.request_stop();
    poller_handle.abort();
    info!("dinopark-monitor stopped");

    served?;
    Ok(())
}
