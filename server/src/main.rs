// Forbid unwrap() in production code to prevent panics at startup.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
use std::net::SocketAddr;
use std::sync::Arc;

use race_hub::{
    broadcast::Broadcaster,
    config::ServerConfig,
    drivers::DriverRegistry,
    race_state::{RaceSessionState, RaceStateManager},
    server::{AppState, ControlPolicy, router},
    simulation::{RaceSimulator, SeededRandom, spawn_simulation_task},
    time::SystemTimeSource,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
#[allow(clippy::disallowed_methods)] // Arc::clone is safe and expected for shared state
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "race_hub=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Loaded configuration: listen_port={}, static_directory={:?}, control_header={:?}, tick_period={:?}",
        config.listen_port,
        config.static_directory,
        config.control_header,
        config.simulation.tick_period(),
    );

    let registry = DriverRegistry::default_field();
    let broadcaster = Arc::new(Broadcaster::new(config.subscriber_queue_capacity));
    let race_state = Arc::new(RaceStateManager::new(
        RaceSessionState::default(),
        broadcaster,
    ));

    let random = config.seed.map_or_else(SeededRandom::from_entropy, |seed| {
        tracing::info!(seed, "using fixed simulation seed");
        SeededRandom::new(seed)
    });
    let simulator = RaceSimulator::new(
        &registry,
        config.simulation.clone(),
        random,
        SystemTimeSource,
    );
    let simulation = spawn_simulation_task(
        simulator,
        Arc::clone(&race_state),
        config.simulation.tick_period(),
    );

    let state = AppState {
        race_state,
        control_policy: ControlPolicy::from_config(&config),
    };
    let app = router(state, config.static_directory.as_deref());

    // Connect to the websocket on ws://<host>:<port>/ws
    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind: {e}");
            std::process::exit(1);
        });

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    let ticks = simulation.stop().await;
    tracing::info!(ticks, "shut down");

    if let Err(e) = served {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
