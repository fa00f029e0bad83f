use gateway::{create_router, AppState};
use matching_engine::{EngineConfig, EventBus, MatchingEngine, SnapshotRegistry};
use persistence::{FileStore, OrderStore};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt::init();

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let store_path =
        std::env::var("STORE_PATH").unwrap_or_else(|_| "data/trade-engine.log".to_string());
    let queue_capacity = std::env::var("QUEUE_CAPACITY")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(10_000);

    tracing::info!(%bind_addr, %store_path, queue_capacity, "starting trade engine");

    let store: Arc<dyn OrderStore> = Arc::new(FileStore::open(&store_path)?);
    let snapshots = Arc::new(SnapshotRegistry::new());
    let events = EventBus::new(256);

    // Runs recovery before accepting the first command
    let engine = Arc::new(MatchingEngine::start(
        EngineConfig {
            queue_capacity,
            ..EngineConfig::default()
        },
        store.clone(),
        snapshots.clone(),
        events.clone(),
    ));

    let state = AppState::new(store, engine, snapshots, events);
    let app = create_router(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
