pub mod api;
pub mod cli;
pub mod config;
pub mod energy;
pub mod errors;
pub mod monitoring;
pub mod twin;

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub use api::routes::{create_router, AppState};
pub use config::Settings;
pub use errors::{TwinError, TwinResult};
pub use twin::{DigitalTwinService, InMemoryCuttingStore};

/// Opens the configured store: the JSON seed file when one is set, empty otherwise.
pub async fn open_store(settings: &Settings) -> TwinResult<InMemoryCuttingStore> {
    match &settings.store.seed_path {
        Some(path) => InMemoryCuttingStore::load_seed(path).await,
        None => Ok(InMemoryCuttingStore::new()),
    }
}

pub fn build_state(store: InMemoryCuttingStore, settings: Settings) -> Arc<AppState> {
    let twin = DigitalTwinService::new(Arc::new(store), settings.twin.clone());
    Arc::new(AppState::new(twin, settings))
}

/// Serves on the configured host; `port` overrides the configured port.
pub async fn run_server(mut settings: Settings, port: u16) -> anyhow::Result<()> {
    settings.server.port = port;
    let store = open_store(&settings).await?;
    let address = settings.server_address();
    let app = create_router(build_state(store, settings));

    let listener = TcpListener::bind(&address).await?;
    info!(address = %address, "Twin dashboard listening");
    axum::serve(listener, app).await?;
    Ok(())
}
