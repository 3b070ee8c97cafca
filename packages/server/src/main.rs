use std::net::SocketAddr;
use std::sync::Arc;

use common::storage::filesystem::FilesystemBlobStore;
use tracing::{Level, info};

use server::config::AppConfig;
use server::database;
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load()?;

    let db = database::init_db(&config.database.url).await?;
    info!("Database initialized");

    let blob_store = FilesystemBlobStore::new(
        config.storage.data_dir.clone(),
        config.storage.max_blob_size,
    )
    .await?;
    info!("Blob store ready at {}", config.storage.data_dir.display());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let state = AppState {
        db,
        blob_store: Arc::new(blob_store),
        config,
    };

    let app = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running at http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
