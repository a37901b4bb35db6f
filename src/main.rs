use fitdash::{AppState, CHANNEL_NAME, SharedContext, SnapshotStore, resolve_storage_path};
use std::{env, net::SocketAddr};
use tokio::fs;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let storage_path = resolve_storage_path();
    if let Some(parent) = storage_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let context = SharedContext::init(SnapshotStore::new(storage_path), CHANNEL_NAME, None).await;
    let app = fitdash::app::router(AppState::new(context));

    let port = env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
