use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use citesearch_backend::core::config::AppPaths;
use citesearch_backend::core::logging;
use citesearch_backend::server;
use citesearch_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = AppPaths::new();
    logging::init(&paths);

    let state = AppState::initialize_with_paths(paths).await?;

    let bind_addr = state.settings.bind_address();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    println!("CITESEARCH_PORT={}", addr.port());
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
