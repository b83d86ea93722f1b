//! Axum server publishing a package directory as a catalog

use axum::{routing::get, Router};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers::{self, CatalogDir};

/// Routes for `GET /list` and `GET /download/{name}` over `root`
pub fn router(root: PathBuf) -> Router {
    let state = Arc::new(CatalogDir::new(root));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/list", get(handlers::list_packages))
        .route("/download/{name}", get(handlers::download_package))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Bind `addr` and serve `root` until the task is dropped
pub async fn serve(addr: &str, root: PathBuf) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, root).await
}

/// Serve `root` on an already bound listener
pub async fn serve_on(listener: TcpListener, root: PathBuf) -> anyhow::Result<()> {
    info!(
        "Serving catalog from {} at http://{}",
        root.display(),
        listener.local_addr()?
    );
    axum::serve(listener, router(root)).await?;
    Ok(())
}
