//! Catalog endpoint handlers

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::software::{LocalLibrary, SoftwareItem};

/// Shared state: the directory being published
pub struct CatalogDir {
    library: LocalLibrary,
}

impl CatalogDir {
    pub fn new(root: PathBuf) -> Self {
        Self {
            library: LocalLibrary::new(root),
        }
    }
}

/// GET /list - Sorted names of the packages on offer
pub async fn list_packages(State(state): State<Arc<CatalogDir>>) -> Json<Vec<String>> {
    let names: Vec<String> = state
        .library
        .list()
        .into_iter()
        .map(String::from)
        .collect();
    info!("Listing {} package(s)", names.len());
    Json(names)
}

/// GET /download/{name} - Raw package body
pub async fn download_package(
    State(state): State<Arc<CatalogDir>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let item = SoftwareItem::new(name).map_err(|e| {
        warn!("Rejected download: {}", e);
        StatusCode::NOT_FOUND
    })?;

    match tokio::fs::read(state.library.path_of(&item)).await {
        Ok(body) => {
            info!("Serving {} ({} bytes)", item, body.len());
            Ok(([(header::CONTENT_TYPE, "application/octet-stream")], body))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            warn!("Failed to read {}: {}", item, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
