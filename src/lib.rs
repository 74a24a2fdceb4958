//! Upload a leaf image, look its filename up in a precomputed results table
//! and show the stored lesion mask next to an infection gauge.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

pub mod config;
pub mod error;
pub mod handlers;
pub mod mask;
pub mod results;
pub mod retention;
pub mod upload;
pub mod views;

use config::Config;
use handlers::{health_check, index, lookup_handler, AppState, SharedState};
use mask::FsProbe;
use results::ResultsTable;

/// Loads the results table and prepares the upload and output directories.
pub async fn build_state(config: &Config) -> Result<SharedState> {
    let table = ResultsTable::new(&config.results_csv)?;
    info!(
        "loaded {} result rows from {}",
        table.len(),
        config.results_csv.display()
    );

    for dir in [&config.upload_dir, &config.results_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    Ok(Arc::new(AppState {
        table,
        mask_root: config.mask_root.clone(),
        upload_dir: config.upload_dir.clone(),
        results_dir: config.results_dir.clone(),
        probe: Box::new(FsProbe),
    }))
}

pub fn app(state: SharedState, body_limit_bytes: usize) -> Router {
    let uploads = ServeDir::new(&state.upload_dir);
    let results = ServeDir::new(&state.results_dir);

    Router::new()
        .route("/", get(index).post(lookup_handler))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .with_state(state)
        .route("/health", get(health_check))
        .nest_service(handlers::UPLOADS_URL_PREFIX, uploads)
        .nest_service(handlers::RESULTS_URL_PREFIX, results)
        .layer(TraceLayer::new_for_http())
}
