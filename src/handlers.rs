use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::Html,
    Json,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::json;
use tracing::info;

use crate::{
    error::LookupError,
    mask::{self, PathProbe},
    results::ResultsTable,
    upload::{self, unique_token},
    views::{self, ResultView},
};

pub const UPLOADS_URL_PREFIX: &str = "/static/uploads";
pub const RESULTS_URL_PREFIX: &str = "/static/results";

// Characters escaped inside a single URL path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'\\')
    .add(b'^')
    .add(b'|');

/// Shared, read-only state built once at startup.
pub struct AppState {
    pub table: ResultsTable,
    pub mask_root: PathBuf,
    pub upload_dir: PathBuf,
    pub results_dir: PathBuf,
    pub probe: Box<dyn PathProbe>,
}

pub type SharedState = Arc<AppState>;

pub fn public_url(prefix: &str, file_name: &str) -> String {
    format!("{}/{}", prefix, utf8_percent_encode(file_name, SEGMENT))
}

pub async fn index() -> Html<String> {
    Html(views::upload_page(None))
}

pub async fn lookup_handler(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Html<String>, LookupError> {
    // a form posted without multipart encoding carries no file
    let multipart = multipart?;
    let uploaded = upload::receive(multipart, &state.upload_dir).await?;
    let view = lookup_and_publish(&state, &uploaded.original_filename, &uploaded.storage_name).await?;
    Ok(Html(views::result_page(&view)))
}

/// Joins an already stored upload against the results table and publishes
/// its mask. The upload stays on disk whatever the outcome.
pub async fn lookup_and_publish(
    state: &AppState,
    filename: &str,
    storage_name: &str,
) -> Result<ResultView, LookupError> {
    let row = state
        .table
        .lookup(filename)
        .ok_or_else(|| LookupError::UnknownFilename(filename.to_string()))?;

    let mask_src = mask::resolve(&state.mask_root, &row.label, filename, state.probe.as_ref())
        .ok_or_else(|| LookupError::MaskNotFound(filename.to_string()))?;

    let mask_name = publish_mask(&mask_src, &state.results_dir).await?;
    info!(
        "lookup {} -> {} ({:.1}%), mask {}",
        filename, row.label, row.infected_pct_leaf, mask_name
    );

    Ok(ResultView {
        label: row.label.clone(),
        infected_pct: row.infected_pct_leaf,
        original_url: public_url(UPLOADS_URL_PREFIX, storage_name),
        mask_url: public_url(RESULTS_URL_PREFIX, &mask_name),
    })
}

/// Copies the mask into the public results directory under a fresh name.
async fn publish_mask(mask_src: &Path, results_dir: &Path) -> Result<String, LookupError> {
    let dest_name = format!("{}_mask.png", unique_token());
    tokio::fs::copy(mask_src, results_dir.join(&dest_name)).await?;
    Ok(dest_name)
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "OK" }))
}
