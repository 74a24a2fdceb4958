use std::net::SocketAddr;

use anyhow::{Context, Result};
use tracing::{info, warn};

use leaf_lookup::{app, build_state, config, retention};

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    init_tracing();
    if let Ok(path) = dotenv {
        info!(".env read from {}", path.display());
    }

    let config = config::Config::from_env()?;
    config::ensure_results_table(&config).await?;
    let state = build_state(&config).await?;

    match config.retention {
        Some(policy) => {
            retention::spawn_sweeper(
                policy,
                vec![config.upload_dir.clone(), config.results_dir.clone()],
            );
        }
        None => warn!("RETENTION_MAX_AGE_SECS not set, uploads and masks are kept forever"),
    }

    let app = app(state, config.body_limit_bytes);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("Listening on http://{}", addr);
    axum::Server::try_bind(&addr)
        .with_context(|| format!("Failed to bind {addr}"))?
        .serve(app.into_make_service())
        .await
        .context("server error")
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("leaf_lookup=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
