use std::{
    io,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::RetentionPolicy;

/// Deletes regular files in `dir` last modified more than `max_age` before
/// `now`. Returns how many were removed.
pub async fn sweep_dir(dir: &Path, max_age: Duration, now: SystemTime) -> io::Result<usize> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut removed = 0;

    while let Some(entry) = entries.next_entry().await? {
        let metadata = match entry.metadata().await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => continue,
            Err(err) => {
                warn!("retention: cannot stat {}: {}", entry.path().display(), err);
                continue;
            }
        };
        if !is_expired(&entry.path(), metadata.modified(), max_age, now) {
            continue;
        }

        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => {
                debug!("retention: removed {}", entry.path().display());
                removed += 1;
            }
            Err(err) => warn!("retention: cannot remove {}: {}", entry.path().display(), err),
        }
    }

    Ok(removed)
}

/// Files without a readable mtime are kept and skipped.
fn is_expired(
    path: &Path,
    modified: io::Result<SystemTime>,
    max_age: Duration,
    now: SystemTime,
) -> bool {
    match modified {
        // files from the future are never expired
        Ok(modified) => now.duration_since(modified).unwrap_or_default() > max_age,
        Err(err) => {
            warn!("retention: no mtime for {}: {}", path.display(), err);
            false
        }
    }
}

/// Starts the background sweeper over the given directories.
pub fn spawn_sweeper(policy: RetentionPolicy, dirs: Vec<PathBuf>) -> JoinHandle<()> {
    info!(
        "retention enabled: max_age={}s interval={}s",
        policy.max_age.as_secs(),
        policy.interval.as_secs()
    );
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(policy.interval);
        loop {
            ticker.tick().await;
            let now = SystemTime::now();
            for dir in &dirs {
                match sweep_dir(dir, policy.max_age, now).await {
                    Ok(0) => {}
                    Ok(n) => info!("retention: removed {} file(s) from {}", n, dir.display()),
                    Err(err) => warn!("retention: sweep of {} failed: {}", dir.display(), err),
                }
            }
        }
    })
}
