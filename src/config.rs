use std::{
    env,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use anyhow::{anyhow, bail, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use tracing::info;

const DEFAULT_RESULTS_CSV: &str = "results_with_infected_area_all_splits.csv";
const DEFAULT_MASK_ROOT: &str = "Segmented/masks";
const DEFAULT_UPLOAD_DIR: &str = "static/uploads";
const DEFAULT_RESULTS_DIR: &str = "static/results";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_BODY_LIMIT_MB: usize = 5;
const DEFAULT_RETENTION_INTERVAL_SECS: u64 = 3600;

/// Everything the server reads from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub body_limit_bytes: usize,
    pub results_csv: PathBuf,
    pub results_csv_url: Option<String>,
    pub mask_root: PathBuf,
    pub upload_dir: PathBuf,
    pub results_dir: PathBuf,
    pub retention: Option<RetentionPolicy>,
}

/// Age limit for stored uploads and published masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_age: Duration,
    pub interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't have to
    /// touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let body_limit_bytes = parse_or(&lookup, "BODY_LIMIT_MB", DEFAULT_BODY_LIMIT_MB)?
            .checked_mul(1024 * 1024)
            .ok_or_else(|| anyhow!("BODY_LIMIT_MB is too large"))?;

        let path_or = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(default))
        };

        let retention = match lookup("RETENTION_MAX_AGE_SECS").filter(|v| !v.is_empty()) {
            Some(raw) => {
                let max_age: u64 = raw
                    .parse()
                    .with_context(|| format!("RETENTION_MAX_AGE_SECS must be a number, got {raw:?}"))?;
                let interval =
                    parse_or(&lookup, "RETENTION_INTERVAL_SECS", DEFAULT_RETENTION_INTERVAL_SECS)?;
                if interval == 0 {
                    bail!("RETENTION_INTERVAL_SECS must be greater than zero");
                }
                Some(RetentionPolicy {
                    max_age: Duration::from_secs(max_age),
                    interval: Duration::from_secs(interval),
                })
            }
            None => None,
        };

        Ok(Config {
            port,
            body_limit_bytes,
            results_csv: path_or("RESULTS_CSV", DEFAULT_RESULTS_CSV),
            results_csv_url: lookup("RESULTS_CSV_URL").filter(|v| !v.is_empty()),
            mask_root: path_or("MASK_ROOT", DEFAULT_MASK_ROOT),
            upload_dir: path_or("UPLOAD_DIR", DEFAULT_UPLOAD_DIR),
            results_dir: path_or("RESULTS_DIR", DEFAULT_RESULTS_DIR),
            retention,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value {raw:?}")),
        None => Ok(default),
    }
}

async fn download_file(url: &str, path: &Path) -> Result<()> {
    info!("Downloading {} from {}", path.display(), url);

    let mut header_map = HeaderMap::new();
    if let Ok(token) = env::var("GITHUB_TOKEN") {
        let auth_value = HeaderValue::from_str(&format!("Bearer {token}"))
            .context("Invalid GITHUB_TOKEN format")?;
        header_map.insert(AUTHORIZATION, auth_value);
    }
    header_map.insert(
        ACCEPT,
        HeaderValue::from_static("application/octet-stream"),
    );
    header_map.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("leaf_lookup/", env!("CARGO_PKG_VERSION"))),
    );

    let client = reqwest::Client::new();
    let response = client
        .get(url)
        .headers(header_map)
        .send()
        .await
        .with_context(|| format!("Failed to send request to {url}"))?;

    if !response.status().is_success() {
        bail!("Failed to download {}: {}", url, response.status());
    }

    let bytes = response.bytes().await.context("Failed to read bytes")?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Makes sure the results table exists on disk, fetching it from
/// `RESULTS_CSV_URL` when it is missing and a URL is configured.
pub async fn ensure_results_table(config: &Config) -> Result<()> {
    info!("Checking results table...");
    if config.results_csv.exists() {
        return Ok(());
    }
    match &config.results_csv_url {
        Some(url) => download_file(url, &config.results_csv).await,
        None => bail!(
            "results table {} not found and RESULTS_CSV_URL is not set",
            config.results_csv.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_fixed_layout() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.body_limit_bytes, 5 * 1024 * 1024);
        assert_eq!(
            config.results_csv,
            PathBuf::from("results_with_infected_area_all_splits.csv")
        );
        assert_eq!(config.mask_root, PathBuf::from("Segmented/masks"));
        assert_eq!(config.upload_dir, PathBuf::from("static/uploads"));
        assert_eq!(config.results_dir, PathBuf::from("static/results"));
        assert!(config.results_csv_url.is_none());
        assert!(config.retention.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("PORT", "8081"),
            ("BODY_LIMIT_MB", "12"),
            ("MASK_ROOT", "/data/masks"),
            ("RETENTION_MAX_AGE_SECS", "600"),
            ("RETENTION_INTERVAL_SECS", "60"),
        ])
        .unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.body_limit_bytes, 12 * 1024 * 1024);
        assert_eq!(config.mask_root, PathBuf::from("/data/masks"));
        assert_eq!(
            config.retention,
            Some(RetentionPolicy {
                max_age: Duration::from_secs(600),
                interval: Duration::from_secs(60),
            })
        );
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        assert!(config_from(&[("PORT", "seventy")]).is_err());
        assert!(config_from(&[("PORT", "70000")]).is_err());
        assert!(config_from(&[("BODY_LIMIT_MB", "-1")]).is_err());
        assert!(config_from(&[("RETENTION_MAX_AGE_SECS", "soon")]).is_err());
        assert!(config_from(&[
            ("RETENTION_MAX_AGE_SECS", "10"),
            ("RETENTION_INTERVAL_SECS", "0")
        ])
        .is_err());
    }

    #[tokio::test]
    async fn missing_table_without_url_fails() {
        let config = config_from(&[("RESULTS_CSV", "/definitely/not/here.csv")]).unwrap();
        let err = ensure_results_table(&config).await.unwrap_err();
        assert!(err.to_string().contains("RESULTS_CSV_URL"));
    }
}
