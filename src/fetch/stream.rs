//! Streamed downloads for the static per-year CSV files.

use anyhow::{bail, Context, Result};
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

const DOWNLOAD_TIMEOUT_SECS: u64 = 300;

pub fn download_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .user_agent("sd-safety-pipeline/0.1")
        .build()
        .context("building download client")
}

/// The host answers 403 for per-year files that have not been published
/// yet. That is an expected absence, not a failure.
pub(crate) fn is_expected_absence(status: StatusCode) -> bool {
    status == StatusCode::FORBIDDEN
}

/// Stream `url` to `out_path` in bounded chunks. Returns `Ok(None)` when
/// the file does not exist yet; any other failure status is fatal for
/// this artifact. The cached copy is returned unchanged unless `force`.
pub async fn fetch_stream(
    client: &Client,
    url: &str,
    out_path: &Path,
    force: bool,
) -> Result<Option<PathBuf>> {
    if out_path.exists() && !force {
        info!("cached: {}", out_path.display());
        return Ok(Some(out_path.to_path_buf()));
    }

    let mut response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("requesting {url}"))?;

    if is_expected_absence(response.status()) {
        return Ok(None);
    }
    if !response.status().is_success() {
        bail!("download of {url} failed with status {}", response.status());
    }

    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating cache dir {}", parent.display()))?;
    }

    let tmp = out_path.with_extension("download.tmp");
    let mut file = fs::File::create(&tmp)
        .await
        .with_context(|| format!("creating {}", tmp.display()))?;
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await.context("reading response chunk")? {
        file.write_all(&chunk).await.context("writing chunk")?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    drop(file);
    fs::rename(&tmp, out_path)
        .await
        .with_context(|| format!("moving {} into place", out_path.display()))?;

    info!(
        "downloaded: {} ({:.1} MB)",
        out_path.display(),
        written as f64 / (1 << 20) as f64
    );
    Ok(Some(out_path.to_path_buf()))
}
