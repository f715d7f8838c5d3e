//! Paginated SODA dataset client.
//!
//! Pages are requested with an explicit `$order=:id` so pagination is
//! deterministic across retries; the accumulated result is written as a
//! single JSON-array artifact only once every page has arrived.

use anyhow::{bail, Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 100;
const REQUEST_TIMEOUT_SECS: u64 = 300;

pub struct SodaClient {
    client: Client,
}

impl SodaClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent("sd-safety-pipeline/0.1")
            .build()
            .context("building HTTP client")?;
        Ok(Self { client })
    }

    /// Page through a dataset and cache the accumulated rows. Returns the
    /// cached artifact unchanged when present and `force` is false. A
    /// transport failure after retries falls back to a prior cached copy
    /// when one exists; otherwise it is fatal for this artifact.
    pub async fn fetch_paginated(
        &self,
        base: &str,
        dataset_id: &str,
        out_path: &Path,
        where_clause: Option<&str>,
        page_size: usize,
        force: bool,
    ) -> Result<PathBuf> {
        if out_path.exists() && !force {
            info!("cached: {}", out_path.display());
            return Ok(out_path.to_path_buf());
        }

        let url = format!("{base}/{dataset_id}.json");
        let mut all_rows: Vec<Value> = Vec::new();
        let mut offset = 0usize;

        loop {
            let mut params = vec![
                ("$limit", page_size.to_string()),
                ("$offset", offset.to_string()),
                ("$order", ":id".to_string()),
            ];
            if let Some(w) = where_clause {
                params.push(("$where", w.to_string()));
            }

            let batch = match self.page_with_retry(&url, &params).await {
                Ok(batch) => batch,
                Err(e) => {
                    if out_path.exists() {
                        warn!(
                            "fetch of {dataset_id} failed ({e:#}), using cached {}",
                            out_path.display()
                        );
                        return Ok(out_path.to_path_buf());
                    }
                    return Err(e).with_context(|| format!("fetching dataset {dataset_id}"));
                }
            };

            debug!("{dataset_id} offset={offset}: {} rows", batch.len());
            let short_page = batch.len() < page_size;
            all_rows.extend(batch);
            if short_page {
                break;
            }
            offset += page_size;
        }

        let payload = serde_json::to_vec(&all_rows).context("serializing artifact")?;
        super::atomic_write(out_path, &payload)?;
        info!("saved {} rows -> {}", all_rows.len(), out_path.display());
        Ok(out_path.to_path_buf())
    }

    /// One page, with bounded exponential backoff on transport errors and
    /// rate limiting. Any other error status is non-retryable.
    async fn page_with_retry(&self, url: &str, params: &[(&str, String)]) -> Result<Vec<Value>> {
        let mut backoff = INITIAL_BACKOFF_MS;

        for attempt in 0..MAX_RETRIES {
            match self.client.get(url).query(params).send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        return response.json().await.context("parsing page response");
                    } else if response.status() == StatusCode::TOO_MANY_REQUESTS {
                        warn!("rate limited on attempt {}, backing off", attempt + 1);
                        sleep(Duration::from_millis(backoff * 10)).await;
                    } else {
                        let status = response.status();
                        let text = response.text().await.unwrap_or_default();
                        bail!("API error {status}: {text}");
                    }
                }
                Err(e) => {
                    warn!("request failed (attempt {}): {e}", attempt + 1);
                }
            }

            if attempt < MAX_RETRIES - 1 {
                debug!("retrying in {backoff}ms");
                sleep(Duration::from_millis(backoff)).await;
                backoff = (backoff * 2).min(30_000);
            }
        }

        bail!("max retries exceeded for {url}")
    }
}
