use crate::config::Settings;
use crate::ingest::types::LiveNavRow;
use crate::ingest::{normalize_header, resolve_column};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 20;
const DEFAULT_RETRIES: u32 = 3;

// AMFI serves the text file to browsers only; a bare client UA gets an
// HTML error page instead.
const USER_AGENT: &str = "Mozilla/5.0";

/// Source of the full live NAV snapshot. Used for catalog builds and as
/// the chat engine's last-resort lookup.
#[async_trait::async_trait]
pub trait LiveNavSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn fetch_live_nav(&self) -> Result<Vec<LiveNavRow>>;
}

/// HTTP client for the AMFI `NAVAll.txt` endpoint with a local text-file
/// cache: successful fetches refresh the cache, failed fetches fall back
/// to it.
#[derive(Debug, Clone)]
pub struct AmfiLiveClient {
    http: reqwest::Client,
    url: String,
    cache_path: PathBuf,
    retries: u32,
}

impl AmfiLiveClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout_secs = std::env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("AMFI_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build AMFI http client")?;

        Ok(Self {
            http,
            url: settings.amfi_nav_url.clone(),
            cache_path: PathBuf::from(&settings.amfi_cache_path),
            retries,
        })
    }

    async fn fetch_text_once(&self) -> Result<String> {
        let res = self
            .http
            .get(&self.url)
            .send()
            .await
            .context("AMFI request failed")?;

        let status = res.status();
        let text = res.text().await.context("failed to read AMFI response")?;

        anyhow::ensure!(status.is_success(), "AMFI HTTP {status}");
        anyhow::ensure!(
            !text.to_lowercase().contains("<html"),
            "AMFI returned an HTML error page"
        );

        Ok(text)
    }

    async fn fetch_text_with_retries(&self) -> Result<String> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_text_once().await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(attempt, ?backoff, error = %err, "AMFI fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    async fn write_cache(&self, text: &str) {
        if let Some(parent) = self.cache_path.parent() {
            if let Err(err) = tokio::fs::create_dir_all(parent).await {
                tracing::warn!(error = %err, "failed to create AMFI cache directory");
                return;
            }
        }
        if let Err(err) = tokio::fs::write(&self.cache_path, text).await {
            tracing::warn!(error = %err, path = %self.cache_path.display(), "failed to write AMFI cache");
        }
    }

    async fn read_cache(&self) -> Option<String> {
        tokio::fs::read_to_string(&self.cache_path).await.ok()
    }
}

#[async_trait::async_trait]
impl LiveNavSource for AmfiLiveClient {
    fn source_name(&self) -> &'static str {
        "amfi_live"
    }

    async fn fetch_live_nav(&self) -> Result<Vec<LiveNavRow>> {
        match self.fetch_text_with_retries().await {
            Ok(text) => {
                self.write_cache(&text).await;
                let rows = parse_navall(&text)?;
                tracing::info!(rows = rows.len(), "live AMFI NAV loaded");
                Ok(rows)
            }
            Err(err) => {
                tracing::warn!(error = %err, "live AMFI fetch failed; trying local cache");
                let Some(text) = self.read_cache().await else {
                    return Err(err.context("AMFI fetch failed and no cache file present"));
                };
                let rows = parse_navall(&text)?;
                tracing::info!(
                    rows = rows.len(),
                    path = %self.cache_path.display(),
                    "AMFI NAV loaded from local cache"
                );
                Ok(rows)
            }
        }
    }
}

/// Parses the semicolon-separated `NAVAll.txt` payload. Only lines that
/// contain a `;` are data-bearing; the first such line is the header.
/// Rows missing a scheme code or a numeric NAV are dropped.
pub fn parse_navall(text: &str) -> Result<Vec<LiveNavRow>> {
    let mut lines = text.lines().filter(|l| l.contains(';'));

    let header_line = lines
        .next()
        .context("AMFI payload contains no delimited lines")?;
    let headers: Vec<String> = header_line.split(';').map(normalize_header).collect();

    let code_idx = resolve_column(&headers, "scheme_code", &["scheme_code"])
        .with_context(|| format!("scheme_code column missing in AMFI data (columns: {headers:?})"))?;
    let name_idx = resolve_column(&headers, "scheme_name", &["scheme_name", "fund_name"])
        .with_context(|| format!("scheme name column missing in AMFI data (columns: {headers:?})"))?;
    let nav_idx = resolve_column(&headers, "net_asset_value", &["net_asset_value", "nav"]);
    let date_idx = resolve_column(&headers, "date", &["date", "nav_date"]);

    let mut out = Vec::new();
    for line in lines {
        let cells: Vec<&str> = line.split(';').collect();

        let Some(code) = cells.get(code_idx).map(|c| c.trim()) else {
            continue;
        };
        if code.is_empty() {
            continue;
        }

        let Some(nav) = nav_idx
            .and_then(|i| cells.get(i))
            .and_then(|c| c.trim().parse::<f64>().ok())
        else {
            continue;
        };

        let fund_name = cells
            .get(name_idx)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        let date = date_idx
            .and_then(|i| cells.get(i))
            .and_then(|c| parse_nav_date(c.trim()));

        out.push(LiveNavRow {
            scheme_code: code.to_string(),
            fund_name,
            nav,
            date,
        });
    }

    Ok(out)
}

/// Best-effort date parsing across the formats AMFI and uploaded files
/// actually use.
pub fn parse_nav_date(raw: &str) -> Option<NaiveDate> {
    const FORMATS: &[&str] = &["%d-%b-%Y", "%d-%m-%Y", "%Y-%m-%d"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}
