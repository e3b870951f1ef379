use crate::config::Settings;
use crate::domain::returns::NavPoint;
use crate::returns::SchemeHistorySource;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 20;

// Per-scheme history payloads carry dates as dd-mm-YYYY strings and NAVs
// as decimal strings.
const HISTORY_DATE_FORMAT: &str = "%d-%m-%Y";

/// HTTP client for an mfapi.in-style per-scheme history endpoint:
/// `GET {base}/{scheme_code}` returning `{"data": [{"date", "nav"}, ...]}`.
#[derive(Debug, Clone)]
pub struct HttpSchemeHistoryClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSchemeHistoryClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout_secs = std::env::var("SCHEME_HISTORY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build scheme history http client")?;

        Ok(Self {
            http,
            base_url: settings.scheme_history_base_url.clone(),
        })
    }

    fn url(&self, scheme_code: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), scheme_code)
    }
}

#[derive(Debug, Deserialize)]
struct SchemeHistoryResponse {
    #[serde(default)]
    data: Vec<SchemeHistoryEntry>,
}

#[derive(Debug, Deserialize)]
struct SchemeHistoryEntry {
    date: String,
    nav: String,
}

#[async_trait::async_trait]
impl SchemeHistorySource for HttpSchemeHistoryClient {
    fn source_name(&self) -> &'static str {
        "scheme_history_http"
    }

    async fn fetch_history(&self, scheme_code: &str) -> Result<Vec<NavPoint>> {
        let url = self.url(scheme_code);
        let res = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("scheme history request failed for {scheme_code}"))?;

        let status = res.status();
        anyhow::ensure!(
            status.is_success(),
            "scheme history HTTP {status} for {scheme_code}"
        );

        let body: SchemeHistoryResponse = res
            .json()
            .await
            .with_context(|| format!("invalid scheme history payload for {scheme_code}"))?;

        Ok(series_from_entries(&body.data))
    }
}

/// Converts raw payload entries into a clean ascending series, dropping
/// anything that does not parse.
fn series_from_entries(entries: &[SchemeHistoryEntry]) -> Vec<NavPoint> {
    let mut series: Vec<NavPoint> = entries
        .iter()
        .filter_map(|e| {
            let date = NaiveDate::parse_from_str(e.date.trim(), HISTORY_DATE_FORMAT).ok()?;
            let nav = e.nav.trim().parse::<f64>().ok()?;
            Some(NavPoint { date, nav })
        })
        .collect();

    series.sort_by_key(|p| p.date);
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_entries_and_sorts_ascending() {
        let body: SchemeHistoryResponse = serde_json::from_value(json!({
            "meta": {"scheme_name": "HDFC Flexi Cap Fund - Direct Growth"},
            "data": [
                {"date": "04-08-2026", "nav": "118.2210"},
                {"date": "01-08-2025", "nav": "101.5000"},
                {"date": "garbage", "nav": "1.0"},
                {"date": "02-08-2025", "nav": "not-a-number"}
            ]
        }))
        .unwrap();

        let series = series_from_entries(&body.data);
        assert_eq!(series.len(), 2);
        assert!(series[0].date < series[1].date);
        assert!((series[1].nav - 118.221).abs() < 1e-9);
    }

    #[test]
    fn missing_data_key_yields_empty_series() {
        let body: SchemeHistoryResponse =
            serde_json::from_value(json!({"status": "FAIL"})).unwrap();
        assert!(series_from_entries(&body.data).is_empty());
    }
}
