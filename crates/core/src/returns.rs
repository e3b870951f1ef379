use crate::domain::returns::{NavPoint, ReturnHorizon, ReturnSet, RETURN_HORIZONS};
use chrono::Duration;

/// Source of per-scheme NAV history. The HTTP implementation lives in
/// `ingest::history`; tests use in-memory stubs.
#[async_trait::async_trait]
pub trait SchemeHistorySource: Send + Sync {
    fn source_name(&self) -> &'static str;

    /// Returns the scheme's NAV series sorted ascending by date.
    async fn fetch_history(&self, scheme_code: &str) -> anyhow::Result<Vec<NavPoint>>;
}

/// Trailing return over one horizon against a chronologically sorted
/// series. The reference entry is the latest one at or before
/// `latest.date - horizon` (nearest past, never future). Insufficient
/// history or a zero past NAV yields None.
pub fn calc_return(series: &[NavPoint], horizon: ReturnHorizon) -> Option<f64> {
    let latest = series.last()?;
    let target_date = latest.date - Duration::days(horizon.days());

    let past = series.iter().rev().find(|p| p.date <= target_date)?;
    if past.nav == 0.0 {
        return None;
    }

    Some((latest.nav - past.nav) / past.nav * 100.0)
}

/// Computes every fixed horizon against an already-fetched series.
pub fn compute_return_set(scheme_code: &str, series: &[NavPoint]) -> ReturnSet {
    let mut out = ReturnSet::unavailable(scheme_code);
    for horizon in RETURN_HORIZONS {
        out.set(horizon, calc_return(series, horizon));
    }
    out
}

/// Fetches a scheme's history and computes its trailing returns. Never
/// fails: any lookup or parse error degrades to an all-unavailable set so
/// one bad scheme cannot abort a ranking batch.
pub async fn compute_returns(source: &dyn SchemeHistorySource, scheme_code: &str) -> ReturnSet {
    match source.fetch_history(scheme_code).await {
        Ok(series) => compute_return_set(scheme_code, &series),
        Err(err) => {
            tracing::warn!(
                scheme_code,
                source = source.source_name(),
                error = %err,
                "scheme history lookup failed; returns unavailable"
            );
            ReturnSet::unavailable(scheme_code)
        }
    }
}
