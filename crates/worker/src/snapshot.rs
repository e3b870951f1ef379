use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;

use fundwise_core::domain::fund::Catalog;
use fundwise_core::ingest::amfi::LiveNavSource;
use fundwise_core::ingest::{hist, merge};

/// Builds the catalog that becomes fund_profiles.csv: load the historical
/// dataset, fetch the live AMFI snapshot (cache fallback included), merge
/// on scheme_code and classify every fund.
pub async fn build_profile_snapshot(
    live: &dyn LiveNavSource,
    hist_path: &Path,
) -> Result<Catalog> {
    let hist_rows = hist::load_hist_file(hist_path)?;
    tracing::info!(rows = hist_rows.len(), "historical dataset loaded");

    let live_rows = live.fetch_live_nav().await?;
    tracing::info!(rows = live_rows.len(), "live NAV snapshot loaded");

    let catalog = merge::merge_hist_live(&hist_rows, &live_rows)?;
    log_fund_type_distribution(&catalog);

    Ok(catalog)
}

fn log_fund_type_distribution(catalog: &Catalog) {
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for record in catalog.records() {
        *counts.entry(record.fund_type.as_str()).or_default() += 1;
    }

    for (fund_type, count) in counts {
        tracing::info!(fund_type, count, "fund type distribution");
    }
}
