use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of the live AMFI snapshot. Rows without a scheme code or a
/// numeric NAV are dropped at parse time, so `nav` is always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveNavRow {
    pub scheme_code: String,
    pub fund_name: String,
    pub nav: f64,
    pub date: Option<NaiveDate>,
}

/// One row of an uploaded historical dataset after header normalization.
/// Everything except the scheme code is best-effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistRecord {
    pub scheme_code: String,
    pub scheme_name: Option<String>,
    pub nav: Option<f64>,
    pub date: Option<NaiveDate>,
}
