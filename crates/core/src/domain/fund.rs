use anyhow::ensure;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Broad fund category derived from the scheme name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FundType {
    Equity,
    Debt,
    Hybrid,
    Gold,
    Other,
}

impl FundType {
    pub fn as_str(self) -> &'static str {
        match self {
            FundType::Equity => "Equity",
            FundType::Debt => "Debt",
            FundType::Hybrid => "Hybrid",
            FundType::Gold => "Gold",
            FundType::Other => "Other",
        }
    }

    /// Case- and whitespace-tolerant parse, used when reading profile
    /// snapshots back from disk.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "equity" => Some(FundType::Equity),
            "debt" => Some(FundType::Debt),
            "hybrid" => Some(FundType::Hybrid),
            "gold" => Some(FundType::Gold),
            "other" => Some(FundType::Other),
            _ => None,
        }
    }
}

impl fmt::Display for FundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fund scheme as of the latest merged snapshot.
///
/// nav, nav_change_pct and date are optional on purpose: merged input data
/// is allowed to be partial, and the validity filter in the recommender is
/// the single place that insists on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundRecord {
    pub scheme_code: String,
    pub fund_name: String,
    pub fund_type: FundType,
    pub nav: Option<f64>,
    pub nav_change_pct: Option<f64>,
    pub date: Option<NaiveDate>,
}

impl FundRecord {
    pub fn nav_display(&self) -> String {
        match self.nav {
            Some(v) => format!("{v:.4}"),
            None => "N/A".to_string(),
        }
    }
}

/// Immutable snapshot of all known fund records, keyed by scheme_code.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    records: Vec<FundRecord>,
}

impl Catalog {
    /// Builds a catalog enforcing the scheme_code invariant: codes must be
    /// non-empty, and a duplicate code replaces the earlier record (last
    /// occurrence wins, keeping the first occurrence's position).
    pub fn from_records(records: Vec<FundRecord>) -> anyhow::Result<Self> {
        let mut by_code: HashMap<String, usize> = HashMap::with_capacity(records.len());
        let mut out: Vec<FundRecord> = Vec::with_capacity(records.len());

        for mut record in records {
            record.scheme_code = record.scheme_code.trim().to_string();
            ensure!(
                !record.scheme_code.is_empty(),
                "fund record with empty scheme_code (name: {})",
                record.fund_name
            );

            match by_code.get(&record.scheme_code) {
                Some(&idx) => out[idx] = record,
                None => {
                    by_code.insert(record.scheme_code.clone(), out.len());
                    out.push(record);
                }
            }
        }

        Ok(Self { records: out })
    }

    pub fn records(&self) -> &[FundRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find_by_code(&self, scheme_code: &str) -> Option<&FundRecord> {
        let code = scheme_code.trim();
        self.records.iter().find(|r| r.scheme_code == code)
    }
}
