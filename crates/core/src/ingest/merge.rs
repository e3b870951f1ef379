use crate::classify::classify;
use crate::domain::fund::{Catalog, FundRecord};
use crate::ingest::types::{HistRecord, LiveNavRow};
use anyhow::Result;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Inner-merges the historical dataset with the live snapshot on trimmed
/// scheme_code and classifies every resulting record.
///
/// Historical files are time series: only the latest-dated row per scheme
/// contributes, so the catalog ends up with one record per scheme_code.
/// nav_change_pct compares the live NAV against that historical base NAV;
/// a missing or zero base leaves it None rather than dividing.
pub fn merge_hist_live(hist: &[HistRecord], live: &[LiveNavRow]) -> Result<Catalog> {
    let mut latest: HashMap<&str, &HistRecord> = HashMap::new();
    for record in hist {
        let code = record.scheme_code.trim();
        if code.is_empty() {
            continue;
        }
        let replace = match latest.get(code) {
            Some(existing) => date_key(record.date) >= date_key(existing.date),
            None => true,
        };
        if replace {
            latest.insert(code, record);
        }
    }

    let mut records = Vec::new();
    for row in live {
        let code = row.scheme_code.trim();
        let Some(base) = latest.get(code) else {
            continue;
        };

        let nav_change_pct = match base.nav {
            Some(b) if b != 0.0 => Some((row.nav - b) / b * 100.0),
            _ => None,
        };

        let fund_name = if row.fund_name.trim().is_empty() {
            base.scheme_name
                .clone()
                .unwrap_or_else(|| "Unknown Fund".to_string())
        } else {
            row.fund_name.trim().to_string()
        };

        let fund_type = classify(&fund_name);

        records.push(FundRecord {
            scheme_code: code.to_string(),
            fund_name,
            fund_type,
            nav: Some(row.nav),
            nav_change_pct,
            date: row.date,
        });
    }

    Catalog::from_records(records)
}

// Undated rows sort before any dated row, so a dated row always wins and
// ties keep the later occurrence.
fn date_key(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fund::FundType;

    fn hist(code: &str, nav: Option<f64>, date: Option<(i32, u32, u32)>) -> HistRecord {
        HistRecord {
            scheme_code: code.to_string(),
            scheme_name: Some(format!("Hist {code}")),
            nav,
            date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
        }
    }

    fn live(code: &str, name: &str, nav: f64) -> LiveNavRow {
        LiveNavRow {
            scheme_code: code.to_string(),
            fund_name: name.to_string(),
            nav,
            date: NaiveDate::from_ymd_opt(2026, 8, 4),
        }
    }

    #[test]
    fn inner_join_keeps_only_schemes_present_in_both() {
        let hist_rows = vec![hist("1", Some(100.0), Some((2025, 1, 1)))];
        let live_rows = vec![
            live("1", "HDFC Flexi Cap Fund - Direct Growth", 110.0),
            live("2", "Orphan Fund", 50.0),
        ];

        let catalog = merge_hist_live(&hist_rows, &live_rows).unwrap();
        assert_eq!(catalog.len(), 1);

        let record = &catalog.records()[0];
        assert_eq!(record.scheme_code, "1");
        assert_eq!(record.fund_type, FundType::Equity);
        assert!((record.nav_change_pct.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn latest_dated_hist_row_is_the_change_base() {
        let hist_rows = vec![
            hist("1", Some(80.0), Some((2024, 1, 1))),
            hist("1", Some(100.0), Some((2025, 6, 1))),
            hist("1", Some(90.0), None),
        ];
        let live_rows = vec![live("1", "SBI Bluechip Fund - Direct Growth", 110.0)];

        let catalog = merge_hist_live(&hist_rows, &live_rows).unwrap();
        let record = &catalog.records()[0];
        assert!((record.nav_change_pct.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn zero_or_missing_base_nav_leaves_change_unset() {
        let hist_rows = vec![
            hist("1", Some(0.0), Some((2025, 1, 1))),
            hist("2", None, Some((2025, 1, 1))),
        ];
        let live_rows = vec![
            live("1", "Fund One Liquid", 10.0),
            live("2", "Fund Two Gilt", 20.0),
        ];

        let catalog = merge_hist_live(&hist_rows, &live_rows).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.records().iter().all(|r| r.nav_change_pct.is_none()));
    }
}
