use crate::ingest::amfi::{parse_nav_date, parse_navall};
use crate::ingest::types::HistRecord;
use crate::ingest::{normalize_header, resolve_column};
use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

/// Loads an uploaded historical dataset. CSV files go through the csv
/// reader; anything else is treated as an AMFI-style semicolon text file.
pub fn load_hist_file(path: &Path) -> Result<Vec<HistRecord>> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    if is_csv {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open historical file {}", path.display()))?;
        hist_from_csv(file)
    } else {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read historical file {}", path.display()))?;
        hist_from_navall_text(&text)
    }
}

/// Parses a historical CSV after normalizing headers. scheme_code is
/// required; everything else degrades to None per row.
pub fn hist_from_csv<R: Read>(reader: R) -> Result<Vec<HistRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .context("failed to read historical CSV header")?
        .iter()
        .map(normalize_header)
        .collect();

    let code_idx = resolve_column(&headers, "scheme_code", &["scheme_code"]).with_context(
        || format!("scheme_code column missing in historical file (columns: {headers:?})"),
    )?;
    let name_idx = resolve_column(&headers, "scheme_name", &["scheme_name", "scheme"]);
    let nav_idx = resolve_column(
        &headers,
        "net_asset_value",
        &["net_asset_value", "nav", "netassetvalue"],
    );
    let date_idx = resolve_column(&headers, "date", &["date", "nav_date"]);

    let mut out = Vec::new();
    for record in rdr.records() {
        let record = record.context("failed to read historical CSV record")?;

        let Some(code) = record.get(code_idx).map(str::trim) else {
            continue;
        };
        if code.is_empty() {
            continue;
        }

        let scheme_name = name_idx
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let nav = nav_idx
            .and_then(|i| record.get(i))
            .and_then(|c| c.trim().parse::<f64>().ok());

        let date = date_idx
            .and_then(|i| record.get(i))
            .and_then(|c| parse_nav_date(c.trim()));

        out.push(HistRecord {
            scheme_code: code.to_string(),
            scheme_name,
            nav,
            date,
        });
    }

    Ok(out)
}

/// Historical data shipped in the AMFI text layout reuses the live
/// parser; the snapshot NAV becomes the historical base NAV.
pub fn hist_from_navall_text(text: &str) -> Result<Vec<HistRecord>> {
    let rows = parse_navall(text)?;
    Ok(rows
        .into_iter()
        .map(|row| HistRecord {
            scheme_code: row.scheme_code,
            scheme_name: Some(row.fund_name),
            nav: Some(row.nav),
            date: row.date,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_with_renamed_columns_resolves_via_candidates() {
        let csv = "\
Scheme Code,Scheme,NetAssetValue,NAV Date
119551,HDFC Flexi Cap Fund - Direct Growth,95.5,2025-08-01
119552,,bad,2025-08-01
,No Code Fund,10.0,2025-08-01
";
        let records = hist_from_csv(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].scheme_code, "119551");
        assert_eq!(
            records[0].scheme_name.as_deref(),
            Some("HDFC Flexi Cap Fund - Direct Growth")
        );
        assert_eq!(records[0].nav, Some(95.5));
        assert!(records[0].date.is_some());

        // Unparseable NAV and blank name degrade to None, row is kept.
        assert_eq!(records[1].scheme_code, "119552");
        assert_eq!(records[1].scheme_name, None);
        assert_eq!(records[1].nav, None);
    }

    #[test]
    fn missing_scheme_code_column_is_a_configuration_error() {
        let csv = "Name,NAV\nFoo,10.0\n";
        let res = hist_from_csv(csv.as_bytes());
        assert!(res.is_err());
        let msg = format!("{:#}", res.unwrap_err());
        assert!(msg.contains("scheme_code"));
    }
}
