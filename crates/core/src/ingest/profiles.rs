use crate::classify::classify;
use crate::domain::fund::{Catalog, FundRecord, FundType};
use crate::ingest::amfi::parse_nav_date;
use crate::ingest::{normalize_header, resolve_column};
use anyhow::{Context, Result};
use std::io::{Read, Write};
use std::path::Path;

const PROFILE_HEADERS: [&str; 6] = [
    "scheme_code",
    "fund_name",
    "fund_type",
    "nav",
    "date",
    "nav_change_pct",
];

const PROFILE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Writes the catalog as the fund_profiles.csv snapshot consumed by the
/// API at startup.
pub fn write_profiles(path: &Path, catalog: &Catalog) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create profile snapshot {}", path.display()))?;
    write_profiles_to(file, catalog)
}

pub fn write_profiles_to<W: Write>(writer: W, catalog: &Catalog) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(PROFILE_HEADERS)
        .context("failed to write profile header")?;

    for record in catalog.records() {
        let nav = record.nav.map(|v| v.to_string()).unwrap_or_default();
        let date = record
            .date
            .map(|d| d.format(PROFILE_DATE_FORMAT).to_string())
            .unwrap_or_default();
        let change = record
            .nav_change_pct
            .map(|v| v.to_string())
            .unwrap_or_default();

        wtr.write_record([
            record.scheme_code.as_str(),
            record.fund_name.as_str(),
            record.fund_type.as_str(),
            nav.as_str(),
            date.as_str(),
            change.as_str(),
        ])
        .context("failed to write profile record")?;
    }

    wtr.flush().context("failed to flush profile snapshot")?;
    Ok(())
}

/// Reads a profile snapshot back into a catalog. scheme_code and
/// fund_name are required headers; a missing fund_type cell falls back to
/// re-classifying the name.
pub fn read_profiles(path: &Path) -> Result<Catalog> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open profile snapshot {}", path.display()))?;
    read_profiles_from(file)
}

pub fn read_profiles_from<R: Read>(reader: R) -> Result<Catalog> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .context("failed to read profile snapshot header")?
        .iter()
        .map(normalize_header)
        .collect();

    let code_idx = resolve_column(&headers, "scheme_code", &["scheme_code"]).with_context(
        || format!("scheme_code column missing in profile snapshot (columns: {headers:?})"),
    )?;
    let name_idx = resolve_column(&headers, "fund_name", &["fund_name", "scheme_name"])
        .with_context(|| {
            format!("fund_name column missing in profile snapshot (columns: {headers:?})")
        })?;
    let type_idx = resolve_column(&headers, "fund_type", &["fund_type"]);
    let nav_idx = resolve_column(&headers, "nav", &["nav", "net_asset_value"]);
    let date_idx = resolve_column(&headers, "date", &["date"]);
    let change_idx = resolve_column(&headers, "nav_change_pct", &["nav_change_pct"]);

    let mut records = Vec::new();
    for record in rdr.records() {
        let record = record.context("failed to read profile snapshot record")?;

        let Some(code) = record.get(code_idx).map(str::trim) else {
            continue;
        };
        if code.is_empty() {
            continue;
        }

        let fund_name = record
            .get(name_idx)
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        let fund_type = type_idx
            .and_then(|i| record.get(i))
            .and_then(FundType::parse)
            .unwrap_or_else(|| classify(&fund_name));

        let nav = nav_idx
            .and_then(|i| record.get(i))
            .and_then(|c| c.trim().parse::<f64>().ok());

        let date = date_idx
            .and_then(|i| record.get(i))
            .and_then(|c| parse_nav_date(c.trim()));

        let nav_change_pct = change_idx
            .and_then(|i| record.get(i))
            .and_then(|c| c.trim().parse::<f64>().ok());

        records.push(FundRecord {
            scheme_code: code.to_string(),
            fund_name,
            fund_type,
            nav,
            date,
            nav_change_pct,
        });
    }

    Catalog::from_records(records)
}
