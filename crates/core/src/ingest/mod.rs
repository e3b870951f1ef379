pub mod amfi;
pub mod hist;
pub mod history;
pub mod merge;
pub mod profiles;
pub mod types;

/// Canonical header form shared by every tabular input: trimmed,
/// lower-cased, spaces replaced with underscores.
pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

/// Finds a column index by exact candidate names first, then by a fuzzy
/// fallback where the header must contain every underscore-separated part
/// of the target name.
pub fn resolve_column(headers: &[String], target: &str, candidates: &[&str]) -> Option<usize> {
    for candidate in candidates {
        if let Some(idx) = headers.iter().position(|h| h == candidate) {
            return Some(idx);
        }
    }

    let parts: Vec<&str> = target.split('_').collect();
    headers
        .iter()
        .position(|h| parts.iter().all(|p| h.contains(p)))
}
