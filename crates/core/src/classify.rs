use crate::domain::fund::FundType;

// Ordered keyword buckets. Gold is checked first so that "gold etf" does
// not fall through to an equity keyword, and Debt precedes Equity because
// debt instruments often share words with equity index names.
const GOLD_KEYWORDS: &[&str] = &["gold"];

const DEBT_KEYWORDS: &[&str] = &[
    "debt",
    "bond",
    "gilt",
    "liquid",
    "overnight",
    "money market",
    "ultra short",
    "short duration",
    "medium duration",
    "long duration",
    "corporate bond",
    "banking",
    "psu",
    "dynamic bond",
    "credit risk",
    "income",
    "floater",
];

const EQUITY_KEYWORDS: &[&str] = &[
    "equity",
    "mid cap",
    "small cap",
    "large cap",
    "flexi cap",
    "multi cap",
    "elss",
    "value",
    "contra",
    "focused",
    "bluechip",
    "dividend yield",
    "index fund",
    "nifty",
    "sensex",
    "top 100",
    "top 50",
];

const HYBRID_KEYWORDS: &[&str] = &[
    "balanced",
    "hybrid",
    "aggressive hybrid",
    "conservative hybrid",
];

/// Maps a scheme name to its fund category. Pure and total: unknown names
/// fall through to `Other`.
pub fn classify(fund_name: &str) -> FundType {
    let name = fund_name.to_lowercase();
    let contains_any = |keywords: &[&str]| keywords.iter().any(|k| name.contains(k));

    if contains_any(GOLD_KEYWORDS) {
        return FundType::Gold;
    }
    if contains_any(DEBT_KEYWORDS) {
        return FundType::Debt;
    }
    if contains_any(EQUITY_KEYWORDS) {
        return FundType::Equity;
    }
    if contains_any(HYBRID_KEYWORDS) {
        return FundType::Hybrid;
    }

    FundType::Other
}
