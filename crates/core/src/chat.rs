use crate::classify::classify;
use crate::domain::fund::{Catalog, FundRecord, FundType};
use crate::domain::returns::ReturnSet;
use crate::ingest::amfi::LiveNavSource;
use crate::resolve::{self, Resolution};
use crate::returns::{compute_returns, SchemeHistorySource};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const ISSUER_LISTING_LIMIT: usize = 6;

/// Cross-turn memory for one conversation: the last fund the user talked
/// about plus the active comparison pair. An explicit value owned by the
/// caller; nothing here is process-global.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    pub last_fund: Option<FundRecord>,
    pub base_fund: Option<FundRecord>,
    pub compare_fund: Option<FundRecord>,
}

/// Chart-ready return triple for one fund, emitted alongside the text for
/// the returns and compare-returns intents. Rendering is someone else's
/// job.
#[derive(Debug, Clone, Serialize)]
pub struct ReturnChart {
    pub fund_name: String,
    pub returns_1y: Option<f64>,
    pub returns_3y: Option<f64>,
    pub returns_5y: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub text: String,
    pub charts: Vec<ReturnChart>,
}

impl ChatReply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            charts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Intents {
    nav: bool,
    returns: bool,
    risk: bool,
    details: bool,
    compare: bool,
    compare_returns: bool,
}

impl Intents {
    fn detect(q: &str) -> Self {
        let compare = q.contains("compare");
        Self {
            nav: q.contains("nav"),
            // "compare returns" is its own flow; a plain returns intent
            // must not fire for it.
            returns: q.contains("return") && !compare,
            risk: q.contains("risk"),
            details: q.contains("detail") || q.contains("about"),
            compare,
            compare_returns: q.contains("compare returns"),
        }
    }

    fn any_fund_intent(self) -> bool {
        self.nav || self.returns || self.risk || self.details || self.compare
    }
}

static DIRECT_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s-\sdirect.*$").expect("plan suffix pattern must compile"));
static REGULAR_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s-\sregular.*$").expect("plan suffix pattern must compile"));

fn base_fund_name(name: &str) -> String {
    let stripped = DIRECT_SUFFIX_RE.replace(name, "");
    let stripped = REGULAR_SUFFIX_RE.replace(&stripped, "");
    stripped.trim().to_string()
}

/// Answers one chat turn. Every path returns a structured reply; lookup
/// problems surface as guidance text, never as an error.
pub async fn respond(
    catalog: &Catalog,
    state: &mut ConversationState,
    live: &dyn LiveNavSource,
    history: &dyn SchemeHistorySource,
    message: &str,
) -> ChatReply {
    let q = message.to_lowercase();
    let cleaned = resolve::clean_query(message);
    let intents = Intents::detect(&q);

    // Per-turn resolution. `resolved_this_turn` distinguishes a fund named
    // in this message from one recalled out of memory; only the former can
    // arm the comparison pair.
    let mut fund: Option<FundRecord> = None;
    let mut resolved_this_turn = false;

    match resolve::resolve(catalog, message) {
        Resolution::Multiple(matches) => {
            if intents.any_fund_intent() {
                let best = resolve::select_best_scheme(&matches).clone();
                state.last_fund = Some(best.clone());
                fund = Some(best);
                resolved_this_turn = true;
            } else {
                return issuer_listing(&matches);
            }
        }
        Resolution::Single(record) => {
            state.last_fund = Some(record.clone());
            fund = Some(record);
            resolved_this_turn = true;
        }
        Resolution::NoMatch => {
            if cleaned.is_empty() {
                fund = state.last_fund.clone();
            } else if let Some(record) = live_lookup(live, &cleaned).await {
                state.last_fund = Some(record.clone());
                fund = Some(record);
                resolved_this_turn = true;
            }
        }
    }

    // Comparison pair building.
    if intents.compare && resolved_this_turn {
        if let Some(picked) = &fund {
            match &state.base_fund {
                None => {
                    state.base_fund = Some(picked.clone());
                    return ChatReply::text(format!(
                        "Base fund selected: {}.\nNow type: compare with <fund name>",
                        picked.fund_name
                    ));
                }
                Some(base) => {
                    let base_name = base.fund_name.clone();
                    state.compare_fund = Some(picked.clone());
                    return ChatReply::text(format!(
                        "Comparison Ready\nFund 1: {}\nFund 2: {}\nAsk: compare returns",
                        base_name, picked.fund_name
                    ));
                }
            }
        }
    }

    if intents.compare_returns {
        let (Some(base), Some(other)) = (state.base_fund.clone(), state.compare_fund.clone())
        else {
            return ChatReply::text(
                "Please select two funds first using `compare with <fund>`.",
            );
        };

        let base_returns = compute_returns(history, &base.scheme_code).await;
        let other_returns = compute_returns(history, &other.scheme_code).await;
        return comparison_reply(&base, &base_returns, &other, &other_returns);
    }

    let Some(fund) = fund else {
        return ChatReply::text(
            "I couldn't find that fund.\n\nTry typing:\n- hdfc flexi cap\n- nippon india large cap\n- sbi bluechip",
        );
    };

    if intents.nav {
        return ChatReply::text(format!(
            "NAV of {} is {}",
            fund.fund_name,
            fund.nav_display()
        ));
    }

    if intents.returns {
        let returns = compute_returns(history, &fund.scheme_code).await;
        return returns_reply(&fund, &returns);
    }

    if intents.risk {
        let risk = match fund.fund_type {
            FundType::Equity => "Moderate to High risk",
            FundType::Debt => "Low to Moderate risk",
            _ => "Moderate risk",
        };
        return ChatReply::text(format!("{} is considered {}", fund.fund_name, risk));
    }

    // Details / default.
    ChatReply::text(format!(
        "Fund Details\n- Name: {}\n- Type: {}\n- NAV: {}\n\nAsk: nav | returns | risk | compare with <fund>",
        fund.fund_name,
        fund.fund_type,
        fund.nav_display()
    ))
}

/// A multiple match without any fund intent reads as "list this issuer's
/// funds": plan-variant suffixes are stripped and duplicates collapse.
fn issuer_listing(matches: &[FundRecord]) -> ChatReply {
    let mut names: Vec<String> = Vec::new();
    for record in matches {
        let base = base_fund_name(&record.fund_name);
        if !names.contains(&base) {
            names.push(base);
            if names.len() == ISSUER_LISTING_LIMIT {
                break;
            }
        }
    }

    let listing = names
        .iter()
        .map(|n| format!("- {n}"))
        .collect::<Vec<_>>()
        .join("\n");

    ChatReply::text(format!(
        "Funds under this issuer:\n\n{listing}\n\nAsk about a specific fund for NAV, returns, or risk."
    ))
}

async fn live_lookup(live: &dyn LiveNavSource, cleaned: &str) -> Option<FundRecord> {
    let rows = match live.fetch_live_nav().await {
        Ok(rows) => rows,
        Err(err) => {
            tracing::warn!(error = %err, "live NAV fallback lookup failed");
            return None;
        }
    };

    let row = rows
        .into_iter()
        .find(|r| resolve::name_matches(&r.fund_name, cleaned))?;

    let fund_name = row.fund_name.trim().to_string();
    Some(FundRecord {
        scheme_code: row.scheme_code.trim().to_string(),
        fund_type: classify(&fund_name),
        fund_name,
        nav: Some(row.nav),
        nav_change_pct: None,
        date: row.date,
    })
}

fn pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}%"),
        None => "N/A".to_string(),
    }
}

fn chart_for(fund: &FundRecord, returns: &ReturnSet) -> ReturnChart {
    ReturnChart {
        fund_name: fund.fund_name.clone(),
        returns_1y: returns.returns_1y,
        returns_3y: returns.returns_3y,
        returns_5y: returns.returns_5y,
    }
}

fn returns_reply(fund: &FundRecord, returns: &ReturnSet) -> ChatReply {
    let text = format!(
        "Returns - {}\n- 1Y: {}\n- 3Y: {}\n- 5Y: {}",
        fund.fund_name,
        pct(returns.returns_1y),
        pct(returns.returns_3y),
        pct(returns.returns_5y)
    );

    ChatReply {
        text,
        charts: vec![chart_for(fund, returns)],
    }
}

fn comparison_reply(
    base: &FundRecord,
    base_returns: &ReturnSet,
    other: &FundRecord,
    other_returns: &ReturnSet,
) -> ChatReply {
    let text = format!(
        "Return Comparison\n\n{}\n- 1Y: {}\n- 3Y: {}\n- 5Y: {}\n\n{}\n- 1Y: {}\n- 3Y: {}\n- 5Y: {}",
        base.fund_name,
        pct(base_returns.returns_1y),
        pct(base_returns.returns_3y),
        pct(base_returns.returns_5y),
        other.fund_name,
        pct(other_returns.returns_1y),
        pct(other_returns.returns_3y),
        pct(other_returns.returns_5y)
    );

    ChatReply {
        text,
        charts: vec![
            chart_for(base, base_returns),
            chart_for(other, other_returns),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::returns::NavPoint;
    use crate::ingest::types::LiveNavRow;
    use anyhow::bail;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn record(code: &str, name: &str, fund_type: FundType) -> FundRecord {
        FundRecord {
            scheme_code: code.to_string(),
            fund_name: name.to_string(),
            fund_type,
            nav: Some(100.5),
            nav_change_pct: Some(0.4),
            date: None,
        }
    }

    fn catalog() -> Catalog {
        Catalog::from_records(vec![
            record("1", "HDFC Flexi Cap Fund - Direct Growth", FundType::Equity),
            record("2", "HDFC Flexi Cap Fund - Regular Growth", FundType::Equity),
            record("3", "HDFC Liquid Fund - Direct Growth", FundType::Debt),
            record("4", "SBI Bluechip Fund - Direct Growth", FundType::Equity),
        ])
        .unwrap()
    }

    struct NoLive;

    #[async_trait::async_trait]
    impl LiveNavSource for NoLive {
        fn source_name(&self) -> &'static str {
            "no_live_stub"
        }

        async fn fetch_live_nav(&self) -> anyhow::Result<Vec<LiveNavRow>> {
            bail!("live source unavailable")
        }
    }

    struct StubLive {
        rows: Vec<LiveNavRow>,
    }

    #[async_trait::async_trait]
    impl LiveNavSource for StubLive {
        fn source_name(&self) -> &'static str {
            "live_stub"
        }

        async fn fetch_live_nav(&self) -> anyhow::Result<Vec<LiveNavRow>> {
            Ok(self.rows.clone())
        }
    }

    struct StubHistory {
        series: HashMap<String, Vec<NavPoint>>,
    }

    impl StubHistory {
        fn with_codes(codes: &[&str]) -> Self {
            let series = vec![
                NavPoint {
                    date: NaiveDate::from_ymd_opt(2020, 8, 1).unwrap(),
                    nav: 50.0,
                },
                NavPoint {
                    date: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
                    nav: 100.0,
                },
                NavPoint {
                    date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
                    nav: 110.0,
                },
            ];
            Self {
                series: codes
                    .iter()
                    .map(|c| (c.to_string(), series.clone()))
                    .collect(),
            }
        }
    }

    #[async_trait::async_trait]
    impl SchemeHistorySource for StubHistory {
        fn source_name(&self) -> &'static str {
            "stub_history"
        }

        async fn fetch_history(&self, scheme_code: &str) -> anyhow::Result<Vec<NavPoint>> {
            match self.series.get(scheme_code) {
                Some(series) => Ok(series.clone()),
                None => bail!("unknown scheme {scheme_code}"),
            }
        }
    }

    #[tokio::test]
    async fn comparison_flow_builds_pair_then_reports() {
        let catalog = catalog();
        let history = StubHistory::with_codes(&["1", "4"]);
        let mut state = ConversationState::default();

        // Turn 1: arm the base slot.
        let reply = respond(&catalog, &mut state, &NoLive, &history, "compare hdfc flexi cap").await;
        assert!(reply.text.contains("Base fund selected"));
        assert_eq!(
            state.base_fund.as_ref().unwrap().scheme_code,
            "1",
            "direct growth variant must win disambiguation"
        );
        assert!(state.compare_fund.is_none());

        // Turn 2: arm the compare slot.
        let reply = respond(&catalog, &mut state, &NoLive, &history, "compare sbi bluechip").await;
        assert!(reply.text.contains("Comparison Ready"));
        assert_eq!(state.compare_fund.as_ref().unwrap().scheme_code, "4");

        // Turn 3: report both return tables.
        let reply = respond(&catalog, &mut state, &NoLive, &history, "compare returns").await;
        assert!(reply.text.contains("Return Comparison"));
        assert!(reply.text.contains("HDFC Flexi Cap Fund - Direct Growth"));
        assert!(reply.text.contains("SBI Bluechip Fund - Direct Growth"));
        assert_eq!(reply.charts.len(), 2);
        assert!((reply.charts[0].returns_1y.unwrap() - 10.0).abs() < 1e-9);

        // The pair persists until overwritten.
        assert!(state.base_fund.is_some());
        assert!(state.compare_fund.is_some());
    }

    #[tokio::test]
    async fn compare_returns_without_a_pair_is_corrected() {
        let catalog = catalog();
        let history = StubHistory::with_codes(&[]);
        let mut state = ConversationState::default();

        let reply = respond(&catalog, &mut state, &NoLive, &history, "compare returns").await;
        assert!(reply.text.contains("select two funds first"));
        assert!(state.base_fund.is_none());
        assert!(state.compare_fund.is_none());

        // Even with only the base armed, the corrective prompt fires and
        // the base is not silently copied into the compare slot.
        let _ = respond(&catalog, &mut state, &NoLive, &history, "compare sbi bluechip").await;
        assert!(state.base_fund.is_some());
        let reply = respond(&catalog, &mut state, &NoLive, &history, "compare returns").await;
        assert!(reply.text.contains("select two funds first"));
        assert!(state.compare_fund.is_none());
    }

    #[tokio::test]
    async fn empty_query_with_intent_recalls_last_fund() {
        let catalog = catalog();
        let history = StubHistory::with_codes(&[]);
        let mut state = ConversationState::default();

        let _ = respond(&catalog, &mut state, &NoLive, &history, "sbi bluechip").await;
        assert_eq!(state.last_fund.as_ref().unwrap().scheme_code, "4");

        let reply = respond(&catalog, &mut state, &NoLive, &history, "nav").await;
        assert!(reply.text.contains("NAV of SBI Bluechip Fund - Direct Growth"));
        assert!(reply.text.contains("100.5000"));
    }

    #[tokio::test]
    async fn multiple_match_without_intent_lists_the_issuer() {
        let catalog = catalog();
        let history = StubHistory::with_codes(&[]);
        let mut state = ConversationState::default();

        let reply = respond(&catalog, &mut state, &NoLive, &history, "hdfc").await;
        assert!(reply.text.contains("Funds under this issuer"));
        // Plan variants collapse into one listing entry.
        assert!(reply.text.contains("- HDFC Flexi Cap Fund"));
        assert!(reply.text.contains("- HDFC Liquid Fund"));
        assert!(!reply.text.to_lowercase().contains("direct growth"));
        // A pure listing never mutates state.
        assert!(state.last_fund.is_none());
    }

    #[tokio::test]
    async fn multiple_match_with_intent_disambiguates_to_direct_growth() {
        let catalog = catalog();
        let history = StubHistory::with_codes(&[]);
        let mut state = ConversationState::default();

        let reply = respond(&catalog, &mut state, &NoLive, &history, "nav of hdfc flexi cap").await;
        assert!(reply.text.contains("HDFC Flexi Cap Fund - Direct Growth"));
        assert_eq!(state.last_fund.as_ref().unwrap().scheme_code, "1");
    }

    #[tokio::test]
    async fn returns_intent_emits_a_chart_triple() {
        let catalog = catalog();
        let history = StubHistory::with_codes(&["4"]);
        let mut state = ConversationState::default();

        let reply = respond(&catalog, &mut state, &NoLive, &history, "returns of sbi bluechip").await;
        assert!(reply.text.contains("Returns - SBI Bluechip Fund - Direct Growth"));
        assert_eq!(reply.charts.len(), 1);
        let chart = &reply.charts[0];
        assert!((chart.returns_1y.unwrap() - 10.0).abs() < 1e-9);
        assert!(chart.returns_3y.is_some());
        assert!(chart.returns_5y.is_some());
    }

    #[tokio::test]
    async fn unknown_fund_falls_back_to_live_source_then_not_found() {
        let catalog = catalog();
        let history = StubHistory::with_codes(&[]);

        // Live source knows a fund the catalog does not.
        let live = StubLive {
            rows: vec![LiveNavRow {
                scheme_code: "900".to_string(),
                fund_name: "Nippon India Large Cap Fund - Direct Growth".to_string(),
                nav: 77.7,
                date: None,
            }],
        };

        let mut state = ConversationState::default();
        let reply = respond(&catalog, &mut state, &live, &history, "nav of nippon india large cap").await;
        assert!(reply.text.contains("Nippon India Large Cap Fund"));
        assert_eq!(state.last_fund.as_ref().unwrap().scheme_code, "900");

        // A query nobody knows leaves state untouched.
        let mut state = ConversationState::default();
        let reply = respond(&catalog, &mut state, &NoLive, &history, "zzz unknown fund").await;
        assert!(reply.text.contains("couldn't find that fund"));
        assert!(state.last_fund.is_none());
    }

    #[tokio::test]
    async fn risk_intent_maps_fund_type_to_a_band() {
        let catalog = catalog();
        let history = StubHistory::with_codes(&[]);
        let mut state = ConversationState::default();

        let reply = respond(&catalog, &mut state, &NoLive, &history, "risk of hdfc liquid").await;
        assert!(reply.text.contains("Low to Moderate risk"));

        let reply = respond(&catalog, &mut state, &NoLive, &history, "risk of sbi bluechip").await;
        assert!(reply.text.contains("Moderate to High risk"));
    }

    #[tokio::test]
    async fn default_branch_summarizes_the_fund() {
        let catalog = catalog();
        let history = StubHistory::with_codes(&[]);
        let mut state = ConversationState::default();

        let reply = respond(&catalog, &mut state, &NoLive, &history, "sbi bluechip").await;
        assert!(reply.text.contains("Fund Details"));
        assert!(reply.text.contains("Type: Equity"));
    }

    #[test]
    fn base_fund_name_strips_plan_suffixes() {
        assert_eq!(
            base_fund_name("HDFC Flexi Cap Fund - Direct Plan - Growth Option"),
            "HDFC Flexi Cap Fund"
        );
        assert_eq!(
            base_fund_name("HDFC Flexi Cap Fund - Regular Growth"),
            "HDFC Flexi Cap Fund"
        );
        assert_eq!(base_fund_name("Parag Parikh Flexi Cap Fund"), "Parag Parikh Flexi Cap Fund");
    }
}
