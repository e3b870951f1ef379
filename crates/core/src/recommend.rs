use crate::domain::fund::{Catalog, FundRecord, FundType};
use crate::domain::returns::{RankedFund, ReturnSet, RETURN_HORIZONS};
use crate::returns::{compute_returns, SchemeHistorySource};
use anyhow::ensure;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

// Only the strongest initial candidates pay for a history lookup.
const INITIAL_CANDIDATES: usize = 10;

const DEFAULT_RETURNS_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskAppetite {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestmentHorizon {
    Short,
    Medium,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestmentType {
    Sip,
    Lumpsum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskProfile {
    Conservative,
    Balanced,
    Aggressive,
}

impl RiskProfile {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskProfile::Conservative => "Conservative",
            RiskProfile::Balanced => "Balanced",
            RiskProfile::Aggressive => "Aggressive",
        }
    }

    /// Fund types an investor with this profile is shown at all.
    pub fn allowed_fund_types(self) -> &'static [FundType] {
        match self {
            RiskProfile::Conservative => &[FundType::Debt, FundType::Hybrid, FundType::Gold],
            RiskProfile::Balanced => &[FundType::Hybrid, FundType::Equity, FundType::Debt],
            RiskProfile::Aggressive => &[FundType::Equity, FundType::Hybrid],
        }
    }
}

impl fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps the questionnaire answers to a risk profile. The horizon is part
/// of the request contract but does not currently affect the mapping;
/// risk appetite alone decides.
pub fn classify_risk_profile(
    risk_appetite: RiskAppetite,
    _horizon: InvestmentHorizon,
) -> RiskProfile {
    match risk_appetite {
        RiskAppetite::Low => RiskProfile::Conservative,
        RiskAppetite::Medium => RiskProfile::Balanced,
        RiskAppetite::High => RiskProfile::Aggressive,
    }
}

fn default_top_n() -> usize {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationRequest {
    pub risk_appetite: RiskAppetite,
    pub horizon: InvestmentHorizon,
    pub investment_type: InvestmentType,
    pub amount: f64,
    pub fund_type: FundType,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl RecommendationRequest {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            (3..=10).contains(&self.top_n),
            "top_n must be 3..=10 (got {})",
            self.top_n
        );
        ensure!(
            self.amount > 0.0,
            "amount must be positive (got {})",
            self.amount
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub funds: Vec<RankedFund>,
    pub explanations: Vec<String>,
}

impl Recommendation {
    fn empty(diagnostic: String) -> Self {
        Self {
            funds: Vec::new(),
            explanations: vec![diagnostic],
        }
    }
}

/// Runtime knobs for the enrichment fan-out.
#[derive(Debug, Clone)]
pub struct RecommendOptions {
    /// Budget for one scheme-history lookup; a timeout counts as a failed
    /// lookup and degrades that fund to unavailable returns.
    pub returns_timeout: Duration,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            returns_timeout: Duration::from_secs(DEFAULT_RETURNS_TIMEOUT_SECS),
        }
    }
}

impl RecommendOptions {
    pub fn from_env() -> Self {
        let mut out = Self::default();
        if let Ok(s) = std::env::var("RETURNS_TIMEOUT_SECS") {
            if let Ok(n) = s.parse::<u64>() {
                out.returns_timeout = Duration::from_secs(n);
            }
        }
        out
    }
}

pub fn filter_by_fund_type<'a>(
    records: impl IntoIterator<Item = &'a FundRecord>,
    fund_type: FundType,
) -> Vec<&'a FundRecord> {
    records
        .into_iter()
        .filter(|r| r.fund_type == fund_type)
        .collect()
}

/// Amount/investment-type filter point. Currently admits everything;
/// minimum-investment thresholds per scheme would plug in here.
pub fn filter_by_amount<'a>(
    records: Vec<&'a FundRecord>,
    _investment_type: InvestmentType,
    _amount: f64,
) -> Vec<&'a FundRecord> {
    records
}

pub fn filter_by_risk<'a>(
    records: Vec<&'a FundRecord>,
    profile: RiskProfile,
) -> Vec<&'a FundRecord> {
    let allowed = profile.allowed_fund_types();
    records
        .into_iter()
        .filter(|r| allowed.contains(&r.fund_type))
        .collect()
}

// Momentum proxy plus a weak NAV tiebreak; stabilizes ordering among
// near-ties without treating NAV as a quality signal.
fn initial_score(record: &FundRecord) -> f64 {
    let change = record.nav_change_pct.unwrap_or(0.0);
    let nav = record.nav.unwrap_or(0.0);
    0.8 * change + 0.2 * nav
}

fn final_score(returns: &ReturnSet, nav_change_pct: Option<f64>) -> f64 {
    0.25 * returns.returns_1y.unwrap_or(0.0)
        + 0.20 * returns.returns_3y.unwrap_or(0.0)
        + 0.20 * returns.returns_5y.unwrap_or(0.0)
        + 0.10 * returns.returns_10y.unwrap_or(0.0)
        + 0.25 * nav_change_pct.unwrap_or(0.0)
}

fn explanation(fund: &RankedFund, profile: RiskProfile) -> String {
    let horizons = RETURN_HORIZONS
        .iter()
        .map(|h| format!("{}: {}", h.label(), fund.returns.display(*h)))
        .collect::<Vec<_>>()
        .join(" | ");

    format!(
        "{} ({}) selected. {}. NAV change: {:.2}% | Final score: {:.2}. Profile match: {}.",
        fund.record.fund_name,
        fund.record.fund_type,
        horizons,
        fund.record.nav_change_pct.unwrap_or(0.0),
        fund.final_score,
        profile,
    )
}

/// Runs the full pipeline: risk profiling, hard filters, two-stage
/// scoring with bounded concurrent return enrichment, and explanation
/// generation. A stage that empties the candidate set is a terminal
/// outcome carrying one diagnostic, not an error.
pub async fn recommend(
    catalog: &Catalog,
    history: Arc<dyn SchemeHistorySource>,
    request: &RecommendationRequest,
    options: &RecommendOptions,
) -> anyhow::Result<Recommendation> {
    request.validate()?;

    let profile = classify_risk_profile(request.risk_appetite, request.horizon);

    let typed = filter_by_fund_type(catalog.records(), request.fund_type);
    if typed.is_empty() {
        return Ok(Recommendation::empty(format!(
            "No funds found for selected Fund Type: {}",
            request.fund_type
        )));
    }

    let after_amount = filter_by_amount(typed, request.investment_type, request.amount);
    if after_amount.is_empty() {
        return Ok(Recommendation::empty(
            "No funds found after the amount filter. Try a different amount or investment type."
                .to_string(),
        ));
    }

    let risked = filter_by_risk(after_amount, profile);
    if risked.is_empty() {
        return Ok(Recommendation::empty(
            "No funds found after risk filtering. Try a different risk appetite or horizon."
                .to_string(),
        ));
    }

    let valid: Vec<&FundRecord> = risked
        .into_iter()
        .filter(|r| r.nav.is_some() && r.nav_change_pct.is_some())
        .collect();
    if valid.is_empty() {
        return Ok(Recommendation::empty(
            "No valid NAV rows found after cleaning.".to_string(),
        ));
    }

    let mut scored: Vec<(f64, &FundRecord)> =
        valid.into_iter().map(|r| (initial_score(r), r)).collect();
    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.scheme_code.cmp(&b.1.scheme_code))
    });
    scored.truncate(INITIAL_CANDIDATES);

    let returns_by_code = enrich_with_returns(&scored, history, options.returns_timeout).await;

    let mut ranked: Vec<RankedFund> = scored
        .into_iter()
        .map(|(score_initial, record)| {
            let returns = returns_by_code
                .get(&record.scheme_code)
                .cloned()
                .unwrap_or_else(|| ReturnSet::unavailable(&record.scheme_code));
            let final_score = final_score(&returns, record.nav_change_pct);
            RankedFund {
                record: record.clone(),
                returns,
                score_initial,
                final_score,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.record.scheme_code.cmp(&b.record.scheme_code))
    });
    ranked.truncate(request.top_n);

    let explanations = ranked.iter().map(|f| explanation(f, profile)).collect();

    tracing::debug!(
        profile = %profile,
        fund_type = %request.fund_type,
        selected = ranked.len(),
        "recommendation run complete"
    );

    Ok(Recommendation {
        funds: ranked,
        explanations,
    })
}

/// One concurrent lookup per candidate, each under its own timeout.
/// Failures and timeouts degrade that one scheme to unavailable returns.
async fn enrich_with_returns(
    candidates: &[(f64, &FundRecord)],
    history: Arc<dyn SchemeHistorySource>,
    timeout: Duration,
) -> HashMap<String, ReturnSet> {
    let mut tasks = tokio::task::JoinSet::new();
    for (_, record) in candidates {
        let scheme_code = record.scheme_code.clone();
        let source = Arc::clone(&history);
        tasks.spawn(async move {
            let returns =
                match tokio::time::timeout(timeout, compute_returns(source.as_ref(), &scheme_code))
                    .await
                {
                    Ok(returns) => returns,
                    Err(_) => {
                        tracing::warn!(
                            scheme_code = %scheme_code,
                            "scheme history lookup timed out; returns unavailable"
                        );
                        ReturnSet::unavailable(&scheme_code)
                    }
                };
            (scheme_code, returns)
        });
    }

    let mut out = HashMap::with_capacity(candidates.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((scheme_code, returns)) => {
                out.insert(scheme_code, returns);
            }
            Err(err) => {
                tracing::warn!(error = %err, "returns enrichment task failed");
            }
        }
    }
    out
}
