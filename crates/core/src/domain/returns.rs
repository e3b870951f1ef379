use crate::domain::fund::FundRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One NAV observation in a scheme's history. Series are kept sorted
/// ascending by date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavPoint {
    pub date: NaiveDate,
    pub nav: f64,
}

/// Fixed look-back horizons for trailing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReturnHorizon {
    SixMonths,
    OneYear,
    TwoYears,
    ThreeYears,
    FiveYears,
    TenYears,
}

pub const RETURN_HORIZONS: [ReturnHorizon; 6] = [
    ReturnHorizon::SixMonths,
    ReturnHorizon::OneYear,
    ReturnHorizon::TwoYears,
    ReturnHorizon::ThreeYears,
    ReturnHorizon::FiveYears,
    ReturnHorizon::TenYears,
];

impl ReturnHorizon {
    /// Look-back duration in days: 30 per month, 365 per year.
    pub fn days(self) -> i64 {
        match self {
            ReturnHorizon::SixMonths => 30 * 6,
            ReturnHorizon::OneYear => 365,
            ReturnHorizon::TwoYears => 365 * 2,
            ReturnHorizon::ThreeYears => 365 * 3,
            ReturnHorizon::FiveYears => 365 * 5,
            ReturnHorizon::TenYears => 365 * 10,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReturnHorizon::SixMonths => "6M",
            ReturnHorizon::OneYear => "1Y",
            ReturnHorizon::TwoYears => "2Y",
            ReturnHorizon::ThreeYears => "3Y",
            ReturnHorizon::FiveYears => "5Y",
            ReturnHorizon::TenYears => "10Y",
        }
    }
}

/// Trailing returns for one scheme. `None` means the horizon could not be
/// computed (insufficient history, lookup failure, or a zero past NAV);
/// zero is only substituted at scoring time, never here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnSet {
    pub scheme_code: String,
    pub returns_6m: Option<f64>,
    pub returns_1y: Option<f64>,
    pub returns_2y: Option<f64>,
    pub returns_3y: Option<f64>,
    pub returns_5y: Option<f64>,
    pub returns_10y: Option<f64>,
}

impl ReturnSet {
    pub fn unavailable(scheme_code: impl Into<String>) -> Self {
        Self {
            scheme_code: scheme_code.into(),
            returns_6m: None,
            returns_1y: None,
            returns_2y: None,
            returns_3y: None,
            returns_5y: None,
            returns_10y: None,
        }
    }

    pub fn get(&self, horizon: ReturnHorizon) -> Option<f64> {
        match horizon {
            ReturnHorizon::SixMonths => self.returns_6m,
            ReturnHorizon::OneYear => self.returns_1y,
            ReturnHorizon::TwoYears => self.returns_2y,
            ReturnHorizon::ThreeYears => self.returns_3y,
            ReturnHorizon::FiveYears => self.returns_5y,
            ReturnHorizon::TenYears => self.returns_10y,
        }
    }

    pub fn set(&mut self, horizon: ReturnHorizon, value: Option<f64>) {
        let slot = match horizon {
            ReturnHorizon::SixMonths => &mut self.returns_6m,
            ReturnHorizon::OneYear => &mut self.returns_1y,
            ReturnHorizon::TwoYears => &mut self.returns_2y,
            ReturnHorizon::ThreeYears => &mut self.returns_3y,
            ReturnHorizon::FiveYears => &mut self.returns_5y,
            ReturnHorizon::TenYears => &mut self.returns_10y,
        };
        *slot = value;
    }

    pub fn display(&self, horizon: ReturnHorizon) -> String {
        match self.get(horizon) {
            Some(v) => format!("{v:.2}"),
            None => "n/a".to_string(),
        }
    }
}

/// A fund that survived the full recommendation pipeline, enriched with
/// its trailing returns and both scoring stages. Built per run, never
/// persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RankedFund {
    pub record: FundRecord,
    pub returns: ReturnSet,
    pub score_initial: f64,
    pub final_score: f64,
}
