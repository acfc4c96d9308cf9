use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::domain::{StockCode, TradeDate, UtcDateTime};
use crate::provider::SourceId;
use crate::ValidationError;

/// Price adjustment mode for historical bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjust {
    /// Raw, unadjusted prices.
    None,
    /// Forward adjusted ("qfq").
    Forward,
    /// Backward adjusted ("hfq").
    Backward,
}

impl Adjust {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim() {
            "" | "none" => Ok(Self::None),
            "qfq" => Ok(Self::Forward),
            "hfq" => Ok(Self::Backward),
            other => Err(ValidationError::InvalidAdjust {
                value: other.to_owned(),
            }),
        }
    }

    /// Wire value understood by the upstream APIs; empty string means raw.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Forward => "qfq",
            Self::Backward => "hfq",
        }
    }
}

impl Default for Adjust {
    fn default() -> Self {
        Self::Forward
    }
}

impl Display for Adjust {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Canonical daily OHLCV bar.
///
/// Volume is in shares and amount in yuan regardless of the source's
/// native units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: TradeDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub amount: f64,
}

/// Canonical real-time (or delayed) quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub code: StockCode,
    pub name: String,
    pub price: f64,
    pub change_pct: f64,
    pub change_amount: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub pre_close: f64,
    pub volume: f64,
    pub amount: f64,
    pub turnover_rate: f64,
    pub timestamp: UtcDateTime,
    pub source: SourceId,
}

/// Financial statement family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Income,
    Balance,
    CashFlow,
}

impl StatementKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Balance => "balance",
            Self::CashFlow => "cash_flow",
        }
    }
}

impl Display for StatementKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reporting period of a financial statement; metric names stay
/// source-native, values are numeric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRow {
    pub period: String,
    pub values: BTreeMap<String, f64>,
}

/// Normalized financial statement for one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatement {
    pub code: StockCode,
    pub kind: StatementKind,
    pub rows: Vec<StatementRow>,
}
