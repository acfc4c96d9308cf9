//! Provider adapter contract and request/response types.
//!
//! Every upstream source implements [`ProviderAdapter`]; the fallback
//! orchestrator walks an ordered chain of adapters and retries each one
//! according to its policy. Adapters return [`RawFrame`]s in provider-native
//! shape; normalization happens after the call succeeds.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::domain::{Adjust, DateRange, StatementKind, StockCode};
use crate::raw::RawFrame;

/// Upstream source identifier, in chain-priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    Tdx,
    Eastmoney,
    Tushare,
}

impl SourceId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tdx => "tdx",
            Self::Eastmoney => "eastmoney",
            Self::Tushare => "tushare",
        }
    }
}

impl Display for SourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data operation used for capability checks and provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Quote,
    Bars,
    Financials,
}

impl Operation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::Bars => "bars",
            Self::Financials => "financials",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported operation matrix for a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub quote: bool,
    pub bars: bool,
    pub financials: bool,
}

impl CapabilitySet {
    pub const fn new(quote: bool, bars: bool, financials: bool) -> Self {
        Self {
            quote,
            bars,
            financials,
        }
    }

    pub const fn full() -> Self {
        Self::new(true, true, true)
    }

    pub const fn supports(self, operation: Operation) -> bool {
        match operation {
            Operation::Quote => self.quote,
            Operation::Bars => self.bars,
            Operation::Financials => self.financials,
        }
    }

    pub fn supported_operations(self) -> Vec<&'static str> {
        let mut values = Vec::with_capacity(3);
        if self.quote {
            values.push("quote");
        }
        if self.bars {
            values.push("bars");
        }
        if self.financials {
            values.push("financials");
        }
        values
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Source is not configured or cannot be reached at all; the chain
    /// moves on without retrying it.
    Unavailable,
    /// Upstream call failed in a way worth retrying on the same source.
    CallFailed,
    /// Request was malformed for this source; retrying cannot help.
    InvalidRequest,
    /// Unexpected adapter-side failure.
    Internal,
}

/// Structured provider error consumed by the fallback orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    kind: ProviderErrorKind,
    message: String,
    retryable: bool,
}

impl ProviderError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Unavailable,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn call_failed(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::CallFailed,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn unsupported_operation(source: SourceId, operation: Operation) -> Self {
        Self::invalid_request(format!(
            "operation '{operation}' is not supported by source '{source}'"
        ))
    }

    pub const fn kind(&self) -> ProviderErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            ProviderErrorKind::Unavailable => "provider.unavailable",
            ProviderErrorKind::CallFailed => "provider.call_failed",
            ProviderErrorKind::InvalidRequest => "provider.invalid_request",
            ProviderErrorKind::Internal => "provider.internal",
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for ProviderError {}

/// Request payload for the quote operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub code: StockCode,
}

impl QuoteRequest {
    pub fn new(code: StockCode) -> Self {
        Self { code }
    }
}

/// Request payload for the bar-history operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarsRequest {
    pub code: StockCode,
    pub range: DateRange,
    pub adjust: Adjust,
}

impl BarsRequest {
    pub fn new(code: StockCode, range: DateRange, adjust: Adjust) -> Self {
        Self {
            code,
            range,
            adjust,
        }
    }
}

/// Request payload for the financial-statement operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinancialsRequest {
    pub code: StockCode,
    pub kind: StatementKind,
}

impl FinancialsRequest {
    pub fn new(code: StockCode, kind: StatementKind) -> Self {
        Self { code, kind }
    }
}

/// Boxed future returned by adapter operations.
pub type AdapterFuture<'a> =
    Pin<Box<dyn Future<Output = Result<RawFrame, ProviderError>> + Send + 'a>>;

/// Source adapter contract.
///
/// Implementations must be `Send + Sync` as they are shared across the
/// orchestrator chain behind `Arc`.
pub trait ProviderAdapter: Send + Sync {
    /// Unique source identifier.
    fn id(&self) -> SourceId;

    /// Set of operations this source can serve.
    fn capabilities(&self) -> CapabilitySet;

    /// Whether the adapter has the credentials/endpoint it needs.
    ///
    /// Unconfigured adapters are skipped by the orchestrator without
    /// consuming any retry budget.
    fn is_configured(&self) -> bool;

    /// Fetch the latest quote snapshot, provider-native.
    fn quote<'a>(&'a self, req: QuoteRequest) -> AdapterFuture<'a>;

    /// Fetch daily bar history, provider-native.
    fn bars<'a>(&'a self, req: BarsRequest) -> AdapterFuture<'a>;

    /// Fetch financial statement rows, provider-native.
    fn financials<'a>(&'a self, req: FinancialsRequest) -> AdapterFuture<'a>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_set_reports_supported_operations() {
        let caps = CapabilitySet::new(true, true, false);
        assert!(caps.supports(Operation::Quote));
        assert!(caps.supports(Operation::Bars));
        assert!(!caps.supports(Operation::Financials));
        assert_eq!(caps.supported_operations(), vec!["quote", "bars"]);
    }

    #[test]
    fn error_kinds_map_to_stable_codes() {
        assert_eq!(
            ProviderError::unavailable("x").code(),
            "provider.unavailable"
        );
        assert_eq!(
            ProviderError::call_failed("x").code(),
            "provider.call_failed"
        );
        assert!(ProviderError::call_failed("x").retryable());
        assert!(!ProviderError::unavailable("x").retryable());
        assert!(!ProviderError::internal("x").retryable());
    }
}
