//! # Equitick Core
//!
//! Resilient A-share market data acquisition with stateless technical
//! indicators.
//!
//! ## Overview
//!
//! This crate provides the foundational components for Equitick:
//!
//! - **Canonical domain models** for quotes, daily bars, and financial
//!   statements in fixed units (shares, yuan, `YYYYMMDD` trade dates)
//! - **Provider adapters** for tdx, eastmoney, and tushare, each speaking
//!   its upstream's native row schema
//! - **Schema normalization** via static per-source field-mapping tables
//! - **Fallback orchestration** over an ordered source chain with
//!   per-source retry budgets
//! - **Indicator engine** computing MA, MACD, RSI, KDJ, and Bollinger
//!   bands from bar history
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (tdx, eastmoney, tushare) |
//! | [`cache`] | Snapshot store trait and in-memory implementation |
//! | [`domain`] | Domain models (StockCode, TradeDate, Bar, Quote) |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP client abstraction |
//! | [`indicators`] | Stateless technical indicator engine |
//! | [`normalize`] | Per-source schema normalization |
//! | [`orchestrator`] | Ordered fallback chain with retries |
//! | [`provider`] | Adapter trait and request/response types |
//! | [`retry`] | Retry policies and backoff |
//! | [`service`] | Market data facade with snapshot fallback |
//! | [`throttling`] | Rate limiting for quota-bound sources |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use equitick_core::{MarketData, OrchestratorBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = OrchestratorBuilder::new().with_real_clients().build();
//!     let service = MarketData::new(orchestrator);
//!
//!     let served = service.quote("600519").await?;
//!     println!("600519 price: {:.2}", served.data.price);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  Caller          │
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ MarketData       │────▶│ Snapshot Store   │
//! │ (service facade) │     │ (24h fallback)   │
//! └────────┬─────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ Orchestrator     │────▶│ Normalizer       │
//! │ (tdx→em→tushare) │     │ (field tables)   │
//! └────────┬─────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ Provider Adapter │────▶│ HTTP Client      │
//! │ (native schema)  │     │ (reqwest/none)   │
//! └──────────────────┘     └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Exhausting every source is a value, not a panic:
//!
//! ```rust,ignore
//! use equitick_core::{FailureKind, FetchFailure};
//!
//! fn handle_failure(failure: FetchFailure) {
//!     match failure.kind {
//!         FailureKind::InvalidSymbol => {
//!             // Report to the caller; no source was contacted
//!         }
//!         FailureKind::Unavailable => {
//!             // Consider serving a recent snapshot
//!         }
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - Credentials are read from environment variables only (never logged)
//! - Input validation on all domain types

pub mod adapters;
pub mod cache;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod indicators;
pub mod normalize;
pub mod orchestrator;
pub mod provider;
pub mod raw;
pub mod retry;
pub mod service;
pub mod throttling;

// Re-export commonly used types at crate root for convenience

// Adapter implementations
pub use adapters::{EastmoneyAdapter, TdxAdapter, TushareAdapter};

// Snapshot store
pub use cache::{MemorySnapshotStore, SnapshotRecord, SnapshotStore, StoreError};

// Domain models
pub use domain::{
    Adjust, Bar, DateRange, FinancialStatement, Quote, StatementKind, StatementRow, StockCode,
    TradeDate, UtcDateTime,
};

// Error types
pub use error::ValidationError;

// Indicator engine
pub use indicators::{
    Bollinger, BollPosition, IndicatorError, IndicatorSnapshot, Kdj, Macd, Rsi, Trend,
};

// Normalization
pub use normalize::NormalizeError;

// Orchestration
pub use orchestrator::{
    AttemptError, FailureKind, FallbackOrchestrator, FetchFailure, FetchResult, FetchSuccess,
    OrchestratorBuilder, OrchestratorConfig,
};

// Provider contracts
pub use provider::{
    AdapterFuture, BarsRequest, CapabilitySet, FinancialsRequest, Operation, ProviderAdapter,
    ProviderError, ProviderErrorKind, QuoteRequest, SourceId,
};

// Raw frames
pub use raw::{RawFrame, RawRecord};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, NoopHttpClient,
    ReqwestHttpClient,
};

// Retry logic
pub use retry::{Backoff, RetryPolicy};

// Service facade
pub use service::{MarketData, Served, ServiceError, DEFAULT_STALENESS};

// Throttling
pub use throttling::{BackoffPolicy, ProviderPolicy, ThrottlingQueue};
