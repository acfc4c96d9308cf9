//! Ordered provider chain with per-source retry and fallthrough.
//!
//! The orchestrator walks the chain in priority order. Unsupported or
//! unconfigured sources are skipped without consuming retry budget. A
//! source that fails retryably, or answers with an empty frame, is
//! retried up to the policy's attempt budget before the chain moves on.
//! Exhausting the whole chain yields an explicit [`FetchFailure`] value;
//! no path panics or raises past the documented types.

use std::env;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::adapters::{EastmoneyAdapter, TdxAdapter, TushareAdapter};
use crate::domain::{Adjust, DateRange, FinancialStatement, Quote, StatementKind, StockCode};
use crate::http_client::ReqwestHttpClient;
use crate::normalize::{self, NormalizeError};
use crate::provider::{
    AdapterFuture, BarsRequest, FinancialsRequest, Operation, ProviderAdapter, ProviderError,
    QuoteRequest, SourceId,
};
use crate::raw::RawFrame;
use crate::retry::RetryPolicy;

/// Pacing and retry settings for the chain.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Attempt budget and backoff per source.
    pub retry: RetryPolicy,
    /// Fixed pause after every successful upstream call, to stay polite
    /// toward free endpoints.
    pub request_delay: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            request_delay: Duration::from_secs(1),
        }
    }
}

impl OrchestratorConfig {
    /// Zero-delay settings for tests.
    pub fn immediate() -> Self {
        Self {
            retry: RetryPolicy::fixed(Duration::ZERO, 3),
            request_delay: Duration::ZERO,
        }
    }
}

/// One recorded failure along the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptError {
    /// Failing source; `None` for failures before any source was chosen.
    pub source: Option<SourceId>,
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl AttemptError {
    fn from_provider(source: SourceId, error: &ProviderError) -> Self {
        Self {
            source: Some(source),
            code: error.code(),
            message: error.message().to_owned(),
            retryable: error.retryable(),
        }
    }
}

/// Successful fetch with provenance.
#[derive(Debug, Clone)]
pub struct FetchSuccess<T> {
    pub data: T,
    /// Source that ultimately served the request.
    pub source: SourceId,
    /// Sources considered, in order.
    pub source_chain: Vec<SourceId>,
    /// Failures collected before success.
    pub errors: Vec<AttemptError>,
    pub latency_ms: u64,
}

/// Why the whole chain came up empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The symbol could not be translated; no source was contacted.
    InvalidSymbol,
    /// Every candidate source failed or returned nothing.
    Unavailable,
}

/// Terminal failure after exhausting the chain.
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub source_chain: Vec<SourceId>,
    pub errors: Vec<AttemptError>,
    pub latency_ms: u64,
}

impl Display for FetchFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            FailureKind::InvalidSymbol => write!(
                f,
                "symbol translation failed: {}",
                self.errors
                    .first()
                    .map(|error| error.message.as_str())
                    .unwrap_or("unknown")
            ),
            FailureKind::Unavailable => write!(
                f,
                "all sources exhausted after {} recorded failure(s)",
                self.errors.len()
            ),
        }
    }
}

impl std::error::Error for FetchFailure {}

pub type FetchResult<T> = Result<FetchSuccess<T>, FetchFailure>;

/// Operation plus its validated payload, dispatched per adapter.
#[derive(Debug, Clone)]
enum Request {
    Quote(QuoteRequest),
    Bars(BarsRequest),
    Financials(FinancialsRequest),
}

impl Request {
    fn operation(&self) -> Operation {
        match self {
            Self::Quote(_) => Operation::Quote,
            Self::Bars(_) => Operation::Bars,
            Self::Financials(_) => Operation::Financials,
        }
    }

    fn invoke<'a>(&self, adapter: &'a dyn ProviderAdapter) -> AdapterFuture<'a> {
        match self {
            Self::Quote(req) => adapter.quote(req.clone()),
            Self::Bars(req) => adapter.bars(req.clone()),
            Self::Financials(req) => adapter.financials(req.clone()),
        }
    }
}

/// Ordered chain of provider adapters.
pub struct FallbackOrchestrator {
    chain: Vec<Arc<dyn ProviderAdapter>>,
    config: OrchestratorConfig,
}

impl Default for FallbackOrchestrator {
    fn default() -> Self {
        Self::new(
            vec![
                Arc::new(TdxAdapter::default()),
                Arc::new(EastmoneyAdapter::default()),
                Arc::new(TushareAdapter::default()),
            ],
            OrchestratorConfig::default(),
        )
    }
}

impl FallbackOrchestrator {
    pub fn new(chain: Vec<Arc<dyn ProviderAdapter>>, config: OrchestratorConfig) -> Self {
        Self { chain, config }
    }

    /// Source ids in chain order.
    pub fn chain(&self) -> Vec<SourceId> {
        self.chain.iter().map(|adapter| adapter.id()).collect()
    }

    /// Latest quote for a six-digit symbol.
    pub async fn quote(&self, symbol: &str) -> FetchResult<Quote> {
        let code = self.translate(symbol)?;
        let request = Request::Quote(QuoteRequest::new(code.clone()));
        self.run(request, move |source, frame| {
            normalize::quote(source, &frame, &code).map(Some)
        })
        .await
    }

    /// Daily bar history, sorted ascending in canonical units.
    pub async fn bars(
        &self,
        symbol: &str,
        range: DateRange,
        adjust: Adjust,
    ) -> FetchResult<Vec<crate::domain::Bar>> {
        let code = self.translate(symbol)?;
        let request = Request::Bars(BarsRequest::new(code, range, adjust));
        self.run(request, move |source, frame| {
            let bars = normalize::bars(source, &frame)?;
            // All records dropped is the same soft failure as an empty
            // upstream frame.
            Ok((!bars.is_empty()).then_some(bars))
        })
        .await
    }

    /// Financial statement rows for one company.
    pub async fn financials(
        &self,
        symbol: &str,
        kind: StatementKind,
    ) -> FetchResult<FinancialStatement> {
        let code = self.translate(symbol)?;
        let request = Request::Financials(FinancialsRequest::new(code.clone(), kind));
        self.run(request, move |source, frame| {
            let statement = normalize::financials(source, &frame, &code, kind)?;
            Ok((!statement.rows.is_empty()).then_some(statement))
        })
        .await
    }

    fn translate(&self, symbol: &str) -> Result<StockCode, FetchFailure> {
        StockCode::parse(symbol).map_err(|error| {
            log::warn!("symbol '{symbol}' failed translation: {error}");
            FetchFailure {
                kind: FailureKind::InvalidSymbol,
                source_chain: Vec::new(),
                errors: vec![AttemptError {
                    source: None,
                    code: "symbol.invalid",
                    message: error.to_string(),
                    retryable: false,
                }],
                latency_ms: 0,
            }
        })
    }

    async fn run<T, N>(&self, request: Request, mut normalize: N) -> FetchResult<T>
    where
        N: FnMut(SourceId, RawFrame) -> Result<Option<T>, NormalizeError>,
    {
        let operation = request.operation();
        let started = Instant::now();
        let mut source_chain = Vec::with_capacity(self.chain.len());
        let mut errors = Vec::new();

        'sources: for adapter in &self.chain {
            let source = adapter.id();
            if !adapter.capabilities().supports(operation) {
                log::debug!("{source} does not serve {operation}, skipping");
                continue;
            }

            source_chain.push(source);

            if !adapter.is_configured() {
                log::debug!("{source} is not configured, skipping without retries");
                errors.push(AttemptError {
                    source: Some(source),
                    code: "provider.unavailable",
                    message: format!("source '{source}' is not configured"),
                    retryable: false,
                });
                continue;
            }

            for attempt in 0..self.config.retry.max_attempts {
                if attempt > 0 {
                    tokio::time::sleep(self.config.retry.delay_for_attempt(attempt - 1)).await;
                }

                match request.invoke(adapter.as_ref()).await {
                    Ok(frame) => {
                        self.pace().await;

                        if frame.is_empty() {
                            log::warn!(
                                "{source} returned an empty {operation} frame (attempt {}/{})",
                                attempt + 1,
                                self.config.retry.max_attempts
                            );
                            errors.push(AttemptError {
                                source: Some(source),
                                code: "provider.empty_result",
                                message: format!("source '{source}' returned no records"),
                                retryable: true,
                            });
                            continue;
                        }

                        match normalize(source, frame) {
                            Ok(Some(data)) => {
                                if !errors.is_empty() {
                                    log::warn!(
                                        "{operation} served by '{source}' after {} failed attempt(s)",
                                        errors.len()
                                    );
                                }
                                return Ok(FetchSuccess {
                                    data,
                                    source,
                                    source_chain,
                                    errors,
                                    latency_ms: elapsed_ms(started),
                                });
                            }
                            Ok(None) => {
                                errors.push(AttemptError {
                                    source: Some(source),
                                    code: "provider.empty_result",
                                    message: format!(
                                        "source '{source}' records all dropped in normalization"
                                    ),
                                    retryable: true,
                                });
                            }
                            Err(error) => {
                                log::warn!("{source} {operation} frame failed to normalize: {error}");
                                errors.push(AttemptError {
                                    source: Some(source),
                                    code: "normalize.failed",
                                    message: error.to_string(),
                                    retryable: false,
                                });
                                continue 'sources;
                            }
                        }
                    }
                    Err(error) => {
                        log::warn!(
                            "{source} {operation} attempt {}/{} failed: {error}",
                            attempt + 1,
                            self.config.retry.max_attempts
                        );
                        errors.push(AttemptError::from_provider(source, &error));
                        if !error.retryable() {
                            continue 'sources;
                        }
                    }
                }
            }
        }

        log::warn!(
            "{operation} exhausted {} source(s) with {} failure(s)",
            source_chain.len(),
            errors.len()
        );
        Err(FetchFailure {
            kind: FailureKind::Unavailable,
            source_chain,
            errors,
            latency_ms: elapsed_ms(started),
        })
    }

    async fn pace(&self) {
        if !self.config.request_delay.is_zero() {
            tokio::time::sleep(self.config.request_delay).await;
        }
    }
}

/// Builder wiring the default chain with real or offline transports.
///
/// # Environment Variables
///
/// | Source | Variable | Meaning |
/// |--------|----------|---------|
/// | tdx | `EQUITICK_TDX_BASE_URL` | Relay endpoint; absent means skipped |
/// | eastmoney | `EQUITICK_AKTOOLS_BASE_URL` | Bridge endpoint (optional) |
/// | tushare | `EQUITICK_TUSHARE_TOKEN` | API token; absent means skipped |
/// | tushare | `EQUITICK_TUSHARE_HTTP_URL` | Endpoint override (optional) |
#[derive(Debug, Default)]
pub struct OrchestratorBuilder {
    use_offline: bool,
    tdx_base_url: Option<String>,
    aktools_base_url: Option<String>,
    tushare_token: Option<String>,
    config: Option<OrchestratorConfig>,
    disable_tdx: bool,
    disable_eastmoney: bool,
    disable_tushare: bool,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// All adapters use the no-op transport with deterministic data.
    pub fn with_offline_mode(mut self) -> Self {
        self.use_offline = true;
        self
    }

    /// Configure adapters with a shared reqwest transport, reading
    /// credentials from the environment.
    pub fn with_real_clients(mut self) -> Self {
        self.use_offline = false;
        self.tdx_base_url = env::var("EQUITICK_TDX_BASE_URL").ok();
        self.aktools_base_url = env::var("EQUITICK_AKTOOLS_BASE_URL").ok();
        self.tushare_token = env::var("EQUITICK_TUSHARE_TOKEN").ok();
        self
    }

    pub fn with_tdx_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.tdx_base_url = Some(base_url.into());
        self
    }

    pub fn with_tushare_token(mut self, token: impl Into<String>) -> Self {
        self.tushare_token = Some(token.into());
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_tdx_enabled(mut self, enabled: bool) -> Self {
        self.disable_tdx = !enabled;
        self
    }

    pub fn with_eastmoney_enabled(mut self, enabled: bool) -> Self {
        self.disable_eastmoney = !enabled;
        self
    }

    pub fn with_tushare_enabled(mut self, enabled: bool) -> Self {
        self.disable_tushare = !enabled;
        self
    }

    pub fn build(self) -> FallbackOrchestrator {
        let mut chain: Vec<Arc<dyn ProviderAdapter>> = Vec::with_capacity(3);
        let http_client = if self.use_offline {
            None
        } else {
            Some(Arc::new(ReqwestHttpClient::new()))
        };

        if !self.disable_tdx {
            chain.push(match (&http_client, &self.tdx_base_url) {
                (Some(client), Some(base_url)) => {
                    Arc::new(TdxAdapter::with_http_client(client.clone(), base_url))
                }
                (None, _) => Arc::new(TdxAdapter::default()),
                (Some(_), None) => Arc::new(TdxAdapter::unconfigured()),
            });
        }

        if !self.disable_eastmoney {
            chain.push(match &http_client {
                Some(client) => {
                    let base_url = self
                        .aktools_base_url
                        .clone()
                        .unwrap_or_else(|| String::from("http://127.0.0.1:8080"));
                    Arc::new(EastmoneyAdapter::with_http_client(client.clone(), base_url))
                }
                None => Arc::new(EastmoneyAdapter::default()),
            });
        }

        if !self.disable_tushare {
            chain.push(match (&http_client, &self.tushare_token) {
                (Some(client), Some(token)) => {
                    Arc::new(TushareAdapter::with_http_client(client.clone(), token))
                }
                (None, _) => Arc::new(TushareAdapter::default()),
                (Some(_), None) => Arc::new(TushareAdapter::unconfigured()),
            });
        }

        FallbackOrchestrator::new(chain, self.config.unwrap_or_default())
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}
