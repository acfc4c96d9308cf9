//! Adapter for a local tdx relay.
//!
//! The relay bridges the TDX wire protocol to row-oriented JSON over HTTP.
//! Quotes carry `price`/`last_close`/`vol`/`amount` fields; bars carry
//! dashed dates plus OHLC with volume in lots. No financial statements.

use std::sync::Arc;

use serde_json::json;

use crate::adapters::{code_seed, parse_object_rows, sample_dates};
use crate::domain::{DateRange, StockCode};
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient};
use crate::provider::{
    AdapterFuture, BarsRequest, CapabilitySet, FinancialsRequest, Operation, ProviderAdapter,
    ProviderError, QuoteRequest, SourceId,
};
use crate::raw::RawFrame;

const SAMPLE_BAR_LIMIT: usize = 120;

/// Primary source: low-latency local relay, configured via
/// `EQUITICK_TDX_BASE_URL`.
#[derive(Clone)]
pub struct TdxAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: Option<String>,
}

impl Default for TdxAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(NoopHttpClient),
            base_url: std::env::var("EQUITICK_TDX_BASE_URL").ok(),
        }
    }
}

impl TdxAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: Some(base_url.into()),
        }
    }

    /// Adapter without a relay endpoint; the orchestrator skips it.
    pub fn unconfigured() -> Self {
        Self {
            http_client: Arc::new(NoopHttpClient),
            base_url: None,
        }
    }

    fn endpoint(&self, path: &str, query: &str) -> Result<String, ProviderError> {
        let base = self.base_url.as_deref().ok_or_else(|| {
            ProviderError::unavailable("tdx relay endpoint is not configured")
        })?;
        Ok(format!("{}/{path}?{query}", base.trim_end_matches('/')))
    }

    async fn fetch_rows(
        &self,
        url: String,
        sample: impl FnOnce() -> String,
    ) -> Result<RawFrame, ProviderError> {
        let response = self
            .http_client
            .execute(HttpRequest::get(url))
            .await
            .map_err(|error| {
                if error.retryable() {
                    ProviderError::call_failed(format!("tdx transport error: {}", error.message()))
                } else {
                    ProviderError::internal(format!("tdx transport error: {}", error.message()))
                }
            })?;

        if !response.is_success() {
            return Err(ProviderError::call_failed(format!(
                "tdx relay returned status {}",
                response.status
            )));
        }

        // The no-op transport answers `{}`; substitute the deterministic
        // sample payload so the full parse path still runs offline.
        let body = if response.body.trim() == "{}" {
            sample()
        } else {
            response.body
        };

        Ok(RawFrame::new(parse_object_rows(SourceId::Tdx, &body)?))
    }
}

impl ProviderAdapter for TdxAdapter {
    fn id(&self) -> SourceId {
        SourceId::Tdx
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(true, true, false)
    }

    fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    fn quote<'a>(&'a self, req: QuoteRequest) -> AdapterFuture<'a> {
        Box::pin(async move {
            let query = format!("code={}", urlencoding::encode(req.code.as_str()));
            let url = self.endpoint("quote", &query)?;
            self.fetch_rows(url, || sample_quote(&req.code)).await
        })
    }

    fn bars<'a>(&'a self, req: BarsRequest) -> AdapterFuture<'a> {
        Box::pin(async move {
            let mut query = format!(
                "code={}&end={}",
                urlencoding::encode(req.code.as_str()),
                req.range.end.format_compact()
            );
            if let Some(start) = req.range.start {
                query.push_str(&format!("&start={}", start.format_compact()));
            }
            if !req.adjust.as_str().is_empty() {
                query.push_str(&format!("&adjust={}", req.adjust.as_str()));
            }

            let url = self.endpoint("bars", &query)?;
            self.fetch_rows(url, || sample_bars(&req.code, &req.range))
                .await
        })
    }

    fn financials<'a>(&'a self, req: FinancialsRequest) -> AdapterFuture<'a> {
        Box::pin(async move {
            let _ = req;
            Err(ProviderError::unsupported_operation(
                SourceId::Tdx,
                Operation::Financials,
            ))
        })
    }
}

fn sample_quote(code: &StockCode) -> String {
    let seed = code_seed(code);
    let price = 10.0 + (seed % 400) as f64 / 10.0;
    let last_close = price - 0.15;

    json!([{
        "code": code.as_str(),
        "name": format!("SAMPLE-{}", code.as_str()),
        "price": price,
        "last_close": last_close,
        "open": last_close + 0.05,
        "high": price + 0.30,
        "low": last_close - 0.20,
        "vol": 52_000 + seed % 9_000,
        "amount": (52_000 + seed % 9_000) as f64 * price * 100.0,
    }])
    .to_string()
}

fn sample_bars(code: &StockCode, range: &DateRange) -> String {
    let seed = code_seed(code);
    let dates = sample_dates(range, SAMPLE_BAR_LIMIT);

    let rows: Vec<serde_json::Value> = dates
        .iter()
        .enumerate()
        .map(|(index, date)| {
            let base = 10.0 + ((seed + index as u64 * 3) % 400) as f64 / 10.0;
            let vol = 30_000 + (seed + index as u64 * 7) % 12_000;
            json!({
                "date": format!(
                    "{}-{}-{}",
                    &date.format_compact()[..4],
                    &date.format_compact()[4..6],
                    &date.format_compact()[6..8]
                ),
                "open": base - 0.08,
                "high": base + 0.42,
                "low": base - 0.35,
                "close": base + 0.12,
                "vol": vol,
                "amount": vol as f64 * base * 100.0,
            })
        })
        .collect();

    serde_json::Value::Array(rows).to_string()
}
