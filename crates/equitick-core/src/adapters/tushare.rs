//! Adapter for the tushare pro HTTP API.
//!
//! Every call is a POST of `{api_name, token, params, fields}`; the reply
//! wraps columnar data as `{code, msg, data: {fields, items}}`. Symbols
//! need the exchange suffix (`600519.SH`), volume arrives in lots and
//! amount in thousand yuan, and frames come back newest-first. The free
//! tier is quota-limited, so calls go through a throttling queue.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use crate::adapters::{code_seed, sample_dates};
use crate::domain::{DateRange, StatementKind, StockCode};
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient};
use crate::provider::{
    AdapterFuture, BarsRequest, CapabilitySet, FinancialsRequest, ProviderAdapter, ProviderError,
    QuoteRequest, SourceId,
};
use crate::raw::{RawFrame, RawRecord};
use crate::throttling::{ProviderPolicy, ThrottlingQueue};

const DEFAULT_HTTP_URL: &str = "http://api.tushare.pro";
const SAMPLE_BAR_LIMIT: usize = 120;

/// Tertiary source: token-gated tushare pro API, configured via
/// `EQUITICK_TUSHARE_TOKEN` (endpoint override: `EQUITICK_TUSHARE_HTTP_URL`).
#[derive(Clone)]
pub struct TushareAdapter {
    http_client: Arc<dyn HttpClient>,
    token: Option<String>,
    http_url: String,
    throttle: ThrottlingQueue,
}

impl Default for TushareAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(NoopHttpClient),
            token: std::env::var("EQUITICK_TUSHARE_TOKEN").ok(),
            http_url: std::env::var("EQUITICK_TUSHARE_HTTP_URL")
                .unwrap_or_else(|_| String::from(DEFAULT_HTTP_URL)),
            throttle: ThrottlingQueue::from_policy(&ProviderPolicy::tushare_default()),
        }
    }
}

impl TushareAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>, token: impl Into<String>) -> Self {
        Self {
            http_client,
            token: Some(token.into()),
            ..Self::default()
        }
    }

    /// Adapter without a token; the orchestrator skips it.
    pub fn unconfigured() -> Self {
        Self {
            token: None,
            ..Self::default()
        }
    }

    async fn call(
        &self,
        api_name: &str,
        params: serde_json::Value,
        sample: impl FnOnce() -> String,
    ) -> Result<RawFrame, ProviderError> {
        let token = self.token.as_deref().ok_or_else(|| {
            ProviderError::unavailable("tushare token is not configured")
        })?;

        if let Err(delay) = self.throttle.acquire() {
            return Err(ProviderError::call_failed(format!(
                "tushare rate budget exhausted, retry in {}s",
                delay.as_secs()
            )));
        }

        let body = json!({
            "api_name": api_name,
            "token": token,
            "params": params,
            "fields": "",
        })
        .to_string();

        let response = self
            .http_client
            .execute(HttpRequest::post_json(&self.http_url, body))
            .await
            .map_err(|error| {
                if error.retryable() {
                    ProviderError::call_failed(format!(
                        "tushare transport error: {}",
                        error.message()
                    ))
                } else {
                    ProviderError::internal(format!(
                        "tushare transport error: {}",
                        error.message()
                    ))
                }
            })?;

        if !response.is_success() {
            return Err(ProviderError::call_failed(format!(
                "tushare upstream returned status {}",
                response.status
            )));
        }

        let body = if response.body.trim() == "{}" {
            sample()
        } else {
            response.body
        };

        parse_envelope(&body)
    }
}

impl ProviderAdapter for TushareAdapter {
    fn id(&self) -> SourceId {
        SourceId::Tushare
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::full()
    }

    fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    fn quote<'a>(&'a self, req: QuoteRequest) -> AdapterFuture<'a> {
        Box::pin(async move {
            let ts_code = req.code.ts_code();
            let params = json!({ "ts_code": ts_code, "limit": 1 });
            self.call("daily", params, || sample_daily(&req.code, None, 1))
                .await
        })
    }

    fn bars<'a>(&'a self, req: BarsRequest) -> AdapterFuture<'a> {
        Box::pin(async move {
            let ts_code = req.code.ts_code();
            let mut params = json!({
                "ts_code": ts_code,
                "end_date": req.range.end.format_compact(),
            });
            if let Some(start) = req.range.start {
                params["start_date"] = json!(start.format_compact());
            }

            self.call("daily", params, || {
                sample_daily(&req.code, Some(&req.range), SAMPLE_BAR_LIMIT)
            })
            .await
        })
    }

    fn financials<'a>(&'a self, req: FinancialsRequest) -> AdapterFuture<'a> {
        Box::pin(async move {
            let ts_code = req.code.ts_code();
            let params = json!({ "ts_code": ts_code });
            self.call(statement_api(req.kind), params, || {
                sample_financials(&req.code, req.kind)
            })
            .await
        })
    }
}

fn statement_api(kind: StatementKind) -> &'static str {
    match kind {
        StatementKind::Income => "income",
        StatementKind::Balance => "balancesheet",
        StatementKind::CashFlow => "cashflow",
    }
}

#[derive(Debug, Deserialize)]
struct TushareResponse {
    code: i64,
    msg: Option<String>,
    data: Option<TushareData>,
}

#[derive(Debug, Deserialize)]
struct TushareData {
    fields: Vec<String>,
    items: Vec<Vec<serde_json::Value>>,
}

/// Unpack the columnar `{fields, items}` envelope into native records.
fn parse_envelope(body: &str) -> Result<RawFrame, ProviderError> {
    let response: TushareResponse = serde_json::from_str(body).map_err(|error| {
        ProviderError::internal(format!("tushare returned malformed JSON: {error}"))
    })?;

    if response.code != 0 {
        let msg = response
            .msg
            .unwrap_or_else(|| String::from("unspecified upstream error"));
        return Err(ProviderError::call_failed(format!(
            "tushare rejected the call (code {}): {msg}",
            response.code
        )));
    }

    let TushareData { fields, items } = response
        .data
        .ok_or_else(|| ProviderError::internal("tushare reply carries no data section"))?;

    let rows = items
        .into_iter()
        .map(|item| fields.iter().cloned().zip(item).collect::<RawRecord>())
        .collect();

    Ok(RawFrame::new(rows))
}

fn sample_daily(code: &StockCode, range: Option<&DateRange>, limit: usize) -> String {
    let seed = code_seed(code);
    let default_range = DateRange::default();
    let range = range.unwrap_or(&default_range);
    let dates = sample_dates(range, limit);

    // tushare serves newest-first.
    let items: Vec<serde_json::Value> = dates
        .iter()
        .enumerate()
        .rev()
        .map(|(index, date)| {
            let base = 15.0 + ((seed + index as u64 * 7) % 350) as f64 / 10.0;
            let vol = 25_000 + (seed + index as u64 * 13) % 11_000;
            json!([
                code.ts_code(),
                date.format_compact(),
                base - 0.05,
                base + 0.33,
                base - 0.28,
                base + 0.11,
                base - 0.16,
                0.27,
                1.7,
                vol,
                vol as f64 * base / 10.0,
            ])
        })
        .collect();

    json!({
        "code": 0,
        "msg": null,
        "data": {
            "fields": [
                "ts_code", "trade_date", "open", "high", "low", "close",
                "pre_close", "change", "pct_chg", "vol", "amount"
            ],
            "items": items,
        }
    })
    .to_string()
}

fn sample_financials(code: &StockCode, kind: StatementKind) -> String {
    let seed = code_seed(code);
    let periods = ["20240930", "20240630", "20240331", "20231231"];
    let metric = match kind {
        StatementKind::Income => ("revenue", "n_income"),
        StatementKind::Balance => ("total_assets", "total_liab"),
        StatementKind::CashFlow => ("n_cashflow_act", "c_cash_equ_end_period"),
    };

    let items: Vec<serde_json::Value> = periods
        .iter()
        .enumerate()
        .map(|(index, period)| {
            let scale = (seed % 80 + 20) as f64 * (1.0 + index as f64 * 0.04);
            json!([code.ts_code(), period, scale * 1.0e8, scale * 0.3e8])
        })
        .collect();

    json!({
        "code": 0,
        "msg": null,
        "data": {
            "fields": ["ts_code", "end_date", metric.0, metric.1],
            "items": items,
        }
    })
    .to_string()
}
