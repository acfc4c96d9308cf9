//! Adapter for eastmoney data served through an akshare-compatible HTTP
//! bridge (aktools).
//!
//! Frames keep the upstream's Chinese column names (日期/开盘/收盘/...);
//! volume arrives in lots and amount in yuan. This source needs no
//! credentials and is always configured, which makes it the reliable
//! middle link of the default chain.

use std::sync::Arc;

use serde_json::json;

use crate::adapters::{code_seed, parse_object_rows, sample_dates};
use crate::domain::{DateRange, StatementKind, StockCode};
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient};
use crate::provider::{
    AdapterFuture, BarsRequest, CapabilitySet, FinancialsRequest, ProviderAdapter, ProviderError,
    QuoteRequest, SourceId,
};
use crate::raw::RawFrame;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
const SAMPLE_BAR_LIMIT: usize = 120;

/// Secondary source: public eastmoney endpoints behind an aktools bridge.
#[derive(Clone)]
pub struct EastmoneyAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
}

impl Default for EastmoneyAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(NoopHttpClient),
            base_url: std::env::var("EQUITICK_AKTOOLS_BASE_URL")
                .unwrap_or_else(|_| String::from(DEFAULT_BASE_URL)),
        }
    }
}

impl EastmoneyAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, api: &str, query: &str) -> String {
        format!(
            "{}/api/public/{api}?{query}",
            self.base_url.trim_end_matches('/')
        )
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
                    ProviderError::call_failed(format!(
                        "eastmoney transport error: {}",
                        error.message()
                    ))
                } else {
                    ProviderError::internal(format!(
                        "eastmoney transport error: {}",
                        error.message()
                    ))
                }
            })?;

        if !response.is_success() {
            return Err(ProviderError::call_failed(format!(
                "eastmoney bridge returned status {}",
                response.status
            )));
        }

        let body = if response.body.trim() == "{}" {
            sample()
        } else {
            response.body
        };

        Ok(RawFrame::new(parse_object_rows(SourceId::Eastmoney, &body)?))
    }
}

impl ProviderAdapter for EastmoneyAdapter {
    fn id(&self) -> SourceId {
        SourceId::Eastmoney
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::full()
    }

    // Public endpoints, no credentials.
    fn is_configured(&self) -> bool {
        true
    }

    fn quote<'a>(&'a self, req: QuoteRequest) -> AdapterFuture<'a> {
        Box::pin(async move {
            let url = self.endpoint("stock_zh_a_spot_em", "");
            let frame = self.fetch_rows(url, || sample_quote(&req.code)).await?;

            // The spot endpoint returns the whole market; keep the row for
            // the requested code.
            let rows = frame
                .rows
                .into_iter()
                .filter(|row| {
                    row.get("代码").and_then(|value| value.as_str()) == Some(req.code.as_str())
                })
                .collect();
            Ok(RawFrame::new(rows))
        })
    }

    fn bars<'a>(&'a self, req: BarsRequest) -> AdapterFuture<'a> {
        Box::pin(async move {
            let mut query = format!(
                "symbol={}&period=daily&end_date={}",
                urlencoding::encode(req.code.as_str()),
                req.range.end.format_compact()
            );
            if let Some(start) = req.range.start {
                query.push_str(&format!("&start_date={}", start.format_compact()));
            }
            query.push_str(&format!("&adjust={}", req.adjust.as_str()));

            let url = self.endpoint("stock_zh_a_hist", &query);
            self.fetch_rows(url, || sample_bars(&req.code, &req.range))
                .await
        })
    }

    fn financials<'a>(&'a self, req: FinancialsRequest) -> AdapterFuture<'a> {
        Box::pin(async move {
            let query = format!(
                "symbol={}&indicator={}",
                urlencoding::encode(req.code.as_str()),
                statement_indicator(req.kind)
            );
            let url = self.endpoint("stock_financial_report_em", &query);
            self.fetch_rows(url, || sample_financials(&req.code)).await
        })
    }
}

fn statement_indicator(kind: StatementKind) -> &'static str {
    match kind {
        StatementKind::Income => "利润表",
        StatementKind::Balance => "资产负债表",
        StatementKind::CashFlow => "现金流量表",
    }
}

fn sample_quote(code: &StockCode) -> String {
    let seed = code_seed(code);
    let price = 12.0 + (seed % 380) as f64 / 10.0;
    let pre_close = price - 0.22;
    let vol = 64_000 + seed % 8_000;

    json!([{
        "代码": code.as_str(),
        "名称": format!("样本{}", code.as_str()),
        "最新价": price,
        "涨跌幅": (price - pre_close) / pre_close * 100.0,
        "涨跌额": price - pre_close,
        "今开": pre_close + 0.10,
        "最高": price + 0.25,
        "最低": pre_close - 0.18,
        "昨收": pre_close,
        "成交量": vol,
        "成交额": vol as f64 * price * 100.0,
        "换手率": 1.0 + (seed % 50) as f64 / 10.0,
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
            let base = 12.0 + ((seed + index as u64 * 5) % 380) as f64 / 10.0;
            let vol = 42_000 + (seed + index as u64 * 11) % 9_000;
            let compact = date.format_compact();
            json!({
                "日期": format!("{}-{}-{}", &compact[..4], &compact[4..6], &compact[6..8]),
                "开盘": base - 0.06,
                "收盘": base + 0.14,
                "最高": base + 0.38,
                "最低": base - 0.31,
                "成交量": vol,
                "成交额": vol as f64 * base * 100.0,
                "换手率": 0.8 + (index % 40) as f64 / 20.0,
            })
        })
        .collect();

    serde_json::Value::Array(rows).to_string()
}

fn sample_financials(code: &StockCode) -> String {
    let seed = code_seed(code);
    let periods = ["2023-12-31", "2024-03-31", "2024-06-30", "2024-09-30"];

    let rows: Vec<serde_json::Value> = periods
        .iter()
        .enumerate()
        .map(|(index, period)| {
            let scale = (seed % 90 + 10) as f64 * (1.0 + index as f64 * 0.05);
            json!({
                "报告期": period,
                "营业收入": scale * 1.0e8,
                "营业成本": scale * 0.62e8,
                "净利润": scale * 0.21e8,
            })
        })
        .collect();

    serde_json::Value::Array(rows).to_string()
}
