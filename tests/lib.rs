//! Shared helpers for the cross-crate behavior tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub use std::sync::Arc;

use equitick_core::{
    AdapterFuture, Bar, CapabilitySet, ProviderAdapter, ProviderError, RawFrame, RawRecord,
    SourceId, TradeDate,
};
use serde_json::{Map, Value};

/// Builds an ascending daily series from closes, one bar per calendar
/// day starting 2024-01-02, with flat intraday range and unit volume.
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(index, close)| {
            let date = time::Date::from_calendar_date(2024, time::Month::January, 2)
                .expect("valid date")
                + time::Duration::days(index as i64);
            Bar {
                date: TradeDate::from(date),
                open: *close,
                high: *close,
                low: *close,
                close: *close,
                volume: 1_000.0,
                amount: close * 1_000.0,
            }
        })
        .collect()
}

pub fn assert_approx(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

/// One native tdx-style bar row.
pub fn tdx_bar_row(date: &str, close: f64, vol_lots: f64) -> RawRecord {
    let mut row = Map::new();
    row.insert("date".into(), Value::from(date));
    row.insert("open".into(), Value::from(close - 0.1));
    row.insert("high".into(), Value::from(close + 0.2));
    row.insert("low".into(), Value::from(close - 0.2));
    row.insert("close".into(), Value::from(close));
    row.insert("vol".into(), Value::from(vol_lots));
    row.insert("amount".into(), Value::from(close * vol_lots * 100.0));
    row
}

/// One native eastmoney-style quote row with Chinese column names.
pub fn eastmoney_quote_row(code: &str, price: f64) -> RawRecord {
    let mut row = Map::new();
    row.insert("代码".into(), Value::from(code));
    row.insert("名称".into(), Value::from("测试"));
    row.insert("最新价".into(), Value::from(price));
    row.insert("涨跌幅".into(), Value::from(1.5));
    row.insert("涨跌额".into(), Value::from(0.15));
    row.insert("今开".into(), Value::from(price - 0.1));
    row.insert("最高".into(), Value::from(price + 0.2));
    row.insert("最低".into(), Value::from(price - 0.3));
    row.insert("昨收".into(), Value::from(price - 0.15));
    row.insert("成交量".into(), Value::from(50_000));
    row.insert("成交额".into(), Value::from(price * 5_000_000.0));
    row.insert("换手率".into(), Value::from(2.1));
    row
}

/// Scripted adapter: answers each call from a fixed queue of outcomes
/// and counts how often it was invoked.
pub struct ScriptedAdapter {
    id: SourceId,
    configured: bool,
    capabilities: CapabilitySet,
    script: Mutex<VecDeque<Result<RawFrame, ProviderError>>>,
    calls: AtomicUsize,
}

impl ScriptedAdapter {
    pub fn new(id: SourceId, script: Vec<Result<RawFrame, ProviderError>>) -> Self {
        Self {
            id,
            configured: true,
            capabilities: CapabilitySet::full(),
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unconfigured(id: SourceId) -> Self {
        Self {
            id,
            configured: false,
            capabilities: CapabilitySet::full(),
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> Result<RawFrame, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .expect("script lock should not be poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::internal("script exhausted")))
    }
}

impl ProviderAdapter for ScriptedAdapter {
    fn id(&self) -> SourceId {
        self.id
    }

    fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn quote<'a>(&'a self, _req: equitick_core::QuoteRequest) -> AdapterFuture<'a> {
        let outcome = self.next();
        Box::pin(async move { outcome })
    }

    fn bars<'a>(&'a self, _req: equitick_core::BarsRequest) -> AdapterFuture<'a> {
        let outcome = self.next();
        Box::pin(async move { outcome })
    }

    fn financials<'a>(&'a self, _req: equitick_core::FinancialsRequest) -> AdapterFuture<'a> {
        let outcome = self.next();
        Box::pin(async move { outcome })
    }
}
