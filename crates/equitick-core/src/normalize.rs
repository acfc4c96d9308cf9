//! Schema normalization: provider-native frames to canonical types.
//!
//! Each source has a static field map describing the native column name
//! and unit scale for every canonical field. The trade date (or report
//! period) is the only required field; a record missing it is dropped
//! and logged, never fatal for the batch. Volume converts from lots to
//! shares (x100) and tushare amounts from thousand yuan to yuan (x1000).

use std::collections::BTreeMap;

use thiserror::Error;

use crate::domain::{
    Bar, FinancialStatement, Quote, StatementKind, StatementRow, StockCode, TradeDate, UtcDateTime,
};
use crate::provider::{Operation, SourceId};
use crate::raw::{RawFrame, RawRecord};

/// Frame-level normalization failure. Record-level problems (a missing
/// date, an unparseable number) degrade to dropped records or zero
/// defaults instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    // Field deliberately not named `source`: thiserror would treat that
    // as the error's cause and demand `SourceId: std::error::Error`.
    #[error("source '{source_id}' has no field mapping for operation '{operation}'")]
    UnsupportedSource {
        source_id: SourceId,
        operation: Operation,
    },
    #[error("frame contains no usable records for operation '{operation}'")]
    NoUsableRecords { operation: Operation },
    #[error("record is missing required field '{field}'")]
    MissingField { field: &'static str },
}

/// Native key plus multiplicative unit scale.
#[derive(Debug, Clone, Copy)]
struct Scaled {
    key: &'static str,
    scale: f64,
}

const fn plain(key: &'static str) -> Scaled {
    Scaled { key, scale: 1.0 }
}

const fn lots(key: &'static str) -> Scaled {
    Scaled { key, scale: 100.0 }
}

const fn thousands(key: &'static str) -> Scaled {
    Scaled {
        key,
        scale: 1000.0,
    }
}

#[derive(Debug, Clone, Copy)]
struct BarFields {
    date: &'static str,
    open: Scaled,
    high: Scaled,
    low: Scaled,
    close: Scaled,
    volume: Scaled,
    amount: Scaled,
}

#[derive(Debug, Clone, Copy)]
struct QuoteFields {
    name: Option<&'static str>,
    price: Scaled,
    change_pct: Option<Scaled>,
    change_amount: Option<Scaled>,
    open: Scaled,
    high: Scaled,
    low: Scaled,
    pre_close: Scaled,
    volume: Scaled,
    amount: Scaled,
    turnover_rate: Option<Scaled>,
    timestamp: Option<&'static str>,
}

const TDX_BARS: BarFields = BarFields {
    date: "date",
    open: plain("open"),
    high: plain("high"),
    low: plain("low"),
    close: plain("close"),
    volume: lots("vol"),
    amount: plain("amount"),
};

const EASTMONEY_BARS: BarFields = BarFields {
    date: "日期",
    open: plain("开盘"),
    high: plain("最高"),
    low: plain("最低"),
    close: plain("收盘"),
    volume: lots("成交量"),
    amount: plain("成交额"),
};

const TUSHARE_BARS: BarFields = BarFields {
    date: "trade_date",
    open: plain("open"),
    high: plain("high"),
    low: plain("low"),
    close: plain("close"),
    volume: lots("vol"),
    amount: thousands("amount"),
};

const TDX_QUOTE: QuoteFields = QuoteFields {
    name: Some("name"),
    price: plain("price"),
    change_pct: None,
    change_amount: None,
    open: plain("open"),
    high: plain("high"),
    low: plain("low"),
    pre_close: plain("last_close"),
    volume: lots("vol"),
    amount: plain("amount"),
    turnover_rate: None,
    timestamp: None,
};

const EASTMONEY_QUOTE: QuoteFields = QuoteFields {
    name: Some("名称"),
    price: plain("最新价"),
    change_pct: Some(plain("涨跌幅")),
    change_amount: Some(plain("涨跌额")),
    open: plain("今开"),
    high: plain("最高"),
    low: plain("最低"),
    pre_close: plain("昨收"),
    volume: lots("成交量"),
    amount: plain("成交额"),
    turnover_rate: Some(plain("换手率")),
    timestamp: None,
};

const TUSHARE_QUOTE: QuoteFields = QuoteFields {
    name: None,
    price: plain("close"),
    change_pct: Some(plain("pct_chg")),
    change_amount: Some(plain("change")),
    open: plain("open"),
    high: plain("high"),
    low: plain("low"),
    pre_close: plain("pre_close"),
    volume: lots("vol"),
    amount: thousands("amount"),
    turnover_rate: None,
    timestamp: Some("trade_date"),
};

/// Identifier columns excluded from statement metric maps.
const IDENTIFIER_KEYS: [&str; 3] = ["ts_code", "code", "代码"];

fn bar_fields(source: SourceId) -> BarFields {
    match source {
        SourceId::Tdx => TDX_BARS,
        SourceId::Eastmoney => EASTMONEY_BARS,
        SourceId::Tushare => TUSHARE_BARS,
    }
}

fn quote_fields(source: SourceId) -> QuoteFields {
    match source {
        SourceId::Tdx => TDX_QUOTE,
        SourceId::Eastmoney => EASTMONEY_QUOTE,
        SourceId::Tushare => TUSHARE_QUOTE,
    }
}

fn period_key(source: SourceId) -> Result<&'static str, NormalizeError> {
    match source {
        SourceId::Eastmoney => Ok("报告期"),
        SourceId::Tushare => Ok("end_date"),
        SourceId::Tdx => Err(NormalizeError::UnsupportedSource {
            source_id: source,
            operation: Operation::Financials,
        }),
    }
}

/// Numeric field lookup tolerating numbers-as-strings.
fn numeric(record: &RawRecord, key: &str) -> Option<f64> {
    match record.get(key)? {
        serde_json::Value::Number(number) => number.as_f64(),
        serde_json::Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn scaled(record: &RawRecord, field: Scaled) -> f64 {
    numeric(record, field.key).map_or(0.0, |value| value * field.scale)
}

fn text(record: &RawRecord, key: &str) -> Option<String> {
    match record.get(key)? {
        serde_json::Value::String(value) => Some(value.clone()),
        serde_json::Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

/// Normalize a bar-history frame: drop records without a parseable trade
/// date, default absent numerics to zero, sort ascending, de-duplicate.
pub fn bars(source: SourceId, frame: &RawFrame) -> Result<Vec<Bar>, NormalizeError> {
    let fields = bar_fields(source);
    let mut out = Vec::with_capacity(frame.len());
    let mut dropped = 0_usize;

    for row in &frame.rows {
        let Some(raw_date) = text(row, fields.date) else {
            dropped += 1;
            continue;
        };
        let Ok(date) = TradeDate::parse(&raw_date) else {
            dropped += 1;
            continue;
        };

        out.push(Bar {
            date,
            open: scaled(row, fields.open),
            high: scaled(row, fields.high),
            low: scaled(row, fields.low),
            close: scaled(row, fields.close),
            volume: scaled(row, fields.volume),
            amount: scaled(row, fields.amount),
        });
    }

    if dropped > 0 {
        log::warn!("{source} bar frame dropped {dropped} record(s) without a trade date");
    }

    out.sort_by_key(|bar| bar.date);
    out.dedup_by_key(|bar| bar.date);
    Ok(out)
}

/// Normalize the first record of a quote frame onto the canonical quote.
pub fn quote(
    source: SourceId,
    frame: &RawFrame,
    code: &StockCode,
) -> Result<Quote, NormalizeError> {
    let fields = quote_fields(source);
    let row = frame.rows.first().ok_or(NormalizeError::NoUsableRecords {
        operation: Operation::Quote,
    })?;

    let price = numeric(row, fields.price.key)
        .map(|value| value * fields.price.scale)
        .ok_or(NormalizeError::MissingField {
            field: fields.price.key,
        })?;

    let pre_close = scaled(row, fields.pre_close);
    let change_amount = match fields.change_amount {
        Some(field) => scaled(row, field),
        None => price - pre_close,
    };
    let change_pct = match fields.change_pct {
        Some(field) => scaled(row, field),
        None if pre_close > 0.0 => (price - pre_close) / pre_close * 100.0,
        None => 0.0,
    };

    let timestamp = fields
        .timestamp
        .and_then(|key| text(row, key))
        .and_then(|raw| UtcDateTime::parse_lenient(&raw).ok())
        .unwrap_or_else(UtcDateTime::now);

    Ok(Quote {
        code: code.clone(),
        name: fields
            .name
            .and_then(|key| text(row, key))
            .unwrap_or_default(),
        price,
        change_pct,
        change_amount,
        open: scaled(row, fields.open),
        high: scaled(row, fields.high),
        low: scaled(row, fields.low),
        pre_close,
        volume: scaled(row, fields.volume),
        amount: scaled(row, fields.amount),
        turnover_rate: fields
            .turnover_rate
            .map(|field| scaled(row, field))
            .unwrap_or(0.0),
        timestamp,
        source,
    })
}

/// Normalize financial statement rows: the report period is required per
/// record, every other numeric column becomes a metric.
pub fn financials(
    source: SourceId,
    frame: &RawFrame,
    code: &StockCode,
    kind: StatementKind,
) -> Result<FinancialStatement, NormalizeError> {
    let period = period_key(source)?;
    let mut rows = Vec::with_capacity(frame.len());
    let mut dropped = 0_usize;

    for record in &frame.rows {
        let Some(raw_period) = text(record, period) else {
            dropped += 1;
            continue;
        };

        let mut values = BTreeMap::new();
        for key in record.keys() {
            if key == period || IDENTIFIER_KEYS.contains(&key.as_str()) {
                continue;
            }
            if let Some(value) = numeric(record, key) {
                values.insert(key.clone(), value);
            }
        }

        rows.push(StatementRow {
            period: raw_period,
            values,
        });
    }

    if dropped > 0 {
        log::warn!("{source} {kind} frame dropped {dropped} record(s) without a report period");
    }

    // Oldest first, matching the bar convention.
    rows.sort_by(|left, right| left.period.cmp(&right.period));

    Ok(FinancialStatement {
        code: code.clone(),
        kind,
        rows,
    })
}
