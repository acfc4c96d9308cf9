//! Behavior-driven tests for cross-source schema normalization.
//!
//! Each source speaks its own column names and units; these tests pin
//! the canonical output: dates as trade dates, volume in shares, amount
//! in yuan, series ascending and deduplicated.

use equitick_core::normalize;
use equitick_core::{RawFrame, RawRecord, SourceId, StatementKind, StockCode};
use equitick_tests::{assert_approx, eastmoney_quote_row, tdx_bar_row};
use serde_json::{Map, Value};

fn code() -> StockCode {
    StockCode::parse("600519").expect("valid code")
}

fn tushare_bar_row(trade_date: &str, close: f64, vol_lots: f64, amount_thousands: f64) -> RawRecord {
    let mut row = Map::new();
    row.insert("ts_code".into(), Value::from("600519.SH"));
    row.insert("trade_date".into(), Value::from(trade_date));
    row.insert("open".into(), Value::from(close - 0.2));
    row.insert("high".into(), Value::from(close + 0.3));
    row.insert("low".into(), Value::from(close - 0.4));
    row.insert("close".into(), Value::from(close));
    row.insert("vol".into(), Value::from(vol_lots));
    row.insert("amount".into(), Value::from(amount_thousands));
    row
}

fn eastmoney_bar_row(date: &str, close: f64, vol_lots: f64) -> RawRecord {
    let mut row = Map::new();
    row.insert("日期".into(), Value::from(date));
    row.insert("开盘".into(), Value::from(close - 0.1));
    row.insert("最高".into(), Value::from(close + 0.2));
    row.insert("最低".into(), Value::from(close - 0.2));
    row.insert("收盘".into(), Value::from(close));
    row.insert("成交量".into(), Value::from(vol_lots));
    row.insert("成交额".into(), Value::from(close * vol_lots * 100.0));
    row
}

// =============================================================================
// Units: Every Source Lands on Shares and Yuan
// =============================================================================

#[test]
fn tdx_volume_in_lots_becomes_shares() {
    let frame = RawFrame::new(vec![tdx_bar_row("2024-01-02", 10.0, 300.0)]);
    let bars = normalize::bars(SourceId::Tdx, &frame).expect("normalizes");
    assert_approx(bars[0].volume, 30_000.0);
}

#[test]
fn eastmoney_volume_in_lots_becomes_shares() {
    let frame = RawFrame::new(vec![eastmoney_bar_row("2024-01-02", 10.0, 450.0)]);
    let bars = normalize::bars(SourceId::Eastmoney, &frame).expect("normalizes");
    assert_approx(bars[0].volume, 45_000.0);
}

#[test]
fn tushare_amount_in_thousand_yuan_becomes_yuan() {
    let frame = RawFrame::new(vec![tushare_bar_row("20240102", 10.0, 300.0, 306.0)]);
    let bars = normalize::bars(SourceId::Tushare, &frame).expect("normalizes");
    assert_approx(bars[0].volume, 30_000.0);
    assert_approx(bars[0].amount, 306_000.0);
}

// =============================================================================
// Series Shape: Ascending, Deduplicated, Tolerant of Bad Rows
// =============================================================================

#[test]
fn newest_first_frames_come_out_ascending() {
    let frame = RawFrame::new(vec![
        tushare_bar_row("20240105", 11.0, 100.0, 110.0),
        tushare_bar_row("20240104", 10.5, 100.0, 105.0),
        tushare_bar_row("20240103", 10.0, 100.0, 100.0),
    ]);
    let bars = normalize::bars(SourceId::Tushare, &frame).expect("normalizes");

    assert_eq!(bars.len(), 3);
    assert!(bars[0].date < bars[1].date && bars[1].date < bars[2].date);
    assert_approx(bars[0].close, 10.0);
    assert_approx(bars[2].close, 11.0);
}

#[test]
fn duplicate_dates_keep_the_first_occurrence() {
    let frame = RawFrame::new(vec![
        tdx_bar_row("2024-01-02", 10.0, 100.0),
        tdx_bar_row("2024-01-02", 99.0, 100.0),
        tdx_bar_row("2024-01-03", 10.5, 100.0),
    ]);
    let bars = normalize::bars(SourceId::Tdx, &frame).expect("normalizes");

    assert_eq!(bars.len(), 2);
    assert_approx(bars[0].close, 10.0);
}

#[test]
fn rows_without_a_trade_date_are_dropped_not_fatal() {
    let mut dateless = tdx_bar_row("2024-01-02", 10.0, 100.0);
    dateless.remove("date");
    let frame = RawFrame::new(vec![dateless, tdx_bar_row("2024-01-03", 10.5, 100.0)]);

    let bars = normalize::bars(SourceId::Tdx, &frame).expect("normalizes");
    assert_eq!(bars.len(), 1);
    assert_approx(bars[0].close, 10.5);
}

// =============================================================================
// Quotes
// =============================================================================

#[test]
fn eastmoney_quote_maps_chinese_columns_to_canonical_fields() {
    let frame = RawFrame::new(vec![eastmoney_quote_row("600519", 10.5)]);
    let quote = normalize::quote(SourceId::Eastmoney, &frame, &code()).expect("normalizes");

    assert_eq!(quote.code.as_str(), "600519");
    assert_approx(quote.price, 10.5);
    assert_approx(quote.pre_close, 10.35);
    assert_approx(quote.volume, 5_000_000.0);
    assert_eq!(quote.source, SourceId::Eastmoney);
}

#[test]
fn tdx_quote_derives_change_from_the_previous_close() {
    let mut row = Map::new();
    row.insert("code".into(), Value::from("600519"));
    row.insert("price".into(), Value::from(10.5));
    row.insert("last_close".into(), Value::from(10.0));
    row.insert("open".into(), Value::from(10.1));
    row.insert("high".into(), Value::from(10.6));
    row.insert("low".into(), Value::from(9.9));
    row.insert("vol".into(), Value::from(400.0));
    row.insert("amount".into(), Value::from(420_000.0));

    let quote =
        normalize::quote(SourceId::Tdx, &RawFrame::new(vec![row]), &code()).expect("normalizes");
    assert_approx(quote.change_amount, 0.5);
    assert_approx(quote.change_pct, 5.0);
}

// =============================================================================
// Financial Statements
// =============================================================================

#[test]
fn statement_rows_sort_by_period_and_keep_numeric_metrics() {
    let mut newer = Map::new();
    newer.insert("报告期".into(), Value::from("2024-06-30"));
    newer.insert("营业收入".into(), Value::from(2.0e8));
    let mut older = Map::new();
    older.insert("报告期".into(), Value::from("2024-03-31"));
    older.insert("营业收入".into(), Value::from(1.0e8));

    let statement = normalize::financials(
        SourceId::Eastmoney,
        &RawFrame::new(vec![newer, older]),
        &code(),
        StatementKind::Income,
    )
    .expect("normalizes");

    assert_eq!(statement.rows.len(), 2);
    assert_eq!(statement.rows[0].period, "2024-03-31");
    assert_approx(statement.rows[0].values["营业收入"], 1.0e8);
    assert_eq!(statement.rows[1].period, "2024-06-30");
}
