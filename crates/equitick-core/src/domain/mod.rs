//! Canonical domain types shared by all sources.

mod code;
mod date;
mod models;

pub use code::StockCode;
pub use date::{DateRange, TradeDate, UtcDateTime};
pub use models::{Adjust, Bar, FinancialStatement, Quote, StatementKind, StatementRow};
