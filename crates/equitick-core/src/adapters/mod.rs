//! Source adapters (tdx relay, eastmoney, tushare).

mod eastmoney;
mod tdx;
mod tushare;

pub use eastmoney::EastmoneyAdapter;
pub use tdx::TdxAdapter;
pub use tushare::TushareAdapter;

use crate::domain::{DateRange, StockCode, TradeDate};
use crate::provider::{ProviderError, SourceId};
use crate::raw::RawRecord;

/// Stable per-code seed for deterministic offline payloads.
pub(crate) fn code_seed(code: &StockCode) -> u64 {
    code.as_str().bytes().fold(13_u64, |acc, byte| {
        acc.wrapping_mul(29).wrapping_add(byte as u64)
    })
}

/// Parse a row-oriented JSON payload: either a bare array of objects or an
/// object wrapping the array under `rows`.
pub(crate) fn parse_object_rows(
    source: SourceId,
    body: &str,
) -> Result<Vec<RawRecord>, ProviderError> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|error| {
        ProviderError::internal(format!("{source} returned malformed JSON: {error}"))
    })?;

    let rows = match value {
        serde_json::Value::Array(rows) => rows,
        serde_json::Value::Object(mut object) => match object.remove("rows") {
            Some(serde_json::Value::Array(rows)) => rows,
            _ => {
                return Err(ProviderError::internal(format!(
                    "{source} payload has no row array"
                )))
            }
        },
        _ => {
            return Err(ProviderError::internal(format!(
                "{source} payload has no row array"
            )))
        }
    };

    rows.into_iter()
        .map(|row| match row {
            serde_json::Value::Object(record) => Ok(record),
            other => Err(ProviderError::internal(format!(
                "{source} row is not an object: {other}"
            ))),
        })
        .collect()
}

/// Ascending calendar dates ending at the range end, capped at `max`.
pub(crate) fn sample_dates(range: &DateRange, max: usize) -> Vec<TradeDate> {
    let count = match range.start {
        Some(start) => {
            let days = (range.end.as_date() - start.as_date()).whole_days();
            (days + 1).clamp(1, max as i64) as usize
        }
        None => max,
    };

    (0..count)
        .map(|index| {
            let offset = time::Duration::days((count - 1 - index) as i64);
            TradeDate::from(range.end.as_date().saturating_sub(offset))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_is_stable_per_code() {
        let a = StockCode::parse("600519").unwrap();
        let b = StockCode::parse("000001").unwrap();
        assert_eq!(code_seed(&a), code_seed(&a));
        assert_ne!(code_seed(&a), code_seed(&b));
    }
}
