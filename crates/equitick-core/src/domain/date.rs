use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::{Date, Month, OffsetDateTime, UtcOffset};

use crate::ValidationError;

/// Calendar trade date, formatted compact (`YYYYMMDD`) on the wire.
///
/// Accepts both the compact form used by tushare/tdx and the dashed
/// `YYYY-MM-DD` form used by eastmoney frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TradeDate(Date);

impl TradeDate {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let digits: String = match trimmed.len() {
            8 => trimmed.to_owned(),
            10 if trimmed.as_bytes()[4] == b'-' && trimmed.as_bytes()[7] == b'-' => {
                trimmed.chars().filter(|ch| *ch != '-').collect()
            }
            _ => {
                return Err(ValidationError::InvalidTradeDate {
                    value: trimmed.to_owned(),
                })
            }
        };

        if digits.len() != 8 || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(ValidationError::InvalidTradeDate {
                value: trimmed.to_owned(),
            });
        }

        let invalid = || ValidationError::InvalidTradeDate {
            value: trimmed.to_owned(),
        };
        let year: i32 = digits[..4].parse().map_err(|_| invalid())?;
        let month: u8 = digits[4..6].parse().map_err(|_| invalid())?;
        let day: u8 = digits[6..8].parse().map_err(|_| invalid())?;

        let month = Month::try_from(month).map_err(|_| invalid())?;
        let date = Date::from_calendar_date(year, month, day).map_err(|_| invalid())?;
        Ok(Self(date))
    }

    pub fn today() -> Self {
        Self(OffsetDateTime::now_utc().date())
    }

    pub fn as_date(self) -> Date {
        self.0
    }

    /// Compact `YYYYMMDD` form.
    pub fn format_compact(self) -> String {
        format!(
            "{:04}{:02}{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day()
        )
    }

    /// Midnight UTC instant for this date.
    pub fn midnight_utc(self) -> OffsetDateTime {
        self.0.midnight().assume_utc()
    }
}

impl From<Date> for TradeDate {
    fn from(value: Date) -> Self {
        Self(value)
    }
}

impl Display for TradeDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_compact())
    }
}

impl Serialize for TradeDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_compact())
    }
}

impl<'de> Deserialize<'de> for TradeDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

/// Inclusive trade-date window for history requests.
///
/// An absent start means "as far back as the source goes"; the end
/// defaults to today when omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<TradeDate>,
    pub end: TradeDate,
}

impl DateRange {
    pub fn new(start: Option<TradeDate>, end: Option<TradeDate>) -> Result<Self, ValidationError> {
        let end = end.unwrap_or_else(TradeDate::today);
        if let Some(start) = start {
            if start > end {
                return Err(ValidationError::InvertedDateRange {
                    start: start.format_compact(),
                    end: end.format_compact(),
                });
            }
        }
        Ok(Self { start, end })
    }

    /// Window covering the `days` calendar days up to today.
    pub fn trailing_days(days: i64) -> Self {
        let end = TradeDate::today();
        let start = end.as_date().saturating_sub(time::Duration::days(days));
        Self {
            start: Some(TradeDate::from(start)),
            end,
        }
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self {
            start: None,
            end: TradeDate::today(),
        }
    }
}

/// RFC3339 timestamp guaranteed to be UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let parsed = OffsetDateTime::parse(input, &Rfc3339).map_err(|_| {
            ValidationError::TimestampNotUtc {
                value: input.to_owned(),
            }
        })?;

        Self::from_offset_datetime(parsed).map_err(|_| ValidationError::TimestampNotUtc {
            value: input.to_owned(),
        })
    }

    /// Lenient parse for provider timestamps: RFC3339, or either trade-date
    /// form taken as midnight UTC.
    pub fn parse_lenient(input: &str) -> Result<Self, ValidationError> {
        if let Ok(parsed) = Self::parse(input) {
            return Ok(parsed);
        }
        let date = TradeDate::parse(input).map_err(|_| ValidationError::TimestampNotUtc {
            value: input.to_owned(),
        })?;
        Ok(Self(date.midnight_utc()))
    }

    pub fn from_offset_datetime(value: OffsetDateTime) -> Result<Self, ValidationError> {
        if value.offset() != UtcOffset::UTC {
            return Err(ValidationError::TimestampNotUtc {
                value: value
                    .format(&Rfc3339)
                    .unwrap_or_else(|_| String::from("<unformattable>")),
            });
        }

        Ok(Self(value))
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .unwrap_or_else(|_| String::from("<unformattable>"))
    }

    /// Age of this instant relative to now. Future instants report zero.
    pub fn age(self) -> std::time::Duration {
        let delta = OffsetDateTime::now_utc() - self.0;
        delta.try_into().unwrap_or(std::time::Duration::ZERO)
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for UtcDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compact_trade_date() {
        let parsed = TradeDate::parse("20240102").expect("must parse");
        assert_eq!(parsed.format_compact(), "20240102");
    }

    #[test]
    fn parses_dashed_trade_date() {
        let parsed = TradeDate::parse("2024-01-02").expect("must parse");
        assert_eq!(parsed.format_compact(), "20240102");
    }

    #[test]
    fn rejects_malformed_trade_date() {
        assert!(TradeDate::parse("2024/01/02").is_err());
        assert!(TradeDate::parse("20241340").is_err());
        assert!(TradeDate::parse("abc").is_err());
    }

    #[test]
    fn trade_dates_order_chronologically() {
        let earlier = TradeDate::parse("20231229").unwrap();
        let later = TradeDate::parse("20240102").unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn range_end_defaults_to_today() {
        let range = DateRange::new(None, None).expect("must build");
        assert_eq!(range.end, TradeDate::today());
        assert!(range.start.is_none());
    }

    #[test]
    fn range_rejects_inverted_bounds() {
        let start = TradeDate::parse("20240301").unwrap();
        let end = TradeDate::parse("20240101").unwrap();
        let err = DateRange::new(Some(start), Some(end)).expect_err("must fail");
        assert!(matches!(err, ValidationError::InvertedDateRange { .. }));
    }

    #[test]
    fn parses_utc_timestamp() {
        let parsed = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("must parse");
        assert_eq!(parsed.format_rfc3339(), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn rejects_non_utc_timestamp() {
        let err = UtcDateTime::parse("2024-01-01T01:00:00+01:00").expect_err("must fail");
        assert!(matches!(err, ValidationError::TimestampNotUtc { .. }));
    }

    #[test]
    fn lenient_parse_accepts_compact_date() {
        let parsed = UtcDateTime::parse_lenient("20240102").expect("must parse");
        assert_eq!(parsed.format_rfc3339(), "2024-01-02T00:00:00Z");
    }
}
