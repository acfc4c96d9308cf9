use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const CODE_LEN: usize = 6;

/// Validated six-digit A-share stock code (e.g. "600519", "000001").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StockCode(String);

impl StockCode {
    /// Parse and validate a bare six-digit code.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyCode);
        }

        if trimmed.len() != CODE_LEN || !trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(ValidationError::InvalidStockCode {
                value: trimmed.to_owned(),
            });
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exchange suffix inferred from the code prefix.
    ///
    /// 6xxxxx trades on Shanghai, 0xxxxx/3xxxxx on Shenzhen,
    /// 4xxxxx/8xxxxx on the Beijing exchange.
    pub fn exchange_suffix(&self) -> &'static str {
        match self.0.as_bytes()[0] {
            b'6' => ".SH",
            b'0' | b'3' => ".SZ",
            b'4' | b'8' => ".BJ",
            _ => ".SZ",
        }
    }

    /// Suffixed form required by the tushare API (e.g. "600519.SH").
    pub fn ts_code(&self) -> String {
        format!("{}{}", self.0, self.exchange_suffix())
    }
}

impl Display for StockCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for StockCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for StockCode {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<StockCode> for String {
    fn from(value: StockCode) -> Self {
        value.0
    }
}
