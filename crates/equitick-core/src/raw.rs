//! Provider-native record frames.
//!
//! Adapters return data in the shape the upstream API produced it;
//! the normalizer maps it onto canonical types afterwards.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One provider-native record: field names and units as the source sent them.
pub type RawRecord = Map<String, Value>;

/// Ordered batch of provider-native records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    pub rows: Vec<RawRecord>,
}

impl RawFrame {
    pub fn new(rows: Vec<RawRecord>) -> Self {
        Self { rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl From<Vec<RawRecord>> for RawFrame {
    fn from(rows: Vec<RawRecord>) -> Self {
        Self::new(rows)
    }
}
