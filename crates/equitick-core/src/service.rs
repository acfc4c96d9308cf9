//! High-level market data facade.
//!
//! Wraps the fallback orchestrator with best-effort snapshot persistence:
//! every live success is written to the store, and when the whole chain
//! is unavailable the most recent snapshot is served instead, provided
//! it is younger than the staleness window.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::cache::SnapshotStore;
use crate::domain::{Adjust, Bar, DateRange, FinancialStatement, Quote, StatementKind, TradeDate};
use crate::indicators::{self, IndicatorError, IndicatorSnapshot};
use crate::orchestrator::{FailureKind, FallbackOrchestrator, FetchFailure};
use crate::provider::SourceId;

/// Default window after which a snapshot is too old to serve.
pub const DEFAULT_STALENESS: Duration = Duration::from_secs(24 * 60 * 60);

/// History depth fetched for indicator computation; generous against
/// the 60-bar minimum to absorb non-trading days.
const INDICATOR_LOOKBACK_DAYS: i64 = 250;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Fetch(#[from] FetchFailure),
    #[error(transparent)]
    Indicator(#[from] IndicatorError),
}

/// A response plus where it came from.
#[derive(Debug, Clone)]
pub struct Served<T> {
    pub data: T,
    /// Live source, or `None` when served from a snapshot.
    pub source: Option<SourceId>,
    pub from_cache: bool,
}

impl<T> Served<T> {
    fn live(data: T, source: SourceId) -> Self {
        Self {
            data,
            source: Some(source),
            from_cache: false,
        }
    }

    fn cached(data: T) -> Self {
        Self {
            data,
            source: None,
            from_cache: true,
        }
    }
}

/// Orchestrated acquisition with snapshot fallback.
pub struct MarketData {
    orchestrator: FallbackOrchestrator,
    store: Option<Arc<dyn SnapshotStore>>,
    staleness: Duration,
}

impl MarketData {
    pub fn new(orchestrator: FallbackOrchestrator) -> Self {
        Self {
            orchestrator,
            store: None,
            staleness: DEFAULT_STALENESS,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_staleness(mut self, staleness: Duration) -> Self {
        self.staleness = staleness;
        self
    }

    /// Latest quote, falling back to the most recent snapshot when the
    /// whole chain is down.
    pub async fn quote(&self, symbol: &str) -> Result<Served<Quote>, ServiceError> {
        let domain = format!("quote:{symbol}");
        match self.orchestrator.quote(symbol).await {
            Ok(success) => {
                self.persist(&domain, TradeDate::today(), &success.data);
                Ok(Served::live(success.data, success.source))
            }
            Err(failure) => self.recover(&domain, failure),
        }
    }

    /// Daily bar history in canonical units, ascending by date.
    pub async fn daily_bars(
        &self,
        symbol: &str,
        range: DateRange,
        adjust: Adjust,
    ) -> Result<Served<Vec<Bar>>, ServiceError> {
        let domain = format!("daily:{symbol}:{}", adjust.as_str());
        match self.orchestrator.bars(symbol, range, adjust).await {
            Ok(success) => {
                let date = success
                    .data
                    .last()
                    .map(|bar| bar.date)
                    .unwrap_or_else(TradeDate::today);
                self.persist(&domain, date, &success.data);
                Ok(Served::live(success.data, success.source))
            }
            Err(failure) => self.recover(&domain, failure),
        }
    }

    /// Financial statement rows, most recent periods last.
    pub async fn financials(
        &self,
        symbol: &str,
        kind: StatementKind,
    ) -> Result<Served<FinancialStatement>, ServiceError> {
        let domain = format!("financials:{symbol}:{kind}");
        match self.orchestrator.financials(symbol, kind).await {
            Ok(success) => {
                self.persist(&domain, TradeDate::today(), &success.data);
                Ok(Served::live(success.data, success.source))
            }
            Err(failure) => self.recover(&domain, failure),
        }
    }

    /// Technical indicators over forward-adjusted daily history.
    pub async fn indicators(&self, symbol: &str) -> Result<Served<IndicatorSnapshot>, ServiceError> {
        let bars = self
            .daily_bars(
                symbol,
                DateRange::trailing_days(INDICATOR_LOOKBACK_DAYS),
                Adjust::Forward,
            )
            .await?;

        let snapshot = indicators::compute(&bars.data)?;
        Ok(Served {
            data: snapshot,
            source: bars.source,
            from_cache: bars.from_cache,
        })
    }

    /// Failed snapshot writes must never fail the fetch.
    fn persist<T: serde::Serialize>(&self, domain: &str, date: TradeDate, data: &T) {
        let Some(store) = &self.store else {
            return;
        };
        let payload = match serde_json::to_value(data) {
            Ok(payload) => payload,
            Err(error) => {
                log::warn!("snapshot for '{domain}' failed to serialize: {error}");
                return;
            }
        };
        if let Err(error) = store.save_snapshot(domain, date, &payload) {
            log::warn!("snapshot for '{domain}' failed to persist: {error}");
        }
    }

    fn recover<T: serde::de::DeserializeOwned>(
        &self,
        domain: &str,
        failure: FetchFailure,
    ) -> Result<Served<T>, ServiceError> {
        // Bad input never falls back to stale data.
        if failure.kind != FailureKind::Unavailable {
            return Err(failure.into());
        }
        let Some(store) = &self.store else {
            return Err(failure.into());
        };

        let record = match store.latest(domain) {
            Ok(Some(record)) => record,
            Ok(None) => return Err(failure.into()),
            Err(error) => {
                log::warn!("snapshot lookup for '{domain}' failed: {error}");
                return Err(failure.into());
            }
        };

        if record.saved_at.age() > self.staleness {
            log::warn!(
                "snapshot for '{domain}' is older than {}s, not serving it",
                self.staleness.as_secs()
            );
            return Err(failure.into());
        }

        match serde_json::from_value(record.payload) {
            Ok(data) => {
                log::warn!("all sources down, serving '{domain}' from snapshot");
                Ok(Served::cached(data))
            }
            Err(error) => {
                log::warn!("snapshot for '{domain}' failed to deserialize: {error}");
                Err(failure.into())
            }
        }
    }
}
