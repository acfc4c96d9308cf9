//! Stateless technical indicator engine over daily bar history.
//!
//! Every value is recomputed from the full input series on each call; no
//! state carries over between invocations. Inputs must hold at least
//! [`MIN_BARS`] bars so the 60-day moving average is well defined.

use thiserror::Error;

use crate::domain::Bar;

/// Minimum history needed for the slowest moving average.
pub const MIN_BARS: usize = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndicatorError {
    #[error("indicator computation needs at least {min} bars, got {len}")]
    InsufficientData { len: usize, min: usize },
}

/// Moving average convergence/divergence, 12/26/9 parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Macd {
    pub dif: f64,
    pub dea: f64,
    pub hist: f64,
}

/// Relative strength index at the three conventional A-share horizons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rsi {
    pub rsi6: f64,
    pub rsi12: f64,
    pub rsi24: f64,
}

/// Stochastic oscillator, 9/3/3 parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kdj {
    pub k: f64,
    pub d: f64,
    pub j: f64,
}

/// Where the last close sits relative to the Bollinger bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollPosition {
    AboveUpper,
    AboveMid,
    BelowMid,
    BelowLower,
}

/// Bollinger bands, 20-day window with 2 standard deviations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bollinger {
    pub upper: f64,
    pub mid: f64,
    pub lower: f64,
    pub position: BollPosition,
}

/// Direction read off the moving-average stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Sideways,
}

/// All indicators for the final bar of the series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSnapshot {
    pub ma5: f64,
    pub ma20: f64,
    pub ma60: f64,
    pub trend: Trend,
    pub macd: Macd,
    pub rsi: Rsi,
    pub kdj: Kdj,
    pub bollinger: Bollinger,
    pub volume_ratio: f64,
}

/// Computes the full indicator set for the last bar of an
/// ascending-by-date series.
pub fn compute(bars: &[Bar]) -> Result<IndicatorSnapshot, IndicatorError> {
    if bars.len() < MIN_BARS {
        return Err(IndicatorError::InsufficientData {
            len: bars.len(),
            min: MIN_BARS,
        });
    }

    let closes: Vec<f64> = bars.iter().map(|bar| bar.close).collect();
    let last_close = closes[closes.len() - 1];

    let ma5 = tail_mean(&closes, 5);
    let ma20 = tail_mean(&closes, 20);
    let ma60 = tail_mean(&closes, 60);

    Ok(IndicatorSnapshot {
        ma5,
        ma20,
        ma60,
        trend: trend(last_close, ma5, ma20, ma60),
        macd: macd(&closes),
        rsi: Rsi {
            rsi6: rsi(&closes, 6),
            rsi12: rsi(&closes, 12),
            rsi24: rsi(&closes, 24),
        },
        kdj: kdj(bars),
        bollinger: bollinger(&closes, last_close),
        volume_ratio: volume_ratio(bars),
    })
}

fn tail_mean(values: &[f64], window: usize) -> f64 {
    let tail = &values[values.len() - window..];
    tail.iter().sum::<f64>() / window as f64
}

/// Exponential moving average over the whole series, seeded from the
/// first value with alpha = 2 / (period + 1).
fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut current = values[0];
    out.push(current);
    for value in &values[1..] {
        current = alpha * value + (1.0 - alpha) * current;
        out.push(current);
    }
    out
}

fn macd(closes: &[f64]) -> Macd {
    let ema12 = ema_series(closes, 12);
    let ema26 = ema_series(closes, 26);
    let dif: Vec<f64> = ema12
        .iter()
        .zip(&ema26)
        .map(|(fast, slow)| fast - slow)
        .collect();
    let dea = ema_series(&dif, 9);

    let last_dif = dif[dif.len() - 1];
    let last_dea = dea[dea.len() - 1];
    Macd {
        dif: last_dif,
        dea: last_dea,
        hist: 2.0 * (last_dif - last_dea),
    }
}

/// Simple-mean RSI over the last `period` close-to-close changes. A zero
/// average loss reads as full strength, including perfectly flat series.
fn rsi(closes: &[f64], period: usize) -> f64 {
    let changes: Vec<f64> = closes.windows(2).map(|pair| pair[1] - pair[0]).collect();
    let tail = &changes[changes.len() - period..];

    let avg_gain = tail.iter().filter(|change| **change > 0.0).sum::<f64>() / period as f64;
    let avg_loss = -tail.iter().filter(|change| **change < 0.0).sum::<f64>() / period as f64;

    if avg_loss == 0.0 {
        return 100.0;
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

/// KDJ(9,3,3). RSV uses full 9-bar windows only; K and D are exponential
/// means with alpha = 1/3 seeded from the first RSV.
fn kdj(bars: &[Bar]) -> Kdj {
    const WINDOW: usize = 9;
    const ALPHA: f64 = 1.0 / 3.0;

    let mut k = 0.0;
    let mut d = 0.0;
    let mut seeded = false;

    for end in WINDOW..=bars.len() {
        let window = &bars[end - WINDOW..end];
        let close = window[WINDOW - 1].close;
        let low = window.iter().map(|bar| bar.low).fold(f64::INFINITY, f64::min);
        let high = window
            .iter()
            .map(|bar| bar.high)
            .fold(f64::NEG_INFINITY, f64::max);

        // Flat nine-day range carries no signal.
        let rsv = if high == low {
            50.0
        } else {
            (close - low) / (high - low) * 100.0
        };

        if seeded {
            k = ALPHA * rsv + (1.0 - ALPHA) * k;
            d = ALPHA * k + (1.0 - ALPHA) * d;
        } else {
            k = rsv;
            d = k;
            seeded = true;
        }
    }

    Kdj {
        k,
        d,
        j: 3.0 * k - 2.0 * d,
    }
}

fn bollinger(closes: &[f64], last_close: f64) -> Bollinger {
    const WINDOW: usize = 20;

    let tail = &closes[closes.len() - WINDOW..];
    let mid = tail.iter().sum::<f64>() / WINDOW as f64;
    let variance = tail
        .iter()
        .map(|close| (close - mid).powi(2))
        .sum::<f64>()
        / (WINDOW as f64 - 1.0);
    let band = 2.0 * variance.sqrt();
    let upper = mid + band;
    let lower = mid - band;

    // Touching a band already counts as overbought/oversold.
    let position = if last_close >= upper {
        BollPosition::AboveUpper
    } else if last_close <= lower {
        BollPosition::BelowLower
    } else if last_close > mid {
        BollPosition::AboveMid
    } else {
        BollPosition::BelowMid
    };

    Bollinger {
        upper,
        mid,
        lower,
        position,
    }
}

/// Trend requires a strict ordering of close over the whole MA stack in
/// either direction; anything else is sideways.
fn trend(close: f64, ma5: f64, ma20: f64, ma60: f64) -> Trend {
    if close > ma5 && ma5 > ma20 && ma20 > ma60 {
        Trend::Up
    } else if close < ma5 && ma5 < ma20 && ma20 < ma60 {
        Trend::Down
    } else {
        Trend::Sideways
    }
}

/// Last day's volume against the trailing five-day mean. A zero mean
/// (suspended stock) reads as neutral.
fn volume_ratio(bars: &[Bar]) -> f64 {
    let tail = &bars[bars.len() - 5..];
    let avg = tail.iter().map(|bar| bar.volume).sum::<f64>() / 5.0;
    if avg == 0.0 {
        return 1.0;
    }
    bars[bars.len() - 1].volume / avg
}
