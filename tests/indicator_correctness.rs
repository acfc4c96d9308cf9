//! Mathematical correctness of the indicator engine on known series.

use equitick_core::indicators::{self, BollPosition, IndicatorError, Trend};
use equitick_tests::{assert_approx, make_bars};

// =============================================================================
// Input Validation
// =============================================================================

#[test]
fn fewer_than_sixty_bars_is_rejected_with_the_exact_counts() {
    let bars = make_bars(&vec![10.0; 59]);
    let error = indicators::compute(&bars).expect_err("59 bars must be rejected");
    assert_eq!(error, IndicatorError::InsufficientData { len: 59, min: 60 });
}

#[test]
fn exactly_sixty_bars_is_accepted() {
    let bars = make_bars(&vec![10.0; 60]);
    assert!(indicators::compute(&bars).is_ok());
}

// =============================================================================
// Moving Averages and Trend
// =============================================================================

#[test]
fn moving_averages_on_a_linear_ramp_match_hand_computation() {
    let closes: Vec<f64> = (1..=60).map(f64::from).collect();
    let snapshot = indicators::compute(&make_bars(&closes)).expect("enough bars");

    assert_approx(snapshot.ma5, 58.0);
    assert_approx(snapshot.ma20, 50.5);
    assert_approx(snapshot.ma60, 30.5);
    assert_eq!(snapshot.trend, Trend::Up);
}

#[test]
fn a_single_break_in_the_ma_stack_reads_sideways() {
    // Rising for 59 days, then one hard sell-off under the 5-day mean.
    let mut closes: Vec<f64> = (1..=60).map(f64::from).collect();
    closes[59] = 40.0;
    let snapshot = indicators::compute(&make_bars(&closes)).expect("enough bars");

    assert_eq!(snapshot.trend, Trend::Sideways);
}

// =============================================================================
// Oscillators
// =============================================================================

#[test]
fn rsi_stays_within_bounds_on_a_noisy_series() {
    let closes: Vec<f64> = (0..60)
        .map(|index| 20.0 + ((index * 7) % 11) as f64 - 5.0)
        .collect();
    let snapshot = indicators::compute(&make_bars(&closes)).expect("enough bars");

    for rsi in [snapshot.rsi.rsi6, snapshot.rsi.rsi12, snapshot.rsi.rsi24] {
        assert!((0.0..=100.0).contains(&rsi), "rsi out of range: {rsi}");
    }
}

#[test]
fn rsi_is_full_strength_when_there_are_no_losses() {
    let closes: Vec<f64> = (1..=60).map(f64::from).collect();
    let snapshot = indicators::compute(&make_bars(&closes)).expect("enough bars");
    assert_approx(snapshot.rsi.rsi6, 100.0);
    assert_approx(snapshot.rsi.rsi24, 100.0);
}

#[test]
fn macd_histogram_is_twice_the_dif_dea_spread() {
    let closes: Vec<f64> = (0..60)
        .map(|index| 15.0 + (index as f64 / 6.0).sin() * 2.0)
        .collect();
    let snapshot = indicators::compute(&make_bars(&closes)).expect("enough bars");

    assert_approx(
        snapshot.macd.hist,
        2.0 * (snapshot.macd.dif - snapshot.macd.dea),
    );
}

#[test]
fn kdj_on_a_flat_series_sits_at_the_midpoint() {
    let snapshot = indicators::compute(&make_bars(&vec![10.0; 60])).expect("enough bars");
    assert_approx(snapshot.kdj.k, 50.0);
    assert_approx(snapshot.kdj.d, 50.0);
    assert_approx(snapshot.kdj.j, 50.0);
}

#[test]
fn kdj_j_follows_its_defining_identity() {
    let closes: Vec<f64> = (0..60)
        .map(|index| 30.0 + ((index * 13) % 17) as f64)
        .collect();
    let snapshot = indicators::compute(&make_bars(&closes)).expect("enough bars");
    assert_approx(snapshot.kdj.j, 3.0 * snapshot.kdj.k - 2.0 * snapshot.kdj.d);
}

// =============================================================================
// Bollinger Bands
// =============================================================================

#[test]
fn bollinger_bands_are_symmetric_around_the_mid() {
    let closes: Vec<f64> = (0..60)
        .map(|index| 25.0 + ((index * 3) % 7) as f64)
        .collect();
    let snapshot = indicators::compute(&make_bars(&closes)).expect("enough bars");

    assert!(snapshot.bollinger.upper > snapshot.bollinger.mid);
    assert!(snapshot.bollinger.mid > snapshot.bollinger.lower);
    assert_approx(
        snapshot.bollinger.upper - snapshot.bollinger.mid,
        snapshot.bollinger.mid - snapshot.bollinger.lower,
    );
}

#[test]
fn a_flat_series_collapses_the_bands_onto_the_mid() {
    let snapshot = indicators::compute(&make_bars(&vec![12.0; 60])).expect("enough bars");
    assert_approx(snapshot.bollinger.upper, 12.0);
    assert_approx(snapshot.bollinger.lower, 12.0);
    // A close touching the upper band counts as overbought, and with the
    // bands collapsed the close touches both at once.
    assert_eq!(snapshot.bollinger.position, BollPosition::AboveUpper);
}

// =============================================================================
// Volume
// =============================================================================

#[test]
fn volume_ratio_flags_a_spike_against_the_recent_mean() {
    let mut bars = make_bars(&vec![10.0; 60]);
    bars[59].volume = 5_000.0;
    let snapshot = indicators::compute(&bars).expect("enough bars");

    // 5000 against a trailing-five mean of (4 * 1000 + 5000) / 5.
    assert_approx(snapshot.volume_ratio, 5_000.0 / 1_800.0);
}

#[test]
fn statelessness_recomputing_the_same_series_yields_identical_output() {
    let closes: Vec<f64> = (0..60)
        .map(|index| 18.0 + ((index * 5) % 13) as f64 / 2.0)
        .collect();
    let bars = make_bars(&closes);

    let first = indicators::compute(&bars).expect("enough bars");
    let second = indicators::compute(&bars).expect("enough bars");
    assert_eq!(first, second);
}
