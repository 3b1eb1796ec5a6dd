//! Look-ahead contamination tests.
//!
//! Invariant: nothing computed at candle t may depend on candle t+1 or later.
//!
//! Method: compute on a truncated series (candles 0..k) and on the full
//! series. Everything strictly before the truncation point must be
//! identical; any difference means future data leaked into the past.

use calllab_core::domain::{Candle, EventKind};
use calllab_core::indicators::{indicators_at, Ema, Indicator, IndicatorEngine, Rsi, Series};
use calllab_core::plan::{compile, EntryConfig, ExitConfig, StrategyConfig, TargetConfig};
use calllab_core::run;

/// Deterministic pseudo-random walk of N candles.
fn make_test_candles(n: usize) -> Vec<Candle> {
    let mut price = 1.0_f64;
    (0..n)
        .map(|i| {
            let seed = (i as u64)
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let change = ((seed >> 33) % 200) as f64 / 1000.0 - 0.1; // -10% to +10%
            let open = price;
            let close = (price * (1.0 + change)).max(0.01);
            let high = open.max(close) * 1.03;
            let low = open.min(close) * 0.97;
            price = close;
            Candle::new(i as i64 * 60_000, open, high, low, close, 1_000.0 + i as f64)
        })
        .collect()
}

fn same_values(a: &[f64], b: &[f64]) -> bool {
    a.iter()
        .zip(b)
        .all(|(x, y)| (x.is_nan() && y.is_nan()) || x == y)
}

fn assert_no_lookahead(indicator: &dyn Indicator, full: &[Candle], truncated_len: usize) {
    let full_result = indicator.compute(full);
    let truncated_result = indicator.compute(&full[..truncated_len]);

    assert_eq!(truncated_result.len(), truncated_len);
    assert!(
        same_values(&truncated_result, &full_result[..truncated_len]),
        "{}: values before candle {truncated_len} changed when later candles were added",
        indicator.name()
    );
}

#[test]
fn batch_indicators_are_causal() {
    let candles = make_test_candles(200);
    for indicator in [
        Box::new(Ema::new(5)) as Box<dyn Indicator>,
        Box::new(Ema::new(20)),
        Box::new(Rsi::new(2)),
        Box::new(Rsi::new(14)),
    ] {
        for k in [1, 15, 21, 100] {
            assert_no_lookahead(indicator.as_ref(), &candles, k);
        }
    }
}

#[test]
fn snapshot_ignores_later_candles() {
    let candles = make_test_candles(120);
    let series = [Series::Ema(9), Series::Rsi(14), Series::Close];
    for t in [0, 8, 14, 60, 119] {
        let from_full = indicators_at(&candles, t, &series);
        let from_prefix = indicators_at(&candles[..=t], t, &series);
        assert_eq!(from_full, from_prefix, "snapshot at {t} differs");
    }
}

#[test]
fn incremental_engine_matches_batch() {
    let candles = make_test_candles(150);
    let ema = Ema::new(12).compute(&candles);
    let rsi = Rsi::new(7).compute(&candles);
    let mut engine = IndicatorEngine::new(&[Series::Ema(12), Series::Rsi(7)]);
    for (i, candle) in candles.iter().enumerate() {
        let snap = engine.update(candle);
        assert_eq!(snap.get(Series::Ema(12)).unwrap_or(f64::NAN).to_bits(), ema[i].to_bits());
        assert_eq!(snap.get(Series::Rsi(7)).unwrap_or(f64::NAN).to_bits(), rsi[i].to_bits());
    }
}

#[test]
fn simulation_before_truncation_point_is_unchanged() {
    let cfg = StrategyConfig {
        entry: EntryConfig {
            mode: "indicator_cross".into(),
            fast: Some("close".into()),
            slow: Some("ema_8".into()),
            direction: Some("up".into()),
            delay_candles: Some(1),
            ..Default::default()
        },
        exits: ExitConfig {
            targets: vec![
                TargetConfig {
                    size_pct: 40.0,
                    profit_pct: 15.0,
                },
                TargetConfig {
                    size_pct: 40.0,
                    profit_pct: 40.0,
                },
            ],
            stop_loss_pct: Some(20.0),
            ..Default::default()
        },
        ..Default::default()
    };
    let plan = compile(&cfg).unwrap();
    let candles = make_test_candles(300);
    let full = run(&candles, &plan).unwrap();

    for k in [10, 40, 80, 150, 299] {
        let prefix = run(&candles[..k], &plan).unwrap();
        let before = |events: &[calllab_core::domain::Event]| {
            events
                .iter()
                .filter(|e| e.candle_index + 1 < k)
                .cloned()
                .collect::<Vec<_>>()
        };
        assert_eq!(before(&prefix.events), before(&full.events), "diverged before {k}");

        // The prefix run may only add an end-of-data close at its last candle.
        for extra in prefix.events.iter().filter(|e| e.candle_index + 1 == k) {
            if !full.events.contains(extra) {
                assert_eq!(extra.kind, EventKind::ExitFull);
            }
        }
    }
}
