//! Evaluates one alert condition against a quote / history snapshot.

use std::collections::HashMap;

use mongodb::bson::oid::ObjectId;

use crate::models::{AlertCondition, HistoricalSeries, Indicator, Operator, QuoteSnapshot};
use crate::services::indicators;

const RSI_PERIOD: usize = 14;
const SMA_FAST: usize = 50;
const SMA_SLOW: usize = 200;

/// Last observed value per (alert, indicator), used only by the crossing
/// operators. Owned by the batch runner and threaded through each call;
/// deliberately not persisted, so a restart re-baselines every crossing
/// (the first post-restart observation can never falsely trigger).
#[derive(Debug, Default)]
pub struct CrossingMemory {
    last: HashMap<(ObjectId, Indicator), f64>,
}

impl CrossingMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `current` and returns what was stored before. `None` means
    /// this observation only establishes a baseline.
    fn observe(&mut self, alert_id: ObjectId, indicator: Indicator, current: f64) -> Option<f64> {
        self.last.insert((alert_id, indicator), current)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub triggered: bool,
    pub current_value: f64,
    pub message: String,
}

impl Evaluation {
    fn quiet(current_value: f64, message: impl Into<String>) -> Self {
        Self {
            triggered: false,
            current_value,
            message: message.into(),
        }
    }

    fn fired(current_value: f64, message: String) -> Self {
        Self {
            triggered: true,
            current_value,
            message,
        }
    }
}

/// Evaluate `condition` for the alert identified by `alert_id`.
///
/// Never fails: insufficient history and unsupported indicator/operator
/// combinations yield a non-triggered evaluation with an explanatory message.
pub fn evaluate(
    alert_id: ObjectId,
    symbol: &str,
    condition: &AlertCondition,
    quote: &QuoteSnapshot,
    history: Option<&HistoricalSeries>,
    memory: &mut CrossingMemory,
) -> Evaluation {
    match condition.indicator {
        Indicator::Price => eval_price(alert_id, symbol, condition, quote, memory),
        Indicator::Rsi => eval_rsi(symbol, condition, history),
        Indicator::Volume => eval_volume(symbol, condition, quote),
        Indicator::SmaCross => eval_sma_cross(symbol, condition, history),
        Indicator::Macd | Indicator::Score => {
            tracing::debug!(
                symbol,
                indicator = condition.indicator.as_str(),
                "indicator has no evaluation branch"
            );
            Evaluation::quiet(
                0.0,
                format!(
                    "{symbol}: {} conditions are not evaluated yet",
                    condition.indicator.as_str()
                ),
            )
        }
    }
}

fn eval_price(
    alert_id: ObjectId,
    symbol: &str,
    condition: &AlertCondition,
    quote: &QuoteSnapshot,
    memory: &mut CrossingMemory,
) -> Evaluation {
    let price = quote.price;
    let value = condition.value;

    match condition.operator {
        Operator::Above => {
            if price >= value {
                Evaluation::fired(price, format!("{symbol} price {price:.2} is above {value:.2}"))
            } else {
                Evaluation::quiet(price, format!("{symbol} price {price:.2} below {value:.2}"))
            }
        }
        Operator::Below => {
            if price <= value {
                Evaluation::fired(price, format!("{symbol} price {price:.2} is below {value:.2}"))
            } else {
                Evaluation::quiet(price, format!("{symbol} price {price:.2} above {value:.2}"))
            }
        }
        Operator::CrossesAbove | Operator::CrossesBelow => {
            // Memory updates on every call, trigger or not.
            let previous = memory.observe(alert_id, Indicator::Price, price);

            let crossed = match (condition.operator, previous) {
                // First observation only sets the baseline.
                (_, None) => false,
                (Operator::CrossesAbove, Some(prev)) => prev <= value && price > value,
                (Operator::CrossesBelow, Some(prev)) => prev >= value && price < value,
                _ => false,
            };

            if crossed {
                let dir = if condition.operator == Operator::CrossesAbove {
                    "above"
                } else {
                    "below"
                };
                Evaluation::fired(
                    price,
                    format!("{symbol} price crossed {dir} {value:.2} (now {price:.2})"),
                )
            } else {
                Evaluation::quiet(price, format!("{symbol} price {price:.2}, no crossing"))
            }
        }
    }
}

fn eval_rsi(
    symbol: &str,
    condition: &AlertCondition,
    history: Option<&HistoricalSeries>,
) -> Evaluation {
    let closes = history.map(|h| h.closes.as_slice()).unwrap_or(&[]);

    let series = indicators::rsi(RSI_PERIOD, closes);
    let Some(&current) = series.last() else {
        return Evaluation::quiet(
            0.0,
            format!(
                "{symbol}: not enough history for RSI({RSI_PERIOD}), have {} closes",
                closes.len()
            ),
        );
    };

    let value = condition.value;
    let hit = match condition.operator {
        Operator::Above => current >= value,
        Operator::Below => current <= value,
        // Crossing operators are not defined for RSI conditions.
        _ => {
            return Evaluation::quiet(
                current,
                format!("{symbol}: unsupported operator for rsi condition"),
            );
        }
    };

    if hit {
        let side = if condition.operator == Operator::Above { "above" } else { "below" };
        Evaluation::fired(current, format!("{symbol} RSI {current:.1} is {side} {value:.1}"))
    } else {
        Evaluation::quiet(current, format!("{symbol} RSI {current:.1}"))
    }
}

fn eval_volume(symbol: &str, condition: &AlertCondition, quote: &QuoteSnapshot) -> Evaluation {
    let ratio = if quote.avg_volume > 0.0 {
        quote.volume / quote.avg_volume
    } else {
        0.0
    };

    if ratio >= condition.value {
        Evaluation::fired(
            ratio,
            format!(
                "{symbol} volume at {ratio:.2}x average (threshold {:.2}x)",
                condition.value
            ),
        )
    } else {
        Evaluation::quiet(ratio, format!("{symbol} volume at {ratio:.2}x average"))
    }
}

fn eval_sma_cross(
    symbol: &str,
    condition: &AlertCondition,
    history: Option<&HistoricalSeries>,
) -> Evaluation {
    let closes = history.map(|h| h.closes.as_slice()).unwrap_or(&[]);

    let fast = indicators::sma(SMA_FAST, closes);
    let slow = indicators::sma(SMA_SLOW, closes);
    if fast.len() < 2 || slow.len() < 2 {
        return Evaluation::quiet(
            0.0,
            format!(
                "{symbol}: not enough history for SMA{SMA_FAST}/SMA{SMA_SLOW} cross, have {} closes",
                closes.len()
            ),
        );
    }

    let (fast_prev, fast_now) = (fast[fast.len() - 2], fast[fast.len() - 1]);
    let (slow_prev, slow_now) = (slow[slow.len() - 2], slow[slow.len() - 1]);

    let crossed = match condition.operator {
        Operator::CrossesAbove => fast_prev <= slow_prev && fast_now > slow_now,
        Operator::CrossesBelow => fast_prev >= slow_prev && fast_now < slow_now,
        _ => {
            return Evaluation::quiet(
                fast_now,
                format!("{symbol}: unsupported operator for sma_cross condition"),
            );
        }
    };

    if crossed {
        let kind = if condition.operator == Operator::CrossesAbove {
            "golden cross"
        } else {
            "death cross"
        };
        Evaluation::fired(
            fast_now,
            format!(
                "{symbol} {kind}: SMA{SMA_FAST} {fast_now:.2} vs SMA{SMA_SLOW} {slow_now:.2}"
            ),
        )
    } else {
        Evaluation::quiet(
            fast_now,
            format!("{symbol} SMA{SMA_FAST} {fast_now:.2}, SMA{SMA_SLOW} {slow_now:.2}, no cross"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Operator;

    fn cond(indicator: Indicator, operator: Operator, value: f64) -> AlertCondition {
        AlertCondition {
            indicator,
            operator,
            value,
            compare_to: None,
        }
    }

    fn quote(price: f64) -> QuoteSnapshot {
        QuoteSnapshot {
            price,
            ..QuoteSnapshot::default()
        }
    }

    #[test]
    fn price_above_triggers_at_or_over_the_level() {
        let c = cond(Indicator::Price, Operator::Above, 3500.0);
        let mut mem = CrossingMemory::new();

        let e = evaluate(ObjectId::new(), "TCS.NS", &c, &quote(3550.0), None, &mut mem);
        assert!(e.triggered);
        assert_eq!(e.current_value, 3550.0);
        assert!(e.message.contains("TCS.NS"));

        let e = evaluate(ObjectId::new(), "TCS.NS", &c, &quote(3499.0), None, &mut mem);
        assert!(!e.triggered);
    }

    #[test]
    fn level_conditions_are_stateless() {
        let c = cond(Indicator::Price, Operator::Below, 100.0);
        let mut mem = CrossingMemory::new();
        let id = ObjectId::new();
        let q = quote(99.0);

        let first = evaluate(id, "X", &c, &q, None, &mut mem);
        let second = evaluate(id, "X", &c, &q, None, &mut mem);
        assert_eq!(first.triggered, second.triggered);
        assert!(first.triggered);
    }

    #[test]
    fn crossing_fires_once_on_the_transition() {
        let threshold = 100.0;
        let c = cond(Indicator::Price, Operator::CrossesAbove, threshold);
        let mut mem = CrossingMemory::new();
        let id = ObjectId::new();

        // Baseline observation: below the level, never triggers.
        let e1 = evaluate(id, "X", &c, &quote(threshold - 1.0), None, &mut mem);
        // Still below: no transition.
        let e2 = evaluate(id, "X", &c, &quote(threshold - 1.0), None, &mut mem);
        // Crosses to above: triggers.
        let e3 = evaluate(id, "X", &c, &quote(threshold + 1.0), None, &mut mem);
        // Stays above: crossing already consumed.
        let e4 = evaluate(id, "X", &c, &quote(threshold + 1.0), None, &mut mem);

        assert!(!e1.triggered);
        assert!(!e2.triggered);
        assert!(e3.triggered);
        assert!(!e4.triggered);
    }

    #[test]
    fn first_observation_above_the_level_does_not_trigger() {
        let c = cond(Indicator::Price, Operator::CrossesAbove, 100.0);
        let mut mem = CrossingMemory::new();

        let e = evaluate(ObjectId::new(), "X", &c, &quote(150.0), None, &mut mem);
        assert!(!e.triggered);
    }

    #[test]
    fn crosses_below_mirrors_crosses_above() {
        let c = cond(Indicator::Price, Operator::CrossesBelow, 100.0);
        let mut mem = CrossingMemory::new();
        let id = ObjectId::new();

        assert!(!evaluate(id, "X", &c, &quote(101.0), None, &mut mem).triggered);
        assert!(evaluate(id, "X", &c, &quote(99.0), None, &mut mem).triggered);
        assert!(!evaluate(id, "X", &c, &quote(98.0), None, &mut mem).triggered);
    }

    #[test]
    fn rsi_above_triggers_on_overbought_series() {
        let c = cond(Indicator::Rsi, Operator::Above, 70.0);
        let mut mem = CrossingMemory::new();

        // Steady gains drive RSI to 100.
        let up = HistoricalSeries {
            closes: (0..30).map(|i| 100.0 + i as f64).collect(),
            ..HistoricalSeries::default()
        };
        let e = evaluate(ObjectId::new(), "X", &c, &quote(0.0), Some(&up), &mut mem);
        assert!(e.triggered);
        assert!(e.current_value > 70.0);

        // Steady losses drive RSI to 0.
        let down = HistoricalSeries {
            closes: (0..30).map(|i| 100.0 - i as f64 * 0.5).collect(),
            ..HistoricalSeries::default()
        };
        let e = evaluate(ObjectId::new(), "X", &c, &quote(0.0), Some(&down), &mut mem);
        assert!(!e.triggered);
    }

    #[test]
    fn rsi_with_short_history_reports_instead_of_erroring() {
        let c = cond(Indicator::Rsi, Operator::Above, 70.0);
        let mut mem = CrossingMemory::new();
        let short = HistoricalSeries {
            closes: vec![100.0; 10],
            ..HistoricalSeries::default()
        };

        let e = evaluate(ObjectId::new(), "X", &c, &quote(0.0), Some(&short), &mut mem);
        assert!(!e.triggered);
        assert!(e.message.contains("not enough history"));

        let e = evaluate(ObjectId::new(), "X", &c, &quote(0.0), None, &mut mem);
        assert!(!e.triggered);
    }

    #[test]
    fn volume_ratio_against_multiplier() {
        let c = cond(Indicator::Volume, Operator::Above, 2.0);
        let mut mem = CrossingMemory::new();

        let q = QuoteSnapshot {
            volume: 2_000_000.0,
            avg_volume: 900_000.0,
            ..QuoteSnapshot::default()
        };
        let e = evaluate(ObjectId::new(), "X", &c, &q, None, &mut mem);
        assert!(e.triggered);
        assert!((e.current_value - 2_000_000.0 / 900_000.0).abs() < 1e-9);
    }

    #[test]
    fn volume_ratio_is_zero_when_average_is_zero() {
        let c = cond(Indicator::Volume, Operator::Above, 0.5);
        let mut mem = CrossingMemory::new();

        let q = QuoteSnapshot {
            volume: 1_000_000.0,
            avg_volume: 0.0,
            ..QuoteSnapshot::default()
        };
        let e = evaluate(ObjectId::new(), "X", &c, &q, None, &mut mem);
        assert!(!e.triggered);
        assert_eq!(e.current_value, 0.0);
    }

    #[test]
    fn sma_golden_cross_triggers() {
        let c = cond(Indicator::SmaCross, Operator::CrossesAbove, 0.0);
        let mut mem = CrossingMemory::new();

        // Flat at 100 long enough for both windows, then one strong close:
        // the 50-day average jumps past the 200-day.
        let mut closes = vec![100.0; 201];
        closes.push(200.0);
        let series = HistoricalSeries {
            closes,
            ..HistoricalSeries::default()
        };

        let e = evaluate(ObjectId::new(), "X", &c, &quote(0.0), Some(&series), &mut mem);
        assert!(e.triggered);
        assert!(e.message.contains("golden cross"));
    }

    #[test]
    fn sma_cross_needs_two_points_per_window() {
        let c = cond(Indicator::SmaCross, Operator::CrossesAbove, 0.0);
        let mut mem = CrossingMemory::new();
        let series = HistoricalSeries {
            closes: vec![100.0; 200],
            ..HistoricalSeries::default()
        };

        let e = evaluate(ObjectId::new(), "X", &c, &quote(0.0), Some(&series), &mut mem);
        assert!(!e.triggered);
        assert!(e.message.contains("not enough history"));
    }

    #[test]
    fn macd_and_score_fall_to_the_unsupported_branch() {
        let mut mem = CrossingMemory::new();
        for indicator in [Indicator::Macd, Indicator::Score] {
            let c = cond(indicator, Operator::Above, 1.0);
            let e = evaluate(ObjectId::new(), "X", &c, &quote(100.0), None, &mut mem);
            assert!(!e.triggered);
            assert!(!e.message.is_empty());
        }
    }
}
