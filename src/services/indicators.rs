//! Rolling-window indicator math over daily close series.

/// Simple moving average series. Output has `data.len() - period + 1` points;
/// empty when there is not enough data.
pub fn sma(period: usize, data: &[f64]) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return Vec::new();
    }
    data.windows(period)
        .map(|w| w.iter().sum::<f64>() / period as f64)
        .collect()
}

/// Wilder-smoothed RSI series. Needs at least `period + 1` closes; returns an
/// empty series otherwise.
pub fn rsi(period: usize, data: &[f64]) -> Vec<f64> {
    if period == 0 || data.len() <= period {
        return Vec::new();
    }

    let mut gains = 0.0;
    let mut losses = 0.0;
    for i in 1..=period {
        let diff = data[i] - data[i - 1];
        if diff >= 0.0 {
            gains += diff;
        } else {
            losses -= diff;
        }
    }

    let mut avg_gain = gains / period as f64;
    let mut avg_loss = losses / period as f64;
    let p = period as f64;

    let to_rsi = |gain: f64, loss: f64| {
        if loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + gain / loss)
        }
    };

    let mut out = Vec::with_capacity(data.len() - period);
    out.push(to_rsi(avg_gain, avg_loss));

    for i in period + 1..data.len() {
        let diff = data[i] - data[i - 1];
        let (gain, loss) = if diff >= 0.0 { (diff, 0.0) } else { (0.0, -diff) };
        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;
        out.push(to_rsi(avg_gain, avg_loss));
    }

    out
}
