use serde::{Deserialize, Serialize};

/// Point-in-time quote for one symbol. Fields the provider omits default to 0.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub price: f64,
    pub previous_close: f64,
    pub volume: f64,
    pub avg_volume: f64,

    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
}

/// Chronological daily series.
///
/// The current history integration only populates `closes`; `highs` and `lows`
/// stay empty, so indicators needing intrabar range cannot be evaluated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoricalSeries {
    pub closes: Vec<f64>,
    pub highs: Vec<f64>,
    pub lows: Vec<f64>,
}
