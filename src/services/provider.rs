//! Market data provider contract and the Yahoo Finance chart-API client.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::error::EngineError;
use crate::models::{HistoricalSeries, QuoteSnapshot};

/// Contract the cache and batch runner program against. Implementations fetch
/// one symbol at a time; pacing between calls belongs to the caller.
pub trait MarketDataProvider {
    fn quote(
        &self,
        symbol: &str,
    ) -> impl Future<Output = Result<QuoteSnapshot, EngineError>> + Send;

    fn history(
        &self,
        symbol: &str,
    ) -> impl Future<Output = Result<HistoricalSeries, EngineError>> + Send;
}

#[derive(Clone)]
pub struct YahooFinanceClient {
    http: Client,
}

const CHART_BASE: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

impl YahooFinanceClient {
    pub fn new(timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (compatible; marketpulse/0.1)")
            .build()
            .unwrap_or_default();

        Self { http }
    }

    async fn chart(&self, symbol: &str, range: &str) -> Result<ChartData, EngineError> {
        let url = format!("{CHART_BASE}/{symbol}");
        let res = self
            .http
            .get(&url)
            .query(&[("range", range), ("interval", "1d")])
            .send()
            .await
            .map_err(|e| EngineError::DataUnavailable(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(EngineError::DataUnavailable(format!(
                "chart fetch for {symbol} failed: {status} {body}"
            )));
        }

        let envelope = res
            .json::<ChartEnvelope>()
            .await
            .map_err(|e| EngineError::DataUnavailable(e.to_string()))?;

        envelope
            .chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or_else(|| {
                EngineError::DataUnavailable(format!("empty chart result for {symbol}"))
            })
    }
}

impl MarketDataProvider for YahooFinanceClient {
    /// One 3-month daily chart call covers the quote fields and gives enough
    /// volume bars to derive the average volume the evaluator divides by.
    async fn quote(&self, symbol: &str) -> Result<QuoteSnapshot, EngineError> {
        let data = self.chart(symbol, "3mo").await?;
        let meta = &data.meta;

        let volumes: Vec<f64> = data
            .indicators
            .quote
            .first()
            .and_then(|q| q.volume.as_ref())
            .map(|v| v.iter().filter_map(|x| *x).collect())
            .unwrap_or_default();

        let avg_volume = if volumes.is_empty() {
            0.0
        } else {
            volumes.iter().sum::<f64>() / volumes.len() as f64
        };

        let volume = meta
            .regular_market_volume
            .or_else(|| volumes.last().copied())
            .unwrap_or(0.0);

        Ok(QuoteSnapshot {
            price: meta.regular_market_price.unwrap_or(0.0),
            previous_close: meta.chart_previous_close.unwrap_or(0.0),
            volume,
            avg_volume,
            day_high: meta.regular_market_day_high,
            day_low: meta.regular_market_day_low,
        })
    }

    /// Daily closes over one year. The chart payload has high/low bars too,
    /// but they are gappy enough that nothing downstream consumes them, so
    /// only closes are extracted.
    async fn history(&self, symbol: &str) -> Result<HistoricalSeries, EngineError> {
        let data = self.chart(symbol, "1y").await?;

        let closes: Vec<f64> = data
            .indicators
            .quote
            .first()
            .and_then(|q| q.close.as_ref())
            .map(|c| c.iter().filter_map(|x| *x).collect())
            .unwrap_or_default();

        Ok(HistoricalSeries {
            closes,
            highs: Vec::new(),
            lows: Vec::new(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: ChartMeta,
    #[serde(default)]
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,

    #[serde(rename = "chartPreviousClose")]
    chart_previous_close: Option<f64>,

    #[serde(rename = "regularMarketVolume")]
    regular_market_volume: Option<f64>,

    #[serde(rename = "regularMarketDayHigh")]
    regular_market_day_high: Option<f64>,

    #[serde(rename = "regularMarketDayLow")]
    regular_market_day_low: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<f64>>>,
}
