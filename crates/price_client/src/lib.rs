//! Yahoo Finance price-history client.
//!
//! Fetches daily closes for a futures symbol from Yahoo's v8 chart API over a
//! trailing window. Non-trading days come back as `null` closes and are
//! dropped here, so the RSI calculator only ever sees finite prices.

use chrono::{DateTime, Duration, Utc};
use common::config::MarketConfig;
use common::{body_excerpt, Error, PriceHistory, PriceHistorySource};
use serde::Deserialize;
use tracing::debug;

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance chart client for a single symbol.
#[derive(Debug, Clone)]
pub struct YahooChartClient {
    client: reqwest::Client,
    symbol: String,
    history_days: u32,
}

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart: ChartResult,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    pub result: Option<Vec<ChartData>>,
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
pub struct ChartError {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ChartData {
    #[serde(default)]
    pub timestamp: Option<Vec<i64>>,
    pub indicators: Indicators,
}

#[derive(Debug, Deserialize)]
pub struct Indicators {
    pub quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteData {
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

impl YahooChartClient {
    pub fn new(market: &MarketConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("failed to build Yahoo HTTP client");

        Self {
            client,
            symbol: market.symbol.clone(),
            history_days: market.history_days,
        }
    }

    /// Fetch the raw chart payload for the trailing window ending at `now`.
    pub async fn fetch_chart(&self, now: DateTime<Utc>) -> Result<ChartResponse, Error> {
        let start = now - Duration::days(i64::from(self.history_days));
        let url = format!("{}/{}", CHART_URL, self.symbol);
        let query = [
            ("period1", start.timestamp().to_string()),
            ("period2", now.timestamp().to_string()),
            ("interval", "1d".to_string()),
        ];

        debug!(
            "Fetching Yahoo chart: {} days={} symbol={}",
            url, self.history_days, self.symbol
        );

        let resp = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::PriceHistory(format!("HTTP error for {}: {e}", self.symbol)))?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::PriceHistory(format!(
                "Yahoo returned {} for {}: {}",
                status,
                self.symbol,
                body_excerpt(&body)
            )));
        }

        resp.json()
            .await
            .map_err(|e| Error::PriceHistory(format!("JSON parse error for {}: {e}", self.symbol)))
    }
}

impl PriceHistorySource for YahooChartClient {
    async fn daily_closes(&self) -> Result<PriceHistory, Error> {
        let now = Utc::now();
        let chart = self.fetch_chart(now).await?;
        let closes = extract_closes(&self.symbol, chart)?;
        Ok(PriceHistory {
            symbol: self.symbol.clone(),
            closes,
            fetched_at: now,
        })
    }
}

/// Pull finite closes out of a chart payload, oldest first.
pub fn extract_closes(symbol: &str, resp: ChartResponse) -> Result<Vec<f64>, Error> {
    let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
        Some(err) => Error::PriceHistory(format!("{}: {}: {}", symbol, err.code, err.description)),
        None => Error::PriceHistory(format!("{}: empty result with no error", symbol)),
    })?;

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| Error::PriceHistory(format!("{}: result array is empty", symbol)))?;

    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| Error::PriceHistory(format!("{}: no quote data", symbol)))?;

    let closes: Vec<f64> = quote
        .close
        .into_iter()
        .flatten()
        .filter(|c| c.is_finite())
        .collect();

    if closes.is_empty() {
        return Err(Error::PriceHistory(format!("{}: no closing prices", symbol)));
    }

    Ok(closes)
}
