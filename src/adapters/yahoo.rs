//! Yahoo Finance price source
//!
//! Uses the public chart endpoint, which covers futures (`GC=F`, `CL=F`),
//! crypto pairs (`BTC-USD`), FX (`EURUSD=X`) and equities without a crumb.

use async_trait::async_trait;
use reqwest::header;
use serde::Deserialize;
use tracing::debug;

use crate::adapters::errors::{FetchError, FetchResult};
use crate::adapters::traits::PriceSource;
use crate::adapters::types::Quote;
use crate::config::constants::http_timeout;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: Option<String>,
    regular_market_price: Option<f64>,
    previous_close: Option<f64>,
    chart_previous_close: Option<f64>,
}

/// Yahoo Finance chart-API client
#[derive(Debug, Clone)]
pub struct YahooPriceSource {
    http: reqwest::Client,
    base_url: String,
}

impl YahooPriceSource {
    /// Create a client against `base_url` (normally `https://query1.finance.yahoo.com`)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(http_timeout())
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: base_url.into(),
        }
    }

    fn chart_url(&self, symbol: &str) -> String {
        format!(
            "{}/v8/finance/chart/{}?interval=1d&range=1d",
            self.base_url.trim_end_matches('/'),
            symbol
        )
    }
}

#[async_trait]
impl PriceSource for YahooPriceSource {
    async fn fetch_quote(&self, symbol: &str) -> FetchResult<Quote> {
        let url = self.chart_url(symbol);
        debug!(symbol = %symbol, url = %url, "Fetching quote");

        let response = self
            .http
            .get(&url)
            .header(header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::SymbolNotFound(symbol.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                symbol: symbol.to_string(),
                status: status.as_u16(),
            });
        }

        let body: ChartResponse = response.json().await?;

        if let Some(err) = body.chart.error {
            return Err(if err.code == "Not Found" {
                FetchError::SymbolNotFound(symbol.to_string())
            } else {
                FetchError::InvalidResponse(format!(
                    "{}: {}",
                    err.code,
                    err.description.unwrap_or_default()
                ))
            });
        }

        let meta = body
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .map(|r| r.meta)
            .ok_or_else(|| FetchError::SymbolNotFound(symbol.to_string()))?;

        let current_price = meta.regular_market_price.ok_or_else(|| {
            FetchError::InvalidResponse(format!("No regularMarketPrice for {}", symbol))
        })?;
        let last_close = meta.previous_close.or(meta.chart_previous_close);

        Ok(Quote::new(
            meta.symbol.unwrap_or_else(|| symbol.to_string()),
            current_price,
            last_close,
        ))
    }
}
