use crate::core::cache::Cache;
use crate::core::rate::CurrencyRateProvider;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Fetches the latest rate from an exchangerate.host compatible endpoint.
/// The endpoint has no per-date granularity.
pub struct ExchangeRateHostProvider {
    base_url: String,
    cache: Arc<Cache<String, Decimal>>,
}

impl ExchangeRateHostProvider {
    pub fn new(base_url: &str, cache: Arc<Cache<String, Decimal>>) -> Self {
        ExchangeRateHostProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    rates: HashMap<String, serde_json::Value>,
}

#[async_trait]
impl CurrencyRateProvider for ExchangeRateHostProvider {
    #[instrument(name = "LatestRateFetch", skip(self))]
    async fn get_rate(&self, from: &str, to: &str) -> Result<Decimal> {
        let pair = format!("{from}-{to}");
        if let Some(cached) = self.cache.get(&pair).await {
            return Ok(cached);
        }

        let url = format!("{}/latest?base={from}&symbols={to}", self.base_url);
        debug!("Requesting latest rate from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("wonspend/1.0")
            .build()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for currency pair: {}", e, pair))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for currency pair: {}",
                response.status(),
                pair
            ));
        }

        let text = response.text().await?;
        let data: LatestRatesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", pair, e))?;

        let rate = data
            .rates
            .get(to)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| anyhow!("No rate data found for currency pair: {}", pair))?;
        let rate = Decimal::try_from(rate)
            .ok()
            .filter(|r| *r > Decimal::ZERO)
            .ok_or_else(|| anyhow!("Invalid rate {} for currency pair: {}", rate, pair))?;

        debug!("Fetched rate {} for {}", rate, pair);
        self.cache.put(pair, rate).await;
        Ok(rate)
    }
}
