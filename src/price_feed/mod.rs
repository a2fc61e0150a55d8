//! External price feed.
//!
//! One HTTP GET against a CoinGecko-compatible `simple/price` endpoint,
//! one JSON field read back as a [`Decimal`].

use crate::error::PriceFetchError;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound on attempts per fetch, including the first
pub const MAX_FETCH_ATTEMPTS: u32 = 10;

/// No single retry waits longer than this
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(60);

/// Source of spot prices, quoted in USD
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_price(&self, symbol: &str) -> Result<Decimal, PriceFetchError>;
}

/// CoinGecko `simple/price` client with a bounded retry
#[derive(Clone)]
pub struct CoinGeckoPriceFeed {
    client: Client,
    base_url: String,
    coin_ids: HashMap<String, String>,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl CoinGeckoPriceFeed {
    /// Create a feed against `base_url`, e.g. `https://api.coingecko.com/api/v3`
    pub fn new(base_url: impl Into<String>) -> Result<Self, PriceFetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| PriceFetchError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            coin_ids: HashMap::new(),
            max_attempts: 1,
            retry_backoff: Duration::from_secs(1),
        })
    }

    /// Map a ticker symbol to its feed id (`FLOW` -> `flow` by default)
    pub fn with_coin_id(mut self, symbol: &str, coin_id: impl Into<String>) -> Self {
        self.coin_ids.insert(symbol.to_uppercase(), coin_id.into());
        self
    }

    /// Total attempts per fetch, including the first
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.clamp(1, MAX_FETCH_ATTEMPTS);
        self
    }

    /// Base delay; doubles after every failed attempt
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Delay after failed attempt `attempt` (1-based): base × 2^(attempt-1), capped
    fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.retry_backoff
            .checked_mul(factor)
            .unwrap_or(MAX_RETRY_BACKOFF)
            .min(MAX_RETRY_BACKOFF)
    }

    fn coin_id(&self, symbol: &str) -> String {
        self.coin_ids
            .get(&symbol.to_uppercase())
            .cloned()
            .unwrap_or_else(|| symbol.to_lowercase())
    }

    async fn fetch_once(&self, coin_id: &str) -> Result<Decimal, PriceFetchError> {
        let url = format!("{}/simple/price", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("ids", coin_id), ("vs_currencies", "usd")])
            .send()
            .await
            .map_err(|e| PriceFetchError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PriceFetchError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(PriceFetchError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        parse_price(&body, coin_id)
    }
}

/// Extract `<coin_id>.usd` without a round trip through `f64` formatting
pub fn parse_price(body: &str, coin_id: &str) -> Result<Decimal, PriceFetchError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| PriceFetchError::Malformed(e.to_string()))?;

    let number = value
        .get(coin_id)
        .and_then(|coin| coin.get("usd"))
        .and_then(|usd| match usd {
            serde_json::Value::Number(n) => Some(n),
            _ => None,
        })
        .ok_or_else(|| PriceFetchError::Malformed(format!("missing {}.usd in response", coin_id)))?;

    let text = number.to_string();
    let price = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| PriceFetchError::Malformed(format!("unparseable price {}: {}", text, e)))?;

    if price <= Decimal::ZERO {
        return Err(PriceFetchError::InvalidPrice(text));
    }

    Ok(price)
}

#[async_trait]
impl PriceSource for CoinGeckoPriceFeed {
    async fn fetch_price(&self, symbol: &str) -> Result<Decimal, PriceFetchError> {
        let coin_id = self.coin_id(symbol);
        let mut attempt = 1;

        loop {
            match self.fetch_once(&coin_id).await {
                Ok(price) => {
                    debug!(symbol, %price, attempt, "Fetched price");
                    return Ok(price);
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let backoff = self.retry_delay(attempt);
                    warn!(
                        symbol,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Price fetch failed, retrying in {:?}",
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price() {
        let price = parse_price(r#"{"flow":{"usd":0.2784}}"#, "flow").unwrap();
        assert_eq!(price, Decimal::from_str("0.2784").unwrap());
    }

    #[test]
    fn test_parse_price_integer_and_exponent() {
        assert_eq!(parse_price(r#"{"flow":{"usd":3}}"#, "flow").unwrap(), Decimal::from(3));
        assert_eq!(
            parse_price(r#"{"flow":{"usd":1.5e-7}}"#, "flow").unwrap(),
            Decimal::from_str("0.00000015").unwrap()
        );
    }

    #[test]
    fn test_parse_price_rejects_bad_shapes() {
        assert!(matches!(parse_price("not json", "flow"), Err(PriceFetchError::Malformed(_))));
        assert!(matches!(parse_price(r#"{"bitcoin":{"usd":1}}"#, "flow"), Err(PriceFetchError::Malformed(_))));
        assert!(matches!(parse_price(r#"{"flow":{"usd":"0.5"}}"#, "flow"), Err(PriceFetchError::Malformed(_))));
        assert!(matches!(parse_price(r#"{"flow":{"usd":0}}"#, "flow"), Err(PriceFetchError::InvalidPrice(_))));
        assert!(matches!(parse_price(r#"{"flow":{"usd":-1.2}}"#, "flow"), Err(PriceFetchError::InvalidPrice(_))));
    }

    #[test]
    fn test_attempts_are_capped() {
        let feed = CoinGeckoPriceFeed::new("http://localhost").unwrap().with_max_attempts(40);
        assert_eq!(feed.max_attempts, MAX_FETCH_ATTEMPTS);
        let feed = feed.with_max_attempts(0);
        assert_eq!(feed.max_attempts, 1);
    }

    #[test]
    fn test_retry_delay_doubles_then_saturates() {
        let feed = CoinGeckoPriceFeed::new("http://localhost")
            .unwrap()
            .with_retry_backoff(Duration::from_secs(1));
        assert_eq!(feed.retry_delay(1), Duration::from_secs(1));
        assert_eq!(feed.retry_delay(2), Duration::from_secs(2));
        assert_eq!(feed.retry_delay(3), Duration::from_secs(4));
        assert_eq!(feed.retry_delay(7), MAX_RETRY_BACKOFF);
        // 2^32 does not fit in u32; must not overflow
        assert_eq!(feed.retry_delay(33), MAX_RETRY_BACKOFF);
        assert_eq!(feed.retry_delay(u32::MAX), MAX_RETRY_BACKOFF);
    }

    #[test]
    fn test_coin_id_mapping() {
        let feed = CoinGeckoPriceFeed::new("http://localhost/").unwrap().with_coin_id("FLOW", "flow");
        assert_eq!(feed.coin_id("flow"), "flow");
        assert_eq!(feed.coin_id("BTC"), "btc");
        assert_eq!(feed.base_url, "http://localhost");
    }
}
