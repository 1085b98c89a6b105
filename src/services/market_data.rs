// ============================================================================
// MARKET DATA PROXY
// ============================================================================
//
// Description:
//   Price feed behind a strategy trait with two implementations:
//     - CoinGeckoSource : live fetch with a short timeout
//     - StaticSource    : fixed price table + seeded random-walk history
//   MarketDataService owns the selection policy (live first when enabled,
//   static otherwise). Feed failures are logged and replaced, never surfaced
//   to the client.
//
// ============================================================================

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AppConfig;
use crate::error::ApiError;

const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Synthetic history is bounded so a large ?days= cannot balloon the response.
const MAX_HISTORY_DAYS: u32 = 365;

pub const TRADING_PAIRS: [&str; 5] = [
    "BTC/USDT",
    "ETH/USDT",
    "BNB/USDT",
    "ETH/BTC",
    "BNB/BTC",
];

#[derive(Debug, Clone, Serialize)]
pub struct CoinInfo {
    pub id: &'static str,
    pub symbol: &'static str,
    pub name: &'static str,
}

/// Supported coins, mapping our symbols to CoinGecko ids.
pub const COIN_CATALOG: [CoinInfo; 10] = [
    CoinInfo { id: "bitcoin", symbol: "btc", name: "Bitcoin" },
    CoinInfo { id: "ethereum", symbol: "eth", name: "Ethereum" },
    CoinInfo { id: "binancecoin", symbol: "bnb", name: "Binance Coin" },
    CoinInfo { id: "tether", symbol: "usdt", name: "Tether" },
    CoinInfo { id: "cardano", symbol: "ada", name: "Cardano" },
    CoinInfo { id: "solana", symbol: "sol", name: "Solana" },
    CoinInfo { id: "ripple", symbol: "xrp", name: "XRP" },
    CoinInfo { id: "polkadot", symbol: "dot", name: "Polkadot" },
    CoinInfo { id: "dogecoin", symbol: "doge", name: "Dogecoin" },
    CoinInfo { id: "shiba-inu", symbol: "shib", name: "Shiba Inu" },
];

pub fn coin_id_for(symbol: &str) -> Option<&'static str> {
    COIN_CATALOG
        .iter()
        .find(|c| c.symbol == symbol)
        .map(|c| c.id)
}

/// Case-insensitive name/symbol search over the static catalog.
pub fn search_catalog(query: &str) -> Vec<&'static CoinInfo> {
    let query = query.to_lowercase();
    COIN_CATALOG
        .iter()
        .filter(|c| c.name.to_lowercase().contains(&query) || c.symbol.contains(&query))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceTicker {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub price_change_24h: f64,
    pub price_change_percentage_24h: f64,
    pub market_cap: f64,
    pub volume_24h: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryPoint {
    pub timestamp: i64, // milliseconds since epoch
    pub price: f64,
    pub volume: f64,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn prices(&self) -> Result<Vec<PriceTicker>, FeedError>;
    async fn history(
        &self,
        coin_id: &str,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<HistoryPoint>, FeedError>;
}

// ----------------------------------------------------------------------
// Live source: CoinGecko
// ----------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CoinGeckoCoin {
    id: String,
    symbol: String,
    name: String,
    current_price: Option<f64>,
    price_change_24h: Option<f64>,
    price_change_percentage_24h: Option<f64>,
    market_cap: Option<f64>,
    total_volume: Option<f64>,
    image: Option<String>,
    last_updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoinGeckoChart {
    prices: Vec<[f64; 2]>,
    total_volumes: Vec<[f64; 2]>,
}

pub struct CoinGeckoSource {
    client: reqwest::Client,
    base_url: String,
}

impl CoinGeckoSource {
    pub fn new(timeout: StdDuration) -> Self {
        CoinGeckoSource {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: COINGECKO_BASE_URL.to_string(),
        }
    }
}

#[async_trait]
impl PriceSource for CoinGeckoSource {
    async fn prices(&self) -> Result<Vec<PriceTicker>, FeedError> {
        let ids: Vec<&str> = COIN_CATALOG.iter().map(|c| c.id).collect();

        let coins: Vec<CoinGeckoCoin> = self
            .client
            .get(format!("{}/coins/markets", self.base_url))
            .query(&[
                ("vs_currency", "usd"),
                ("ids", &ids.join(",")),
                ("order", "market_cap_desc"),
                ("per_page", "50"),
                ("page", "1"),
                ("sparkline", "false"),
                ("price_change_percentage", "24h"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(coins
            .into_iter()
            .map(|c| PriceTicker {
                id: c.id,
                symbol: c.symbol,
                name: c.name,
                current_price: c.current_price.unwrap_or(0.0),
                price_change_24h: c.price_change_24h.unwrap_or(0.0),
                price_change_percentage_24h: c.price_change_percentage_24h.unwrap_or(0.0),
                market_cap: c.market_cap.unwrap_or(0.0),
                volume_24h: c.total_volume.unwrap_or(0.0),
                image: c.image,
                last_updated: c.last_updated,
            })
            .collect())
    }

    async fn history(
        &self,
        coin_id: &str,
        _symbol: &str,
        days: u32,
    ) -> Result<Vec<HistoryPoint>, FeedError> {
        let interval = if days <= 1 { "hourly" } else { "daily" };

        let chart: CoinGeckoChart = self
            .client
            .get(format!("{}/coins/{}/market_chart", self.base_url, coin_id))
            .query(&[
                ("vs_currency", "usd"),
                ("days", &days.to_string()),
                ("interval", interval),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let volumes: HashMap<i64, f64> = chart
            .total_volumes
            .iter()
            .map(|[ts, v]| (*ts as i64, *v))
            .collect();

        Ok(chart
            .prices
            .into_iter()
            .map(|[ts, price]| HistoryPoint {
                timestamp: ts as i64,
                price,
                volume: volumes.get(&(ts as i64)).copied().unwrap_or(0.0),
            })
            .collect())
    }
}

// ----------------------------------------------------------------------
// Static fallback
// ----------------------------------------------------------------------

pub struct StaticSource;

#[async_trait]
impl PriceSource for StaticSource {
    async fn prices(&self) -> Result<Vec<PriceTicker>, FeedError> {
        Ok(static_prices())
    }

    async fn history(
        &self,
        _coin_id: &str,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<HistoryPoint>, FeedError> {
        Ok(synthetic_history(symbol, days))
    }
}

fn ticker(
    id: &str,
    symbol: &str,
    name: &str,
    current_price: f64,
    price_change_24h: f64,
    price_change_percentage_24h: f64,
    market_cap: f64,
    volume_24h: f64,
) -> PriceTicker {
    PriceTicker {
        id: id.to_string(),
        symbol: symbol.to_string(),
        name: name.to_string(),
        current_price,
        price_change_24h,
        price_change_percentage_24h,
        market_cap,
        volume_24h,
        image: None,
        last_updated: None,
    }
}

/// Fixed price table served whenever the live feed is unavailable.
pub fn static_prices() -> Vec<PriceTicker> {
    vec![
        ticker("bitcoin", "btc", "Bitcoin", 45000.0, 1200.0, 2.74, 850_000_000_000.0, 25_000_000_000.0),
        ticker("ethereum", "eth", "Ethereum", 3200.0, -150.0, -4.48, 380_000_000_000.0, 18_000_000_000.0),
        ticker("binancecoin", "bnb", "Binance Coin", 350.0, 8.5, 2.49, 55_000_000_000.0, 1_200_000_000.0),
        ticker("tether", "usdt", "Tether", 1.00, 0.0, 0.0, 83_000_000_000.0, 45_000_000_000.0),
    ]
}

fn base_price(symbol: &str) -> f64 {
    match symbol {
        "btc" => 44000.0,
        "eth" => 3100.0,
        "bnb" => 340.0,
        _ => 1.0,
    }
}

fn history_seed(symbol: &str, days: u32) -> u64 {
    let mut hasher = DefaultHasher::new();
    symbol.hash(&mut hasher);
    days.hash(&mut hasher);
    hasher.finish()
}

/// Deterministic random walk around the per-symbol base price, one point per
/// day, oldest first. Prices are clamped at zero.
pub fn synthetic_history(symbol: &str, days: u32) -> Vec<HistoryPoint> {
    let days = days.min(MAX_HISTORY_DAYS);
    let mut rng = StdRng::seed_from_u64(history_seed(symbol, days));
    let base = base_price(symbol);
    let now = Utc::now();

    let mut history = Vec::with_capacity(days as usize + 1);
    for i in (0..=days).rev() {
        let date = now - Duration::days(i as i64);
        let price = (base + rng.gen_range(-500.0..500.0)).max(0.0);
        history.push(HistoryPoint {
            timestamp: date.timestamp_millis(),
            price: (price * 100.0).round() / 100.0,
            volume: rng.gen_range(500_000_000.0..1_500_000_000.0),
        });
    }
    history
}

// ----------------------------------------------------------------------
// Policy
// ----------------------------------------------------------------------

pub struct MarketDataService {
    live: Option<Box<dyn PriceSource>>,
    fallback: Box<dyn PriceSource>,
}

impl MarketDataService {
    pub fn new(config: &AppConfig) -> Self {
        let live: Option<Box<dyn PriceSource>> = if config.market_data_live {
            Some(Box::new(CoinGeckoSource::new(StdDuration::from_secs(
                config.market_fetch_timeout_secs,
            ))))
        } else {
            None
        };
        MarketDataService {
            live,
            fallback: Box::new(StaticSource),
        }
    }

    /// Static-only service, for tests and MARKET_DATA_LIVE=false.
    pub fn static_only() -> Self {
        MarketDataService {
            live: None,
            fallback: Box::new(StaticSource),
        }
    }

    pub async fn prices(&self) -> Vec<PriceTicker> {
        if let Some(live) = &self.live {
            match live.prices().await {
                Ok(prices) => return prices,
                Err(e) => log::warn!("live price fetch failed, serving static table: {}", e),
            }
        }
        // The static source cannot fail
        self.fallback.prices().await.unwrap_or_default()
    }

    pub async fn history(&self, symbol: &str, days: u32) -> Result<Vec<HistoryPoint>, ApiError> {
        let symbol = symbol.to_lowercase();
        let coin_id = coin_id_for(&symbol).ok_or_else(|| {
            ApiError::Validation("Unsupported cryptocurrency symbol".to_string())
        })?;

        if let Some(live) = &self.live {
            match live.history(coin_id, &symbol, days).await {
                Ok(history) => return Ok(history),
                Err(e) => log::warn!(
                    "live history fetch failed for {}, serving synthetic series: {}",
                    symbol,
                    e
                ),
            }
        }
        Ok(self
            .fallback
            .history(coin_id, &symbol, days)
            .await
            .unwrap_or_default())
    }
}
