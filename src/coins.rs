use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{MarketDataError, Result};
use crate::models::SymbolRef;

/// The four venue/market-type symbol lists the orchestrator fans out over.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinLists {
    #[serde(default)]
    pub binance_perps: Option<Vec<SymbolRef>>,
    #[serde(default)]
    pub binance_spot: Option<Vec<SymbolRef>>,
    #[serde(default)]
    pub bybit_perps: Option<Vec<SymbolRef>>,
    #[serde(default)]
    pub bybit_spot: Option<Vec<SymbolRef>>,
}

/// Caches the coin lists once at startup. A failed refresh leaves the
/// cache empty; runs then see empty inputs rather than failing.
pub struct CoinsRepository {
    client: Client,
    coins_api: String,
    cached: RwLock<Option<CoinLists>>,
}

impl CoinsRepository {
    pub fn new(client: Client, config: &Config) -> Arc<Self> {
        Arc::new(Self {
            client,
            coins_api: config.coins_api.clone(),
            cached: RwLock::new(None),
        })
    }

    pub async fn initialize(&self) {
        match self.fetch_lists().await {
            Ok(lists) => {
                info!(
                    "Coins repository initialized: {} binance perps, {} bybit perps",
                    lists.binance_perps.as_ref().map_or(0, Vec::len),
                    lists.bybit_perps.as_ref().map_or(0, Vec::len),
                );
                *self.cached.write().await = Some(lists);
            }
            Err(e) => {
                error!("Failed to fetch coin lists: {}", e);
            }
        }
    }

    async fn fetch_lists(&self) -> Result<CoinLists> {
        let url = format!("{}/api/coins/get", self.coins_api);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(MarketDataError::ExchangeApi {
                status: response.status().as_u16(),
                message: format!("coins API returned status {}", response.status()),
            });
        }
        Ok(response.json::<CoinLists>().await?)
    }

    pub async fn get_coins_from_cache(&self) -> CoinLists {
        self.cached.read().await.clone().unwrap_or_default()
    }
}
