use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::{Level1Response, PriceError};
use crate::traits::PriceSource;

const LEVEL1_PATH: &str = "/api/v1/market/orderbook/level1";

/// Public spot ticker client. No auth, no retry, transport default timeouts.
#[derive(Clone)]
pub struct KucoinClient {
    client: Client,
    base_url: String,
}

impl KucoinClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, PriceError> {
        let client = Client::builder()
            .user_agent(concat!("crypto-alert/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn request_level1(&self, symbol: &str) -> Result<f64, PriceError> {
        let url = format!("{}{}", self.base_url, LEVEL1_PATH);

        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PriceError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let level1: Level1Response = serde_json::from_str(&body)?;
        level1.into_price(symbol)
    }
}

#[async_trait]
impl PriceSource for KucoinClient {
    async fn fetch_price(&self, symbol: &str) -> Result<f64, PriceError> {
        let symbol = symbol.trim().to_uppercase();

        match self.request_level1(&symbol).await {
            Ok(price) => {
                debug!("{} = {}", symbol, price);
                Ok(price)
            }
            Err(e) => {
                warn!("Price for {} unavailable: {}", symbol, e);
                Err(e)
            }
        }
    }
}
