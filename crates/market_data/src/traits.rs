use async_trait::async_trait;

use crate::remote::PriceError;

/// Anything that can quote a current price for a trading pair symbol.
///
/// Every failure is an `Err`; the monitor treats that as "unavailable this cycle".
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_price(&self, symbol: &str) -> Result<f64, PriceError>;
}
