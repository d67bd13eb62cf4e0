//! Exchange abstraction used by the rebalance orchestrator.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::ExchangeError;
use crate::models::OrderSide;

/// Account and market access needed for one rebalance cycle.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Total account equity in USDT.
    async fn get_equity(&self) -> Result<Decimal, ExchangeError>;

    /// Last traded price for the instrument.
    async fn get_price(&self, instrument: &str) -> Result<Decimal, ExchangeError>;

    /// Current long position in base-currency units.
    async fn get_position(&self, instrument: &str) -> Result<Decimal, ExchangeError>;

    /// Submit a market order for `size` base-currency units; returns the exchange order id.
    async fn place_order(
        &self,
        instrument: &str,
        side: OrderSide,
        size: Decimal,
    ) -> Result<String, ExchangeError>;
}
