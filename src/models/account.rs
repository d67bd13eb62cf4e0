//! Account snapshot captured at the start of a rebalance.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Equity, price and current position as of one rebalance attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Total account equity in USDT, including unrealized P&L
    pub equity: Decimal,

    /// Last traded price of the instrument in USDT
    pub price: Decimal,

    /// Current position in base-currency units
    pub position: Decimal,
}

impl AccountSnapshot {
    pub fn new(equity: Decimal, price: Decimal, position: Decimal) -> Self {
        Self {
            equity,
            price,
            position,
        }
    }

    /// Snapshot stored on records whose fetch step failed.
    pub fn zeroed() -> Self {
        Self::default()
    }

    /// Notional value of the current position in USDT.
    pub fn notional(&self) -> Decimal {
        self.position * self.price
    }

    /// Current leverage implied by the snapshot, if equity is positive.
    pub fn effective_leverage(&self) -> Option<Decimal> {
        if self.equity > Decimal::ZERO {
            Some(self.notional() / self.equity)
        } else {
            None
        }
    }
}
