//! Rebalance decision produced by the position calculator.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order direction sent to the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the rebalance should do with the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "buy",
            Action::Sell => "sell",
            Action::Hold => "hold",
        }
    }

    /// Order side for actions that trade, `None` for hold.
    pub fn side(&self) -> Option<OrderSide> {
        match self {
            Action::Buy => Some(OrderSide::Buy),
            Action::Sell => Some(OrderSide::Sell),
            Action::Hold => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target position and the adjustment needed to reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Desired position in base-currency units
    pub target: Decimal,

    /// `target - current`, rounded to 4 decimals
    pub delta: Decimal,

    pub action: Action,
}

impl Decision {
    /// Size of the order this decision asks for (zero when holding).
    pub fn order_size(&self) -> Decimal {
        match self.action {
            Action::Hold => Decimal::ZERO,
            Action::Buy | Action::Sell => self.delta.abs(),
        }
    }
}
