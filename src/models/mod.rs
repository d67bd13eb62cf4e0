//! Data models for account snapshots, rebalance decisions, and trade records.

mod account;
mod decision;
mod trade;

pub use account::AccountSnapshot;
pub use decision::{Action, Decision, OrderSide};
pub use trade::{OrderOutcome, TradeRecord};
