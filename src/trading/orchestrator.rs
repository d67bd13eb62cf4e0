//! Rebalance orchestrator: one full fetch -> decide -> execute -> record cycle.
//!
//! Every invocation produces exactly one [`TradeRecord`], including failed
//! ones, and places at most one order. Storage and notification are left to
//! whoever receives the record.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::api::Exchange;
use crate::error::RebalanceError;
use crate::models::{AccountSnapshot, Decision, OrderOutcome, OrderSide, TradeRecord};

use super::{Config, PositionCalculator};

/// Runs rebalance cycles for one instrument.
pub struct RebalanceOrchestrator {
    exchange: Arc<dyn Exchange>,
    calculator: PositionCalculator,
    instrument: String,
    dry_run: bool,

    // Held for the whole cycle so scheduled and manual runs never overlap.
    in_flight: Mutex<()>,
}

impl RebalanceOrchestrator {
    pub fn new(exchange: Arc<dyn Exchange>, config: &Config) -> Self {
        Self::with_params(
            exchange,
            config.instrument.clone(),
            config.leverage,
            config.min_adjustment,
            config.dry_run,
        )
    }

    pub fn with_params(
        exchange: Arc<dyn Exchange>,
        instrument: String,
        leverage: Decimal,
        min_adjustment: Decimal,
        dry_run: bool,
    ) -> Self {
        Self {
            exchange,
            calculator: PositionCalculator::new(leverage, min_adjustment),
            instrument,
            dry_run,
            in_flight: Mutex::new(()),
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    /// Run one rebalance cycle and return its record.
    pub async fn rebalance(&self) -> TradeRecord {
        let _guard = match self.in_flight.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!(instrument = %self.instrument, "Rebalance already in progress, waiting");
                self.in_flight.lock().await
            }
        };

        let timestamp = Utc::now();
        info!(
            instrument = %self.instrument,
            dry_run = self.dry_run,
            "Starting rebalance"
        );

        let snapshot = match self.fetch_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "Fetching account state failed, aborting cycle");
                return self.record(timestamp, AccountSnapshot::zeroed(), None, OrderOutcome::failed(&e));
            }
        };

        let decision = match self.calculator.calculate(&snapshot) {
            Ok(decision) => decision,
            Err(e) => {
                let e = RebalanceError::from(e);
                error!(error = %e, "Position calculation failed, aborting cycle");
                return self.record(timestamp, snapshot, None, OrderOutcome::failed(&e));
            }
        };

        info!(
            equity = %snapshot.equity,
            price = %snapshot.price,
            current = %snapshot.position,
            target = %decision.target,
            delta = %decision.delta,
            action = %decision.action,
            "Rebalance decision"
        );

        let outcome = match decision.action.side() {
            Some(side) => self.execute(side, decision.order_size()).await,
            None => {
                info!(delta = %decision.delta, "Delta below minimum adjustment, holding");
                OrderOutcome::Held
            }
        };

        self.record(timestamp, snapshot, Some(decision), outcome)
    }

    /// Fetch equity, price and position concurrently; the first failure wins.
    async fn fetch_snapshot(&self) -> Result<AccountSnapshot, RebalanceError> {
        debug!(instrument = %self.instrument, "Fetching account state");

        let (equity, price, position) = futures::try_join!(
            self.exchange.get_equity(),
            self.exchange.get_price(&self.instrument),
            self.exchange.get_position(&self.instrument),
        )?;

        Ok(AccountSnapshot::new(equity, price, position))
    }

    async fn execute(&self, side: OrderSide, size: Decimal) -> OrderOutcome {
        if self.dry_run {
            info!(side = %side, size = %size, "[DRY RUN] Would place market order");
            return OrderOutcome::Simulated { size };
        }

        match self.exchange.place_order(&self.instrument, side, size).await {
            Ok(order_id) => {
                info!(order_id = %order_id, side = %side, size = %size, "Order placed");
                OrderOutcome::Executed { order_id, size }
            }
            Err(e) => {
                let e = RebalanceError::from(e);
                error!(error = %e, side = %side, size = %size, "Order placement failed");
                OrderOutcome::failed(&e)
            }
        }
    }

    fn record(
        &self,
        timestamp: chrono::DateTime<Utc>,
        snapshot: AccountSnapshot,
        decision: Option<Decision>,
        outcome: OrderOutcome,
    ) -> TradeRecord {
        let record = TradeRecord {
            timestamp,
            instrument: self.instrument.clone(),
            snapshot,
            decision,
            outcome,
        };
        debug!(success = record.success(), outcome = record.outcome.as_str(), "Rebalance recorded");
        record
    }
}
