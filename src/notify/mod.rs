//! Destinations for trade records.
//!
//! Every rebalance attempt, scheduled or manual, is handed to each sink in
//! turn. A failing sink is logged and skipped; it never changes the outcome
//! of the cycle.

mod telegram;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::models::TradeRecord;

pub use telegram::{TelegramConfig, TelegramNotifier};

#[async_trait]
pub trait TradeSink: Send + Sync {
    fn name(&self) -> &str;

    async fn record(&self, record: &TradeRecord) -> Result<()>;
}

/// Hand a record to every sink, logging failures.
pub async fn publish(record: &TradeRecord, sinks: &[Arc<dyn TradeSink>]) {
    for sink in sinks {
        match sink.record(record).await {
            Ok(()) => debug!(sink = sink.name(), "Record delivered"),
            Err(e) => warn!(sink = sink.name(), error = %e, "Failed to deliver trade record"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;

    use crate::models::{AccountSnapshot, OrderOutcome};

    struct FailingSink;

    #[async_trait]
    impl TradeSink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        async fn record(&self, _record: &TradeRecord) -> Result<()> {
            anyhow::bail!("disk full")
        }
    }

    #[derive(Default)]
    struct Counter(AtomicUsize);

    #[async_trait]
    impl TradeSink for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        async fn record(&self, _record: &TradeRecord) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_block_others() {
        let counter = Arc::new(Counter::default());
        let sinks: Vec<Arc<dyn TradeSink>> = vec![Arc::new(FailingSink), counter.clone()];

        let record = TradeRecord {
            timestamp: Utc::now(),
            instrument: "ETH-USDT-SWAP".to_string(),
            snapshot: AccountSnapshot::zeroed(),
            decision: None,
            outcome: OrderOutcome::Held,
        };

        publish(&record, &sinks).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }
}
