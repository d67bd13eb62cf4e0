//! Trade record produced once per rebalance attempt.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, RebalanceError};

use super::{AccountSnapshot, Decision};

/// How the execution step of a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OrderOutcome {
    /// Delta below threshold, no order needed.
    Held,

    /// Order accepted by the exchange.
    Executed {
        order_id: String,
        /// Requested size in base units, before lot rounding. Not the filled size.
        size: Decimal,
    },

    /// Dry run: the order was computed but not submitted.
    Simulated { size: Decimal },

    /// Fetch, calculation or order placement failed.
    Failed { kind: ErrorKind, error: String },
}

impl OrderOutcome {
    pub fn failed(err: &RebalanceError) -> Self {
        OrderOutcome::Failed {
            kind: err.kind(),
            error: err.to_string(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderOutcome::Held => "held",
            OrderOutcome::Executed { .. } => "executed",
            OrderOutcome::Simulated { .. } => "simulated",
            OrderOutcome::Failed { .. } => "failed",
        }
    }
}

/// Immutable result of one rebalance attempt, handed to journal and notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// When the attempt started
    pub timestamp: DateTime<Utc>,

    /// Instrument being rebalanced (e.g. "ETH-USDT-SWAP")
    pub instrument: String,

    /// Fetched account state; zeroed when the fetch step failed
    pub snapshot: AccountSnapshot,

    /// Absent when the cycle failed before a decision was made
    pub decision: Option<Decision>,

    pub outcome: OrderOutcome,
}

impl TradeRecord {
    pub fn success(&self) -> bool {
        !matches!(self.outcome, OrderOutcome::Failed { .. })
    }

    pub fn order_id(&self) -> Option<&str> {
        match &self.outcome {
            OrderOutcome::Executed { order_id, .. } => Some(order_id),
            _ => None,
        }
    }

    pub fn order_size(&self) -> Option<Decimal> {
        match &self.outcome {
            OrderOutcome::Executed { size, .. } | OrderOutcome::Simulated { size } => Some(*size),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            OrderOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.outcome {
            OrderOutcome::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for TradeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Rebalance {} ===", self.instrument)?;
        writeln!(f, "Time:      {}", self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(f, "Equity:    {} USDT", self.snapshot.equity)?;
        writeln!(f, "Price:     {} USDT", self.snapshot.price)?;
        writeln!(f, "Position:  {}", self.snapshot.position)?;
        if let Some(leverage) = self.snapshot.effective_leverage() {
            writeln!(f, "Leverage:  {:.2}x", leverage)?;
        }
        if let Some(d) = &self.decision {
            writeln!(f, "Target:    {}", d.target)?;
            writeln!(f, "Delta:     {}", d.delta)?;
            writeln!(f, "Action:    {}", d.action)?;
        }
        match &self.outcome {
            OrderOutcome::Held => write!(f, "Result:    no adjustment needed"),
            OrderOutcome::Executed { order_id, size } => {
                write!(f, "Result:    order {} filled for {}", order_id, size)
            }
            OrderOutcome::Simulated { size } => {
                write!(f, "Result:    [DRY RUN] would trade {}", size)
            }
            OrderOutcome::Failed { kind, error } => {
                write!(f, "Result:    FAILED ({}): {}", kind.as_str(), error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CalculationError;
    use crate::models::Action;
    use rust_decimal_macros::dec;

    fn record(outcome: OrderOutcome) -> TradeRecord {
        TradeRecord {
            timestamp: Utc::now(),
            instrument: "ETH-USDT-SWAP".to_string(),
            snapshot: AccountSnapshot::new(dec!(12000), dec!(2100), dec!(15)),
            decision: Some(Decision {
                target: dec!(17.1429),
                delta: dec!(2.1429),
                action: Action::Buy,
            }),
            outcome,
        }
    }

    #[test]
    fn test_executed_record_fields() {
        let rec = record(OrderOutcome::Executed {
            order_id: "612345".to_string(),
            size: dec!(2.1429),
        });

        assert!(rec.success());
        assert_eq!(rec.order_id(), Some("612345"));
        assert_eq!(rec.order_size(), Some(dec!(2.1429)));
        assert_eq!(rec.error(), None);
        assert!(rec.to_string().contains("Leverage:  2.6"));
    }

    #[test]
    fn test_failed_record_fields() {
        let err: RebalanceError = CalculationError::NonPositivePrice(dec!(0)).into();
        let rec = record(OrderOutcome::failed(&err));

        assert!(!rec.success());
        assert_eq!(rec.order_id(), None);
        assert_eq!(rec.order_size(), None);
        assert_eq!(rec.error_kind(), Some(ErrorKind::Calculation));
        assert!(rec.error().unwrap().contains("price must be positive"));
        assert!(rec.to_string().contains("FAILED (calculation)"));
    }

    #[test]
    fn test_simulated_counts_as_success() {
        let rec = record(OrderOutcome::Simulated { size: dec!(2.1429) });
        assert!(rec.success());
        assert_eq!(rec.order_size(), Some(dec!(2.1429)));
        assert_eq!(rec.order_id(), None);
    }
}
