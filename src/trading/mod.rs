//! Rebalancing logic: configuration, sizing, orchestration, scheduling.

mod config;
mod orchestrator;
mod position_calculator;
mod scheduler;

pub use config::{Config, Settings};
pub use orchestrator::RebalanceOrchestrator;
pub use position_calculator::PositionCalculator;
pub use scheduler::{Scheduler, SystemClock};
