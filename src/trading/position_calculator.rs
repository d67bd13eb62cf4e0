//! Target position and rebalance decision.
//!
//! target = round4(equity * leverage / price)
//! delta  = round4(target - current)
//! action = hold if |delta| < threshold, else buy/sell by the sign of delta
//!
//! Rounding is to 4 decimal places, half away from zero. Both values go
//! through the same rounding so `delta` is exactly `target - current` when
//! the current position carries at most 4 decimals.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::CalculationError;
use crate::models::{AccountSnapshot, Action, Decision};

/// Decimal places kept for position sizes.
pub const SIZE_DECIMALS: u32 = 4;

pub fn round4(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(SIZE_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

/// Position (base currency) worth `leverage` times `equity` at `price`.
pub fn target_position(
    equity: Decimal,
    price: Decimal,
    leverage: Decimal,
) -> Result<Decimal, CalculationError> {
    if price <= Decimal::ZERO {
        return Err(CalculationError::NonPositivePrice(price));
    }

    let notional = equity
        .checked_mul(leverage)
        .ok_or(CalculationError::Overflow("notional"))?;
    let target = notional
        .checked_div(price)
        .ok_or(CalculationError::Overflow("target"))?;

    Ok(round4(target))
}

/// Compare the current position with the target and pick an action.
pub fn decide(current: Decimal, target: Decimal, threshold: Decimal) -> Decision {
    let delta = round4(target - current);

    let action = if delta.abs() < threshold {
        Action::Hold
    } else if delta > Decimal::ZERO {
        Action::Buy
    } else if delta < Decimal::ZERO {
        Action::Sell
    } else {
        // Only reachable with a zero threshold and a zero delta.
        Action::Hold
    };

    Decision {
        target,
        delta,
        action,
    }
}

/// Calculator bound to a fixed leverage and minimum adjustment.
#[derive(Debug, Clone, Copy)]
pub struct PositionCalculator {
    leverage: Decimal,
    threshold: Decimal,
}

impl PositionCalculator {
    pub fn new(leverage: Decimal, threshold: Decimal) -> Self {
        Self {
            leverage,
            threshold,
        }
    }

    /// Decision for a snapshot. Fails only when the price is not positive.
    pub fn calculate(&self, snapshot: &AccountSnapshot) -> Result<Decision, CalculationError> {
        let target = target_position(snapshot.equity, snapshot.price, self.leverage)?;
        Ok(decide(snapshot.position, target, self.threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn calc(leverage: Decimal, threshold: Decimal, equity: Decimal, price: Decimal, current: Decimal) -> Decision {
        PositionCalculator::new(leverage, threshold)
            .calculate(&AccountSnapshot::new(equity, price, current))
            .unwrap()
    }

    #[test]
    fn test_scenario_buy() {
        let d = calc(dec!(3), dec!(0.01), dec!(12000), dec!(2100), dec!(15));
        assert_eq!(d.target, dec!(17.1429));
        assert_eq!(d.delta, dec!(2.1429));
        assert_eq!(d.action, Action::Buy);
        assert_eq!(d.order_size(), dec!(2.1429));
    }

    #[test]
    fn test_scenario_sell() {
        let d = calc(dec!(3), dec!(0.01), dec!(12500), dec!(2200), dec!(17.1429));
        assert_eq!(d.target, dec!(17.0455));
        assert_eq!(d.delta, dec!(-0.0974));
        assert_eq!(d.action, Action::Sell);
    }

    #[test]
    fn test_scenario_hold() {
        let d = calc(dec!(3), dec!(0.01), dec!(1000), dec!(2000), dec!(1.5005));
        assert_eq!(d.target, dec!(1.5));
        assert_eq!(d.delta, dec!(-0.0005));
        assert_eq!(d.action, Action::Hold);
    }

    #[test]
    fn test_zero_price_fails() {
        let err = PositionCalculator::new(dec!(3), dec!(0.01))
            .calculate(&AccountSnapshot::new(dec!(1000), dec!(0), dec!(1)))
            .unwrap_err();
        assert_eq!(err, CalculationError::NonPositivePrice(dec!(0)));

        assert!(target_position(dec!(1000), dec!(-5), dec!(3)).is_err());
    }

    #[test]
    fn test_zero_equity_liquidates() {
        let d = calc(dec!(3), dec!(0.01), dec!(0), dec!(2000), dec!(4.2));
        assert_eq!(d.target, Decimal::ZERO);
        assert_eq!(d.delta, dec!(-4.2));
        assert_eq!(d.action, Action::Sell);
    }

    #[test]
    fn test_negative_current_accepted() {
        let d = calc(dec!(1), dec!(0.01), dec!(2000), dec!(2000), dec!(-0.5));
        assert_eq!(d.target, dec!(1));
        assert_eq!(d.delta, dec!(1.5));
        assert_eq!(d.action, Action::Buy);
    }

    #[test]
    fn test_threshold_boundary_trades() {
        // |delta| == threshold is not below it, so the order goes out.
        let d = decide(dec!(1), dec!(1.01), dec!(0.01));
        assert_eq!(d.delta, dec!(0.01));
        assert_eq!(d.action, Action::Buy);

        let d = decide(dec!(1.01), dec!(1), dec!(0.01));
        assert_eq!(d.action, Action::Sell);
    }

    #[test]
    fn test_zero_threshold_zero_delta_holds() {
        let d = decide(dec!(2), dec!(2), Decimal::ZERO);
        assert_eq!(d.delta, Decimal::ZERO);
        assert_eq!(d.action, Action::Hold);
    }

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(round4(dec!(1.00005)), dec!(1.0001));
        assert_eq!(round4(dec!(-1.00005)), dec!(-1.0001));
        assert_eq!(round4(dec!(1.000049)), dec!(1.0000));
    }

    fn cents() -> impl Strategy<Value = Decimal> {
        (0i64..1_000_000_000).prop_map(|v| Decimal::new(v, 2))
    }

    fn positive_price() -> impl Strategy<Value = Decimal> {
        (1i64..100_000_000).prop_map(|v| Decimal::new(v, 2))
    }

    fn leverage() -> impl Strategy<Value = Decimal> {
        (1i64..1000).prop_map(|v| Decimal::new(v, 1))
    }

    fn size4() -> impl Strategy<Value = Decimal> {
        (-10_000_000i64..10_000_000).prop_map(|v| Decimal::new(v, 4))
    }

    proptest! {
        #[test]
        fn prop_target_is_rounded_and_non_negative(
            equity in cents(),
            price in positive_price(),
            lev in leverage(),
        ) {
            let target = target_position(equity, price, lev).unwrap();
            prop_assert_eq!(target, round4(equity * lev / price));
            prop_assert!(target >= Decimal::ZERO);
            prop_assert!(target.scale() <= SIZE_DECIMALS);
        }

        #[test]
        fn prop_delta_consistent_with_target(
            equity in cents(),
            price in positive_price(),
            lev in leverage(),
            current in size4(),
        ) {
            let target = target_position(equity, price, lev).unwrap();
            let d = decide(current, target, dec!(0.01));
            prop_assert_eq!(d.delta, round4(target - current));
            prop_assert_eq!(round4(target - current - d.delta), Decimal::ZERO);
            prop_assert_eq!(target - current, d.delta);
        }

        #[test]
        fn prop_action_matches_threshold(
            target in size4(),
            current in size4(),
            threshold in (0i64..10_000).prop_map(|v| Decimal::new(v, 4)),
        ) {
            let d = decide(current, target, threshold);
            if d.delta.abs() < threshold {
                prop_assert_eq!(d.action, Action::Hold);
            } else if d.delta > Decimal::ZERO {
                prop_assert_eq!(d.action, Action::Buy);
            } else if d.delta < Decimal::ZERO {
                prop_assert_eq!(d.action, Action::Sell);
            }
        }

        #[test]
        fn prop_calculation_is_deterministic(
            equity in cents(),
            price in positive_price(),
            lev in leverage(),
            current in size4(),
        ) {
            let calculator = PositionCalculator::new(lev, dec!(0.01));
            let snapshot = AccountSnapshot::new(equity, price, current);
            prop_assert_eq!(calculator.calculate(&snapshot), calculator.calculate(&snapshot));
        }
    }
}
