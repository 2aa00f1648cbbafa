use serde::{Deserialize, Serialize};

use crate::records::TradeReason;

/// Fractional stop-loss / take-profit distances from the entry price.
/// `None` disables a limit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskLimits {
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

impl RiskLimits {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.stop_loss.is_some() || self.take_profit.is_some()
    }

    /// Returns the exit reason when `price` breaches a configured limit.
    /// Stop-loss is checked first, so it wins when both thresholds are
    /// crossed in the same step.
    pub fn evaluate(&self, entry_price: f64, price: f64) -> Option<TradeReason> {
        if let Some(stop_loss) = self.stop_loss {
            if price <= entry_price * (1.0 - stop_loss) {
                return Some(TradeReason::StopLoss);
            }
        }
        if let Some(take_profit) = self.take_profit {
            if price >= entry_price * (1.0 + take_profit) {
                return Some(TradeReason::TakeProfit);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::RiskLimits;
    use crate::records::TradeReason;

    #[test]
    fn disabled_limits_never_trigger() {
        let limits = RiskLimits::disabled();

        assert!(!limits.is_enabled());
        assert_eq!(limits.evaluate(100.0, 1.0), None);
        assert_eq!(limits.evaluate(100.0, 1_000.0), None);
    }

    #[test]
    fn stop_loss_triggers_at_threshold_inclusive() {
        let limits = RiskLimits {
            stop_loss: Some(0.05),
            take_profit: None,
        };

        assert_eq!(limits.evaluate(100.0, 95.0), Some(TradeReason::StopLoss));
        assert_eq!(limits.evaluate(100.0, 95.5), None);
    }

    #[test]
    fn take_profit_triggers_at_threshold_inclusive() {
        let limits = RiskLimits {
            stop_loss: None,
            take_profit: Some(0.25),
        };

        assert_eq!(limits.evaluate(100.0, 125.0), Some(TradeReason::TakeProfit));
        assert_eq!(limits.evaluate(100.0, 124.0), None);
    }

    #[test]
    fn stop_loss_wins_when_both_thresholds_are_crossed() {
        // A degenerate entry price makes both inequalities hold at once.
        let limits = RiskLimits {
            stop_loss: Some(0.05),
            take_profit: Some(0.05),
        };

        assert_eq!(limits.evaluate(0.0, 0.0), Some(TradeReason::StopLoss));
        assert_eq!(limits.evaluate(100.0, 94.0), Some(TradeReason::StopLoss));
    }
}
