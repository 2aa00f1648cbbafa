use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::risk::RiskLimits;

const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;
const DEFAULT_POSITION_SIZE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("initial capital must be a finite positive amount")]
    InvalidInitialCapital,
    #[error("position size must be a finite fraction in (0, 1]")]
    InvalidPositionSize,
    #[error("stop loss must be a finite fraction in (0, 1)")]
    InvalidStopLoss,
    #[error("take profit must be a finite fraction in (0, 1)")]
    InvalidTakeProfit,
}

/// Validated run parameters for a single portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PortfolioConfig {
    initial_capital: f64,
    position_size: f64,
    risk: RiskLimits,
}

impl PortfolioConfig {
    pub fn new(
        initial_capital: f64,
        position_size: f64,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
    ) -> Result<Self, ConfigError> {
        if !initial_capital.is_finite() || initial_capital <= 0.0 {
            return Err(ConfigError::InvalidInitialCapital);
        }
        if !position_size.is_finite() || position_size <= 0.0 || position_size > 1.0 {
            return Err(ConfigError::InvalidPositionSize);
        }
        if stop_loss.is_some_and(|fraction| !is_open_unit_fraction(fraction)) {
            return Err(ConfigError::InvalidStopLoss);
        }
        if take_profit.is_some_and(|fraction| !is_open_unit_fraction(fraction)) {
            return Err(ConfigError::InvalidTakeProfit);
        }

        Ok(Self {
            initial_capital,
            position_size,
            risk: RiskLimits {
                stop_loss,
                take_profit,
            },
        })
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn position_size(&self) -> f64 {
        self.position_size
    }

    pub fn risk(&self) -> RiskLimits {
        self.risk
    }
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            position_size: DEFAULT_POSITION_SIZE,
            risk: RiskLimits::disabled(),
        }
    }
}

/// Wire form of [`PortfolioConfig`]; validated through `TryFrom`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioConfigInput {
    pub initial_capital: f64,
    #[serde(default = "default_position_size")]
    pub position_size: f64,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub take_profit: Option<f64>,
}

impl TryFrom<PortfolioConfigInput> for PortfolioConfig {
    type Error = ConfigError;

    fn try_from(input: PortfolioConfigInput) -> Result<Self, Self::Error> {
        Self::new(
            input.initial_capital,
            input.position_size,
            input.stop_loss,
            input.take_profit,
        )
    }
}

fn default_position_size() -> f64 {
    DEFAULT_POSITION_SIZE
}

fn is_open_unit_fraction(value: f64) -> bool {
    value.is_finite() && value > 0.0 && value < 1.0
}
