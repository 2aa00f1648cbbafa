use std::collections::HashMap;

use portfolio::{
    is_tradable_price, ConfigError, Portfolio, PortfolioConfig, PricePoint, TradeReason,
};
use strategy::{Signal, SignalPoint};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::logging::{NoopRunLogWriter, RunLogEvent, RunLogEventKind, RunLogWriter};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BacktestError {
    #[error("price series is empty")]
    EmptyInput,
    #[error("price timestamps must be strictly increasing (violated at index {index})")]
    UnorderedInput { index: usize },
    #[error("invalid portfolio configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    #[error("none of the {signal_points} signal timestamps match a price timestamp")]
    MisalignedIndex { signal_points: usize },
}

/// What the driver did on a single step after marking the portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    ForcedExit,
    Signal(Signal),
}

/// Finished run. The portfolio is always flat.
#[derive(Debug, Clone)]
pub struct BacktestRun {
    pub portfolio: Portfolio,
    pub warnings: Vec<BacktestError>,
}

impl BacktestRun {
    /// Fails when the signal series never lined up with the prices.
    pub fn into_aligned(self) -> Result<Self, BacktestError> {
        match self
            .warnings
            .iter()
            .find(|warning| matches!(warning, BacktestError::MisalignedIndex { .. }))
        {
            Some(warning) => Err(warning.clone()),
            None => Ok(self),
        }
    }
}

/// Drives one portfolio through a price series, one step at a time.
pub struct SimEngine {
    portfolio: Portfolio,
    signals: HashMap<OffsetDateTime, Signal>,
    signal_points: usize,
    matched_signals: usize,
    step: u64,
    /// Last step with a tradable close.
    last_price: Option<PricePoint>,
}

impl SimEngine {
    pub fn new(config: PortfolioConfig, signals: &[SignalPoint]) -> Self {
        Self {
            portfolio: Portfolio::new(config),
            signals: signals
                .iter()
                .map(|point| (point.timestamp, point.signal))
                .collect(),
            signal_points: signals.len(),
            matched_signals: 0,
            step: 0,
            last_price: None,
        }
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    /// Mark, then risk check, then signal. A forced exit skips the signal
    /// lookup, so there is no same-step re-entry.
    pub fn step_once(&mut self, point: PricePoint, log: &mut dyn RunLogWriter) -> StepOutcome {
        self.step += 1;
        if is_tradable_price(point.close) {
            self.last_price = Some(point);
        }

        self.portfolio.mark(point.close, point.timestamp);
        log.write(RunLogEvent::new(self.step, RunLogEventKind::StepMarked));

        let signal = self.signals.get(&point.timestamp).copied();
        if signal.is_some() {
            self.matched_signals += 1;
        }

        let trades_before = self.portfolio.trade_log().len();
        if self.portfolio.check_risk(point.close, point.timestamp) {
            if let Some(exit) = self
                .portfolio
                .trade_log()
                .get(trades_before)
                .filter(|exit| exit.reason.is_forced())
            {
                log.write(RunLogEvent::new(
                    self.step,
                    RunLogEventKind::RiskExitTriggered(exit.reason),
                ));
            }
            return StepOutcome::ForcedExit;
        }

        let signal = signal.unwrap_or_default();
        match signal {
            Signal::Buy => self.portfolio.buy(point.close, point.timestamp),
            Signal::Sell => self
                .portfolio
                .sell(point.close, point.timestamp, TradeReason::Signal),
            Signal::Hold => return StepOutcome::Signal(signal),
        }
        if self.portfolio.trade_log().len() > trades_before {
            log.write(RunLogEvent::new(
                self.step,
                RunLogEventKind::SignalApplied(signal),
            ));
        }

        StepOutcome::Signal(signal)
    }

    /// Liquidates any open position at the last tradable price and reports
    /// misaligned signals.
    pub fn finish(mut self, log: &mut dyn RunLogWriter) -> BacktestRun {
        let mut warnings = Vec::new();

        if let Some(last) = self.last_price {
            if self.portfolio.is_long() {
                self.portfolio
                    .sell(last.close, last.timestamp, TradeReason::EndOfBacktest);
                log.write(RunLogEvent::new(
                    self.step,
                    RunLogEventKind::EndOfBacktestLiquidated,
                ));
            }
        }

        if self.signal_points > 0 && self.matched_signals == 0 {
            warn!(
                signal_points = self.signal_points,
                steps = self.step,
                "signal series never matched a price timestamp"
            );
            log.write(RunLogEvent::new(
                self.step,
                RunLogEventKind::MisalignedSignals,
            ));
            warnings.push(BacktestError::MisalignedIndex {
                signal_points: self.signal_points,
            });
        }

        info!(
            steps = self.step,
            trades = self.portfolio.trade_log().len(),
            final_cash = self.portfolio.cash(),
            "backtest finished"
        );

        BacktestRun {
            portfolio: self.portfolio,
            warnings,
        }
    }
}

pub fn run_backtest(
    prices: &[PricePoint],
    signals: &[SignalPoint],
    config: PortfolioConfig,
) -> Result<BacktestRun, BacktestError> {
    run_backtest_with_log(prices, signals, config, &mut NoopRunLogWriter)
}

pub fn run_backtest_with_log(
    prices: &[PricePoint],
    signals: &[SignalPoint],
    config: PortfolioConfig,
    log: &mut dyn RunLogWriter,
) -> Result<BacktestRun, BacktestError> {
    validate_prices(prices)?;

    let mut engine = SimEngine::new(config, signals);
    for point in prices {
        engine.step_once(*point, log);
    }

    Ok(engine.finish(log))
}

fn validate_prices(prices: &[PricePoint]) -> Result<(), BacktestError> {
    if prices.is_empty() {
        return Err(BacktestError::EmptyInput);
    }
    if let Some(position) = prices
        .windows(2)
        .position(|pair| pair[1].timestamp <= pair[0].timestamp)
    {
        return Err(BacktestError::UnorderedInput {
            index: position + 1,
        });
    }

    Ok(())
}
