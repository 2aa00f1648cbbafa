use portfolio::PricePoint;
use serde::Serialize;
use thiserror::Error;

use crate::signal::{Signal, SignalPoint};

const DEFAULT_SHORT_WINDOW: usize = 50;
const DEFAULT_LONG_WINDOW: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StrategyError {
    #[error("moving average windows must be non-zero")]
    ZeroWindow,
    #[error("short window ({short}) must be smaller than long window ({long})")]
    WindowOrder { short: usize, long: usize },
    #[error("{rows} price rows cannot fill the {long_window}-row long moving average")]
    InsufficientHistory { rows: usize, long_window: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CrossoverConfig {
    short_window: usize,
    long_window: usize,
}

impl CrossoverConfig {
    pub fn new(short_window: usize, long_window: usize) -> Result<Self, StrategyError> {
        if short_window == 0 || long_window == 0 {
            return Err(StrategyError::ZeroWindow);
        }
        if short_window >= long_window {
            return Err(StrategyError::WindowOrder {
                short: short_window,
                long: long_window,
            });
        }

        Ok(Self {
            short_window,
            long_window,
        })
    }

    pub fn short_window(&self) -> usize {
        self.short_window
    }

    pub fn long_window(&self) -> usize {
        self.long_window
    }

    /// Fails when `rows` prices leave no row with both averages defined.
    pub fn ensure_history(&self, rows: usize) -> Result<(), StrategyError> {
        if rows < self.long_window {
            return Err(StrategyError::InsufficientHistory {
                rows,
                long_window: self.long_window,
            });
        }
        Ok(())
    }
}

impl Default for CrossoverConfig {
    fn default() -> Self {
        Self {
            short_window: DEFAULT_SHORT_WINDOW,
            long_window: DEFAULT_LONG_WINDOW,
        }
    }
}

/// Prices trimmed to the rows where both averages exist, with one signal
/// per kept row.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossoverSeries {
    pub prices: Vec<PricePoint>,
    pub signals: Vec<SignalPoint>,
}

/// Trailing mean over `window` values; `None` until the window fills.
///
/// Each window is summed on its own so rounding never carries across rows,
/// and a window of identical values averages to exactly that value.
pub fn simple_moving_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 || values.len() < window {
        return vec![None; values.len()];
    }

    let mut averages = vec![None; window - 1];
    averages.extend(values.windows(window).map(|slice| Some(window_mean(slice))));
    averages
}

fn window_mean(slice: &[f64]) -> f64 {
    let first = slice[0];
    if slice.iter().all(|value| *value == first) {
        return first;
    }
    slice.iter().sum::<f64>() / slice.len() as f64
}

/// Turns aligned short/long averages into lagged crossover signals.
///
/// Position is long while the short average is above the long one. The
/// position change on row `i` is emitted on row `i + 1`, so a decision made
/// on a close is only acted on at the next step.
pub fn crossover_signals(short_averages: &[f64], long_averages: &[f64]) -> Vec<Signal> {
    let positions: Vec<i8> = short_averages
        .iter()
        .zip(long_averages)
        .map(|(short, long)| i8::from(short > long))
        .collect();

    let changes: Vec<Option<i8>> = (0..positions.len())
        .map(|index| index.checked_sub(1).map(|prev| positions[index] - positions[prev]))
        .collect();

    (0..positions.len())
        .map(|index| {
            index
                .checked_sub(1)
                .and_then(|prev| changes[prev])
                .map_or(Signal::Hold, Signal::from_position_change)
        })
        .collect()
}

pub fn generate_signals(prices: &[PricePoint], config: CrossoverConfig) -> CrossoverSeries {
    let closes: Vec<f64> = prices.iter().map(|point| point.close).collect();
    let short = simple_moving_average(&closes, config.short_window);
    let long = simple_moving_average(&closes, config.long_window);

    let warm_rows: Vec<(PricePoint, f64, f64)> = prices
        .iter()
        .zip(short.iter().zip(&long))
        .filter_map(|(point, averages)| match averages {
            (Some(short), Some(long)) => Some((*point, *short, *long)),
            _ => None,
        })
        .collect();

    let short_averages: Vec<f64> = warm_rows.iter().map(|(_, short, _)| *short).collect();
    let long_averages: Vec<f64> = warm_rows.iter().map(|(_, _, long)| *long).collect();
    let signals = crossover_signals(&short_averages, &long_averages);

    CrossoverSeries {
        signals: warm_rows
            .iter()
            .zip(signals)
            .map(|((point, _, _), signal)| SignalPoint::new(point.timestamp, signal))
            .collect(),
        prices: warm_rows.into_iter().map(|(point, _, _)| point).collect(),
    }
}
