pub mod crossover;
pub mod signal;

pub use crossover::{
    crossover_signals, generate_signals, simple_moving_average, CrossoverConfig,
    CrossoverSeries, StrategyError,
};
pub use signal::{Signal, SignalPoint};
