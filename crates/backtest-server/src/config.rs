use std::{
    env,
    net::{AddrParseError, SocketAddr},
    num::NonZeroUsize,
    str::FromStr,
};

use api::state::DEFAULT_MAX_STORED_RUNS;

use portfolio::PortfolioConfig;
use runtime::data::{parse_date, DateRange};
use strategy::{CrossoverConfig, StrategyError};

const DEFAULT_LISTEN_PORT: u16 = 8080;
const DEFAULT_MODE: RunMode = RunMode::Run;
const DEFAULT_PRICES_PATH: &str = "data/prices.csv";
const DEFAULT_REPLAY_OUTPUT_PATH: &str = "artifacts/replay.csv";
const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;
const DEFAULT_POSITION_SIZE: f64 = 1.0;

const ENV_MODE: &str = "BACKTEST_MODE";
const ENV_LISTEN_ADDR: &str = "BACKTEST_SERVER_ADDR";
const ENV_PRICES_PATH: &str = "BACKTEST_PRICES_PATH";
const ENV_START: &str = "BACKTEST_START";
const ENV_END: &str = "BACKTEST_END";
const ENV_INITIAL_CAPITAL: &str = "BACKTEST_INITIAL_CAPITAL";
const ENV_POSITION_SIZE: &str = "BACKTEST_POSITION_SIZE";
const ENV_STOP_LOSS: &str = "BACKTEST_STOP_LOSS";
const ENV_TAKE_PROFIT: &str = "BACKTEST_TAKE_PROFIT";
const ENV_SHORT_WINDOW: &str = "BACKTEST_SHORT_WINDOW";
const ENV_LONG_WINDOW: &str = "BACKTEST_LONG_WINDOW";
const ENV_REPLAY_OUTPUT: &str = "BACKTEST_REPLAY_OUTPUT";
const ENV_MAX_STORED_RUNS: &str = "BACKTEST_MAX_STORED_RUNS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Run,
    Serve,
}

impl RunMode {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "run" => Some(Self::Run),
            "serve" => Some(Self::Serve),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Serve => "serve",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: RunMode,
    pub listen_addr: SocketAddr,
    pub prices_path: String,
    pub date_range: DateRange,
    pub portfolio: PortfolioConfig,
    pub crossover: CrossoverConfig,
    pub max_stored_runs: NonZeroUsize,
    pub replay_output_path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("BACKTEST_SERVER_ADDR is not a valid socket address: {0}")]
    InvalidListenAddr(#[source] AddrParseError),
    #[error("BACKTEST_MODE must be one of: run, serve")]
    InvalidMode,
    #[error("{0} must not be empty or whitespace")]
    EmptyPath(&'static str),
    #[error("{0} must be a YYYY-MM-DD date")]
    InvalidDate(&'static str),
    #[error("{0} is not a valid number")]
    InvalidNumber(&'static str),
    #[error("{0} contains non-unicode data")]
    NonUnicode(&'static str),
    #[error("invalid portfolio settings: {0}")]
    InvalidPortfolio(#[from] portfolio::ConfigError),
    #[error("invalid moving average windows: {0}")]
    InvalidCrossover(#[from] StrategyError),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mode = match read_env(ENV_MODE)? {
            Some(value) => RunMode::parse(value.as_str()).ok_or(ConfigError::InvalidMode)?,
            None => DEFAULT_MODE,
        };

        let listen_addr = match read_env(ENV_LISTEN_ADDR)? {
            Some(value) => value.parse().map_err(ConfigError::InvalidListenAddr)?,
            None => SocketAddr::from(([0, 0, 0, 0], DEFAULT_LISTEN_PORT)),
        };

        let prices_path = parse_path_env(ENV_PRICES_PATH, DEFAULT_PRICES_PATH)?;
        let replay_output_path = parse_path_env(ENV_REPLAY_OUTPUT, DEFAULT_REPLAY_OUTPUT_PATH)?;

        let date_range = DateRange {
            start: parse_date_env(ENV_START)?,
            end: parse_date_env(ENV_END)?,
        };

        let portfolio = PortfolioConfig::new(
            parse_number_env(ENV_INITIAL_CAPITAL)?.unwrap_or(DEFAULT_INITIAL_CAPITAL),
            parse_number_env(ENV_POSITION_SIZE)?.unwrap_or(DEFAULT_POSITION_SIZE),
            parse_number_env(ENV_STOP_LOSS)?,
            parse_number_env(ENV_TAKE_PROFIT)?,
        )?;

        let default_crossover = CrossoverConfig::default();
        let crossover = CrossoverConfig::new(
            parse_number_env(ENV_SHORT_WINDOW)?.unwrap_or(default_crossover.short_window()),
            parse_number_env(ENV_LONG_WINDOW)?.unwrap_or(default_crossover.long_window()),
        )?;

        let max_stored_runs =
            parse_number_env(ENV_MAX_STORED_RUNS)?.unwrap_or(DEFAULT_MAX_STORED_RUNS);

        Ok(Self {
            mode,
            listen_addr,
            prices_path,
            date_range,
            portfolio,
            crossover,
            max_stored_runs,
            replay_output_path,
        })
    }
}

fn read_env(key: &'static str) -> Result<Option<String>, ConfigError> {
    match env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::NonUnicode(key)),
    }
}

fn parse_path_env(key: &'static str, default_value: &str) -> Result<String, ConfigError> {
    match read_env(key)? {
        Some(value) if value.trim().is_empty() => Err(ConfigError::EmptyPath(key)),
        Some(value) => Ok(value),
        None => Ok(default_value.to_owned()),
    }
}

fn parse_date_env(key: &'static str) -> Result<Option<time::Date>, ConfigError> {
    read_env(key)?
        .map(|value| parse_date(value.trim()).ok_or(ConfigError::InvalidDate(key)))
        .transpose()
}

fn parse_number_env<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    read_env(key)?
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidNumber(key))
        })
        .transpose()
}
