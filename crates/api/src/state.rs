use std::{
    collections::BTreeMap,
    num::NonZeroUsize,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use portfolio::{EquityPoint, PortfolioConfigInput, PricePoint, TradeRecord};
use runtime::{BacktestRun, PerformanceReport};
use serde::{Deserialize, Serialize};
use strategy::SignalPoint;
use tokio::sync::RwLock;

pub const DEFAULT_MAX_STORED_RUNS: NonZeroUsize = match NonZeroUsize::new(1_000) {
    Some(limit) => limit,
    None => panic!("stored run limit must be non-zero"),
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StartRunError {
    RunIdOverflow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct CrossoverInput {
    #[serde(default = "default_short_window")]
    pub short_window: usize,
    #[serde(default = "default_long_window")]
    pub long_window: usize,
}

impl Default for CrossoverInput {
    fn default() -> Self {
        Self {
            short_window: default_short_window(),
            long_window: default_long_window(),
        }
    }
}

fn default_short_window() -> usize {
    strategy::CrossoverConfig::default().short_window()
}

fn default_long_window() -> usize {
    strategy::CrossoverConfig::default().long_window()
}

/// Body of `POST /backtests`. Without `signals` the crossover strategy
/// generates them from `prices`.
#[derive(Clone, Debug, Deserialize)]
pub struct BacktestRequest {
    pub prices: Vec<PricePoint>,
    #[serde(default)]
    pub signals: Option<Vec<SignalPoint>>,
    #[serde(default)]
    pub crossover: Option<CrossoverInput>,
    pub config: PortfolioConfigInput,
}

#[derive(Clone, Debug, Serialize)]
pub struct BacktestResponse {
    pub run_id: u64,
    pub report: Option<PerformanceReport>,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
    pub warnings: Vec<String>,
}

impl BacktestResponse {
    pub fn from_run(run_id: u64, run: &BacktestRun) -> Self {
        Self {
            run_id,
            report: PerformanceReport::from_portfolio(&run.portfolio),
            trades: run.portfolio.trade_log().to_vec(),
            equity_curve: run.portfolio.equity_curve().to_vec(),
            warnings: run.warnings.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Run ids and finished runs. Each request simulates on its own portfolio;
/// only the results are shared. At most `max_stored_runs` results are kept,
/// the oldest run ids are evicted first.
#[derive(Clone, Debug)]
pub struct AppState {
    next_run_id: Arc<AtomicU64>,
    runs: Arc<RwLock<BTreeMap<u64, BacktestResponse>>>,
    max_stored_runs: NonZeroUsize,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            next_run_id: Arc::default(),
            runs: Arc::default(),
            max_stored_runs: DEFAULT_MAX_STORED_RUNS,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_stored_runs(max_stored_runs: NonZeroUsize) -> Self {
        Self {
            max_stored_runs,
            ..Self::default()
        }
    }

    pub fn start_run(&self) -> Result<u64, StartRunError> {
        let previous = self
            .next_run_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                current.checked_add(1)
            })
            .map_err(|_| StartRunError::RunIdOverflow)?;

        Ok(previous + 1)
    }

    pub async fn store_run(&self, response: BacktestResponse) {
        let mut runs = self.runs.write().await;
        runs.insert(response.run_id, response);
        while runs.len() > self.max_stored_runs.get() {
            runs.pop_first();
        }
    }

    pub async fn run(&self, run_id: u64) -> Option<BacktestResponse> {
        self.runs.read().await.get(&run_id).cloned()
    }
}
