mod config;
mod wiring;

use std::error::Error;
use std::fs::{self, File};
use std::path::Path;

use runtime::data::load_prices;
use runtime::logging::TracingRunLogWriter;
use runtime::replay::ReplayCsvWriter;
use runtime::{run_backtest_with_log, BacktestRun, PerformanceReport};
use strategy::generate_signals;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, RunMode};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    info!(mode = config.mode.as_str(), "starting backtest server");

    match config.mode {
        RunMode::Run => {
            let run = run_from_config(&config)?;
            match PerformanceReport::from_portfolio(&run.portfolio) {
                Some(report) => println!("{report}"),
                None => println!("No history to report."),
            }
        }
        RunMode::Serve => {
            let listener = TcpListener::bind(config.listen_addr).await?;
            info!(addr = %config.listen_addr, "listening");
            axum::serve(listener, wiring::build_app(config.max_stored_runs)).await?;
        }
    }

    Ok(())
}

/// Loads the configured price history, runs the crossover strategy over it
/// and writes the replay artifact.
fn run_from_config(config: &Config) -> Result<BacktestRun, Box<dyn Error>> {
    let prices = load_prices(&config.prices_path, config.date_range)?;
    info!(rows = prices.len(), path = %config.prices_path, "loaded price history");

    config.crossover.ensure_history(prices.len())?;
    let series = generate_signals(&prices, config.crossover);
    let mut log = TracingRunLogWriter;
    let run = run_backtest_with_log(&series.prices, &series.signals, config.portfolio, &mut log)?;
    for warning in &run.warnings {
        warn!(%warning, "backtest completed with warning");
    }

    write_replay_output(&config.replay_output_path, &run, &mut log)?;
    info!(path = %config.replay_output_path, "wrote replay artifact");
    Ok(run)
}

fn write_replay_output(
    path: &str,
    run: &BacktestRun,
    log: &mut TracingRunLogWriter,
) -> Result<(), std::io::Error> {
    let replay_path = Path::new(path);

    if let Some(parent) = replay_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        fs::create_dir_all(parent)?;
    }

    let replay_file = File::create(replay_path)?;
    let mut replay_writer = ReplayCsvWriter::new(replay_file);
    replay_writer.write_run_and_log(&run.portfolio, log)
}
