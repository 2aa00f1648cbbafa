use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use portfolio::{ConfigError, PortfolioConfig};
use runtime::{run_backtest, BacktestError};
use serde::Serialize;
use strategy::{generate_signals, CrossoverConfig, StrategyError};
use thiserror::Error;
use tracing::{info, warn};

use crate::state::{AppState, BacktestRequest, BacktestResponse, StartRunError};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/backtests", post(start_backtest))
        .route("/backtests/:run_id", get(get_backtest))
        .with_state(state)
}

#[derive(Debug, Error)]
enum ApiError {
    #[error(transparent)]
    Backtest(#[from] BacktestError),
    #[error(transparent)]
    Strategy(#[from] StrategyError),
    #[error("run id space exhausted")]
    RunIdOverflow,
    #[error("backtest run {0} not found")]
    NotFound(u64),
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        Self::Backtest(BacktestError::InvalidConfiguration(err))
    }
}

impl From<StartRunError> for ApiError {
    fn from(err: StartRunError) -> Self {
        match err {
            StartRunError::RunIdOverflow => Self::RunIdOverflow,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::Backtest(_) | Self::Strategy(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RunIdOverflow => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        };
        let body = ErrorResponse {
            error: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

async fn start_backtest(
    State(state): State<AppState>,
    Json(request): Json<BacktestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let config = PortfolioConfig::try_from(request.config)?;

    let (prices, signals) = match request.signals {
        Some(signals) => (request.prices, signals),
        None => {
            let crossover = request.crossover.unwrap_or_default();
            let crossover = CrossoverConfig::new(crossover.short_window, crossover.long_window)?;
            crossover.ensure_history(request.prices.len())?;
            let series = generate_signals(&request.prices, crossover);
            (series.prices, series.signals)
        }
    };

    let run = run_backtest(&prices, &signals, config)?;
    for warning in &run.warnings {
        warn!(%warning, "backtest completed with warning");
    }

    let run_id = state.start_run()?;
    let response = BacktestResponse::from_run(run_id, &run);
    info!(run_id, trades = response.trades.len(), "stored backtest run");
    state.store_run(response.clone()).await;

    let location = format!("/backtests/{run_id}");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(response),
    ))
}

async fn get_backtest(
    State(state): State<AppState>,
    Path(run_id): Path<u64>,
) -> Result<Json<BacktestResponse>, ApiError> {
    state
        .run(run_id)
        .await
        .map(Json)
        .ok_or(ApiError::NotFound(run_id))
}
