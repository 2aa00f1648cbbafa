use std::num::NonZeroUsize;

use api::state::AppState;
use axum::{routing::get, Router};

pub fn build_app(max_stored_runs: NonZeroUsize) -> Router {
    api::app_with_state(AppState::with_max_stored_runs(max_stored_runs))
        .route("/health", get(healthcheck))
}

async fn healthcheck() -> &'static str {
    "ok"
}
