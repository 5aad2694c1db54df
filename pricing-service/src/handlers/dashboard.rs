use crate::models::summarize;
use crate::startup::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use service_core::error::AppError;
use tracing::instrument;

/// Aggregate counts and revenue across all entities.
#[instrument(skip_all)]
pub async fn get_dashboard(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let facts = state.store.dashboard_facts().await?;
    Ok(Json(summarize(facts, Utc::now().date_naive())))
}
