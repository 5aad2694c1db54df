use crate::dtos::{SettingsRequest, SettingsResponse};
use crate::middleware::RequestMeta;
use crate::models::{AuditAction, NewAuditLog, NewSettings, PricingSettings, SettingsView};
use crate::services::{audit, record_entity_operation};
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use service_core::error::AppError;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

async fn load_view(state: &AppState) -> Result<SettingsView, AppError> {
    state
        .store
        .get_settings()
        .await?
        .ok_or_else(|| AppError::not_found("Pricing settings"))
}

/// Settings that drive subscription and invoice defaults.
///
/// Falls back to unsaved defaults so that writes elsewhere never create the
/// settings record.
pub(crate) async fn current_settings(state: &AppState) -> Result<PricingSettings, AppError> {
    Ok(match state.store.get_settings().await? {
        Some(view) => view.settings,
        None => NewSettings::default().into_settings(Uuid::nil(), Utc::now()),
    })
}

/// Returns the settings record, creating the defaults on first access.
#[instrument(skip_all)]
pub async fn get_settings(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let view = state.store.ensure_settings().await?;
    Ok(Json(SettingsResponse::from(view)))
}

/// Creates the settings record. Fails when one already exists.
#[instrument(skip_all)]
pub async fn create_settings(
    State(state): State<AppState>,
    meta: RequestMeta,
    Json(req): Json<SettingsRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    state.store.create_settings(&req.into_new_settings()).await?;
    let response = SettingsResponse::from(load_view(&state).await?);

    tracing::info!(settings_id = %response.id, "Pricing settings created");
    record_entity_operation("settings", "create");

    let mut entry = NewAuditLog::new(AuditAction::SettingsUpdated, "Created pricing settings");
    entry.plan_id = response.trial_plan;
    entry.changes = audit::snapshot(&response);
    audit::record(state.store.as_ref(), &meta, entry).await;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Serves both PUT and PATCH on the singleton.
#[instrument(skip_all)]
pub async fn update_settings(
    State(state): State<AppState>,
    meta: RequestMeta,
    Json(req): Json<SettingsRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let view = state.store.ensure_settings().await?;
    let before = SettingsResponse::from(view.clone());
    let mut settings = view.settings;

    req.apply(&mut settings);
    state.store.update_settings(&settings).await?;
    let after = SettingsResponse::from(load_view(&state).await?);

    record_entity_operation("settings", "update");

    let mut entry = NewAuditLog::new(AuditAction::SettingsUpdated, "Updated pricing settings");
    entry.plan_id = after.trial_plan;
    entry.changes = audit::diff(&before, &after);
    audit::record(state.store.as_ref(), &meta, entry).await;

    Ok(Json(after))
}
