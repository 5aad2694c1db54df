use crate::dtos::{AuditLogListParams, AuditLogResponse};
use crate::models::ListAuditLogsFilter;
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use tracing::instrument;
use uuid::Uuid;

/// Audit entries, newest first.
#[instrument(skip_all, fields(action_type = ?params.action_type))]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    Query(params): Query<AuditLogListParams>,
) -> Result<impl IntoResponse, AppError> {
    let logs = state
        .store
        .list_audit_logs(&ListAuditLogsFilter {
            action_type: params.action_type,
        })
        .await?;
    Ok(Json(
        logs.into_iter()
            .map(AuditLogResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[instrument(skip_all, fields(audit_log_id = %id))]
pub async fn get_audit_log(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let log = state
        .store
        .get_audit_log(id)
        .await?
        .ok_or_else(|| AppError::not_found("Audit log"))?;
    Ok(Json(AuditLogResponse::from(log)))
}
