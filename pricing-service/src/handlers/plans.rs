use crate::dtos::{
    CreatePlanRequest, PlanDetailResponse, PlanResponse, SubscriptionResponse, UpdatePlanRequest,
};
use crate::middleware::RequestMeta;
use crate::models::{AuditAction, ListPlansFilter, ListSubscriptionsFilter, NewAuditLog, NewPlan};
use crate::services::{audit, record_entity_operation};
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

async fn list_with(
    state: &AppState,
    filter: ListPlansFilter,
) -> Result<Json<Vec<PlanResponse>>, AppError> {
    let plans = state.store.list_plans(&filter).await?;
    Ok(Json(plans.into_iter().map(PlanResponse::from).collect()))
}

#[instrument(skip_all)]
pub async fn list_plans(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    list_with(&state, ListPlansFilter::default()).await
}

#[instrument(skip_all)]
pub async fn list_active_plans(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    list_with(
        &state,
        ListPlansFilter {
            active_only: true,
            ..Default::default()
        },
    )
    .await
}

/// Featured plans that are also active.
#[instrument(skip_all)]
pub async fn list_featured_plans(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    list_with(
        &state,
        ListPlansFilter {
            active_only: true,
            featured_only: true,
        },
    )
    .await
}

#[instrument(skip_all, fields(plan_name = %req.name))]
pub async fn create_plan(
    State(state): State<AppState>,
    meta: RequestMeta,
    Json(req): Json<CreatePlanRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let plan = state.store.create_plan(&NewPlan::from(req)).await?;
    let response = PlanResponse::from(plan);

    tracing::info!(plan_id = %response.id, "Pricing plan created");
    record_entity_operation("plan", "create");

    let mut entry = NewAuditLog::new(
        AuditAction::PlanCreated,
        format!("Created plan '{}'", response.name),
    );
    entry.plan_id = Some(response.id);
    entry.changes = audit::snapshot(&response);
    audit::record(state.store.as_ref(), &meta, entry).await;

    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip_all, fields(plan_id = %id))]
pub async fn get_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let plan = state
        .store
        .get_plan(id)
        .await?
        .ok_or_else(|| AppError::not_found("Plan"))?;

    let subscriptions: Vec<SubscriptionResponse> = state
        .store
        .list_subscriptions(&ListSubscriptionsFilter {
            plan_id: Some(id),
            ..Default::default()
        })
        .await?
        .into_iter()
        .map(SubscriptionResponse::from)
        .collect();

    Ok(Json(PlanDetailResponse {
        plan: PlanResponse::from(plan),
        subscription_count: subscriptions.len(),
        subscriptions,
    }))
}

/// Serves both PUT and PATCH; every field is optional.
#[instrument(skip_all, fields(plan_id = %id))]
pub async fn update_plan(
    State(state): State<AppState>,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePlanRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let mut plan = state
        .store
        .get_plan(id)
        .await?
        .ok_or_else(|| AppError::not_found("Plan"))?;
    let before = PlanResponse::from(plan.clone());

    req.apply(&mut plan);
    let after = PlanResponse::from(state.store.update_plan(&plan).await?);

    record_entity_operation("plan", "update");

    let mut entry = NewAuditLog::new(
        AuditAction::PlanUpdated,
        format!("Updated plan '{}'", after.name),
    );
    entry.plan_id = Some(id);
    entry.changes = audit::diff(&before, &after);
    audit::record(state.store.as_ref(), &meta, entry).await;

    Ok(Json(after))
}

#[instrument(skip_all, fields(plan_id = %id))]
pub async fn delete_plan(
    State(state): State<AppState>,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let plan = state
        .store
        .get_plan(id)
        .await?
        .ok_or_else(|| AppError::not_found("Plan"))?;

    if !state.store.delete_plan(id).await? {
        return Err(AppError::not_found("Plan"));
    }

    tracing::info!(plan_id = %id, "Pricing plan deleted");
    record_entity_operation("plan", "delete");

    // The plan row is gone, so the entry keeps only the snapshot.
    let mut entry = NewAuditLog::new(
        AuditAction::PlanDeleted,
        format!("Deleted plan '{}'", plan.name),
    );
    entry.changes = audit::snapshot(&PlanResponse::from(plan));
    audit::record(state.store.as_ref(), &meta, entry).await;

    Ok(StatusCode::NO_CONTENT)
}
