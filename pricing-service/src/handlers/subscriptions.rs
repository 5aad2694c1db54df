use crate::dtos::{
    CreateSubscriptionRequest, CustomerResponse, InvoiceResponse, PlanResponse,
    SubscriptionDetailResponse, SubscriptionResponse, UpdateSubscriptionRequest,
};
use crate::handlers::settings::current_settings;
use crate::middleware::RequestMeta;
use crate::models::{
    usage_percentage, AuditAction, ListInvoicesFilter, ListSubscriptionsFilter, NewAuditLog,
    NewSubscription, SubscriptionStatus, SubscriptionView,
};
use crate::services::{audit, record_entity_operation};
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Duration;
use service_core::error::AppError;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

async fn load_view(state: &AppState, id: Uuid) -> Result<SubscriptionView, AppError> {
    state
        .store
        .get_subscription(id)
        .await?
        .ok_or_else(|| AppError::not_found("Subscription"))
}

async fn list_with(
    state: &AppState,
    filter: ListSubscriptionsFilter,
) -> Result<Json<Vec<SubscriptionResponse>>, AppError> {
    let subscriptions = state.store.list_subscriptions(&filter).await?;
    Ok(Json(
        subscriptions
            .into_iter()
            .map(SubscriptionResponse::from)
            .collect(),
    ))
}

#[instrument(skip_all)]
pub async fn list_subscriptions(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    list_with(&state, ListSubscriptionsFilter::default()).await
}

#[instrument(skip_all)]
pub async fn list_active_subscriptions(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    list_with(
        &state,
        ListSubscriptionsFilter {
            status: Some(SubscriptionStatus::Active),
            ..Default::default()
        },
    )
    .await
}

/// Creates a subscription, applying the trial length and custom pricing
/// policy from the pricing settings.
#[instrument(skip_all, fields(customer_id = %req.customer, plan_id = %req.plan))]
pub async fn create_subscription(
    State(state): State<AppState>,
    meta: RequestMeta,
    Json(req): Json<CreateSubscriptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let settings = current_settings(&state).await?;
    if req.custom_price.is_some() && !settings.allow_custom_pricing {
        return Err(AppError::invalid_field(
            "custom_price",
            "custom_pricing_disabled",
            "Custom pricing is disabled.",
        ));
    }

    let mut input = NewSubscription::from(req);
    if input.status == SubscriptionStatus::Trial && input.trial_end_date.is_none() {
        input.trial_end_date =
            Some(input.start_date + Duration::days(i64::from(settings.trial_days)));
    }

    let created = state.store.create_subscription(&input).await?;
    let response = SubscriptionResponse::from(load_view(&state, created.id).await?);

    tracing::info!(subscription_id = %response.id, status = %response.status, "Subscription created");
    record_entity_operation("subscription", "create");

    let mut entry = NewAuditLog::new(
        AuditAction::SubscriptionCreated,
        format!(
            "Subscribed '{}' to plan '{}'",
            response.customer_name, response.plan_name
        ),
    );
    entry.subscription_id = Some(response.id);
    entry.customer_id = Some(response.customer);
    entry.plan_id = Some(response.plan);
    entry.changes = audit::snapshot(&response);
    audit::record(state.store.as_ref(), &meta, entry).await;

    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip_all, fields(subscription_id = %id))]
pub async fn get_subscription(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = load_view(&state, id).await?;
    let effective_price = view.effective_price();
    let subscription = view.subscription;

    let customer = state
        .store
        .get_customer(subscription.customer_id)
        .await?
        .ok_or_else(|| AppError::not_found("Customer"))?;
    let plan = state
        .store
        .get_plan(subscription.plan_id)
        .await?
        .ok_or_else(|| AppError::not_found("Plan"))?;
    let invoices = state
        .store
        .list_invoices(&ListInvoicesFilter {
            subscription_id: Some(id),
            ..Default::default()
        })
        .await?;

    let usage = usage_percentage(
        subscription.current_loan_applications,
        plan.max_loan_applications,
    );

    Ok(Json(SubscriptionDetailResponse {
        id: subscription.id,
        customer: CustomerResponse::from(customer),
        plan: PlanResponse::from(plan),
        status: subscription.status,
        start_date: subscription.start_date,
        end_date: subscription.end_date,
        trial_end_date: subscription.trial_end_date,
        custom_price: subscription.custom_price,
        discount_percentage: subscription.discount_percentage,
        current_loan_applications: subscription.current_loan_applications,
        current_users: subscription.current_users,
        current_storage_gb: subscription.current_storage_gb,
        effective_price,
        usage_percentage: usage,
        invoices: invoices.into_iter().map(InvoiceResponse::from).collect(),
        created_at: subscription.created_at,
        updated_at: subscription.updated_at,
    }))
}

/// Serves both PUT and PATCH. Moving to `cancelled` is audited as a
/// cancellation.
#[instrument(skip_all, fields(subscription_id = %id))]
pub async fn update_subscription(
    State(state): State<AppState>,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateSubscriptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate_request()?;

    let view = load_view(&state, id).await?;
    let before = SubscriptionResponse::from(view.clone());
    let mut subscription = view.subscription;
    let previous_status = subscription.status;

    req.apply(&mut subscription);
    state.store.update_subscription(&subscription).await?;
    let after = SubscriptionResponse::from(load_view(&state, id).await?);

    let cancelled = after.status == SubscriptionStatus::Cancelled
        && previous_status != SubscriptionStatus::Cancelled;
    let (action, description) = if cancelled {
        tracing::info!("Subscription cancelled");
        (
            AuditAction::SubscriptionCancelled,
            format!("Cancelled subscription of '{}' to '{}'", after.customer_name, after.plan_name),
        )
    } else {
        (
            AuditAction::SubscriptionUpdated,
            format!("Updated subscription of '{}' to '{}'", after.customer_name, after.plan_name),
        )
    };
    record_entity_operation("subscription", "update");

    let mut entry = NewAuditLog::new(action, description);
    entry.subscription_id = Some(id);
    entry.customer_id = Some(after.customer);
    entry.plan_id = Some(after.plan);
    entry.changes = audit::diff(&before, &after);
    audit::record(state.store.as_ref(), &meta, entry).await;

    Ok(Json(after))
}

#[instrument(skip_all, fields(subscription_id = %id))]
pub async fn delete_subscription(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !state.store.delete_subscription(id).await? {
        return Err(AppError::not_found("Subscription"));
    }

    tracing::info!("Subscription deleted");
    record_entity_operation("subscription", "delete");

    Ok(StatusCode::NO_CONTENT)
}
