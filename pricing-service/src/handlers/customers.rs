use crate::dtos::{
    CreateCustomerRequest, CustomerDetailResponse, CustomerResponse, SubscriptionResponse,
    UpdateCustomerRequest,
};
use crate::middleware::RequestMeta;
use crate::models::money::to_money;
use crate::models::{
    AuditAction, CustomerStatus, InvoiceStatus, ListCustomersFilter, ListInvoicesFilter,
    ListSubscriptionsFilter, NewAuditLog, NewCustomer, SubscriptionStatus,
};
use crate::services::{audit, record_entity_operation};
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use service_core::error::AppError;
use tracing::instrument;
use uuid::Uuid;

async fn list_with(
    state: &AppState,
    filter: ListCustomersFilter,
) -> Result<Json<Vec<CustomerResponse>>, AppError> {
    let customers = state.store.list_customers(&filter).await?;
    Ok(Json(customers.into_iter().map(CustomerResponse::from).collect()))
}

#[instrument(skip_all)]
pub async fn list_customers(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    list_with(&state, ListCustomersFilter::default()).await
}

#[instrument(skip_all)]
pub async fn list_active_customers(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    list_with(
        &state,
        ListCustomersFilter {
            status: Some(CustomerStatus::Active),
        },
    )
    .await
}

#[instrument(skip_all, fields(email = %req.email))]
pub async fn create_customer(
    State(state): State<AppState>,
    meta: RequestMeta,
    Json(req): Json<CreateCustomerRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate_request()?;

    let customer = state.store.create_customer(&NewCustomer::from(req)).await?;
    let response = CustomerResponse::from(customer);

    tracing::info!(customer_id = %response.id, "Customer created");
    record_entity_operation("customer", "create");

    let mut entry = NewAuditLog::new(
        AuditAction::CustomerCreated,
        format!("Created customer '{}'", response.name),
    );
    entry.customer_id = Some(response.id);
    entry.changes = audit::snapshot(&response);
    audit::record(state.store.as_ref(), &meta, entry).await;

    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip_all, fields(customer_id = %id))]
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let customer = state
        .store
        .get_customer(id)
        .await?
        .ok_or_else(|| AppError::not_found("Customer"))?;

    let subscriptions = state
        .store
        .list_subscriptions(&ListSubscriptionsFilter {
            customer_id: Some(id),
            ..Default::default()
        })
        .await?;
    let active_subscriptions = subscriptions
        .iter()
        .filter(|s| s.subscription.status == SubscriptionStatus::Active)
        .count();

    let paid = state
        .store
        .list_invoices(&ListInvoicesFilter {
            statuses: vec![InvoiceStatus::Paid],
            customer_id: Some(id),
            ..Default::default()
        })
        .await?;
    let total_spent = to_money(
        paid.iter()
            .map(|i| i.invoice.total_amount)
            .sum::<Decimal>(),
    );

    Ok(Json(CustomerDetailResponse {
        customer: CustomerResponse::from(customer),
        subscriptions: subscriptions
            .into_iter()
            .map(SubscriptionResponse::from)
            .collect(),
        active_subscriptions,
        total_spent,
    }))
}

/// Serves both PUT and PATCH; every field is optional.
#[instrument(skip_all, fields(customer_id = %id))]
pub async fn update_customer(
    State(state): State<AppState>,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCustomerRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate_request()?;

    let mut customer = state
        .store
        .get_customer(id)
        .await?
        .ok_or_else(|| AppError::not_found("Customer"))?;
    let before = CustomerResponse::from(customer.clone());

    req.apply(&mut customer);
    let after = CustomerResponse::from(state.store.update_customer(&customer).await?);

    record_entity_operation("customer", "update");

    let mut entry = NewAuditLog::new(
        AuditAction::CustomerUpdated,
        format!("Updated customer '{}'", after.name),
    );
    entry.customer_id = Some(id);
    entry.changes = audit::diff(&before, &after);
    audit::record(state.store.as_ref(), &meta, entry).await;

    Ok(Json(after))
}

/// Deletes the customer together with its subscriptions and their invoices.
#[instrument(skip_all, fields(customer_id = %id))]
pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !state.store.delete_customer(id).await? {
        return Err(AppError::not_found("Customer"));
    }

    tracing::info!(customer_id = %id, "Customer deleted");
    record_entity_operation("customer", "delete");

    Ok(StatusCode::NO_CONTENT)
}
