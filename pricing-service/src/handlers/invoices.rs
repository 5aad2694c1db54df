use crate::dtos::{CreateInvoiceRequest, InvoiceResponse, UpdateInvoiceRequest};
use crate::handlers::settings::current_settings;
use crate::middleware::RequestMeta;
use crate::models::{AuditAction, InvoiceStatus, InvoiceView, ListInvoicesFilter, NewAuditLog};
use crate::services::{audit, record_entity_operation};
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

async fn load_view(state: &AppState, id: Uuid) -> Result<InvoiceView, AppError> {
    state
        .store
        .get_invoice(id)
        .await?
        .ok_or_else(|| AppError::not_found("Invoice"))
}

async fn list_with(
    state: &AppState,
    filter: ListInvoicesFilter,
) -> Result<Json<Vec<InvoiceResponse>>, AppError> {
    let invoices = state.store.list_invoices(&filter).await?;
    Ok(Json(invoices.into_iter().map(InvoiceResponse::from).collect()))
}

#[instrument(skip_all)]
pub async fn list_invoices(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    list_with(&state, ListInvoicesFilter::default()).await
}

/// Draft and sent invoices.
#[instrument(skip_all)]
pub async fn list_pending_invoices(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    list_with(&state, ListInvoicesFilter::pending()).await
}

/// Creates an invoice. Number, dates and total default from the pricing
/// settings when omitted.
#[instrument(skip_all, fields(subscription_id = %req.subscription))]
pub async fn create_invoice(
    State(state): State<AppState>,
    meta: RequestMeta,
    Json(req): Json<CreateInvoiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let settings = current_settings(&state).await?;
    let input = req.into_new_invoice(&settings, Utc::now())?;

    let created = state.store.create_invoice(&input).await?;
    let response = InvoiceResponse::from(load_view(&state, created.id).await?);

    tracing::info!(
        invoice_id = %response.id,
        invoice_number = %response.invoice_number,
        "Invoice created"
    );
    record_entity_operation("invoice", "create");

    let mut entry = NewAuditLog::new(
        AuditAction::InvoiceCreated,
        format!(
            "Created invoice {} for '{}'",
            response.invoice_number, response.customer_name
        ),
    );
    entry.invoice_id = Some(response.id);
    entry.subscription_id = Some(response.subscription_id);
    entry.changes = audit::snapshot(&response);
    audit::record(state.store.as_ref(), &meta, entry).await;

    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip_all, fields(invoice_id = %id))]
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(InvoiceResponse::from(load_view(&state, id).await?)))
}

/// Serves both PUT and PATCH. Only the move to `paid` is audited.
#[instrument(skip_all, fields(invoice_id = %id))]
pub async fn update_invoice(
    State(state): State<AppState>,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateInvoiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let view = load_view(&state, id).await?;
    let before = InvoiceResponse::from(view.clone());
    let mut invoice = view.invoice;
    let previous_status = invoice.status;

    req.apply(&mut invoice, Utc::now());
    state.store.update_invoice(&invoice).await?;
    let after = InvoiceResponse::from(load_view(&state, id).await?);

    record_entity_operation("invoice", "update");

    if after.status == InvoiceStatus::Paid && previous_status != InvoiceStatus::Paid {
        tracing::info!(total_amount = %after.total_amount, "Invoice paid");

        let mut entry = NewAuditLog::new(
            AuditAction::InvoicePaid,
            format!("Invoice {} marked as paid", after.invoice_number),
        );
        entry.invoice_id = Some(id);
        entry.subscription_id = Some(after.subscription_id);
        entry.changes = audit::diff(&before, &after);
        audit::record(state.store.as_ref(), &meta, entry).await;
    }

    Ok(Json(after))
}

#[instrument(skip_all, fields(invoice_id = %id))]
pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !state.store.delete_invoice(id).await? {
        return Err(AppError::not_found("Invoice"));
    }

    record_entity_operation("invoice", "delete");
    Ok(StatusCode::NO_CONTENT)
}
