//! Handlers for the `/invoices` resource.
//!
//! Reads apply the overdue projection; nothing here persists `overdue`
//! on its own.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use buildtrack_core::cost::{parse_required_cost, CostInput};
use buildtrack_core::error::CoreError;
use buildtrack_core::invoice::{
    ensure_deletable, fallback_invoice_number, format_invoice_number, InvoiceStatus,
    PaymentMethod,
};
use buildtrack_core::notification::NotificationEvent;
use buildtrack_core::project::{authorize, ProjectAccess};
use buildtrack_core::types::{DbId, Timestamp};
use buildtrack_core::validation::validate_input;
use buildtrack_db::models::invoice::{CreateInvoice, Invoice};
use buildtrack_db::repositories::{InvoiceRepo, OutboxRepo};
use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

use super::{load_authorized_project, load_project, project_clients};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireManager;
use crate::query::ProjectFilter;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /invoices`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    #[serde(alias = "projectId")]
    pub project_id: DbId,
    pub amount: Option<CostInput>,
    #[validate(length(min = 1, max = 2000))]
    pub description: String,
    pub due_date: Timestamp,
    pub payment: PaymentMethod,
}

/// Request body for `PUT /invoices/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

async fn load_invoice(state: &AppState, id: DbId) -> AppResult<Invoice> {
    InvoiceRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Invoice",
            id,
        }))
}

/// GET /api/v1/invoices?projectId=
///
/// Callers without access to the project get an empty list.
pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<ProjectFilter>,
) -> AppResult<Json<DataResponse<Vec<Invoice>>>> {
    let project = load_project(&state.pool, filter.project_id).await?;
    if authorize(auth.user_id, &auth.role, &project.members(), ProjectAccess::View).is_err() {
        return Ok(Json(DataResponse { data: Vec::new() }));
    }

    let now = Utc::now();
    let invoices = InvoiceRepo::list_by_project(&state.pool, project.id)
        .await?
        .into_iter()
        .map(|inv| inv.with_display_status(now))
        .collect();
    Ok(Json(DataResponse { data: invoices }))
}

/// POST /api/v1/invoices
///
/// Numbers the invoice after the project's last issued number, addresses it to
/// the project's clients, and records the creation event for delivery.
pub async fn create(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Json(input): Json<CreateInvoiceRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Invoice>>)> {
    validate_input(&input)?;
    let amount = parse_required_cost("amount", input.amount.as_ref())?;
    if amount <= 0 {
        return Err(AppError::Core(CoreError::Validation(
            "amount must be greater than zero".into(),
        )));
    }
    input.payment.validate()?;

    let project =
        load_authorized_project(&state.pool, &auth, input.project_id, ProjectAccess::Manage)
            .await?;
    let clients = project_clients(&state.pool, &project)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(project_id = project.id, error = %e, "Could not resolve invoice recipients");
            Vec::new()
        });

    let invoice_number = match InvoiceRepo::last_issued_number(&state.pool, project.id).await {
        Ok(last) => format_invoice_number(last),
        Err(e) => {
            tracing::warn!(project_id = project.id, error = %e, "Invoice number lookup failed, using fallback number");
            fallback_invoice_number(Utc::now())
        }
    };

    let (payment_link, bank_details) = match input.payment {
        PaymentMethod::Link { url } => (Some(url), None),
        PaymentMethod::BankTransfer(bank) => (None, Some(bank)),
    };
    let create = CreateInvoice {
        project_id: project.id,
        invoice_number,
        tx_ref: format!("bt-{}-{}", project.id, uuid::Uuid::new_v4().simple()),
        amount,
        description: input.description.trim().to_string(),
        due_date: input.due_date,
        payment_link,
        bank_details,
        sent_to: clients
            .iter()
            .map(|c| c.email.trim())
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .collect(),
        created_by: auth.user_id,
    };

    let mut tx = state.pool.begin().await?;
    let invoice = InvoiceRepo::create(&mut tx, &create).await?;
    let event = NotificationEvent::InvoiceCreated {
        project_id: project.id,
        project_name: project.name.clone(),
        invoice_id: invoice.id,
        invoice_number: invoice.invoice_number.clone(),
        amount: invoice.amount,
        due_date: invoice.due_date,
        clients,
    };
    let event_id = OutboxRepo::enqueue(&mut tx, &event, Some(auth.user_id)).await?;
    tx.commit().await?;
    state.wake_outbox();

    tracing::info!(
        project_id = project.id,
        invoice_id = invoice.id,
        invoice_number = %invoice.invoice_number,
        event_id,
        "Invoice created",
    );

    let invoice = invoice.with_display_status(Utc::now());
    Ok((StatusCode::CREATED, Json(DataResponse { data: invoice })))
}

/// GET /api/v1/invoices/{id}
pub async fn get_by_id(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Invoice>>> {
    let invoice = load_invoice(&state, id).await?;
    load_authorized_project(&state.pool, &auth, invoice.project_id, ProjectAccess::View).await?;
    Ok(Json(DataResponse {
        data: invoice.with_display_status(Utc::now()),
    }))
}

/// PUT /api/v1/invoices/{id}/status
///
/// Overwrites the stored status. No transition rules apply.
pub async fn update_status(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateStatusRequest>,
) -> AppResult<Json<DataResponse<Invoice>>> {
    let status = InvoiceStatus::parse(input.status.trim())?;
    let invoice = load_invoice(&state, id).await?;
    load_authorized_project(&state.pool, &auth, invoice.project_id, ProjectAccess::Manage)
        .await?;

    let updated = InvoiceRepo::update_status(&state.pool, id, status)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Invoice",
            id,
        }))?;
    tracing::info!(invoice_id = id, status = status.as_str(), "Invoice status updated");

    Ok(Json(DataResponse {
        data: updated.with_display_status(Utc::now()),
    }))
}

/// DELETE /api/v1/projects/{project_id}/invoices/{id}
///
/// Paid invoices are kept; deleting one is a conflict.
pub async fn delete(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Path((project_id, id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    load_authorized_project(&state.pool, &auth, project_id, ProjectAccess::Manage).await?;
    let invoice = load_invoice(&state, id).await?;
    if invoice.project_id != project_id {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Invoice",
            id,
        }));
    }
    ensure_deletable(invoice.status)?;

    if !InvoiceRepo::delete_unpaid(&state.pool, id, project_id).await? {
        return Err(AppError::Core(CoreError::Conflict(
            "Invoice was paid before it could be deleted".into(),
        )));
    }
    tracing::info!(project_id, invoice_id = id, "Invoice deleted");
    Ok(StatusCode::NO_CONTENT)
}
