//! Handler for `POST /payments/verify`.
//!
//! The endpoint is public: the payment provider redirects the payer here
//! with the transaction id and the invoice reference. Settlement only
//! trusts what the gateway confirms.

use axum::extract::State;
use axum::Json;
use buildtrack_core::error::CoreError;
use buildtrack_core::invoice::{check_settlement, InvoiceStatus, Settlement};
use buildtrack_core::notification::NotificationEvent;
use buildtrack_core::types::{DbId, Timestamp};
use buildtrack_db::models::invoice::Invoice;
use buildtrack_db::repositories::{InvoiceRepo, OutboxRepo};
use serde::{Deserialize, Serialize};

use super::load_project;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Request body for `POST /payments/verify`.
///
/// The invoice is identified by `tx_ref` or `invoiceId`. The gateway's
/// `transaction_id` may arrive as a number or a string.
#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub tx_ref: Option<String>,
    #[serde(alias = "invoiceId")]
    pub invoice_id: Option<DbId>,
    pub transaction_id: Option<serde_json::Value>,
}

/// Response body for a successful verification.
#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub status: &'static str,
    pub message: String,
    pub details: SettlementDetails,
}

#[derive(Debug, Serialize)]
pub struct SettlementDetails {
    pub invoice_id: DbId,
    pub invoice_number: String,
    pub status: InvoiceStatus,
    pub already_paid: bool,
    pub paid_at: Option<Timestamp>,
}

impl VerifyPaymentResponse {
    fn for_invoice(invoice: &Invoice, already_paid: bool) -> Self {
        let message = if already_paid {
            format!("Invoice {} is already paid", invoice.invoice_number)
        } else {
            format!("Payment for invoice {} verified", invoice.invoice_number)
        };
        Self {
            status: "success",
            message,
            details: SettlementDetails {
                invoice_id: invoice.id,
                invoice_number: invoice.invoice_number.clone(),
                status: InvoiceStatus::Paid,
                already_paid,
                paid_at: invoice.paid_at,
            },
        }
    }
}

fn transaction_id(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn missing_parameters() -> AppError {
    AppError::BadRequest("Missing required parameters: transaction_id and tx_ref or invoiceId".into())
}

/// POST /api/v1/payments/verify
pub async fn verify(
    State(state): State<AppState>,
    Json(input): Json<VerifyPaymentRequest>,
) -> AppResult<Json<VerifyPaymentResponse>> {
    let transaction_id =
        transaction_id(input.transaction_id.as_ref()).ok_or_else(missing_parameters)?;
    let tx_ref = input
        .tx_ref
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    let invoice = match (tx_ref, input.invoice_id) {
        (Some(tx_ref), _) => InvoiceRepo::find_by_tx_ref(&state.pool, tx_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No invoice matches tx_ref '{tx_ref}'"))),
        (None, Some(id)) => InvoiceRepo::find_by_id(&state.pool, id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "Invoice",
                id,
            })),
        (None, None) => Err(missing_parameters()),
    }?;

    if invoice.status == InvoiceStatus::Paid {
        tracing::info!(invoice_id = invoice.id, "Verification for an already paid invoice");
        return Ok(Json(VerifyPaymentResponse::for_invoice(&invoice, true)));
    }

    let payment = state.payments.verify_transaction(&transaction_id).await?;
    if !payment.is_successful() {
        return Err(AppError::BadRequest(format!(
            "Payment was not successful (status: {})",
            payment.status
        )));
    }
    // Without a caller-supplied reference only the gateway's copy ties the
    // transaction to this invoice.
    match payment.tx_ref.as_deref() {
        Some(verified_ref) if verified_ref != invoice.tx_ref => {
            return Err(AppError::Core(CoreError::Validation(
                "Transaction reference does not match the invoice".into(),
            )));
        }
        None if tx_ref.is_none() => {
            return Err(AppError::Core(CoreError::Validation(
                "Gateway did not report a transaction reference; verify with tx_ref".into(),
            )));
        }
        _ => {}
    }

    match check_settlement(invoice.status, invoice.amount, payment.amount)? {
        Settlement::AlreadyPaid => {
            return Ok(Json(VerifyPaymentResponse::for_invoice(&invoice, true)));
        }
        Settlement::MarkPaid => {}
    }

    let project = load_project(&state.pool, invoice.project_id).await?;

    let mut tx = state.pool.begin().await?;
    let Some(paid) =
        InvoiceRepo::mark_paid(&mut tx, invoice.id, &payment.transaction_id, &payment.raw).await?
    else {
        // Another request settled it between our read and this update.
        tx.rollback().await?;
        let current = InvoiceRepo::find_by_id(&state.pool, invoice.id)
            .await?
            .unwrap_or(invoice);
        return Ok(Json(VerifyPaymentResponse::for_invoice(&current, true)));
    };
    let event = NotificationEvent::InvoicePaid {
        project_id: project.id,
        project_name: project.name.clone(),
        invoice_id: paid.id,
        invoice_number: paid.invoice_number.clone(),
        amount: paid.amount,
        client_ids: project.client_ids.clone(),
        sent_to: paid.sent_to.clone(),
    };
    let event_id = OutboxRepo::enqueue(&mut tx, &event, None).await?;
    tx.commit().await?;
    state.wake_outbox();

    tracing::info!(
        invoice_id = paid.id,
        project_id = project.id,
        transaction_id = %payment.transaction_id,
        event_id,
        "Invoice settled",
    );
    Ok(Json(VerifyPaymentResponse::for_invoice(&paid, false)))
}
