//! Invoice entity model and DTOs.

use buildtrack_core::invoice::{display_status, BankDetails, InvoiceStatus};
use buildtrack_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `invoices` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Invoice {
    pub id: DbId,
    pub project_id: DbId,
    pub invoice_number: String,
    pub tx_ref: String,
    pub amount: i64,
    pub description: String,
    pub due_date: Timestamp,
    #[sqlx(try_from = "String")]
    pub status: InvoiceStatus,
    pub payment_link: Option<String>,
    pub bank_details: Option<Json<BankDetails>>,
    pub sent_to: Vec<String>,
    pub created_by: Option<DbId>,
    pub payment_id: Option<String>,
    pub payment_data: Option<serde_json::Value>,
    pub paid_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Invoice {
    /// Replace the stored status with the one readers should see at `now`.
    pub fn with_display_status(mut self, now: Timestamp) -> Self {
        self.status = display_status(self.status, self.due_date, now);
        self
    }
}

/// DTO for inserting an invoice. Exactly one of `payment_link` and
/// `bank_details` is expected to be set.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub project_id: DbId,
    pub invoice_number: String,
    pub tx_ref: String,
    pub amount: i64,
    pub description: String,
    pub due_date: Timestamp,
    pub payment_link: Option<String>,
    pub bank_details: Option<BankDetails>,
    pub sent_to: Vec<String>,
    pub created_by: DbId,
}
