//! Repository for the `invoices` table.

use buildtrack_core::invoice::InvoiceStatus;
use buildtrack_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::invoice::{CreateInvoice, Invoice};

const COLUMNS: &str = "id, project_id, invoice_number, tx_ref, amount, description, due_date, \
     status, payment_link, bank_details, sent_to, created_by, payment_id, payment_data, \
     paid_at, created_at, updated_at";

/// Provides CRUD and settlement operations for invoices.
pub struct InvoiceRepo;

impl InvoiceRepo {
    /// Highest sequence number issued for a project, `0` before its first
    /// invoice.
    ///
    /// Deleted invoices leave gaps rather than freeing their numbers, so the
    /// next number is taken past the largest `INV-<digits>` suffix instead
    /// of from a row count.
    pub async fn last_issued_number(pool: &PgPool, project_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COALESCE(MAX(SUBSTRING(invoice_number FROM '^INV-([0-9]{1,18})$')::BIGINT), 0)
             FROM invoices WHERE project_id = $1",
        )
        .bind(project_id)
        .fetch_one(pool)
        .await
    }

    /// Insert a pending invoice inside an open transaction.
    ///
    /// A duplicate invoice number for the same project fails with the
    /// `uq_invoices_project_number` unique violation.
    pub async fn create(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        input: &CreateInvoice,
    ) -> Result<Invoice, sqlx::Error> {
        let query = format!(
            "INSERT INTO invoices
                (project_id, invoice_number, tx_ref, amount, description, due_date,
                 status, payment_link, bank_details, sent_to, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Invoice>(&query)
            .bind(input.project_id)
            .bind(&input.invoice_number)
            .bind(&input.tx_ref)
            .bind(input.amount)
            .bind(&input.description)
            .bind(input.due_date)
            .bind(InvoiceStatus::Pending.as_str())
            .bind(&input.payment_link)
            .bind(input.bank_details.as_ref().map(Json))
            .bind(&input.sent_to)
            .bind(input.created_by)
            .fetch_one(&mut **tx)
            .await
    }

    /// Find an invoice by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Invoice>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM invoices WHERE id = $1");
        sqlx::query_as::<_, Invoice>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an invoice by the reference handed to the payment gateway.
    pub async fn find_by_tx_ref(pool: &PgPool, tx_ref: &str) -> Result<Option<Invoice>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM invoices WHERE tx_ref = $1");
        sqlx::query_as::<_, Invoice>(&query)
            .bind(tx_ref)
            .fetch_optional(pool)
            .await
    }

    /// All invoices of a project in issue order.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Invoice>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM invoices WHERE project_id = $1 ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, Invoice>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Overwrite the stored status. Returns `None` if the invoice does not exist.
    ///
    /// Marking an invoice paid by hand stamps `paid_at`; moving it away from
    /// paid clears it.
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        status: InvoiceStatus,
    ) -> Result<Option<Invoice>, sqlx::Error> {
        let query = format!(
            "UPDATE invoices SET
                status = $2,
                paid_at = CASE
                    WHEN $2 = 'paid' THEN COALESCE(paid_at, NOW())
                    ELSE NULL
                END
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Invoice>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Mark an unpaid invoice as paid with the gateway's payment snapshot.
    ///
    /// Returns `None` if the invoice is already paid, so a concurrent
    /// settlement of the same invoice happens at most once.
    pub async fn mark_paid(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
        payment_id: &str,
        payment_data: &serde_json::Value,
    ) -> Result<Option<Invoice>, sqlx::Error> {
        let query = format!(
            "UPDATE invoices SET
                status = 'paid',
                paid_at = NOW(),
                payment_id = $2,
                payment_data = $3
             WHERE id = $1 AND status <> 'paid'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Invoice>(&query)
            .bind(id)
            .bind(payment_id)
            .bind(payment_data)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Delete an unpaid invoice belonging to `project_id`.
    /// Returns `true` if a row was removed.
    pub async fn delete_unpaid(
        pool: &PgPool,
        id: DbId,
        project_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM invoices WHERE id = $1 AND project_id = $2 AND status <> 'paid'",
        )
        .bind(id)
        .bind(project_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
