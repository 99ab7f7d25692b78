//! Invoice lifecycle rules: numbering, status projection, settlement and
//! deletion checks.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Stored invoice status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    /// All valid statuses, in lifecycle order.
    pub const ALL: [InvoiceStatus; 3] = [Self::Pending, Self::Paid, Self::Overdue];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
        }
    }

    /// Parse a stored or client-supplied status string.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|s| s.as_str()).collect();
                CoreError::Validation(format!(
                    "Invalid invoice status '{value}'. Must be one of: {}",
                    valid.join(", ")
                ))
            })
    }
}

impl TryFrom<String> for InvoiceStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

/// Status shown to readers: a pending invoice whose due date has passed is
/// reported as overdue. Nothing is persisted by this projection.
pub fn display_status(stored: InvoiceStatus, due_date: Timestamp, now: Timestamp) -> InvoiceStatus {
    if stored == InvoiceStatus::Pending && due_date < now {
        InvoiceStatus::Overdue
    } else {
        stored
    }
}

// ---------------------------------------------------------------------------
// Numbering
// ---------------------------------------------------------------------------

pub const INVOICE_NUMBER_PREFIX: &str = "INV-";

/// Invoice number following `last_issued`: the first is `INV-001`.
pub fn format_invoice_number(last_issued: i64) -> String {
    format!("{INVOICE_NUMBER_PREFIX}{:03}", last_issued + 1)
}

/// Timestamp-derived invoice number, used when the last issued number
/// cannot be read. Not guaranteed unique.
pub fn fallback_invoice_number(now: Timestamp) -> String {
    format!(
        "{INVOICE_NUMBER_PREFIX}{:06}",
        now.timestamp_millis().rem_euclid(1_000_000)
    )
}

// ---------------------------------------------------------------------------
// Payment method
// ---------------------------------------------------------------------------

/// Bank account a client can pay into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    pub bank_name: String,
    pub account_name: String,
    pub account_number: String,
}

/// How a client is expected to pay an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Hosted checkout link from the payment gateway.
    Link { url: String },
    BankTransfer(BankDetails),
}

impl PaymentMethod {
    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            Self::Link { url } => {
                if !(url.starts_with("https://") || url.starts_with("http://")) {
                    return Err(CoreError::Validation(format!(
                        "Payment link must be an http(s) URL, got '{url}'"
                    )));
                }
            }
            Self::BankTransfer(bank) => {
                if bank.bank_name.trim().is_empty() || bank.account_name.trim().is_empty() {
                    return Err(CoreError::Validation(
                        "Bank transfer details require bank_name and account_name".into(),
                    ));
                }
                let number = bank.account_number.trim();
                if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
                    return Err(CoreError::Validation(format!(
                        "account_number must contain only digits, got '{number}'"
                    )));
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// What a verified payment should do to an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// The invoice is already paid; nothing changes and no side effects fire.
    AlreadyPaid,
    /// Amounts match; mark the invoice paid.
    MarkPaid,
}

/// Decide how to settle an invoice against a verified gateway amount.
///
/// A paid invoice short-circuits before the amount is compared, so
/// re-verification is idempotent. Otherwise the verified amount must equal
/// the stored amount exactly.
pub fn check_settlement(
    status: InvoiceStatus,
    stored_amount: i64,
    verified_amount: f64,
) -> Result<Settlement, CoreError> {
    if status == InvoiceStatus::Paid {
        return Ok(Settlement::AlreadyPaid);
    }
    if verified_amount != stored_amount as f64 {
        return Err(CoreError::AmountMismatch {
            expected: stored_amount,
            verified: verified_amount,
        });
    }
    Ok(Settlement::MarkPaid)
}

/// Only pending or overdue invoices may be deleted.
pub fn ensure_deletable(status: InvoiceStatus) -> Result<(), CoreError> {
    match status {
        InvoiceStatus::Pending | InvoiceStatus::Overdue => Ok(()),
        InvoiceStatus::Paid => Err(CoreError::Conflict(
            "Paid invoices cannot be deleted".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    #[test]
    fn first_invoice_is_inv_001() {
        assert_eq!(format_invoice_number(0), "INV-001");
    }

    #[test]
    fn fourth_invoice_is_inv_004() {
        assert_eq!(format_invoice_number(3), "INV-004");
    }

    #[test]
    fn numbers_past_999_keep_growing() {
        assert_eq!(format_invoice_number(1_233), "INV-1234");
    }

    #[test]
    fn fallback_number_is_six_timestamp_digits() {
        let now = Utc.timestamp_millis_opt(1_760_000_123_456).unwrap();
        assert_eq!(fallback_invoice_number(now), "INV-123456");
    }

    #[test]
    fn pending_past_due_displays_overdue() {
        let now = Utc::now();
        let due = now - Duration::days(1);
        assert_eq!(
            display_status(InvoiceStatus::Pending, due, now),
            InvoiceStatus::Overdue
        );
    }

    #[test]
    fn paid_past_due_stays_paid() {
        let now = Utc::now();
        let due = now - Duration::days(30);
        assert_eq!(
            display_status(InvoiceStatus::Paid, due, now),
            InvoiceStatus::Paid
        );
    }

    #[test]
    fn pending_not_yet_due_stays_pending() {
        let now = Utc::now();
        assert_eq!(
            display_status(InvoiceStatus::Pending, now + Duration::hours(2), now),
            InvoiceStatus::Pending
        );
        // Due exactly now is not yet past due.
        assert_eq!(
            display_status(InvoiceStatus::Pending, now, now),
            InvoiceStatus::Pending
        );
    }

    #[test]
    fn status_parse_accepts_known_values_only() {
        assert_eq!(InvoiceStatus::parse("paid").unwrap(), InvoiceStatus::Paid);
        assert_matches!(
            InvoiceStatus::parse("refunded"),
            Err(CoreError::Validation(msg)) if msg.contains("pending, paid, overdue")
        );
    }

    #[test]
    fn settlement_requires_exact_amount() {
        assert_matches!(
            check_settlement(InvoiceStatus::Pending, 250_000, 249_999.0),
            Err(CoreError::AmountMismatch { expected: 250_000, .. })
        );
        assert_matches!(
            check_settlement(InvoiceStatus::Overdue, 250_000, 250_000.5),
            Err(CoreError::AmountMismatch { .. })
        );
        assert_eq!(
            check_settlement(InvoiceStatus::Pending, 250_000, 250_000.0).unwrap(),
            Settlement::MarkPaid
        );
    }

    #[test]
    fn settlement_of_paid_invoice_short_circuits() {
        // Even a mismatched amount does not matter once paid.
        assert_eq!(
            check_settlement(InvoiceStatus::Paid, 250_000, 1.0).unwrap(),
            Settlement::AlreadyPaid
        );
    }

    #[test]
    fn paid_invoices_are_not_deletable() {
        assert!(ensure_deletable(InvoiceStatus::Pending).is_ok());
        assert!(ensure_deletable(InvoiceStatus::Overdue).is_ok());
        assert_matches!(
            ensure_deletable(InvoiceStatus::Paid),
            Err(CoreError::Conflict(_))
        );
    }

    #[test]
    fn payment_method_is_tagged_on_the_wire() {
        let json = serde_json::json!({
            "method": "bank_transfer",
            "bank_name": "Zenith Bank",
            "account_name": "Acme Builders Ltd",
            "account_number": "1012345678"
        });
        let method: PaymentMethod = serde_json::from_value(json).unwrap();
        assert_matches!(&method, PaymentMethod::BankTransfer(b) if b.bank_name == "Zenith Bank");
        assert!(method.validate().is_ok());
    }

    #[test]
    fn payment_method_validation() {
        let bad_link = PaymentMethod::Link {
            url: "ftp://pay".into(),
        };
        assert_matches!(bad_link.validate(), Err(CoreError::Validation(_)));

        let bad_account = PaymentMethod::BankTransfer(BankDetails {
            bank_name: "GTBank".into(),
            account_name: "Acme".into(),
            account_number: "12-34".into(),
        });
        assert_matches!(bad_account.validate(), Err(CoreError::Validation(_)));
    }
}
