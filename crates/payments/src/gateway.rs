use async_trait::async_trait;
use serde::Serialize;

/// Gateway status string for a completed charge.
pub const STATUS_SUCCESSFUL: &str = "successful";

/// Errors from payment verification.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The gateway returned a non-2xx status code.
    #[error("Payment gateway error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The gateway answered but the response could not be understood.
    #[error("Malformed gateway response: {0}")]
    Malformed(String),

    /// No gateway credentials are configured.
    #[error("Payment gateway is not configured")]
    NotConfigured,
}

/// The gateway's view of a transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifiedPayment {
    pub transaction_id: String,
    pub tx_ref: Option<String>,
    /// Charged amount as reported by the gateway, in major currency units.
    pub amount: f64,
    pub currency: Option<String>,
    pub status: String,
    /// Full gateway response, stored with the invoice on settlement.
    pub raw: serde_json::Value,
}

impl VerifiedPayment {
    pub fn is_successful(&self) -> bool {
        self.status.eq_ignore_ascii_case(STATUS_SUCCESSFUL)
    }
}

/// Confirms transactions with a payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn verify_transaction(&self, transaction_id: &str)
        -> Result<VerifiedPayment, PaymentError>;
}

/// Gateway used when no credentials are configured. Every verification fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledGateway;

#[async_trait]
impl PaymentGateway for DisabledGateway {
    async fn verify_transaction(&self, transaction_id: &str) -> Result<VerifiedPayment, PaymentError> {
        tracing::warn!(transaction_id, "Payment verification requested but no gateway is configured");
        Err(PaymentError::NotConfigured)
    }
}
