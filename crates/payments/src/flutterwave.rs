//! Flutterwave v3 client.
//!
//! Wraps `GET /v3/transactions/{id}/verify` using [`reqwest`].

use async_trait::async_trait;
use serde::Deserialize;

use crate::gateway::{PaymentError, PaymentGateway, VerifiedPayment};

const DEFAULT_BASE_URL: &str = "https://api.flutterwave.com";

#[derive(Debug, Clone)]
pub struct FlutterwaveConfig {
    pub secret_key: String,
    /// API root without a trailing slash, e.g. `https://api.flutterwave.com`.
    pub base_url: String,
}

impl FlutterwaveConfig {
    /// Load from `FLUTTERWAVE_SECRET_KEY` and `FLUTTERWAVE_BASE_URL`.
    ///
    /// Returns `None` if no secret key is set.
    pub fn from_env() -> Option<Self> {
        let secret_key = std::env::var("FLUTTERWAVE_SECRET_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())?;
        let base_url = std::env::var("FLUTTERWAVE_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Some(Self {
            secret_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Envelope of every Flutterwave response.
#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    message: String,
    data: Option<TransactionData>,
}

#[derive(Debug, Deserialize)]
struct TransactionData {
    id: serde_json::Value,
    tx_ref: Option<String>,
    amount: f64,
    currency: Option<String>,
    status: String,
}

/// HTTP client for the Flutterwave API.
pub struct FlutterwaveGateway {
    client: reqwest::Client,
    config: FlutterwaveConfig,
}

impl FlutterwaveGateway {
    pub fn new(config: FlutterwaveConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Reuse an existing [`reqwest::Client`] (shared timeouts and pooling).
    pub fn with_client(client: reqwest::Client, config: FlutterwaveConfig) -> Self {
        Self { client, config }
    }
}

/// Turn a verify-transaction body into a [`VerifiedPayment`].
pub fn parse_verify_response(raw: serde_json::Value) -> Result<VerifiedPayment, PaymentError> {
    let envelope: Envelope = serde_json::from_value(raw.clone())
        .map_err(|e| PaymentError::Malformed(e.to_string()))?;
    if envelope.status != "success" {
        return Err(PaymentError::Malformed(format!(
            "verification status '{}': {}",
            envelope.status, envelope.message
        )));
    }
    let data = envelope
        .data
        .ok_or_else(|| PaymentError::Malformed("response has no data".into()))?;

    let transaction_id = match &data.id {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    Ok(VerifiedPayment {
        transaction_id,
        tx_ref: data.tx_ref,
        amount: data.amount,
        currency: data.currency,
        status: data.status,
        raw: raw.get("data").cloned().unwrap_or(raw),
    })
}

#[async_trait]
impl PaymentGateway for FlutterwaveGateway {
    async fn verify_transaction(&self, transaction_id: &str) -> Result<VerifiedPayment, PaymentError> {
        let response = self
            .client
            .get(format!(
                "{}/v3/transactions/{}/verify",
                self.config.base_url, transaction_id
            ))
            .bearer_auth(&self.config.secret_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(PaymentError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let raw = response.json::<serde_json::Value>().await?;
        let payment = parse_verify_response(raw)?;
        tracing::info!(
            transaction_id,
            tx_ref = ?payment.tx_ref,
            status = %payment.status,
            "Transaction verified with Flutterwave"
        );
        Ok(payment)
    }
}
