//! Payment gateway verification.
//!
//! [`PaymentGateway`] is the seam the settlement flow calls to confirm a
//! transaction with the provider. [`FlutterwaveGateway`] implements it
//! against the Flutterwave v3 verify-transaction endpoint.

pub mod flutterwave;
pub mod gateway;

pub use flutterwave::{FlutterwaveConfig, FlutterwaveGateway};
pub use gateway::{DisabledGateway, PaymentError, PaymentGateway, VerifiedPayment};
