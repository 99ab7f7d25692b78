//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that accept
//! `&PgPool` (or an open transaction when the write must commit together with
//! an outbox event) as the first argument.

pub mod email_delivery_repo;
pub mod invoice_repo;
pub mod notification_repo;
pub mod outbox_repo;
pub mod project_repo;
pub mod user_repo;

pub use email_delivery_repo::EmailDeliveryRepo;
pub use invoice_repo::InvoiceRepo;
pub use notification_repo::NotificationRepo;
pub use outbox_repo::OutboxRepo;
pub use project_repo::ProjectRepo;
pub use user_repo::UserRepo;
