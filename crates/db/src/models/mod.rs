//! Row models and DTOs, one module per table family.

pub mod invoice;
pub mod notification;
pub mod outbox;
pub mod project;
pub mod user;
