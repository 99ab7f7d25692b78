//! Side-effect delivery for BuildTrack.
//!
//! State changes record [`NotificationEvent`]s in the outbox table inside
//! their own transaction. This crate drains that table:
//!
//! - [`OutboxDispatcher`] claims due events, stores the notifications they
//!   produce, sends their emails, and retries failures with backoff.
//! - [`delivery`] holds the [`Mailer`] seam with SMTP and log-only
//!   implementations.
//!
//! [`NotificationEvent`]: buildtrack_core::notification::NotificationEvent

pub mod delivery;
pub mod dispatcher;

pub use delivery::email::{EmailConfig, EmailError, LogMailer, Mailer, SmtpMailer};
pub use dispatcher::{DispatchError, DispatchStats, DispatcherConfig, OutboxDispatcher};
