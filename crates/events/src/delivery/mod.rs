//! External delivery channels for notification events.

pub mod email;
