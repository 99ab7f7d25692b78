pub mod budget;
pub mod cost;
pub mod email;
pub mod error;
pub mod invoice;
pub mod notification;
pub mod project;
pub mod roles;
pub mod timeline;
pub mod types;
pub mod validation;
