//! Transactional email planning.
//!
//! Emails follow the `{to, subject, name, message}` shape the mail collaborator
//! accepts. [`plan_emails`] decides which messages a [`NotificationEvent`]
//! produces; sending them is left to the delivery layer.

use serde::{Deserialize, Serialize};

use crate::cost::format_cost;
use crate::notification::{NotificationEvent, Recipient};

/// A single outgoing email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    /// Greeting name of the recipient.
    pub name: String,
    /// Message text. Rendered into the HTML body with [`EmailMessage::html_body`].
    pub message: String,
}

impl EmailMessage {
    /// Minimal HTML body with the greeting and escaped message paragraphs.
    pub fn html_body(&self) -> String {
        let paragraphs: String = self
            .message
            .split("\n\n")
            .filter(|p| !p.trim().is_empty())
            .map(|p| format!("<p>{}</p>", escape_html(p.trim())))
            .collect();
        format!(
            "<html><body><p>Hello {},</p>{paragraphs}</body></html>",
            escape_html(&self.name)
        )
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn to_each(recipients: &[Recipient], subject: &str, message: &str) -> Vec<EmailMessage> {
    recipients
        .iter()
        .filter(|r| !r.email.trim().is_empty())
        .map(|r| EmailMessage {
            to: r.email.clone(),
            subject: subject.to_string(),
            name: r.name.clone(),
            message: message.to_string(),
        })
        .collect()
}

/// Emails produced by an event.
///
/// Recipients without an address are skipped. System alerts are in-app only.
pub fn plan_emails(event: &NotificationEvent) -> Vec<EmailMessage> {
    match event {
        NotificationEvent::PhaseCompleted {
            project_name,
            stage_name,
            clients,
            ..
        } => to_each(
            clients,
            &format!("{project_name}: {stage_name} phase completed"),
            &format!(
                "The {stage_name} phase of your project {project_name} has been marked as completed.\n\n\
                 Log in to your dashboard to review progress."
            ),
        ),
        NotificationEvent::TaskCompleted {
            project_name,
            stage_name,
            task_name,
            clients,
            ..
        } => to_each(
            clients,
            &format!("{project_name}: {task_name} completed"),
            &format!(
                "{task_name} in the {stage_name} phase of {project_name} has been completed."
            ),
        ),
        NotificationEvent::ManagerAssigned {
            project_name,
            manager,
            clients,
            ..
        } => {
            let mut emails = to_each(
                std::slice::from_ref(manager),
                &format!("You have been assigned to {project_name}"),
                &format!(
                    "You are now the project manager for {project_name}.\n\n\
                     Open the project console to review its timeline and invoices."
                ),
            );
            emails.extend(to_each(
                clients,
                &format!("{project_name}: project manager assigned"),
                &format!(
                    "{} has been assigned as the project manager for {project_name}.",
                    manager.name
                ),
            ));
            emails
        }
        NotificationEvent::InvoiceCreated {
            project_name,
            invoice_number,
            amount,
            due_date,
            clients,
            ..
        } => to_each(
            clients,
            &format!("New invoice {invoice_number} for {project_name}"),
            &format!(
                "Invoice {invoice_number} of {} has been issued for {project_name}.\n\n\
                 Payment is due by {}.",
                format_cost(*amount),
                due_date.format("%B %-d, %Y")
            ),
        ),
        NotificationEvent::InvoicePaid {
            project_name,
            invoice_number,
            amount,
            sent_to,
            ..
        } => sent_to
            .iter()
            .filter(|addr| !addr.trim().is_empty())
            .map(|addr| EmailMessage {
                to: addr.clone(),
                subject: format!("Payment received for {invoice_number}"),
                name: "there".into(),
                message: format!(
                    "We have received your payment of {} for invoice {invoice_number} on {project_name}.\n\n\
                     Thank you.",
                    format_cost(*amount)
                ),
            })
            .collect(),
        NotificationEvent::SystemAlert { .. } => Vec::new(),
    }
}
