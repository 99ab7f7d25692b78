//! Notification events and the records they fan out to.
//!
//! A [`NotificationEvent`] is produced by a qualifying state transition and
//! stored in the outbox alongside that transition. When the outbox is drained
//! each event is expanded into [`NotificationDraft`]s (in-app records) and
//! emails (see [`crate::email`]).

use serde::{Deserialize, Serialize};

use crate::cost::format_cost;
use crate::error::CoreError;
use crate::roles::ROLE_ADMIN;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Kind and target
// ---------------------------------------------------------------------------

/// Category of a notification, used by clients for icons and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    Invoice,
    ProjectUpdate,
    Message,
    ActionRequired,
    SystemAlert,
    Generic,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 6] = [
        Self::Invoice,
        Self::ProjectUpdate,
        Self::Message,
        Self::ActionRequired,
        Self::SystemAlert,
        Self::Generic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::ProjectUpdate => "project-update",
            Self::Message => "message",
            Self::ActionRequired => "action-required",
            Self::SystemAlert => "system-alert",
            Self::Generic => "generic",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == value)
            .ok_or_else(|| CoreError::Validation(format!("Invalid notification type '{value}'")))
    }
}

impl TryFrom<String> for NotificationKind {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

/// Who a notification is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationTarget {
    User { user_id: DbId },
    Users { user_ids: Vec<DbId> },
    Role { role: String },
    Global,
}

impl NotificationTarget {
    /// Whether the target can reach anyone at all.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Users { user_ids } if user_ids.is_empty())
    }
}

/// A notification ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationDraft {
    pub title: String,
    pub body: String,
    pub kind: NotificationKind,
    pub target: NotificationTarget,
    pub related_id: Option<String>,
    pub project_id: Option<DbId>,
    pub action_url: Option<String>,
    /// Distinguishes drafts produced by the same event so re-processing an
    /// event never stores the same notification twice.
    pub dedupe_key: &'static str,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A person who receives notifications and emails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub user_id: DbId,
    pub name: String,
    pub email: String,
}

fn user_ids(recipients: &[Recipient]) -> Vec<DbId> {
    recipients.iter().map(|r| r.user_id).collect()
}

/// A state transition that produces notifications.
///
/// Recipients are resolved when the event is recorded so that delivery does
/// not depend on later changes to project membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotificationEvent {
    PhaseCompleted {
        project_id: DbId,
        project_name: String,
        stage_id: String,
        stage_name: String,
        clients: Vec<Recipient>,
    },
    TaskCompleted {
        project_id: DbId,
        project_name: String,
        stage_name: String,
        task_id: String,
        task_name: String,
        clients: Vec<Recipient>,
    },
    ManagerAssigned {
        project_id: DbId,
        project_name: String,
        manager: Recipient,
        clients: Vec<Recipient>,
    },
    InvoiceCreated {
        project_id: DbId,
        project_name: String,
        invoice_id: DbId,
        invoice_number: String,
        amount: i64,
        due_date: Timestamp,
        clients: Vec<Recipient>,
    },
    InvoicePaid {
        project_id: DbId,
        project_name: String,
        invoice_id: DbId,
        invoice_number: String,
        amount: i64,
        client_ids: Vec<DbId>,
        sent_to: Vec<String>,
    },
    SystemAlert {
        title: String,
        body: String,
        target: NotificationTarget,
    },
}

fn project_url(project_id: DbId) -> String {
    format!("/dashboard/projects/{project_id}")
}

const BILLING_URL: &str = "/dashboard/billing";

impl NotificationEvent {
    /// Dot-separated event name stored with the outbox row.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PhaseCompleted { .. } => "timeline.phase_completed",
            Self::TaskCompleted { .. } => "timeline.task_completed",
            Self::ManagerAssigned { .. } => "project.manager_assigned",
            Self::InvoiceCreated { .. } => "invoice.created",
            Self::InvoicePaid { .. } => "invoice.paid",
            Self::SystemAlert { .. } => "system.alert",
        }
    }

    /// The project the event concerns, if any.
    pub fn project_id(&self) -> Option<DbId> {
        match self {
            Self::PhaseCompleted { project_id, .. }
            | Self::TaskCompleted { project_id, .. }
            | Self::ManagerAssigned { project_id, .. }
            | Self::InvoiceCreated { project_id, .. }
            | Self::InvoicePaid { project_id, .. } => Some(*project_id),
            Self::SystemAlert { .. } => None,
        }
    }

    /// Expand the event into the notification records it produces.
    ///
    /// Drafts whose target would reach nobody are omitted.
    pub fn notifications(&self) -> Vec<NotificationDraft> {
        let drafts = match self {
            Self::PhaseCompleted {
                project_id,
                project_name,
                stage_id,
                stage_name,
                clients,
            } => vec![NotificationDraft {
                title: "Phase completed".into(),
                body: format!("The {stage_name} phase of {project_name} has been completed."),
                kind: NotificationKind::ProjectUpdate,
                target: NotificationTarget::Users {
                    user_ids: user_ids(clients),
                },
                related_id: Some(stage_id.clone()),
                project_id: Some(*project_id),
                action_url: Some(project_url(*project_id)),
                dedupe_key: "clients",
            }],
            Self::TaskCompleted {
                project_id,
                project_name,
                stage_name,
                task_id,
                task_name,
                clients,
            } => vec![NotificationDraft {
                title: "Task completed".into(),
                body: format!("{task_name} in the {stage_name} phase of {project_name} is done."),
                kind: NotificationKind::ProjectUpdate,
                target: NotificationTarget::Users {
                    user_ids: user_ids(clients),
                },
                related_id: Some(task_id.clone()),
                project_id: Some(*project_id),
                action_url: Some(project_url(*project_id)),
                dedupe_key: "clients",
            }],
            Self::ManagerAssigned {
                project_id,
                project_name,
                manager,
                clients,
            } => vec![
                NotificationDraft {
                    title: "New project assignment".into(),
                    body: format!("You have been assigned as project manager for {project_name}."),
                    kind: NotificationKind::ActionRequired,
                    target: NotificationTarget::User {
                        user_id: manager.user_id,
                    },
                    related_id: None,
                    project_id: Some(*project_id),
                    action_url: Some(project_url(*project_id)),
                    dedupe_key: "manager",
                },
                NotificationDraft {
                    title: "Project manager assigned".into(),
                    body: format!(
                        "{} is now the project manager for {project_name}.",
                        manager.name
                    ),
                    kind: NotificationKind::ProjectUpdate,
                    target: NotificationTarget::Users {
                        user_ids: user_ids(clients),
                    },
                    related_id: None,
                    project_id: Some(*project_id),
                    action_url: Some(project_url(*project_id)),
                    dedupe_key: "clients",
                },
            ],
            Self::InvoiceCreated {
                project_id,
                project_name,
                invoice_id,
                invoice_number,
                amount,
                due_date,
                clients,
            } => vec![NotificationDraft {
                title: format!("New invoice {invoice_number}"),
                body: format!(
                    "An invoice of {} for {project_name} is due on {}.",
                    format_cost(*amount),
                    due_date.format("%B %-d, %Y")
                ),
                kind: NotificationKind::Invoice,
                target: NotificationTarget::Users {
                    user_ids: user_ids(clients),
                },
                related_id: Some(invoice_id.to_string()),
                project_id: Some(*project_id),
                action_url: Some(BILLING_URL.into()),
                dedupe_key: "clients",
            }],
            Self::InvoicePaid {
                project_id,
                project_name,
                invoice_id,
                invoice_number,
                amount,
                client_ids,
                ..
            } => vec![
                NotificationDraft {
                    title: format!("Invoice {invoice_number} paid"),
                    body: format!(
                        "Your payment of {} for {project_name} was received.",
                        format_cost(*amount)
                    ),
                    kind: NotificationKind::Invoice,
                    target: NotificationTarget::Users {
                        user_ids: client_ids.clone(),
                    },
                    related_id: Some(invoice_id.to_string()),
                    project_id: Some(*project_id),
                    action_url: Some(BILLING_URL.into()),
                    dedupe_key: "clients",
                },
                NotificationDraft {
                    title: format!("Payment received for {invoice_number}"),
                    body: format!(
                        "{} was paid against {invoice_number} on {project_name}.",
                        format_cost(*amount)
                    ),
                    kind: NotificationKind::Invoice,
                    target: NotificationTarget::Role {
                        role: ROLE_ADMIN.into(),
                    },
                    related_id: Some(invoice_id.to_string()),
                    project_id: Some(*project_id),
                    action_url: None,
                    dedupe_key: "admins",
                },
            ],
            Self::SystemAlert {
                title,
                body,
                target,
            } => vec![NotificationDraft {
                title: title.clone(),
                body: body.clone(),
                kind: NotificationKind::SystemAlert,
                target: target.clone(),
                related_id: None,
                project_id: None,
                action_url: None,
                dedupe_key: "broadcast",
            }],
        };

        drafts.into_iter().filter(|d| !d.target.is_empty()).collect()
    }
}
