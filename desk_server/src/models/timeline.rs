//! Timeline — the append-only audit log, one row per lifecycle event.

use std::fmt;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::technician::Technician;
use crate::schema::timeline;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = timeline)]
pub struct TimelineEntry {
    pub id: i64,
    pub ticket_id: i64,
    pub event: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = timeline)]
pub struct NewTimelineEntry {
    pub ticket_id: i64,
    pub event: String,
    pub created_at: DateTime<Utc>,
}

/// Events that can happen to a ticket.
///
/// The store keeps free text; this enum is the single place that text is
/// produced, so wording stays consistent across the lifecycle service.
#[derive(Debug, Clone, Copy)]
pub enum TimelineEvent<'a> {
    /// Ticket was created from the web form or the intake endpoint.
    Created,
    /// Ticket was auto-assigned at creation by keyword routing.
    AutoRouted { technician: &'a Technician },
    /// A dispatcher assigned the ticket by hand.
    Assigned {
        actor: &'a str,
        technician: &'a Technician,
    },
    /// A dispatcher assigned the ticket via the round-robin action.
    Dispatched {
        actor: &'a str,
        technician: &'a Technician,
    },
    /// A technician handed the ticket to a colleague.
    Reassigned {
        actor: &'a str,
        technician: &'a Technician,
        note: Option<&'a str>,
    },
    /// A technician sent the ticket back to the dispatch queue.
    ReturnedToDispatcher { note: Option<&'a str> },
    /// Free-text technician comment, no state change.
    Commented { text: &'a str },
    /// Ticket was closed.
    Closed,
}

impl fmt::Display for TimelineEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimelineEvent::Created => f.write_str("Ticket created"),
            TimelineEvent::AutoRouted { technician } => {
                write!(f, "Auto-routed to {} ({})", technician.name, technician.email)
            }
            TimelineEvent::Assigned { actor, technician } => {
                write!(
                    f,
                    "Assigned by {} to {} ({})",
                    actor, technician.name, technician.email
                )
            }
            TimelineEvent::Dispatched { actor, technician } => {
                write!(
                    f,
                    "Dispatched by {} to {} ({})",
                    actor, technician.name, technician.email
                )
            }
            TimelineEvent::Reassigned {
                actor,
                technician,
                note,
            } => {
                write!(
                    f,
                    "Reassigned by {} to {} ({})",
                    actor, technician.name, technician.email
                )?;
                if let Some(note) = note {
                    write!(f, ": {note}")?;
                }
                Ok(())
            }
            TimelineEvent::ReturnedToDispatcher { note } => {
                f.write_str("Returned to dispatcher")?;
                if let Some(note) = note {
                    write!(f, ": {note}")?;
                }
                Ok(())
            }
            TimelineEvent::Commented { text } => write!(f, "Technician comment: {text}"),
            TimelineEvent::Closed => f.write_str("Ticket closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tech() -> Technician {
        Technician {
            id: 1,
            name: "Laura Gomez".to_string(),
            email: "laura.gomez@example.com".to_string(),
            specialty: "Networking".to_string(),
            is_active: true,
        }
    }

    #[test]
    fn event_wording() {
        let tech = tech();
        assert_eq!(TimelineEvent::Created.to_string(), "Ticket created");
        assert_eq!(TimelineEvent::Closed.to_string(), "Ticket closed");
        assert_eq!(
            TimelineEvent::AutoRouted { technician: &tech }.to_string(),
            "Auto-routed to Laura Gomez (laura.gomez@example.com)"
        );
        assert_eq!(
            TimelineEvent::Assigned {
                actor: "dispatcher@example.com",
                technician: &tech
            }
            .to_string(),
            "Assigned by dispatcher@example.com to Laura Gomez (laura.gomez@example.com)"
        );
        assert_eq!(
            TimelineEvent::Commented { text: "rebooted" }.to_string(),
            "Technician comment: rebooted"
        );
    }

    #[test]
    fn notes_are_appended_only_when_present() {
        let tech = tech();
        assert_eq!(
            TimelineEvent::ReturnedToDispatcher { note: None }.to_string(),
            "Returned to dispatcher"
        );
        assert_eq!(
            TimelineEvent::ReturnedToDispatcher {
                note: Some("wrong queue")
            }
            .to_string(),
            "Returned to dispatcher: wrong queue"
        );
        assert_eq!(
            TimelineEvent::Reassigned {
                actor: "ana.rojas@example.com",
                technician: &tech,
                note: Some("network issue")
            }
            .to_string(),
            "Reassigned by ana.rojas@example.com to Laura Gomez (laura.gomez@example.com): network issue"
        );
    }
}
