//! Ticket — a support request with lifecycle status.

use std::fmt;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::tickets;

/// Sentinel stored in `assigned_to` while no technician owns the ticket.
pub const UNASSIGNED: &str = "unassigned";

/// Lifecycle status. Stored as a lowercase string column.
///
/// Invariant: `closed_at` is set iff the status is `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Pending,
    InProgress,
    Closed,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Pending => "pending",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TicketStatus::Pending),
            "in_progress" => Some(TicketStatus::InProgress),
            "closed" => Some(TicketStatus::Closed),
            _ => None,
        }
    }

    /// Human-readable label for HTML pages and CSV export.
    pub fn label(self) -> &'static str {
        match self {
            TicketStatus::Pending => "Pending",
            TicketStatus::InProgress => "In progress",
            TicketStatus::Closed => "Closed",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = tickets)]
pub struct Ticket {
    pub id: i64,
    pub email_from: String,
    pub subject: String,
    pub body: String,
    pub assigned_to: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Ticket {
    pub fn status(&self) -> Option<TicketStatus> {
        TicketStatus::parse(&self.status)
    }

    pub fn is_unassigned(&self) -> bool {
        self.assigned_to == UNASSIGNED
    }

    /// Label for display; falls back to the raw column for unknown values.
    pub fn status_label(&self) -> &str {
        self.status().map(TicketStatus::label).unwrap_or(&self.status)
    }
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = tickets)]
pub struct NewTicket {
    pub email_from: String,
    pub subject: String,
    pub body: String,
    pub assigned_to: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        for status in [
            TicketStatus::Pending,
            TicketStatus::InProgress,
            TicketStatus::Closed,
        ] {
            assert_eq!(TicketStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TicketStatus::parse("resolved"), None);
    }

    #[test]
    fn unknown_status_keeps_raw_label() {
        let ticket = Ticket {
            id: 1,
            email_from: "client@example.com".to_string(),
            subject: "Subject".to_string(),
            body: "Body".to_string(),
            assigned_to: UNASSIGNED.to_string(),
            status: "weird".to_string(),
            created_at: Utc::now(),
            closed_at: None,
        };
        assert_eq!(ticket.status(), None);
        assert_eq!(ticket.status_label(), "weird");
        assert!(ticket.is_unassigned());
    }
}
