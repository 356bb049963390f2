//! Ticket lifecycle: creation, assignment, reassignment, comments, closing.
//!
//! Every state change pairs the ticket update with its timeline append in a
//! single transaction. Mutations on unknown ticket ids are no-ops that
//! return `Ok(false)`.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};

use crate::models::technician::Technician;
use crate::models::ticket::{NewTicket, Ticket, TicketStatus, UNASSIGNED};
use crate::models::timeline::{NewTimelineEntry, TimelineEntry, TimelineEvent};
use crate::schema::{tickets, timeline};
use crate::services::routing::{self, RoutingMode};
use crate::services::technician_service;

/// Reassignment target that returns a ticket to the dispatch queue.
pub const DISPATCHER_TARGET: &str = "dispatcher";

pub const DEFAULT_SUBJECT: &str = "No subject";
pub const DEFAULT_BODY: &str = "No detail";

/// Raw creation input, before defaults.
#[derive(Debug, Clone)]
pub struct TicketIntake {
    pub email_from: String,
    pub subject: String,
    pub body: String,
}

impl TicketIntake {
    /// Apply the silent-default policy: blank or missing fields become
    /// placeholders instead of rejecting the request.
    pub fn from_parts(
        email_from: Option<String>,
        subject: Option<String>,
        body: Option<String>,
        default_requester: &str,
    ) -> Self {
        fn or_default(value: Option<String>, fallback: &str) -> String {
            match value {
                Some(s) if !s.trim().is_empty() => s.trim().to_string(),
                _ => fallback.to_string(),
            }
        }
        Self {
            email_from: or_default(email_from, default_requester),
            subject: or_default(subject, DEFAULT_SUBJECT),
            body: or_default(body, DEFAULT_BODY),
        }
    }
}

/// Create a ticket, optionally pre-assigned by auto-routing.
///
/// Always appends exactly one "Ticket created" entry; a routed ticket gets
/// a second entry naming the technician.
pub async fn create_ticket(
    conn: &mut AsyncPgConnection,
    intake: TicketIntake,
    routed: Option<&Technician>,
) -> anyhow::Result<Ticket> {
    let now = Utc::now();
    let (assigned_to, status) = match routed {
        Some(technician) => (technician.email.clone(), TicketStatus::InProgress),
        None => (UNASSIGNED.to_string(), TicketStatus::Pending),
    };

    let mut events = vec![TimelineEvent::Created.to_string()];
    if let Some(technician) = routed {
        events.push(TimelineEvent::AutoRouted { technician }.to_string());
    }

    let new_ticket = NewTicket {
        email_from: intake.email_from,
        subject: intake.subject,
        body: intake.body,
        assigned_to,
        status: status.as_str().to_string(),
        created_at: now,
    };

    let ticket = conn
        .transaction::<Ticket, diesel::result::Error, _>(|conn| {
            async move {
                let ticket: Ticket = diesel::insert_into(tickets::table)
                    .values(&new_ticket)
                    .get_result(conn)
                    .await?;
                for event in events {
                    diesel::insert_into(timeline::table)
                        .values(&NewTimelineEntry {
                            ticket_id: ticket.id,
                            event,
                            created_at: now,
                        })
                        .execute(conn)
                        .await?;
                }
                Ok(ticket)
            }
            .scope_boxed()
        })
        .await?;

    crate::metrics::ticket_status_changed(status.as_str());
    tracing::info!(
        ticket_id = ticket.id,
        status = %status,
        assigned_to = %ticket.assigned_to,
        "Ticket created"
    );
    Ok(ticket)
}

/// Create a ticket, resolving the technician first when auto-routing is on.
pub async fn create_with_routing(
    conn: &mut AsyncPgConnection,
    intake: TicketIntake,
    mode: RoutingMode,
    fallback_email: &str,
) -> anyhow::Result<Ticket> {
    let routed = match mode {
        RoutingMode::Auto => {
            routing::route_ticket(conn, &intake.subject, &intake.body, fallback_email).await?
        }
        RoutingMode::Manual => None,
    };
    create_ticket(conn, intake, routed.as_ref()).await
}

/// Assign a ticket to a technician (dispatcher action).
pub async fn assign_ticket(
    conn: &mut AsyncPgConnection,
    ticket_id: i64,
    technician: &Technician,
    actor: &str,
) -> anyhow::Result<bool> {
    if !ticket_exists(conn, ticket_id).await? {
        return Ok(false);
    }
    let event = TimelineEvent::Assigned { actor, technician }.to_string();
    apply_assignment(
        conn,
        ticket_id,
        technician.email.clone(),
        TicketStatus::InProgress,
        event,
    )
    .await?;
    Ok(true)
}

/// Assign a ticket to the next technician in rotation (dispatch action).
pub async fn dispatch_ticket(
    conn: &mut AsyncPgConnection,
    ticket_id: i64,
    technician: &Technician,
    actor: &str,
) -> anyhow::Result<bool> {
    if !ticket_exists(conn, ticket_id).await? {
        return Ok(false);
    }
    let event = TimelineEvent::Dispatched { actor, technician }.to_string();
    apply_assignment(
        conn,
        ticket_id,
        technician.email.clone(),
        TicketStatus::InProgress,
        event,
    )
    .await?;
    Ok(true)
}

/// Reassign a ticket. The sentinel target `"dispatcher"` returns it to the
/// queue; an unknown technician email is a no-op.
pub async fn reassign_ticket(
    conn: &mut AsyncPgConnection,
    ticket_id: i64,
    target: &str,
    note: Option<&str>,
    actor: &str,
) -> anyhow::Result<bool> {
    if !ticket_exists(conn, ticket_id).await? {
        return Ok(false);
    }

    if target == DISPATCHER_TARGET {
        let event = TimelineEvent::ReturnedToDispatcher { note }.to_string();
        apply_assignment(
            conn,
            ticket_id,
            UNASSIGNED.to_string(),
            TicketStatus::Pending,
            event,
        )
        .await?;
        return Ok(true);
    }

    let Some(technician) = technician_service::find_by_email(conn, target).await? else {
        return Ok(false);
    };
    let event = TimelineEvent::Reassigned {
        actor,
        technician: &technician,
        note,
    }
    .to_string();
    apply_assignment(
        conn,
        ticket_id,
        technician.email.clone(),
        TicketStatus::InProgress,
        event,
    )
    .await?;
    Ok(true)
}

/// Append a technician comment; no state change. Blank comments are a no-op.
pub async fn comment_ticket(
    conn: &mut AsyncPgConnection,
    ticket_id: i64,
    text: &str,
) -> anyhow::Result<bool> {
    let text = text.trim();
    if text.is_empty() || !ticket_exists(conn, ticket_id).await? {
        return Ok(false);
    }
    let entry = NewTimelineEntry {
        ticket_id,
        event: TimelineEvent::Commented { text }.to_string(),
        created_at: Utc::now(),
    };
    diesel::insert_into(timeline::table)
        .values(&entry)
        .execute(conn)
        .await?;
    Ok(true)
}

/// Close a ticket, stamping closed_at. Closing an already-closed ticket
/// re-stamps the time.
pub async fn close_ticket(conn: &mut AsyncPgConnection, ticket_id: i64) -> anyhow::Result<bool> {
    let Some(ticket) = get_ticket(conn, ticket_id).await? else {
        return Ok(false);
    };

    let now = Utc::now();
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        async move {
            diesel::update(tickets::table.find(ticket_id))
                .set((
                    tickets::status.eq(TicketStatus::Closed.as_str()),
                    tickets::closed_at.eq(Some(now)),
                ))
                .execute(conn)
                .await?;
            diesel::insert_into(timeline::table)
                .values(&NewTimelineEntry {
                    ticket_id,
                    event: TimelineEvent::Closed.to_string(),
                    created_at: now,
                })
                .execute(conn)
                .await?;
            Ok(())
        }
        .scope_boxed()
    })
    .await?;

    crate::metrics::ticket_status_changed(TicketStatus::Closed.as_str());
    let hours = (now - ticket.created_at).num_milliseconds() as f64 / 3_600_000.0;
    crate::metrics::ticket_resolution_hours(hours);
    tracing::info!(ticket_id, "Ticket closed");
    Ok(true)
}

/// Get a ticket by id.
pub async fn get_ticket(
    conn: &mut AsyncPgConnection,
    ticket_id: i64,
) -> anyhow::Result<Option<Ticket>> {
    let result = tickets::table
        .find(ticket_id)
        .first::<Ticket>(conn)
        .await
        .optional()?;
    Ok(result)
}

/// Timeline for a ticket, oldest first.
pub async fn get_timeline(
    conn: &mut AsyncPgConnection,
    ticket_id: i64,
) -> anyhow::Result<Vec<TimelineEntry>> {
    let results = timeline::table
        .filter(timeline::ticket_id.eq(ticket_id))
        .order((timeline::created_at.asc(), timeline::id.asc()))
        .load::<TimelineEntry>(conn)
        .await?;
    Ok(results)
}

/// All tickets, newest first; optionally scoped to one technician.
pub async fn list_tickets(
    conn: &mut AsyncPgConnection,
    assigned_to: Option<&str>,
) -> anyhow::Result<Vec<Ticket>> {
    let results = match assigned_to {
        Some(email) => {
            tickets::table
                .filter(tickets::assigned_to.eq(email))
                .order(tickets::created_at.desc())
                .load::<Ticket>(conn)
                .await?
        }
        None => {
            tickets::table
                .order(tickets::created_at.desc())
                .load::<Ticket>(conn)
                .await?
        }
    };
    Ok(results)
}

/// Most recent tickets for the JSON API.
pub async fn list_recent(conn: &mut AsyncPgConnection, limit: i64) -> anyhow::Result<Vec<Ticket>> {
    let results = tickets::table
        .order(tickets::id.desc())
        .limit(limit)
        .load::<Ticket>(conn)
        .await?;
    Ok(results)
}

/// Closed tickets for export, most recently closed first.
pub async fn list_closed(
    conn: &mut AsyncPgConnection,
    assigned_to: Option<&str>,
) -> anyhow::Result<Vec<Ticket>> {
    let results = match assigned_to {
        Some(email) => {
            tickets::table
                .filter(tickets::status.eq(TicketStatus::Closed.as_str()))
                .filter(tickets::assigned_to.eq(email))
                .order(tickets::closed_at.desc())
                .load::<Ticket>(conn)
                .await?
        }
        None => {
            tickets::table
                .filter(tickets::status.eq(TicketStatus::Closed.as_str()))
                .order(tickets::closed_at.desc())
                .load::<Ticket>(conn)
                .await?
        }
    };
    Ok(results)
}

async fn ticket_exists(conn: &mut AsyncPgConnection, ticket_id: i64) -> anyhow::Result<bool> {
    let found: Option<i64> = tickets::table
        .find(ticket_id)
        .select(tickets::id)
        .first(conn)
        .await
        .optional()?;
    Ok(found.is_some())
}

/// Shared tail of every assignment-shaped mutation: update the ticket row
/// and append the timeline entry atomically.
async fn apply_assignment(
    conn: &mut AsyncPgConnection,
    ticket_id: i64,
    assigned_to: String,
    status: TicketStatus,
    event: String,
) -> anyhow::Result<()> {
    let now = Utc::now();
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        async move {
            diesel::update(tickets::table.find(ticket_id))
                .set((
                    tickets::assigned_to.eq(&assigned_to),
                    tickets::status.eq(status.as_str()),
                ))
                .execute(conn)
                .await?;
            diesel::insert_into(timeline::table)
                .values(&NewTimelineEntry {
                    ticket_id,
                    event,
                    created_at: now,
                })
                .execute(conn)
                .await?;
            Ok(())
        }
        .scope_boxed()
    })
    .await?;
    crate::metrics::ticket_status_changed(status.as_str());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intake_defaults_substitute_blank_fields() {
        let intake = TicketIntake::from_parts(None, None, None, "client@example.com");
        assert_eq!(intake.email_from, "client@example.com");
        assert_eq!(intake.subject, DEFAULT_SUBJECT);
        assert_eq!(intake.body, DEFAULT_BODY);

        let intake = TicketIntake::from_parts(
            Some("   ".to_string()),
            Some("VPN down".to_string()),
            Some("  cannot connect  ".to_string()),
            "client@example.com",
        );
        assert_eq!(intake.email_from, "client@example.com");
        assert_eq!(intake.subject, "VPN down");
        assert_eq!(intake.body, "cannot connect");
    }
}
