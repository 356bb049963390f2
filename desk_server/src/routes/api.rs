//! JSON read API for tickets and metrics.

use diesel_async::AsyncPgConnection;
use serde::Serialize;

use crate::dashboard::kpi::{self, TicketMetrics};
use crate::models::ticket::Ticket;
use crate::services::ticket_service;

/// JSON response for a ticket with its timeline.
#[derive(Debug, Serialize)]
pub struct TicketJson {
    pub id: i64,
    pub email_from: String,
    pub subject: String,
    pub body: String,
    pub assigned_to: String,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub closed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub resolution_hours: Option<f64>,
    pub timeline: Vec<TimelineEntryJson>,
}

#[derive(Debug, Serialize)]
pub struct TimelineEntryJson {
    pub id: i64,
    pub event: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

fn ticket_json(ticket: Ticket, timeline: Vec<TimelineEntryJson>) -> TicketJson {
    let resolution_hours = kpi::resolution_hours(&ticket);
    TicketJson {
        id: ticket.id,
        email_from: ticket.email_from,
        subject: ticket.subject,
        body: ticket.body,
        assigned_to: ticket.assigned_to,
        status: ticket.status,
        created_at: ticket.created_at,
        closed_at: ticket.closed_at,
        resolution_hours,
        timeline,
    }
}

async fn load_timeline(
    conn: &mut AsyncPgConnection,
    ticket_id: i64,
) -> anyhow::Result<Vec<TimelineEntryJson>> {
    let entries = ticket_service::get_timeline(conn, ticket_id).await?;
    Ok(entries
        .into_iter()
        .map(|e| TimelineEntryJson {
            id: e.id,
            event: e.event,
            created_at: e.created_at,
        })
        .collect())
}

/// Get a ticket by id with its timeline. `None` for an unknown id.
pub async fn get_ticket(
    conn: &mut AsyncPgConnection,
    ticket_id: i64,
) -> anyhow::Result<Option<TicketJson>> {
    let Some(ticket) = ticket_service::get_ticket(conn, ticket_id).await? else {
        return Ok(None);
    };
    let timeline = load_timeline(conn, ticket_id).await?;
    Ok(Some(ticket_json(ticket, timeline)))
}

/// Most recent tickets with their timelines.
pub async fn list_tickets(
    conn: &mut AsyncPgConnection,
    limit: i64,
) -> anyhow::Result<Vec<TicketJson>> {
    let tickets = ticket_service::list_recent(conn, limit).await?;
    let mut result = Vec::with_capacity(tickets.len());
    for ticket in tickets {
        let timeline = load_timeline(conn, ticket.id).await?;
        result.push(ticket_json(ticket, timeline));
    }
    Ok(result)
}

/// Aggregate metrics over the full ticket set.
pub async fn metrics(conn: &mut AsyncPgConnection) -> anyhow::Result<TicketMetrics> {
    let tickets = ticket_service::list_tickets(conn, None).await?;
    Ok(kpi::compute_metrics(&tickets))
}
