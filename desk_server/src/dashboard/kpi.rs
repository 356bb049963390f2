//! Resolution-time KPIs for the dashboard.

use serde::Serialize;

use crate::models::ticket::Ticket;

/// Aggregate counts and average resolution time over a ticket set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketMetrics {
    pub total: i64,
    pub open: i64,
    pub closed: i64,
    /// Mean of (closed_at - created_at) over closed tickets, in hours,
    /// rounded to two decimals. 0 when nothing is closed.
    pub avg_resolution_hours: f64,
}

/// Compute metrics from ticket timestamps. A ticket counts as closed iff
/// closed_at is set.
pub fn compute_metrics(tickets: &[Ticket]) -> TicketMetrics {
    let mut durations_secs: Vec<f64> = Vec::new();
    let mut open = 0i64;
    for ticket in tickets {
        match ticket.closed_at {
            Some(closed_at) => {
                let elapsed = closed_at - ticket.created_at;
                durations_secs.push(elapsed.num_milliseconds() as f64 / 1000.0);
            }
            None => open += 1,
        }
    }
    let avg_secs = if durations_secs.is_empty() {
        0.0
    } else {
        durations_secs.iter().sum::<f64>() / durations_secs.len() as f64
    };
    TicketMetrics {
        total: tickets.len() as i64,
        open,
        closed: durations_secs.len() as i64,
        avg_resolution_hours: round2(avg_secs / 3600.0),
    }
}

/// Per-ticket resolution time in hours, rounded to two decimals. `None`
/// while the ticket is open.
pub fn resolution_hours(ticket: &Ticket) -> Option<f64> {
    let closed_at = ticket.closed_at?;
    let elapsed = closed_at - ticket.created_at;
    Some(round2(elapsed.num_milliseconds() as f64 / 3_600_000.0))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    use crate::models::ticket::{TicketStatus, UNASSIGNED};

    fn ticket(id: i64, open_for: Duration, resolution: Option<Duration>) -> Ticket {
        let created_at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap() - open_for;
        let closed_at = resolution.map(|d| created_at + d);
        Ticket {
            id,
            email_from: "client@example.com".to_string(),
            subject: "Subject".to_string(),
            body: "Body".to_string(),
            assigned_to: UNASSIGNED.to_string(),
            status: match closed_at {
                Some(_) => TicketStatus::Closed.as_str().to_string(),
                None => TicketStatus::Pending.as_str().to_string(),
            },
            created_at,
            closed_at,
        }
    }

    #[test]
    fn zero_closed_tickets_average_to_zero() {
        let tickets = vec![
            ticket(1, Duration::hours(1), None),
            ticket(2, Duration::hours(2), None),
        ];
        let metrics = compute_metrics(&tickets);
        assert_eq!(metrics.total, 2);
        assert_eq!(metrics.open, 2);
        assert_eq!(metrics.closed, 0);
        assert_eq!(metrics.avg_resolution_hours, 0.0);
    }

    #[test]
    fn empty_set_is_all_zeroes() {
        let metrics = compute_metrics(&[]);
        assert_eq!(
            metrics,
            TicketMetrics {
                total: 0,
                open: 0,
                closed: 0,
                avg_resolution_hours: 0.0
            }
        );
    }

    #[test]
    fn average_over_closed_tickets_only() {
        let tickets = vec![
            ticket(1, Duration::zero(), Some(Duration::minutes(90))),
            ticket(2, Duration::zero(), Some(Duration::minutes(150))),
            ticket(3, Duration::hours(5), None),
        ];
        let metrics = compute_metrics(&tickets);
        assert_eq!(metrics.total, 3);
        assert_eq!(metrics.open, 1);
        assert_eq!(metrics.closed, 2);
        // (1.5h + 2.5h) / 2
        assert_eq!(metrics.avg_resolution_hours, 2.0);
    }

    #[test]
    fn averages_round_to_two_decimals() {
        let tickets = vec![ticket(1, Duration::zero(), Some(Duration::minutes(100)))];
        let metrics = compute_metrics(&tickets);
        // 100 minutes = 1.666... hours
        assert_eq!(metrics.avg_resolution_hours, 1.67);
    }

    #[test]
    fn per_ticket_resolution_hours() {
        let open = ticket(1, Duration::hours(1), None);
        assert_eq!(resolution_hours(&open), None);
        let closed = ticket(2, Duration::zero(), Some(Duration::minutes(45)));
        assert_eq!(resolution_hours(&closed), Some(0.75));
    }
}
