//! CSV export of closed tickets.

use crate::models::ticket::Ticket;

pub const EXPORT_FILENAME: &str = "closed_tickets.csv";

/// Render closed tickets as CSV with a header row.
pub fn closed_tickets_csv(tickets: &[Ticket]) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "ID",
        "Requester",
        "Subject",
        "Technician",
        "Status",
        "Created",
        "Closed",
    ])?;
    for ticket in tickets {
        writer.write_record([
            ticket.id.to_string(),
            ticket.email_from.clone(),
            ticket.subject.clone(),
            ticket.assigned_to.clone(),
            ticket.status_label().to_string(),
            ticket.created_at.to_rfc3339(),
            ticket
                .closed_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("csv export: {e}"))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    use crate::models::ticket::TicketStatus;

    fn closed_ticket(id: i64) -> Ticket {
        let created = Utc::now() - Duration::hours(3);
        Ticket {
            id,
            email_from: "client@example.com".to_string(),
            subject: "Printer jam".to_string(),
            body: "Paper stuck in tray 2".to_string(),
            assigned_to: "ana.rojas@example.com".to_string(),
            status: TicketStatus::Closed.as_str().to_string(),
            created_at: created,
            closed_at: Some(created + Duration::hours(2)),
        }
    }

    #[test]
    fn csv_has_header_and_one_row_per_ticket() {
        let tickets = vec![closed_ticket(1), closed_ticket(2)];
        let bytes = closed_tickets_csv(&tickets).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "ID,Requester,Subject,Technician,Status,Created,Closed"
        );
        assert!(lines[1].starts_with("1,client@example.com,Printer jam,ana.rojas@example.com,Closed,"));
    }

    #[test]
    fn empty_export_is_just_the_header() {
        let bytes = closed_tickets_csv(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
