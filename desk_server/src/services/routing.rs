//! Keyword routing and round-robin dispatch.

use std::sync::atomic::{AtomicUsize, Ordering};

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::models::technician::Technician;
use crate::schema::technicians;
use crate::services::technician_service;

/// How tickets get a technician at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingMode {
    /// Tickets stay pending until a dispatcher assigns them.
    Manual,
    /// Tickets are assigned at creation by keyword match, with a fixed
    /// fallback technician.
    Auto,
}

impl RoutingMode {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "auto" => RoutingMode::Auto,
            _ => RoutingMode::Manual,
        }
    }
}

/// Classify a ticket's text into a technician specialty.
pub fn classify_specialty(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    if lower.contains("network")
        || lower.contains("red")
        || lower.contains("wifi")
        || lower.contains("vpn")
        || lower.contains("dns")
        || lower.contains("router")
    {
        Some("Networking")
    } else if lower.contains("hardware")
        || lower.contains("printer")
        || lower.contains("disk")
        || lower.contains("screen")
        || lower.contains("keyboard")
    {
        Some("Hardware")
    } else if lower.contains("software")
        || lower.contains("install")
        || lower.contains("license")
        || lower.contains("update")
        || lower.contains("application")
    {
        Some("Software")
    } else {
        None
    }
}

/// Resolve the technician for a new ticket under [`RoutingMode::Auto`].
///
/// Keyword match over subject+body picks the first active technician with
/// the matching specialty; otherwise the configured fallback technician.
/// Returns `None` when neither resolves to an active technician.
pub async fn route_ticket(
    conn: &mut AsyncPgConnection,
    subject: &str,
    body: &str,
    fallback_email: &str,
) -> anyhow::Result<Option<Technician>> {
    let text = format!("{subject} {body}");
    if let Some(specialty) = classify_specialty(&text) {
        let matched: Option<Technician> = technicians::table
            .filter(technicians::specialty.eq(specialty))
            .filter(technicians::is_active.eq(true))
            .order(technicians::name.asc())
            .first::<Technician>(conn)
            .await
            .optional()?;
        if let Some(technician) = matched {
            return Ok(Some(technician));
        }
    }
    technician_service::find_by_email(conn, fallback_email).await
}

/// Pick the next technician in round-robin order for the dispatch action.
///
/// The cursor lives in process memory; a restart resets the rotation.
pub fn next_round_robin<'a>(
    technicians: &'a [Technician],
    cursor: &AtomicUsize,
) -> Option<&'a Technician> {
    if technicians.is_empty() {
        return None;
    }
    let index = cursor.fetch_add(1, Ordering::Relaxed) % technicians.len();
    technicians.get(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tech(id: i64, name: &str, specialty: &str) -> Technician {
        Technician {
            id,
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            specialty: specialty.to_string(),
            is_active: true,
        }
    }

    #[test]
    fn red_routes_to_networking() {
        assert_eq!(classify_specialty("the red light is blinking"), Some("Networking"));
        assert_eq!(classify_specialty("VPN is down"), Some("Networking"));
    }

    #[test]
    fn hardware_and_software_keywords() {
        assert_eq!(classify_specialty("printer out of toner"), Some("Hardware"));
        assert_eq!(classify_specialty("cannot install the application"), Some("Software"));
    }

    #[test]
    fn unmatched_text_has_no_specialty() {
        assert_eq!(classify_specialty("please help"), None);
    }

    #[test]
    fn routing_mode_defaults_to_manual() {
        assert_eq!(RoutingMode::parse("auto"), RoutingMode::Auto);
        assert_eq!(RoutingMode::parse("AUTO"), RoutingMode::Auto);
        assert_eq!(RoutingMode::parse("manual"), RoutingMode::Manual);
        assert_eq!(RoutingMode::parse("nonsense"), RoutingMode::Manual);
    }

    #[test]
    fn round_robin_cycles() {
        let technicians = vec![
            tech(1, "Laura Gomez", "Networking"),
            tech(2, "Carlos Perez", "Software"),
            tech(3, "Ana Rojas", "Hardware"),
        ];
        let cursor = AtomicUsize::new(0);
        let picks: Vec<i64> = (0..4)
            .map(|_| next_round_robin(&technicians, &cursor).unwrap().id)
            .collect();
        assert_eq!(picks, vec![1, 2, 3, 1]);
    }

    #[test]
    fn round_robin_on_empty_roster() {
        let cursor = AtomicUsize::new(0);
        assert!(next_round_robin(&[], &cursor).is_none());
    }
}
