//! Helpdesk configuration — loaded from environment variables.

use crate::services::routing::RoutingMode;

#[derive(Clone, Debug)]
pub struct DeskConfig {
    /// Whether ticket creation auto-routes by keyword or leaves tickets
    /// pending for a dispatcher.
    pub routing: RoutingMode,
    /// Technician email that receives auto-routed tickets with no keyword
    /// match.
    pub fallback_technician: String,
    /// Shared secret for HMAC validation of the JSON intake endpoint.
    pub intake_secret: String,
    /// Session lifetime in minutes.
    pub session_ttl_min: i64,
    /// Requester substituted when a ticket arrives without a sender.
    pub default_requester: String,
}

impl DeskConfig {
    pub fn from_env() -> Self {
        let routing = std::env::var("DESK_ROUTING")
            .map(|s| RoutingMode::parse(&s))
            .unwrap_or(RoutingMode::Manual);
        let fallback_technician = std::env::var("DESK_FALLBACK_TECHNICIAN")
            .unwrap_or_else(|_| "carlos.perez@example.com".to_string());
        let intake_secret = std::env::var("DESK_INTAKE_SECRET").unwrap_or_default();
        let session_ttl_min = std::env::var("DESK_SESSION_TTL_MIN")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(480);
        let default_requester = std::env::var("DESK_DEFAULT_REQUESTER")
            .unwrap_or_else(|_| "client@example.com".to_string());

        if intake_secret.is_empty() {
            tracing::warn!("DESK_INTAKE_SECRET not set -- intake signature validation disabled");
        }

        Self {
            routing,
            fallback_technician,
            intake_secret,
            session_ttl_min,
            default_requester,
        }
    }
}
