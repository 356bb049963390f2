//! Prometheus metrics for helpdesk observability.

use metrics::{counter, histogram};

/// Initialize metrics exporter (Prometheus).
pub fn init_metrics() {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    if let Err(e) = builder.install() {
        tracing::warn!("Failed to install Prometheus exporter: {}", e);
    }
}

/// Record a ticket entering a lifecycle status.
pub fn ticket_status_changed(status: &str) {
    counter!("desk_tickets_total", "status" => status.to_string()).increment(1);
}

/// Record a ticket created through a channel (form or intake).
pub fn ticket_created(channel: &str) {
    counter!("desk_tickets_created_total", "channel" => channel.to_string()).increment(1);
}

/// Record an intake request, accepted or rejected.
pub fn intake_received(outcome: &str) {
    counter!("desk_intake_received_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record a successful login.
pub fn login_recorded(role: &str) {
    counter!("desk_logins_total", "role" => role.to_string()).increment(1);
}

/// Record the resolution time of a closed ticket.
pub fn ticket_resolution_hours(hours: f64) {
    histogram!("desk_resolution_hours").record(hours);
}
