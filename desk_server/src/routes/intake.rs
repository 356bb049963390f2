//! JSON intake endpoint — turns inbound mail gateway posts into tickets.

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::DeskConfig;
use crate::db::PgPool;
use crate::services::ticket_service::{self, TicketIntake};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Default, Deserialize)]
pub struct IntakePayload {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IntakeResponse {
    pub ticket_id: i64,
    pub status: &'static str,
}

/// Validate the intake signature (`x-intake-signature`).
///
/// With no secret configured, validation is skipped entirely.
pub fn validate_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    if secret.is_empty() {
        return true;
    }

    let sig = signature.strip_prefix("sha256=").unwrap_or(signature);
    let sig_bytes = match hex::decode(sig) {
        Ok(b) => b,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(payload);

    mac.verify_slice(&sig_bytes).is_ok()
}

/// Handle an inbound intake payload. Malformed JSON and missing fields get
/// the silent-default treatment rather than a rejection.
pub async fn handle_intake(
    config: &DeskConfig,
    pool: &PgPool,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, axum::Json<IntakeResponse>), StatusCode> {
    let signature = headers
        .get("x-intake-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !validate_signature(&config.intake_secret, &body, signature) {
        tracing::warn!("Intake signature validation failed");
        crate::metrics::intake_received("rejected");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let payload: IntakePayload = serde_json::from_slice(&body).unwrap_or_default();
    let intake = TicketIntake::from_parts(
        payload.from,
        payload.subject,
        payload.body,
        &config.default_requester,
    );

    let mut conn = pool
        .get()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let ticket = ticket_service::create_with_routing(
        &mut conn,
        intake,
        config.routing,
        &config.fallback_technician,
    )
    .await
    .map_err(|e| {
        tracing::error!("Intake ticket creation failed: {e}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    crate::metrics::intake_received("accepted");
    crate::metrics::ticket_created("intake");
    tracing::info!(ticket_id = ticket.id, "Ticket created from intake");

    Ok((
        StatusCode::CREATED,
        axum::Json(IntakeResponse {
            ticket_id: ticket.id,
            status: "created",
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_secret_skips_validation() {
        assert!(validate_signature("", b"{}", ""));
    }

    #[test]
    fn valid_signature_is_accepted() {
        let secret = "intake-secret";
        let payload = br#"{"subject":"VPN down"}"#;
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload);
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(validate_signature(secret, payload, &signature));
        assert!(validate_signature(
            secret,
            payload,
            &format!("sha256={signature}")
        ));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let secret = "intake-secret";
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(b"original");
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(!validate_signature(secret, b"tampered", &signature));
        assert!(!validate_signature(secret, b"original", "not-hex"));
    }

    #[test]
    fn malformed_json_falls_back_to_defaults() {
        let payload: IntakePayload = serde_json::from_slice(b"not json").unwrap_or_default();
        assert!(payload.from.is_none());
        assert!(payload.subject.is_none());
        assert!(payload.body.is_none());
    }
}
