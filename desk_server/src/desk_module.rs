//! Helpdesk schema migration.

use diesel_async::AsyncPgConnection;
use diesel_async::SimpleAsyncConnection;

/// SQL migration for the helpdesk tables.
///
/// Idempotent: every statement is `IF NOT EXISTS`, so it is safe to run on
/// every startup.
pub const MIGRATION_SQL: &str = r#"
-- ================================================================
-- Helpdesk Tables
-- ================================================================

CREATE TABLE IF NOT EXISTS users (
    id              BIGSERIAL PRIMARY KEY,
    role            VARCHAR(32) NOT NULL,
    identifier      VARCHAR(255) NOT NULL UNIQUE,
    password_hash   VARCHAR(64) NOT NULL,
    salt            VARCHAR(64) NOT NULL,
    last_login      TIMESTAMPTZ
);

CREATE INDEX IF NOT EXISTS idx_users_role ON users (role);

CREATE TABLE IF NOT EXISTS technicians (
    id              BIGSERIAL PRIMARY KEY,
    name            VARCHAR(255) NOT NULL,
    email           VARCHAR(255) NOT NULL UNIQUE,
    specialty       VARCHAR(64) NOT NULL,
    is_active       BOOLEAN NOT NULL DEFAULT TRUE
);

CREATE TABLE IF NOT EXISTS tickets (
    id              BIGSERIAL PRIMARY KEY,
    email_from      VARCHAR(255) NOT NULL,
    subject         VARCHAR(500) NOT NULL,
    body            TEXT NOT NULL,
    assigned_to     VARCHAR(255) NOT NULL DEFAULT 'unassigned',
    status          VARCHAR(32) NOT NULL DEFAULT 'pending',
    created_at      TIMESTAMPTZ NOT NULL,
    closed_at       TIMESTAMPTZ
);

CREATE INDEX IF NOT EXISTS idx_tickets_assigned ON tickets (assigned_to);
CREATE INDEX IF NOT EXISTS idx_tickets_status ON tickets (status);
CREATE INDEX IF NOT EXISTS idx_tickets_created ON tickets (created_at DESC);

CREATE TABLE IF NOT EXISTS timeline (
    id              BIGSERIAL PRIMARY KEY,
    ticket_id       BIGINT NOT NULL REFERENCES tickets(id) ON DELETE CASCADE,
    event           TEXT NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_timeline_ticket ON timeline (ticket_id);
"#;

/// Run the helpdesk migration.
pub async fn run_migration(conn: &mut AsyncPgConnection) -> anyhow::Result<()> {
    conn.batch_execute(MIGRATION_SQL)
        .await
        .map_err(|e| anyhow::anyhow!("helpdesk migration failed: {e}"))?;
    Ok(())
}
