//! In-memory session store with periodic vacuum.
//!
//! Tokens are opaque UUIDs carried in the `desk_session` cookie. Sessions
//! live only in process memory; a restart signs everyone out.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};

use crate::auth::Role;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "desk_session";

#[derive(Debug, Clone)]
pub struct Session {
    pub role: Role,
    pub identifier: String,
    pub technician_email: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[derive(Default)]
pub struct SessionStore {
    inner: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session and return its token.
    pub fn create(
        &self,
        role: Role,
        identifier: &str,
        technician_email: &str,
        ttl: Duration,
    ) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        let session = Session {
            role,
            identifier: identifier.to_string(),
            technician_email: technician_email.to_string(),
            expires_at: Utc::now() + ttl,
        };
        self.inner
            .write()
            .expect("session store poisoned")
            .insert(token.clone(), session);
        token
    }

    /// Look up a live session. Expired entries are treated as absent and
    /// removed on the next vacuum.
    pub fn get(&self, token: &str) -> Option<Session> {
        let sessions = self.inner.read().expect("session store poisoned");
        sessions.get(token).filter(|s| !s.is_expired()).cloned()
    }

    pub fn remove(&self, token: &str) {
        self.inner
            .write()
            .expect("session store poisoned")
            .remove(token);
    }

    /// Drop expired sessions; returns how many were removed.
    pub fn vacuum(&self) -> usize {
        let mut sessions = self.inner.write().expect("session store poisoned");
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired());
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("session store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sweep expired sessions once a minute.
pub fn spawn_vacuum_task(store: Arc<SessionStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            let removed = store.vacuum();
            if removed > 0 {
                tracing::debug!(removed, "Vacuumed expired sessions");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_get() {
        let store = SessionStore::new();
        let token = store.create(
            Role::Technician,
            "laura.gomez@example.com",
            "laura.gomez@example.com",
            Duration::minutes(30),
        );
        let session = store.get(&token).expect("session should be live");
        assert_eq!(session.role, Role::Technician);
        assert_eq!(session.identifier, "laura.gomez@example.com");
        assert!(store.get("no-such-token").is_none());
    }

    #[test]
    fn expired_sessions_are_invisible_and_vacuumed() {
        let store = SessionStore::new();
        let token = store.create(Role::Admin, "admin@example.com", "", Duration::seconds(-1));
        assert!(store.get(&token).is_none());
        assert_eq!(store.len(), 1);
        assert_eq!(store.vacuum(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn remove_signs_out() {
        let store = SessionStore::new();
        let token = store.create(Role::Dispatcher, "d@example.com", "", Duration::hours(1));
        store.remove(&token);
        assert!(store.get(&token).is_none());
    }
}
