//! Roles and credential digests.
//!
//! Passwords are stored as hex SHA-256 of salt followed by password. The
//! salt is regenerated on every credential upsert.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Session role. `Guest` is the implicit role of a request with no session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Guest,
    Admin,
    Dispatcher,
    Technician,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::Admin => "admin",
            Role::Dispatcher => "dispatcher",
            Role::Technician => "technician",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "guest" => Some(Role::Guest),
            "admin" => Some(Role::Admin),
            "dispatcher" => Some(Role::Dispatcher),
            "technician" => Some(Role::Technician),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is making the current request, resolved from the session cookie.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub role: Role,
    pub identifier: String,
    /// Set only for technician sessions; used to scope ticket lists.
    pub technician_email: String,
}

impl UserContext {
    pub fn guest() -> Self {
        Self {
            role: Role::Guest,
            identifier: String::new(),
            technician_email: String::new(),
        }
    }

    pub fn is_guest(&self) -> bool {
        self.role == Role::Guest
    }
}

/// Hex SHA-256 digest of salt ‖ password.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Fresh random salt for a credential upsert.
pub fn generate_salt() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    hash_password(password, salt) == expected_hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_salted() {
        let hash_a = hash_password("admin123", "salt-a");
        let hash_b = hash_password("admin123", "salt-b");
        assert_ne!(hash_a, hash_b);
        assert_eq!(hash_a.len(), 64);
        assert!(verify_password("admin123", "salt-a", &hash_a));
        assert!(!verify_password("admin124", "salt-a", &hash_a));
    }

    #[test]
    fn salts_are_unique() {
        assert_ne!(generate_salt(), generate_salt());
    }

    #[test]
    fn role_round_trips() {
        for role in [Role::Guest, Role::Admin, Role::Dispatcher, Role::Technician] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("root"), None);
    }
}
