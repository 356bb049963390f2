//! Base data seeding — default technicians and the bootstrap admin.
//!
//! Runs on every startup; inserts only when the tables are empty, so it is
//! idempotent.

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::auth::{self, Role};
use crate::models::technician::NewTechnician;
use crate::models::user::NewUser;
use crate::schema::{technicians, users};

pub const DEFAULT_TECHNICIANS: [(&str, &str, &str); 3] = [
    ("Laura Gomez", "laura.gomez@example.com", "Networking"),
    ("Carlos Perez", "carlos.perez@example.com", "Software"),
    ("Ana Rojas", "ana.rojas@example.com", "Hardware"),
];

pub const BOOTSTRAP_ADMIN_IDENTIFIER: &str = "admin@example.com";
const BOOTSTRAP_ADMIN_PASSWORD: &str = "admin123";

/// Seed default technicians and the bootstrap admin credential.
pub async fn seed_base_data(conn: &mut AsyncPgConnection) -> anyhow::Result<()> {
    let technician_count: i64 = technicians::table.count().get_result(conn).await?;
    if technician_count == 0 {
        let rows: Vec<NewTechnician> = DEFAULT_TECHNICIANS
            .iter()
            .map(|(name, email, specialty)| NewTechnician {
                name: name.to_string(),
                email: email.to_string(),
                specialty: specialty.to_string(),
                is_active: true,
            })
            .collect();
        diesel::insert_into(technicians::table)
            .values(&rows)
            .on_conflict_do_nothing()
            .execute(conn)
            .await?;
        tracing::info!("Seeded {} default technicians", rows.len());
    }

    let user_count: i64 = users::table.count().get_result(conn).await?;
    if user_count == 0 {
        let salt = auth::generate_salt();
        let new_user = NewUser {
            role: Role::Admin.as_str().to_string(),
            identifier: BOOTSTRAP_ADMIN_IDENTIFIER.to_string(),
            password_hash: auth::hash_password(BOOTSTRAP_ADMIN_PASSWORD, &salt),
            salt,
        };
        diesel::insert_into(users::table)
            .values(&new_user)
            .on_conflict_do_nothing()
            .execute(conn)
            .await?;
        tracing::info!(
            identifier = BOOTSTRAP_ADMIN_IDENTIFIER,
            "Seeded bootstrap admin -- change its password after first login"
        );
    }

    Ok(())
}
