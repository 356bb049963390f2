//! Credential verification and management.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::auth::{self, Role};
use crate::models::user::{NewUser, User};
use crate::schema::users;

/// Verify a credential for a role. Empty identifier or password never
/// authenticates.
pub async fn authenticate(
    conn: &mut AsyncPgConnection,
    role: Role,
    identifier: &str,
    password: &str,
) -> anyhow::Result<bool> {
    if identifier.is_empty() || password.is_empty() {
        return Ok(false);
    }
    let record: Option<User> = users::table
        .filter(users::role.eq(role.as_str()))
        .filter(users::identifier.eq(identifier))
        .first::<User>(conn)
        .await
        .optional()?;
    let Some(user) = record else {
        return Ok(false);
    };
    Ok(auth::verify_password(password, &user.salt, &user.password_hash))
}

/// Create or replace a credential, re-salting the password.
pub async fn upsert(
    conn: &mut AsyncPgConnection,
    role: Role,
    identifier: &str,
    password: &str,
) -> anyhow::Result<()> {
    let salt = auth::generate_salt();
    let password_hash = auth::hash_password(password, &salt);

    let existing: Option<i64> = users::table
        .filter(users::role.eq(role.as_str()))
        .filter(users::identifier.eq(identifier))
        .select(users::id)
        .first(conn)
        .await
        .optional()?;

    match existing {
        Some(user_id) => {
            diesel::update(users::table.find(user_id))
                .set((
                    users::password_hash.eq(&password_hash),
                    users::salt.eq(&salt),
                ))
                .execute(conn)
                .await?;
        }
        None => {
            let new_user = NewUser {
                role: role.as_str().to_string(),
                identifier: identifier.to_string(),
                password_hash,
                salt,
            };
            diesel::insert_into(users::table)
                .values(&new_user)
                .execute(conn)
                .await?;
        }
    }
    Ok(())
}

/// Stamp last_login after a successful sign-in.
pub async fn record_login(conn: &mut AsyncPgConnection, identifier: &str) -> anyhow::Result<()> {
    diesel::update(users::table.filter(users::identifier.eq(identifier)))
        .set(users::last_login.eq(Some(Utc::now())))
        .execute(conn)
        .await?;
    Ok(())
}

/// Dispatcher and technician credentials for the admin page.
pub async fn list_staff(conn: &mut AsyncPgConnection) -> anyhow::Result<Vec<User>> {
    let results = users::table
        .filter(users::role.ne(Role::Admin.as_str()))
        .order((users::role.asc(), users::identifier.asc()))
        .load::<User>(conn)
        .await?;
    Ok(results)
}
