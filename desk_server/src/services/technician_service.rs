//! Technician directory CRUD.

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::models::technician::{NewTechnician, Technician};
use crate::models::ticket::UNASSIGNED;
use crate::schema::technicians;

/// List technicians ordered by name.
pub async fn list(conn: &mut AsyncPgConnection, active_only: bool) -> anyhow::Result<Vec<Technician>> {
    let results = if active_only {
        technicians::table
            .filter(technicians::is_active.eq(true))
            .order(technicians::name.asc())
            .load::<Technician>(conn)
            .await?
    } else {
        technicians::table
            .order(technicians::name.asc())
            .load::<Technician>(conn)
            .await?
    };
    Ok(results)
}

/// Find an active technician by email. The unassigned sentinel and the
/// empty string never resolve.
pub async fn find_by_email(
    conn: &mut AsyncPgConnection,
    email: &str,
) -> anyhow::Result<Option<Technician>> {
    if email.is_empty() || email == UNASSIGNED {
        return Ok(None);
    }
    let result = technicians::table
        .filter(technicians::email.eq(email))
        .filter(technicians::is_active.eq(true))
        .first::<Technician>(conn)
        .await
        .optional()?;
    Ok(result)
}

/// Create a technician; duplicate emails are ignored.
pub async fn create(
    conn: &mut AsyncPgConnection,
    new_technician: NewTechnician,
) -> anyhow::Result<()> {
    diesel::insert_into(technicians::table)
        .values(&new_technician)
        .on_conflict_do_nothing()
        .execute(conn)
        .await?;
    Ok(())
}

/// Update a technician's profile and active flag.
pub async fn update(
    conn: &mut AsyncPgConnection,
    technician_id: i64,
    name: &str,
    email: &str,
    specialty: &str,
    is_active: bool,
) -> anyhow::Result<()> {
    diesel::update(technicians::table.find(technician_id))
        .set((
            technicians::name.eq(name),
            technicians::email.eq(email),
            technicians::specialty.eq(specialty),
            technicians::is_active.eq(is_active),
        ))
        .execute(conn)
        .await?;
    Ok(())
}

/// Take a technician out of the assignable roster.
pub async fn disable(conn: &mut AsyncPgConnection, technician_id: i64) -> anyhow::Result<()> {
    diesel::update(technicians::table.find(technician_id))
        .set(technicians::is_active.eq(false))
        .execute(conn)
        .await?;
    Ok(())
}
