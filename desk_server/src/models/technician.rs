//! Technician — staff member assignable to tickets.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::technicians;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = technicians)]
pub struct Technician {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub specialty: String,
    pub is_active: bool,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = technicians)]
pub struct NewTechnician {
    pub name: String,
    pub email: String,
    pub specialty: String,
    pub is_active: bool,
}
