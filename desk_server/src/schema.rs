//! Diesel table definitions for the helpdesk store.
//!
//! Tables: users, technicians, tickets, timeline.
//! `timeline` is the append-only audit log, keyed by ticket.

diesel::table! {
    users (id) {
        id -> Int8,
        role -> Varchar,
        identifier -> Varchar,
        password_hash -> Varchar,
        salt -> Varchar,
        last_login -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    technicians (id) {
        id -> Int8,
        name -> Varchar,
        email -> Varchar,
        specialty -> Varchar,
        is_active -> Bool,
    }
}

diesel::table! {
    tickets (id) {
        id -> Int8,
        email_from -> Varchar,
        subject -> Varchar,
        body -> Text,
        assigned_to -> Varchar,
        status -> Varchar,
        created_at -> Timestamptz,
        closed_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    timeline (id) {
        id -> Int8,
        ticket_id -> Int8,
        event -> Text,
        created_at -> Timestamptz,
    }
}

// Foreign key relationships
diesel::joinable!(timeline -> tickets (ticket_id));

diesel::allow_tables_to_appear_in_same_query!(users, technicians, tickets, timeline,);
