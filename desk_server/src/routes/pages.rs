//! HTML page rendering.
//!
//! Pages are small server-rendered strings; values coming from the store or
//! the request are escaped before interpolation.

use chrono::{DateTime, Utc};

use crate::auth::{Role, UserContext};
use crate::dashboard::kpi::{self, TicketMetrics};
use crate::models::technician::Technician;
use crate::models::ticket::Ticket;
use crate::models::timeline::TimelineEntry;
use crate::models::user::User;

const STYLE: &str = r#"
    body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #f5f5f5; margin: 0; }
    .container { max-width: 1100px; margin: 0 auto; padding: 24px; }
    .nav { display: flex; gap: 16px; align-items: center; background: #1a1a2e; color: #fff; padding: 12px 24px; }
    .nav a { color: #e0e0ff; text-decoration: none; }
    .nav form { margin-left: auto; }
    .card { background: #fff; border-radius: 8px; padding: 20px; margin-bottom: 20px; box-shadow: 0 2px 6px rgba(0,0,0,0.08); }
    table { border-collapse: collapse; width: 100%; }
    th, td { text-align: left; padding: 8px 12px; border-bottom: 1px solid #e0e0e0; }
    .status { padding: 2px 10px; border-radius: 12px; font-size: 12px; }
    .status-pending { background: #fff3e0; color: #ef6c00; }
    .status-in_progress { background: #e3f2fd; color: #1565c0; }
    .status-closed { background: #e8f5e9; color: #2e7d32; }
    .metric { display: inline-block; margin-right: 32px; }
    .metric .value { font-size: 28px; font-weight: 600; }
    .metric .label { font-size: 13px; color: #666; }
    .error { color: #c62828; }
    input, select, textarea { padding: 6px; margin: 4px 0; }
    button { padding: 6px 14px; cursor: pointer; }
"#;

/// Escape a value for interpolation into HTML text or attributes.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn format_time(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn status_badge(ticket: &Ticket) -> String {
    format!(
        r#"<span class="status status-{}">{}</span>"#,
        escape(&ticket.status),
        escape(ticket.status_label())
    )
}

fn layout(title: &str, user: &UserContext, body: &str) -> String {
    let mut nav = String::new();
    if !user.is_guest() {
        nav.push_str(r#"<a href="/">Tickets</a>"#);
        if user.role != Role::Technician {
            nav.push_str(r#"<a href="/dashboard">Dashboard</a>"#);
        }
        if user.role == Role::Admin {
            nav.push_str(r#"<a href="/admin/technicians">Technicians</a>"#);
            nav.push_str(r#"<a href="/admin/credentials">Credentials</a>"#);
        }
        nav.push_str(r#"<a href="/exports/closed">Export</a>"#);
        nav.push_str(&format!(
            r#"<form method="post" action="/logout"><button>Sign out ({})</button></form>"#,
            escape(&user.identifier)
        ));
    } else {
        nav.push_str(r#"<a href="/login">Sign in</a>"#);
    }
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title} — Helpdesk</title>
<style>{STYLE}</style>
</head>
<body>
<div class="nav"><strong>Helpdesk</strong>{nav}</div>
<div class="container">{body}</div>
</body>
</html>"#,
        title = escape(title),
    )
}

pub fn login_home() -> String {
    let body = r#"<div class="card">
<h1>Sign in</h1>
<ul>
<li><a href="/login/admin">Administrator</a></li>
<li><a href="/login/dispatcher">Dispatcher</a></li>
<li><a href="/login/technician">Technician</a></li>
</ul>
</div>"#;
    layout("Sign in", &UserContext::guest(), body)
}

/// Identifier/password login form for admin and dispatcher roles.
pub fn login_form(role: Role, error: Option<&str>) -> String {
    let (title, action) = match role {
        Role::Admin => ("Administrator sign in", "/login/admin"),
        _ => ("Dispatcher sign in", "/login/dispatcher"),
    };
    let error_html = error
        .map(|e| format!(r#"<p class="error">{}</p>"#, escape(e)))
        .unwrap_or_default();
    let body = format!(
        r#"<div class="card">
<h1>{title}</h1>
{error_html}
<form method="post" action="{action}">
<p><input name="identifier" placeholder="Email" size="40"></p>
<p><input name="password" type="password" placeholder="Password" size="40"></p>
<button>Sign in</button>
</form>
</div>"#
    );
    layout(title, &UserContext::guest(), &body)
}

pub fn login_technician(technicians: &[Technician], error: Option<&str>) -> String {
    let options: String = technicians
        .iter()
        .map(|t| {
            format!(
                r#"<option value="{}">{} ({})</option>"#,
                escape(&t.email),
                escape(&t.name),
                escape(&t.specialty)
            )
        })
        .collect();
    let error_html = error
        .map(|e| format!(r#"<p class="error">{}</p>"#, escape(e)))
        .unwrap_or_default();
    let body = format!(
        r#"<div class="card">
<h1>Technician sign in</h1>
{error_html}
<form method="post" action="/login/technician">
<p><select name="technician_email">{options}</select></p>
<p><input name="password" type="password" placeholder="Password" size="40"></p>
<button>Sign in</button>
</form>
</div>"#
    );
    layout("Technician sign in", &UserContext::guest(), &body)
}

pub fn index(tickets: &[Ticket], user: &UserContext) -> String {
    let rows: String = tickets
        .iter()
        .map(|t| {
            format!(
                r#"<tr><td><a href="/tickets/{id}">#{id}</a></td><td>{subject}</td><td>{from}</td><td>{assigned}</td><td>{status}</td><td>{created}</td></tr>"#,
                id = t.id,
                subject = escape(&t.subject),
                from = escape(&t.email_from),
                assigned = escape(&t.assigned_to),
                status = status_badge(t),
                created = format_time(t.created_at),
            )
        })
        .collect();
    let body = format!(
        r#"<div class="card">
<h1>Tickets</h1>
<table>
<tr><th>ID</th><th>Subject</th><th>Requester</th><th>Assigned to</th><th>Status</th><th>Created</th></tr>
{rows}
</table>
</div>
<div class="card">
<h2>New ticket</h2>
<form method="post" action="/tickets">
<p><input name="email_from" placeholder="Requester email" size="40"></p>
<p><input name="subject" placeholder="Subject" size="40"></p>
<p><textarea name="body" placeholder="Detail" rows="4" cols="60"></textarea></p>
<button>Create</button>
</form>
</div>"#
    );
    layout("Tickets", user, &body)
}

pub fn ticket_detail(
    ticket: &Ticket,
    timeline: &[TimelineEntry],
    technicians: &[Technician],
    user: &UserContext,
) -> String {
    let entries: String = timeline
        .iter()
        .map(|e| {
            format!(
                "<li>{} — <em>{}</em></li>",
                escape(&e.event),
                format_time(e.created_at)
            )
        })
        .collect();

    let closed_row = ticket
        .closed_at
        .map(|t| format!("<p>Closed: {}</p>", format_time(t)))
        .unwrap_or_default();

    let technician_options: String = technicians
        .iter()
        .map(|t| {
            format!(
                r#"<option value="{}">{} ({})</option>"#,
                escape(&t.email),
                escape(&t.name),
                escape(&t.specialty)
            )
        })
        .collect();

    let mut actions = String::new();
    if user.role == Role::Dispatcher {
        actions.push_str(&format!(
            r#"<form method="post" action="/tickets/{id}/assign">
<select name="technician_email">{technician_options}</select>
<button>Assign</button>
</form>
<form method="post" action="/tickets/{id}/dispatch">
<button>Dispatch to next technician</button>
</form>"#,
            id = ticket.id,
        ));
    }
    if user.role == Role::Technician {
        actions.push_str(&format!(
            r#"<form method="post" action="/tickets/{id}/comment">
<textarea name="comment" placeholder="Comment" rows="3" cols="60"></textarea>
<button>Add comment</button>
</form>
<form method="post" action="/tickets/{id}/reassign">
<select name="technician_email">
<option value="dispatcher">Return to dispatcher</option>
{technician_options}
</select>
<input name="note" placeholder="Note" size="30">
<button>Reassign</button>
</form>"#,
            id = ticket.id,
        ));
    }
    if matches!(user.role, Role::Admin | Role::Technician) {
        actions.push_str(&format!(
            r#"<form method="post" action="/tickets/{}/close"><button>Close ticket</button></form>"#,
            ticket.id
        ));
    }

    let body = format!(
        r#"<div class="card">
<h1>Ticket #{id}: {subject}</h1>
<p>Requester: {from}</p>
<p>Assigned to: {assigned}</p>
<p>Status: {status}</p>
<p>Created: {created}</p>
{closed_row}
<p>{ticket_body}</p>
</div>
<div class="card">
<h2>Timeline</h2>
<ul>{entries}</ul>
</div>
<div class="card">
<h2>Actions</h2>
{actions}
</div>"#,
        id = ticket.id,
        subject = escape(&ticket.subject),
        from = escape(&ticket.email_from),
        assigned = escape(&ticket.assigned_to),
        status = status_badge(ticket),
        created = format_time(ticket.created_at),
        ticket_body = escape(&ticket.body),
    );
    layout(&format!("Ticket #{}", ticket.id), user, &body)
}

pub fn not_found(ticket_id: i64, user: &UserContext) -> String {
    let body = format!(
        r#"<div class="card"><h1>Ticket #{ticket_id} not found</h1><p><a href="/">Back to tickets</a></p></div>"#
    );
    layout("Not found", user, &body)
}

pub fn admin_technicians(technicians: &[Technician], user: &UserContext) -> String {
    let rows: String = technicians
        .iter()
        .map(|t| {
            let checked = if t.is_active { "checked" } else { "" };
            format!(
                r#"<tr>
<td>{id}</td>
<td>
<form method="post" action="/admin/technicians/{id}/update">
<input name="name" value="{name}">
<input name="email" value="{email}">
<input name="specialty" value="{specialty}">
<label><input type="checkbox" name="is_active" {checked}> active</label>
<button>Save</button>
</form>
</td>
<td><form method="post" action="/admin/technicians/{id}/disable"><button>Disable</button></form></td>
</tr>"#,
                id = t.id,
                name = escape(&t.name),
                email = escape(&t.email),
                specialty = escape(&t.specialty),
            )
        })
        .collect();
    let body = format!(
        r#"<div class="card">
<h1>Technicians</h1>
<table>
<tr><th>ID</th><th>Profile</th><th></th></tr>
{rows}
</table>
</div>
<div class="card">
<h2>New technician</h2>
<form method="post" action="/admin/technicians">
<p><input name="name" placeholder="Name"></p>
<p><input name="email" placeholder="Email"></p>
<p><input name="specialty" placeholder="Specialty"></p>
<button>Create</button>
</form>
</div>"#
    );
    layout("Technicians", user, &body)
}

pub fn admin_credentials(staff: &[User], user: &UserContext) -> String {
    let rows: String = staff
        .iter()
        .map(|u| {
            let last_login = u
                .last_login
                .map(format_time)
                .unwrap_or_else(|| "never".to_string());
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&u.role),
                escape(&u.identifier),
                last_login
            )
        })
        .collect();
    let body = format!(
        r#"<div class="card">
<h1>Credentials</h1>
<table>
<tr><th>Role</th><th>Identifier</th><th>Last login</th></tr>
{rows}
</table>
</div>
<div class="card">
<h2>Set staff credential</h2>
<form method="post" action="/admin/credentials">
<input type="hidden" name="action" value="upsert">
<p><select name="role"><option value="dispatcher">Dispatcher</option><option value="technician">Technician</option></select></p>
<p><input name="identifier" placeholder="Email"></p>
<p><input name="password" type="password" placeholder="Password"></p>
<button>Save</button>
</form>
</div>
<div class="card">
<h2>Change my password</h2>
<form method="post" action="/admin/credentials">
<input type="hidden" name="action" value="update_admin">
<p><input name="password" type="password" placeholder="New password"></p>
<button>Update</button>
</form>
</div>"#
    );
    layout("Credentials", user, &body)
}

pub fn dashboard(tickets: &[Ticket], metrics: &TicketMetrics, user: &UserContext) -> String {
    let rows: String = tickets
        .iter()
        .map(|t| {
            let hours = kpi::resolution_hours(t)
                .map(|h| format!("{h:.2}"))
                .unwrap_or_else(|| "—".to_string());
            format!(
                r#"<tr><td><a href="/tickets/{id}">#{id}</a></td><td>{subject}</td><td>{assigned}</td><td>{status}</td><td>{hours}</td></tr>"#,
                id = t.id,
                subject = escape(&t.subject),
                assigned = escape(&t.assigned_to),
                status = status_badge(t),
            )
        })
        .collect();
    let body = format!(
        r#"<div class="card">
<h1>Dashboard</h1>
<div class="metric"><div class="value">{total}</div><div class="label">Total</div></div>
<div class="metric"><div class="value">{open}</div><div class="label">Open</div></div>
<div class="metric"><div class="value">{closed}</div><div class="label">Closed</div></div>
<div class="metric"><div class="value">{avg:.2}</div><div class="label">Avg resolution (hours)</div></div>
</div>
<div class="card">
<table>
<tr><th>ID</th><th>Subject</th><th>Assigned to</th><th>Status</th><th>Resolution (h)</th></tr>
{rows}
</table>
</div>"#,
        total = metrics.total,
        open = metrics.open,
        closed = metrics.closed,
        avg = metrics.avg_resolution_hours,
    );
    layout("Dashboard", user, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(
            escape(r#"<script>alert("x")</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt;"
        );
        assert_eq!(escape("a & b"), "a &amp; b");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn guest_layout_links_to_login() {
        let html = login_home();
        assert!(html.contains(r#"<a href="/login/admin">"#));
        assert!(html.contains("Sign in"));
    }
}
