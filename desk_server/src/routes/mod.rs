//! Helpdesk HTTP routes — pages, actions, intake, JSON API, CSV export.

pub mod api;
pub mod intake;
pub mod pages;

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use tower_cookies::{Cookie, CookieManagerLayer, Cookies};
use tower_http::trace::TraceLayer;

use crate::auth::{Role, UserContext};
use crate::config::DeskConfig;
use crate::db::{PgConn, PgPool};
use crate::services::ticket_service::{self, TicketIntake};
use crate::services::{export_service, routing, technician_service, user_service};
use crate::session::{SessionStore, SESSION_COOKIE};

/// Shared state for route handlers.
#[derive(Clone)]
pub struct DeskRouterState {
    pub pool: PgPool,
    pub config: DeskConfig,
    pub sessions: Arc<SessionStore>,
    /// Rotation cursor for the round-robin dispatch action.
    pub dispatch_cursor: Arc<AtomicUsize>,
}

/// Build the helpdesk Axum router.
pub fn desk_router(state: DeskRouterState) -> Router {
    Router::new()
        // Pages
        .route("/", get(index))
        .route("/login", get(login_home))
        .route("/login/admin", get(login_admin_form).post(login_admin))
        .route(
            "/login/dispatcher",
            get(login_dispatcher_form).post(login_dispatcher),
        )
        .route(
            "/login/technician",
            get(login_technician_form).post(login_technician),
        )
        .route("/logout", post(logout))
        .route("/dashboard", get(dashboard_page))
        // Ticket lifecycle
        .route("/tickets", post(create_ticket_handler))
        .route("/tickets/{ticket_id}", get(ticket_detail))
        .route("/tickets/{ticket_id}/close", post(close_ticket_handler))
        .route("/tickets/{ticket_id}/comment", post(comment_ticket_handler))
        .route("/tickets/{ticket_id}/assign", post(assign_ticket_handler))
        .route(
            "/tickets/{ticket_id}/reassign",
            post(reassign_ticket_handler),
        )
        .route(
            "/tickets/{ticket_id}/dispatch",
            post(dispatch_ticket_handler),
        )
        // Admin
        .route(
            "/admin/technicians",
            get(admin_technicians).post(create_technician_handler),
        )
        .route(
            "/admin/technicians/{technician_id}/update",
            post(update_technician_handler),
        )
        .route(
            "/admin/technicians/{technician_id}/disable",
            post(disable_technician_handler),
        )
        .route(
            "/admin/credentials",
            get(admin_credentials).post(upsert_credential_handler),
        )
        // Export, intake, JSON API
        .route("/exports/closed", get(export_closed_handler))
        .route("/intake/email", post(intake_handler))
        .route("/api/tickets", get(api_list_tickets))
        .route("/api/tickets/{ticket_id}", get(api_get_ticket))
        .route("/api/metrics", get(api_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CookieManagerLayer::new())
        .with_state(state)
}

// ── Shared helpers ──

fn current_user(state: &DeskRouterState, cookies: &Cookies) -> UserContext {
    cookies
        .get(SESSION_COOKIE)
        .and_then(|c| state.sessions.get(c.value()))
        .map(|s| UserContext {
            role: s.role,
            identifier: s.identifier,
            technician_email: s.technician_email,
        })
        .unwrap_or_else(UserContext::guest)
}

async fn get_conn(state: &DeskRouterState) -> Result<PgConn, StatusCode> {
    state
        .pool
        .get()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

fn internal_error<E: std::fmt::Display>(e: E) -> StatusCode {
    tracing::error!("Request failed: {e}");
    StatusCode::INTERNAL_SERVER_ERROR
}

fn detail_redirect(ticket_id: i64) -> Response {
    Redirect::to(&format!("/tickets/{ticket_id}")).into_response()
}

fn start_session(
    state: &DeskRouterState,
    cookies: &Cookies,
    role: Role,
    identifier: &str,
    technician_email: &str,
) {
    let ttl = chrono::Duration::minutes(state.config.session_ttl_min);
    let token = state.sessions.create(role, identifier, technician_email, ttl);
    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookies.add(cookie);
}

/// Ticket scope for listings: technicians only see their own tickets.
fn assignment_scope(user: &UserContext) -> Option<&str> {
    if user.role == Role::Technician && !user.technician_email.is_empty() {
        Some(user.technician_email.as_str())
    } else {
        None
    }
}

// ── Pages ──

async fn index(
    State(state): State<DeskRouterState>,
    cookies: Cookies,
) -> Result<Response, StatusCode> {
    let user = current_user(&state, &cookies);
    if user.is_guest() {
        return Ok(Redirect::to("/login").into_response());
    }
    let mut conn = get_conn(&state).await?;
    let tickets = ticket_service::list_tickets(&mut conn, assignment_scope(&user))
        .await
        .map_err(internal_error)?;
    Ok(Html(pages::index(&tickets, &user)).into_response())
}

async fn login_home() -> Html<String> {
    Html(pages::login_home())
}

async fn login_admin_form() -> Html<String> {
    Html(pages::login_form(Role::Admin, None))
}

async fn login_dispatcher_form() -> Html<String> {
    Html(pages::login_form(Role::Dispatcher, None))
}

async fn login_technician_form(
    State(state): State<DeskRouterState>,
) -> Result<Html<String>, StatusCode> {
    let mut conn = get_conn(&state).await?;
    let technicians = technician_service::list(&mut conn, true)
        .await
        .map_err(internal_error)?;
    Ok(Html(pages::login_technician(&technicians, None)))
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    identifier: Option<String>,
    password: Option<String>,
}

async fn login_admin(
    State(state): State<DeskRouterState>,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> Result<Response, StatusCode> {
    credential_login(&state, &cookies, Role::Admin, form).await
}

async fn login_dispatcher(
    State(state): State<DeskRouterState>,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> Result<Response, StatusCode> {
    credential_login(&state, &cookies, Role::Dispatcher, form).await
}

async fn credential_login(
    state: &DeskRouterState,
    cookies: &Cookies,
    role: Role,
    form: LoginForm,
) -> Result<Response, StatusCode> {
    let identifier = form.identifier.unwrap_or_default().trim().to_string();
    let password = form.password.unwrap_or_default();

    let mut conn = get_conn(state).await?;
    let authenticated = user_service::authenticate(&mut conn, role, &identifier, &password)
        .await
        .map_err(internal_error)?;
    if !authenticated {
        return Ok(Html(pages::login_form(role, Some("Invalid credentials."))).into_response());
    }

    user_service::record_login(&mut conn, &identifier)
        .await
        .map_err(internal_error)?;
    start_session(state, cookies, role, &identifier, "");
    crate::metrics::login_recorded(role.as_str());
    Ok(Redirect::to("/").into_response())
}

#[derive(Debug, Deserialize)]
struct TechnicianLoginForm {
    technician_email: Option<String>,
    password: Option<String>,
}

async fn login_technician(
    State(state): State<DeskRouterState>,
    cookies: Cookies,
    Form(form): Form<TechnicianLoginForm>,
) -> Result<Response, StatusCode> {
    let email = form.technician_email.unwrap_or_default().trim().to_string();
    let password = form.password.unwrap_or_default();

    let mut conn = get_conn(&state).await?;
    let authenticated = user_service::authenticate(&mut conn, Role::Technician, &email, &password)
        .await
        .map_err(internal_error)?;
    if !authenticated {
        let technicians = technician_service::list(&mut conn, true)
            .await
            .map_err(internal_error)?;
        return Ok(
            Html(pages::login_technician(&technicians, Some("Invalid credentials.")))
                .into_response(),
        );
    }

    user_service::record_login(&mut conn, &email)
        .await
        .map_err(internal_error)?;
    start_session(&state, &cookies, Role::Technician, &email, &email);
    crate::metrics::login_recorded(Role::Technician.as_str());
    Ok(Redirect::to("/").into_response())
}

async fn logout(State(state): State<DeskRouterState>, cookies: Cookies) -> Redirect {
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        state.sessions.remove(cookie.value());
    }
    let mut removal = Cookie::new(SESSION_COOKIE, "");
    removal.set_path("/");
    cookies.remove(removal);
    Redirect::to("/login")
}

async fn dashboard_page(
    State(state): State<DeskRouterState>,
    cookies: Cookies,
) -> Result<Response, StatusCode> {
    let user = current_user(&state, &cookies);
    if user.is_guest() {
        return Ok(Redirect::to("/login").into_response());
    }
    if user.role == Role::Technician {
        return Ok(Redirect::to("/").into_response());
    }
    let mut conn = get_conn(&state).await?;
    let tickets = ticket_service::list_tickets(&mut conn, None)
        .await
        .map_err(internal_error)?;
    let metrics = crate::dashboard::kpi::compute_metrics(&tickets);
    Ok(Html(pages::dashboard(&tickets, &metrics, &user)).into_response())
}

// ── Ticket lifecycle ──

#[derive(Debug, Deserialize)]
struct CreateTicketForm {
    email_from: Option<String>,
    subject: Option<String>,
    body: Option<String>,
}

async fn create_ticket_handler(
    State(state): State<DeskRouterState>,
    cookies: Cookies,
    Form(form): Form<CreateTicketForm>,
) -> Result<Response, StatusCode> {
    let user = current_user(&state, &cookies);
    if user.is_guest() {
        return Ok(Redirect::to("/login").into_response());
    }

    let intake = TicketIntake::from_parts(
        form.email_from,
        form.subject,
        form.body,
        &state.config.default_requester,
    );
    let mut conn = get_conn(&state).await?;
    let ticket = ticket_service::create_with_routing(
        &mut conn,
        intake,
        state.config.routing,
        &state.config.fallback_technician,
    )
    .await
    .map_err(internal_error)?;

    crate::metrics::ticket_created("form");
    Ok(detail_redirect(ticket.id))
}

async fn ticket_detail(
    State(state): State<DeskRouterState>,
    cookies: Cookies,
    Path(ticket_id): Path<i64>,
) -> Result<Response, StatusCode> {
    let user = current_user(&state, &cookies);
    if user.is_guest() {
        return Ok(Redirect::to("/login").into_response());
    }
    let mut conn = get_conn(&state).await?;
    let Some(ticket) = ticket_service::get_ticket(&mut conn, ticket_id)
        .await
        .map_err(internal_error)?
    else {
        return Ok(
            (StatusCode::NOT_FOUND, Html(pages::not_found(ticket_id, &user))).into_response(),
        );
    };
    let timeline = ticket_service::get_timeline(&mut conn, ticket_id)
        .await
        .map_err(internal_error)?;
    let technicians = technician_service::list(&mut conn, true)
        .await
        .map_err(internal_error)?;
    Ok(Html(pages::ticket_detail(&ticket, &timeline, &technicians, &user)).into_response())
}

async fn close_ticket_handler(
    State(state): State<DeskRouterState>,
    cookies: Cookies,
    Path(ticket_id): Path<i64>,
) -> Result<Response, StatusCode> {
    let user = current_user(&state, &cookies);
    if !matches!(user.role, Role::Admin | Role::Technician) {
        return Ok(detail_redirect(ticket_id));
    }
    let mut conn = get_conn(&state).await?;
    ticket_service::close_ticket(&mut conn, ticket_id)
        .await
        .map_err(internal_error)?;
    Ok(detail_redirect(ticket_id))
}

#[derive(Debug, Deserialize)]
struct CommentForm {
    comment: Option<String>,
}

async fn comment_ticket_handler(
    State(state): State<DeskRouterState>,
    cookies: Cookies,
    Path(ticket_id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> Result<Response, StatusCode> {
    let user = current_user(&state, &cookies);
    if user.role != Role::Technician {
        return Ok(detail_redirect(ticket_id));
    }
    let mut conn = get_conn(&state).await?;
    ticket_service::comment_ticket(&mut conn, ticket_id, form.comment.as_deref().unwrap_or(""))
        .await
        .map_err(internal_error)?;
    Ok(detail_redirect(ticket_id))
}

#[derive(Debug, Deserialize)]
struct AssignForm {
    technician_email: Option<String>,
}

async fn assign_ticket_handler(
    State(state): State<DeskRouterState>,
    cookies: Cookies,
    Path(ticket_id): Path<i64>,
    Form(form): Form<AssignForm>,
) -> Result<Response, StatusCode> {
    let user = current_user(&state, &cookies);
    if user.role != Role::Dispatcher {
        return Ok(detail_redirect(ticket_id));
    }
    let email = form.technician_email.unwrap_or_default();
    let mut conn = get_conn(&state).await?;
    let Some(technician) = technician_service::find_by_email(&mut conn, email.trim())
        .await
        .map_err(internal_error)?
    else {
        return Ok(detail_redirect(ticket_id));
    };
    let actor = if user.identifier.is_empty() {
        "dispatcher"
    } else {
        user.identifier.as_str()
    };
    ticket_service::assign_ticket(&mut conn, ticket_id, &technician, actor)
        .await
        .map_err(internal_error)?;
    Ok(detail_redirect(ticket_id))
}

#[derive(Debug, Deserialize)]
struct ReassignForm {
    technician_email: Option<String>,
    note: Option<String>,
}

async fn reassign_ticket_handler(
    State(state): State<DeskRouterState>,
    cookies: Cookies,
    Path(ticket_id): Path<i64>,
    Form(form): Form<ReassignForm>,
) -> Result<Response, StatusCode> {
    let user = current_user(&state, &cookies);
    if user.role != Role::Technician {
        return Ok(detail_redirect(ticket_id));
    }
    let target = form.technician_email.unwrap_or_default();
    let target = target.trim();
    if target.is_empty() {
        return Ok(detail_redirect(ticket_id));
    }
    let note_text = form.note.unwrap_or_default();
    let note_text = note_text.trim();
    let note = (!note_text.is_empty()).then_some(note_text);
    let actor = if user.identifier.is_empty() {
        "technician"
    } else {
        user.identifier.as_str()
    };
    let mut conn = get_conn(&state).await?;
    ticket_service::reassign_ticket(&mut conn, ticket_id, target, note, actor)
        .await
        .map_err(internal_error)?;
    Ok(detail_redirect(ticket_id))
}

async fn dispatch_ticket_handler(
    State(state): State<DeskRouterState>,
    cookies: Cookies,
    Path(ticket_id): Path<i64>,
) -> Result<Response, StatusCode> {
    let user = current_user(&state, &cookies);
    if user.role != Role::Dispatcher {
        return Ok(detail_redirect(ticket_id));
    }
    let mut conn = get_conn(&state).await?;
    let technicians = technician_service::list(&mut conn, true)
        .await
        .map_err(internal_error)?;
    let Some(technician) = routing::next_round_robin(&technicians, &state.dispatch_cursor) else {
        return Ok(detail_redirect(ticket_id));
    };
    let actor = if user.identifier.is_empty() {
        "dispatcher"
    } else {
        user.identifier.as_str()
    };
    ticket_service::dispatch_ticket(&mut conn, ticket_id, technician, actor)
        .await
        .map_err(internal_error)?;
    Ok(detail_redirect(ticket_id))
}

// ── Admin ──

async fn admin_technicians(
    State(state): State<DeskRouterState>,
    cookies: Cookies,
) -> Result<Response, StatusCode> {
    let user = current_user(&state, &cookies);
    if user.role != Role::Admin {
        return Ok(Redirect::to("/").into_response());
    }
    let mut conn = get_conn(&state).await?;
    let technicians = technician_service::list(&mut conn, false)
        .await
        .map_err(internal_error)?;
    Ok(Html(pages::admin_technicians(&technicians, &user)).into_response())
}

#[derive(Debug, Deserialize)]
struct TechnicianForm {
    name: Option<String>,
    email: Option<String>,
    specialty: Option<String>,
    is_active: Option<String>,
}

async fn create_technician_handler(
    State(state): State<DeskRouterState>,
    cookies: Cookies,
    Form(form): Form<TechnicianForm>,
) -> Result<Response, StatusCode> {
    let user = current_user(&state, &cookies);
    if user.role != Role::Admin {
        return Ok(Redirect::to("/").into_response());
    }
    let name = form.name.unwrap_or_default().trim().to_string();
    let email = form.email.unwrap_or_default().trim().to_string();
    let specialty = form.specialty.unwrap_or_default().trim().to_string();
    if !name.is_empty() && !email.is_empty() && !specialty.is_empty() {
        let mut conn = get_conn(&state).await?;
        technician_service::create(
            &mut conn,
            crate::models::technician::NewTechnician {
                name,
                email,
                specialty,
                is_active: true,
            },
        )
        .await
        .map_err(internal_error)?;
    }
    Ok(Redirect::to("/admin/technicians").into_response())
}

async fn update_technician_handler(
    State(state): State<DeskRouterState>,
    cookies: Cookies,
    Path(technician_id): Path<i64>,
    Form(form): Form<TechnicianForm>,
) -> Result<Response, StatusCode> {
    let user = current_user(&state, &cookies);
    if user.role != Role::Admin {
        return Ok(Redirect::to("/").into_response());
    }
    let name = form.name.unwrap_or_default().trim().to_string();
    let email = form.email.unwrap_or_default().trim().to_string();
    let specialty = form.specialty.unwrap_or_default().trim().to_string();
    let is_active = form.is_active.as_deref() == Some("on");
    if !name.is_empty() && !email.is_empty() && !specialty.is_empty() {
        let mut conn = get_conn(&state).await?;
        technician_service::update(&mut conn, technician_id, &name, &email, &specialty, is_active)
            .await
            .map_err(internal_error)?;
    }
    Ok(Redirect::to("/admin/technicians").into_response())
}

async fn disable_technician_handler(
    State(state): State<DeskRouterState>,
    cookies: Cookies,
    Path(technician_id): Path<i64>,
) -> Result<Response, StatusCode> {
    let user = current_user(&state, &cookies);
    if user.role != Role::Admin {
        return Ok(Redirect::to("/").into_response());
    }
    let mut conn = get_conn(&state).await?;
    technician_service::disable(&mut conn, technician_id)
        .await
        .map_err(internal_error)?;
    Ok(Redirect::to("/admin/technicians").into_response())
}

async fn admin_credentials(
    State(state): State<DeskRouterState>,
    cookies: Cookies,
) -> Result<Response, StatusCode> {
    let user = current_user(&state, &cookies);
    if user.role != Role::Admin {
        return Ok(Redirect::to("/").into_response());
    }
    let mut conn = get_conn(&state).await?;
    let staff = user_service::list_staff(&mut conn)
        .await
        .map_err(internal_error)?;
    Ok(Html(pages::admin_credentials(&staff, &user)).into_response())
}

#[derive(Debug, Deserialize)]
struct CredentialForm {
    action: Option<String>,
    role: Option<String>,
    identifier: Option<String>,
    password: Option<String>,
}

async fn upsert_credential_handler(
    State(state): State<DeskRouterState>,
    cookies: Cookies,
    Form(form): Form<CredentialForm>,
) -> Result<Response, StatusCode> {
    let user = current_user(&state, &cookies);
    if user.role != Role::Admin {
        return Ok(Redirect::to("/").into_response());
    }

    let action = form.action.unwrap_or_else(|| "upsert".to_string());
    let password = form.password.unwrap_or_default();

    let mut conn = get_conn(&state).await?;
    if action == "update_admin" {
        if !user.identifier.is_empty() && !password.is_empty() {
            user_service::upsert(&mut conn, Role::Admin, &user.identifier, &password)
                .await
                .map_err(internal_error)?;
        }
    } else {
        let role = form.role.as_deref().and_then(Role::parse);
        let identifier = form.identifier.unwrap_or_default().trim().to_string();
        if let Some(role @ (Role::Dispatcher | Role::Technician)) = role {
            if !identifier.is_empty() && !password.is_empty() {
                user_service::upsert(&mut conn, role, &identifier, &password)
                    .await
                    .map_err(internal_error)?;
            }
        }
    }
    Ok(Redirect::to("/admin/credentials").into_response())
}

// ── Export ──

async fn export_closed_handler(
    State(state): State<DeskRouterState>,
    cookies: Cookies,
) -> Result<Response, StatusCode> {
    let user = current_user(&state, &cookies);
    if user.is_guest() {
        return Ok(Redirect::to("/login").into_response());
    }
    let mut conn = get_conn(&state).await?;
    let tickets = ticket_service::list_closed(&mut conn, assignment_scope(&user))
        .await
        .map_err(internal_error)?;
    let csv = export_service::closed_tickets_csv(&tickets).map_err(internal_error)?;
    let headers = [
        (
            header::CONTENT_TYPE,
            "text/csv; charset=utf-8".to_string(),
        ),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", export_service::EXPORT_FILENAME),
        ),
    ];
    Ok((headers, csv).into_response())
}

// ── Intake ──

async fn intake_handler(
    State(state): State<DeskRouterState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<intake::IntakeResponse>), StatusCode> {
    intake::handle_intake(&state.config, &state.pool, &headers, body).await
}

// ── JSON API ──

#[derive(Debug, Deserialize)]
struct ListTicketsQuery {
    limit: Option<i64>,
}

async fn api_list_tickets(
    State(state): State<DeskRouterState>,
    cookies: Cookies,
    Query(query): Query<ListTicketsQuery>,
) -> Result<Json<Vec<api::TicketJson>>, StatusCode> {
    let user = current_user(&state, &cookies);
    if user.is_guest() {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let mut conn = get_conn(&state).await?;
    api::list_tickets(&mut conn, query.limit.unwrap_or(20))
        .await
        .map(Json)
        .map_err(internal_error)
}

async fn api_get_ticket(
    State(state): State<DeskRouterState>,
    cookies: Cookies,
    Path(ticket_id): Path<i64>,
) -> Result<Json<api::TicketJson>, StatusCode> {
    let user = current_user(&state, &cookies);
    if user.is_guest() {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let mut conn = get_conn(&state).await?;
    api::get_ticket(&mut conn, ticket_id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn api_metrics(
    State(state): State<DeskRouterState>,
    cookies: Cookies,
) -> Result<Json<crate::dashboard::kpi::TicketMetrics>, StatusCode> {
    let user = current_user(&state, &cookies);
    if user.is_guest() {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let mut conn = get_conn(&state).await?;
    api::metrics(&mut conn).await.map(Json).map_err(internal_error)
}
