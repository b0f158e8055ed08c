//! # tb-api Handlers
//!
//! This module coordinates the flow between HTTP requests and `TipService`.
//! Every handler resolves the acting user from the session first and passes
//! it explicitly into the service.

use actix_web::http::header::{self, ContentType};
use actix_web::{web, HttpResponse};
use askama::Template;
use log::debug;
use serde::Deserialize;
use tb_core::models::Actor;
use tb_core::voting::VoteDirection;
use tb_core::{AppError, TipService};
use tb_ui::{HomeTemplate, LoginTemplate, RegistrationTemplate, TipView};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::middleware::GuestName;
use crate::session::SessionContext;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub service: TipService,
    /// Pool of display names handed to anonymous visitors
    pub guest_names: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TipForm {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegistrationForm {
    pub username: String,
    pub pass: String,
    pub secur_pass: String,
}

fn redirect(to: &str) -> HttpResponse {
    HttpResponse::SeeOther().insert_header((header::LOCATION, to)).finish()
}

fn render(template: &impl Template) -> ApiResult<HttpResponse> {
    let html = template
        .render()
        .map_err(|e| AppError::Internal(format!("template rendering failed: {e}")))?;
    Ok(HttpResponse::Ok().content_type(ContentType::html()).body(html))
}

async fn current_actor(data: &AppState, session: &SessionContext) -> ApiResult<Actor> {
    Ok(data.service.resolve_actor(session.user_id()).await?)
}

/// Members are greeted by username, guests by their assigned name.
fn display_name(actor: &Actor, guest: Option<&web::ReqData<GuestName>>) -> String {
    match (actor.user(), guest) {
        (Some(user), _) => user.username.clone(),
        (None, Some(guest)) => guest.0.clone(),
        (None, None) => "Guest".to_string(),
    }
}

/// Renders the tip list, newest first (e.g., `GET /`).
pub async fn home(
    data: web::Data<AppState>,
    session: SessionContext,
    guest: Option<web::ReqData<GuestName>>,
) -> ApiResult<HttpResponse> {
    let actor = current_actor(&data, &session).await?;
    let tips: Vec<TipView> = data
        .service
        .list_tips(&actor)
        .await?
        .iter()
        .map(|summary| TipView::new(summary, &actor))
        .collect();

    let username = display_name(&actor, guest.as_ref());
    render(&HomeTemplate {
        username: &username,
        authenticated: actor.is_authenticated(),
        reputation: actor.user().map(|u| u.reputation),
        tips: &tips,
    })
}

/// Posts a new tip. Guests and empty tips are sent back home unchanged.
pub async fn create_tip(
    data: web::Data<AppState>,
    session: SessionContext,
    form: web::Form<TipForm>,
) -> ApiResult<HttpResponse> {
    let actor = current_actor(&data, &session).await?;
    if !actor.is_authenticated() {
        return Ok(redirect("/"));
    }

    match data.service.post_tip(&actor, &form.content).await {
        Ok(_) => {}
        Err(AppError::ValidationError(msg)) => debug!("discarded tip: {msg}"),
        Err(e) => return Err(e.into()),
    }
    Ok(redirect("/"))
}

async fn vote(
    data: web::Data<AppState>,
    session: SessionContext,
    tip_id: Uuid,
    direction: VoteDirection,
) -> ApiResult<HttpResponse> {
    let actor = current_actor(&data, &session).await?;
    data.service.toggle_vote(&actor, tip_id, direction).await?;
    Ok(redirect("/"))
}

pub async fn upvote(
    data: web::Data<AppState>,
    session: SessionContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    vote(data, session, path.into_inner(), VoteDirection::Up).await
}

pub async fn downvote(
    data: web::Data<AppState>,
    session: SessionContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    vote(data, session, path.into_inner(), VoteDirection::Down).await
}

pub async fn delete_tip(
    data: web::Data<AppState>,
    session: SessionContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let actor = current_actor(&data, &session).await?;
    data.service.delete_tip(&actor, path.into_inner()).await?;
    Ok(redirect("/"))
}

pub async fn login_page(
    data: web::Data<AppState>,
    session: SessionContext,
    guest: Option<web::ReqData<GuestName>>,
) -> ApiResult<HttpResponse> {
    let actor = current_actor(&data, &session).await?;
    if actor.is_authenticated() {
        return Ok(redirect("/"));
    }
    let username = display_name(&actor, guest.as_ref());
    render(&LoginTemplate { username: &username, authenticated: false, error: None })
}

pub async fn login(
    data: web::Data<AppState>,
    session: SessionContext,
    guest: Option<web::ReqData<GuestName>>,
    form: web::Form<LoginForm>,
) -> ApiResult<HttpResponse> {
    let actor = current_actor(&data, &session).await?;
    if actor.is_authenticated() {
        return Ok(redirect("/"));
    }

    match data.service.login(&form.username, &form.password).await {
        Ok(user) => {
            session.log_in(user.id)?;
            Ok(redirect("/"))
        }
        Err(AppError::Unauthorized(msg)) => {
            let username = display_name(&actor, guest.as_ref());
            render(&LoginTemplate { username: &username, authenticated: false, error: Some(msg.as_str()) })
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn logout(session: SessionContext) -> HttpResponse {
    if session.user_id().is_none() {
        return redirect("/login");
    }
    session.log_out();
    redirect("/")
}

pub async fn registration_page(
    data: web::Data<AppState>,
    session: SessionContext,
    guest: Option<web::ReqData<GuestName>>,
) -> ApiResult<HttpResponse> {
    let actor = current_actor(&data, &session).await?;
    if actor.is_authenticated() {
        return Ok(redirect("/"));
    }
    let username = display_name(&actor, guest.as_ref());
    render(&RegistrationTemplate { username: &username, authenticated: false, error: None })
}

/// Creates an account and logs it in.
pub async fn register(
    data: web::Data<AppState>,
    session: SessionContext,
    guest: Option<web::ReqData<GuestName>>,
    form: web::Form<RegistrationForm>,
) -> ApiResult<HttpResponse> {
    let actor = current_actor(&data, &session).await?;
    if actor.is_authenticated() {
        return Ok(redirect("/"));
    }

    match data.service.register(&form.username, &form.pass, &form.secur_pass).await {
        Ok(user) => {
            session.log_in(user.id)?;
            Ok(redirect("/"))
        }
        Err(AppError::ValidationError(msg)) | Err(AppError::Conflict(msg)) => {
            let username = display_name(&actor, guest.as_ref());
            render(&RegistrationTemplate { username: &username, authenticated: false, error: Some(msg.as_str()) })
        }
        Err(e) => Err(ApiError::from(e)),
    }
}

/// Any unknown path goes back to the tip list.
pub async fn redirect_home() -> HttpResponse {
    redirect("/")
}
