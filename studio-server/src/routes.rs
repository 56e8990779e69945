//! HTTP handlers for the session API

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use studio_gate::contact::ContactMessage;
use studio_gate::gate::{Session, ViewState};
use studio_gate::validate::{is_valid_email, validate_password};
use studio_gate::waiver::{WaiverRecord, WaiverSubmission};
use studio_gate::{AuthSession, GateError, SignUpOutcome};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::sessions::{ClientSession, SessionView};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/sessions/:id/passcode", post(submit_passcode))
        .route("/api/sessions/:id/auth-mode", post(set_auth_mode))
        .route("/api/sessions/:id/sign-in", post(sign_in))
        .route("/api/sessions/:id/sign-up", post(sign_up))
        .route("/api/sessions/:id/token", post(restore_token))
        .route("/api/sessions/:id/sign-out", post(sign_out))
        .route("/api/sessions/:id/waiver", get(get_waiver).post(submit_waiver))
        .route("/api/sessions/:id/contact", post(send_contact))
        .route("/api/sessions/:id/waivers", get(list_waivers))
}

// ─── Request bodies ───

#[derive(Deserialize)]
pub struct PasscodeRequest {
    code: String,
}

#[derive(Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    SignIn,
    SignUp,
}

#[derive(Deserialize)]
pub struct AuthModeRequest {
    mode: AuthMode,
}

#[derive(Deserialize)]
pub struct CredentialsRequest {
    email: String,
    password: String,
    #[serde(default)]
    full_name: Option<String>,
}

#[derive(Deserialize)]
pub struct TokenRequest {
    access_token: String,
}

#[derive(Deserialize)]
pub struct ContactRequest {
    subject: String,
    message: String,
    #[serde(default)]
    name: Option<String>,
}

// ─── Handlers ───

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.sessions.len(),
    }))
}

async fn create_session(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let session = state
        .sessions
        .create(&state.gate_config, state.collaborators.clone());
    Ok((StatusCode::CREATED, Json(session.view().await?)))
}

async fn get_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<SessionView>> {
    let session = state.sessions.get(id)?;
    Ok(Json(session.view().await?))
}

async fn delete_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> StatusCode {
    if let Some(session) = state.sessions.remove(id) {
        session.gate.shutdown().await;
        info!(session_id = %id, "Client session closed");
    }
    StatusCode::NO_CONTENT
}

async fn submit_passcode(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<PasscodeRequest>,
) -> ApiResult<Json<SessionView>> {
    let session = state.sessions.get(id)?;
    session.gate.submit_passcode(body.code).await?;
    Ok(Json(session.view().await?))
}

async fn set_auth_mode(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AuthModeRequest>,
) -> ApiResult<Json<SessionView>> {
    let session = state.sessions.get(id)?;
    match body.mode {
        AuthMode::SignIn => session.gate.request_sign_in().await?,
        AuthMode::SignUp => session.gate.request_sign_up().await?,
    };
    Ok(Json(session.view().await?))
}

async fn sign_in(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CredentialsRequest>,
) -> ApiResult<Json<SessionView>> {
    let session = state.sessions.get(id)?;
    let email = body.email.trim();
    if !is_valid_email(email) {
        return Err(GateError::Validation("Please enter a valid email address.".into()).into());
    }

    let auth = state.auth.clone();
    let password = body.password;
    authenticate(&state, &session, async move { auth.sign_in(email, &password).await }).await?;
    Ok(Json(session.view().await?))
}

async fn sign_up(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CredentialsRequest>,
) -> ApiResult<impl IntoResponse> {
    let session = state.sessions.get(id)?;
    if !session.gate.snapshot().await?.passcode_accepted {
        warn!(session_id = %id, "Sign-up attempted before the passcode was accepted");
        return Err(GateError::Forbidden("passcode".into()).into());
    }
    let email = body.email.trim().to_string();
    if !is_valid_email(&email) {
        return Err(GateError::Validation("Please enter a valid email address.".into()).into());
    }
    let strength = validate_password(&body.password);
    if !strength.is_valid() {
        return Err(GateError::Validation(strength.errors.join(". ")).into());
    }
    let full_name = body.full_name.as_deref().map(str::trim).filter(|n| !n.is_empty());

    let outcome = state.auth.sign_up(&email, &body.password, full_name).await?;
    let (status, user) = match outcome {
        SignUpOutcome::SignedIn(auth) => {
            let auth = authenticate(&state, &session, std::future::ready(Ok(auth))).await?;
            (StatusCode::OK, auth.user)
        }
        SignUpOutcome::ConfirmationRequired(user) => {
            info!(user_id = %user.id, "Sign-up awaiting email confirmation");
            (StatusCode::ACCEPTED, user)
        }
    };

    if let Err(e) = state.mailer.send_welcome(&user, full_name).await {
        warn!(user_id = %user.id, error = ?e, "Welcome email failed");
    }

    Ok((status, Json(session.view().await?)))
}

async fn restore_token(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<TokenRequest>,
) -> ApiResult<Json<SessionView>> {
    let session = state.sessions.get(id)?;
    let auth = state.auth.clone();
    let access_token = body.access_token;
    authenticate(&state, &session, async move {
        let user = auth.resolve(&access_token).await?;
        Ok(AuthSession { access_token, user })
    })
    .await?;
    Ok(Json(session.view().await?))
}

async fn sign_out(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<SessionView>> {
    let session = state.sessions.get(id)?;
    if let Some(token) = session.take_access_token() {
        if let Err(e) = state.auth.sign_out(&token).await {
            warn!(session_id = %id, error = ?e, "Backend sign-out failed, signing out locally");
        }
    }
    session.gate.set_session(Session::signed_out()).await?;
    Ok(Json(session.view().await?))
}

async fn get_waiver(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Option<WaiverRecord>>> {
    let session = state.sessions.get(id)?;
    let user = session.gate.snapshot().await?.user.ok_or(GateError::NotSignedIn)?;
    let token = session.access_token();
    Ok(Json(state.waivers.get_waiver(&user.id, token.as_deref()).await?))
}

async fn submit_waiver(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<WaiverSubmission>,
) -> ApiResult<Json<SessionView>> {
    let session = state.sessions.get(id)?;
    session.gate.submit_waiver(body).await?;
    Ok(Json(session.view().await?))
}

async fn send_contact(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ContactRequest>,
) -> ApiResult<impl IntoResponse> {
    let session = state.sessions.get(id)?;
    let user = session.gate.snapshot().await?.user.ok_or(GateError::NotSignedIn)?;

    let message = ContactMessage::new(&user, body.name.as_deref(), &body.subject, &body.message)?;
    state.mailer.send_contact(&message).await?;
    info!(user_id = %user.id, "Contact message sent");
    Ok((StatusCode::ACCEPTED, Json(json!({ "success": true }))))
}

async fn list_waivers(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Vec<WaiverRecord>>> {
    let session = state.sessions.get(id)?;
    if session.gate.view() != ViewState::Admin {
        return Err(GateError::Forbidden("admin".into()).into());
    }
    let token = session.access_token();
    Ok(Json(state.waivers.list_waivers(token.as_deref()).await?))
}

// ─── Helpers ───

/// Show `loading` while the session provider works, then apply its answer.
/// Any earlier sign-in on this session is revoked first, so a failure always
/// leaves the gate signed out.
async fn authenticate<F>(state: &AppState, session: &Arc<ClientSession>, provider: F) -> ApiResult<AuthSession>
where
    F: std::future::Future<Output = studio_gate::Result<AuthSession>>,
{
    if let Some(previous) = session.take_access_token() {
        if let Err(e) = state.auth.sign_out(&previous).await {
            warn!(session_id = %session.id, error = ?e, "Revoking previous sign-in failed");
        }
    }

    session.gate.set_session(Session::loading()).await?;
    match provider.await {
        Ok(auth) => {
            session.set_access_token(Some(auth.access_token.clone()));
            session
                .gate
                .set_session(Session::authenticated(auth.user.clone(), auth.access_token.clone()))
                .await?;
            session.gate.settled().await?;
            info!(session_id = %session.id, user_id = %auth.user.id, "Client signed in");
            Ok(auth)
        }
        Err(e) => {
            session.gate.set_session(Session::signed_out()).await?;
            Err(e.into())
        }
    }
}
