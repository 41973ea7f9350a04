//!
//! akun HTTP server
//! ----------------
//! Axum-based HTTP API for the account demo.
//!
//! Responsibilities:
//! - Register/login/logout endpoints backed by the single-record profile store.
//! - Signed-cookie session issuance on login and profile edits.
//! - The per-navigation refresh gate layered over every route.
//! - First-visit sentinel cookie that bounces new visitors to registration.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum::extract::State;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::AppError;
use crate::gate;
use crate::profile::{first_empty_field, sanitize_phone, ProfileStore, UserUpdate};
use crate::session::{self, CookieAttributes, FIRST_VISIT_COOKIE, SESSION_COOKIE};
use crate::token::TokenCodec;

/// Shared server state injected into all handlers.
///
/// Holds the single-record profile store and the claims codec. The codec's
/// secret is process-wide and read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub profile: ProfileStore,
    pub codec: Arc<TokenCodec>,
}

/// Start the akun HTTP server bound to the given port with the given codec.
pub async fn run_with_port(http_port: u16, codec: TokenCodec) -> anyhow::Result<()> {
    let app_state = AppState {
        profile: ProfileStore::new(),
        codec: Arc::new(codec),
    };

    let app = router(app_state);

    let addr: SocketAddr = format!("0.0.0.0:{}", http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Mount all routes with the refresh gate layered over them.
pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "akun ok" }))
        .route("/login", get(login_page).post(login))
        .route("/register", post(register))
        .route("/profile", get(profile_show).post(profile_edit))
        .route("/logout", post(logout))
        .layer(middleware::from_fn_with_state(app_state.clone(), gate::refresh_gate))
        .with_state(app_state)
}

/// Entry point using environment configuration. A missing signing secret is
/// fatal: without it no session could ever verify.
pub async fn run() -> anyhow::Result<()> {
    use anyhow::Context;
    let http_port: u16 = std::env::var("AKUN_HTTP_PORT")
        .unwrap_or_else(|_| "7878".to_string())
        .parse()
        .context("AKUN_HTTP_PORT is not a valid port")?;
    let codec = TokenCodec::from_env()?;
    run_with_port(http_port, codec).await
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    nama: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct RegisterPayload {
    nama: String,
    phone: String,
    password: String,
    confirm_password: String,
}

#[derive(Debug, Deserialize)]
struct EditPayload {
    nama: String,
    phone: String,
    old_password: String,
    new_password: String,
}

fn error_body(err: &AppError) -> (StatusCode, Json<serde_json::Value>) {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({"status":"error","code": err.code_str(),"message": err.message()})))
}

fn empty_field_error(fields: &[(&'static str, &str)]) -> Option<AppError> {
    first_empty_field(fields)
        .map(|f| AppError::validation("validation".into(), format!("Invalid value on {}", f.to_uppercase())))
}

/// First-visit gate for the login page: a brand-new visitor has no
/// `isFirstVisit` cookie, gets the sentinel set, and is bounced to
/// registration. Everyone else just gets the page.
async fn login_page(headers: HeaderMap) -> Response {
    if session::get(&headers, FIRST_VISIT_COOKIE).is_none() {
        let mut res = Redirect::temporary("/register").into_response();
        session::set(res.headers_mut(), FIRST_VISIT_COOKIE, "false", &CookieAttributes::sentinel());
        return res;
    }
    (StatusCode::OK, Json(json!({"status":"ok","page":"login"}))).into_response()
}

async fn register(State(state): State<AppState>, Json(payload): Json<RegisterPayload>) -> impl IntoResponse {
    if payload.password != payload.confirm_password {
        return error_body(&AppError::validation("validation", "Passwords do not match"));
    }
    let phone = sanitize_phone(&payload.phone);
    if let Some(err) = empty_field_error(&[
        ("nama", &payload.nama),
        ("phone", &phone),
        ("password", &payload.password),
    ]) {
        return error_body(&err);
    }
    state.profile.update(UserUpdate {
        nama: Some(payload.nama.clone()),
        phone: Some(phone),
        password: Some(payload.password),
    });
    info!(target: "akun", "registered user nama={}", payload.nama);
    (StatusCode::OK, Json(json!({"status":"ok"})))
}

async fn login(State(state): State<AppState>, Json(payload): Json<LoginPayload>) -> impl IntoResponse {
    if let Some(err) = empty_field_error(&[("nama", &payload.nama), ("password", &payload.password)]) {
        let (status, body) = error_body(&err);
        return (status, HeaderMap::new(), body);
    }
    let user = state.profile.snapshot();
    if payload.nama != user.nama || payload.password != user.password {
        let (status, body) = error_body(&AppError::credentials("invalid_credentials", "Invalid credentials"));
        return (status, HeaderMap::new(), body);
    }
    match state.codec.sign(&user) {
        Ok(signed) => {
            let mut headers = HeaderMap::new();
            session::set(&mut headers, SESSION_COOKIE, &signed.token, &CookieAttributes::session(signed.expires));
            info!(target: "akun", "login nama={} session_expires={}", user.nama, signed.expires);
            (StatusCode::OK, headers, Json(json!({"status":"ok"})))
        }
        Err(e) => {
            let (status, body) = error_body(&e.into());
            (status, HeaderMap::new(), body)
        }
    }
}

/// The profile view reconciles the store against the decoded claims: the
/// cookie is the survivor across a restart of this process, so claims win.
async fn profile_show(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let Some(token) = session::get(&headers, SESSION_COOKIE) else {
        return error_body(&AppError::credentials("invalid_credentials", "no session"));
    };
    let claims = match state.codec.verify(&token) {
        Ok(c) => c,
        Err(e) => return error_body(&e.into()),
    };
    if claims.user != state.profile.snapshot() {
        state.profile.replace(claims.user.clone());
    }
    (StatusCode::OK, Json(json!({"status":"ok","nama": claims.user.nama,"phone": claims.user.phone})))
}

async fn profile_edit(State(state): State<AppState>, Json(payload): Json<EditPayload>) -> impl IntoResponse {
    let current = state.profile.snapshot();
    if payload.old_password != current.password {
        let (status, body) = error_body(&AppError::credentials(
            "invalid_credentials",
            "Old password does not match our records",
        ));
        return (status, HeaderMap::new(), body);
    }
    let phone = sanitize_phone(&payload.phone);
    if let Some(err) = empty_field_error(&[
        ("nama", &payload.nama),
        ("phone", &phone),
        ("old_password", &payload.old_password),
        ("new_password", &payload.new_password),
    ]) {
        let (status, body) = error_body(&err);
        return (status, HeaderMap::new(), body);
    }
    let updated = state.profile.update(UserUpdate {
        nama: Some(payload.nama),
        phone: Some(phone),
        password: Some(payload.new_password),
    });
    // Reissue the session so the cookie carries the edited record.
    match state.codec.sign(&updated) {
        Ok(signed) => {
            let mut headers = HeaderMap::new();
            session::set(&mut headers, SESSION_COOKIE, &signed.token, &CookieAttributes::session(signed.expires));
            (StatusCode::OK, headers, Json(json!({"status":"ok"})))
        }
        Err(e) => {
            let (status, body) = error_body(&e.into());
            (status, HeaderMap::new(), body)
        }
    }
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    match session::get(&headers, SESSION_COOKIE).map(|t| state.codec.verify(&t)) {
        Some(Ok(claims)) => state.profile.replace(claims.user),
        // Absent or invalid prior session: nothing trustworthy to keep.
        _ => state.profile.reset(),
    }
    let mut h = HeaderMap::new();
    session::clear(&mut h, SESSION_COOKIE);
    (StatusCode::OK, h, Json(json!({"status":"ok"})))
}
