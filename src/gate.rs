//! Session refresh gate.
//! Runs once per inbound navigation: redirects unauthenticated visitors away
//! from protected paths, redirects authenticated visitors away from
//! entry-only paths, and otherwise silently reissues the session token with a
//! refreshed expiry. Verification failure is a forced logout (cookie cleared,
//! redirect to login), never a propagated error.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use tracing::{debug, error};

use crate::server::AppState;
use crate::session::{self, CookieAttributes, SESSION_COOKIE};

/// Paths that require a session token.
const AUTH_REQUIRED: &[&str] = &["/profile", "/"];
/// Entry-only paths a session holder is bounced away from.
const GUEST_ONLY: &[&str] = &["/login", "/register", "/"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    RedirectToLogin,
    RedirectToProfile,
    PassThrough,
}

/// Ordered rule list, first match wins.
///
/// `/` appears in both path sets; because the unauthenticated rule is
/// evaluated first, `/` resolves toward `/login` without a token and toward
/// `/profile` with one. Only token presence is consulted here; the token is
/// verified on the pass-through branch.
pub fn decide(path: &str, has_token: bool) -> GateDecision {
    if !has_token && AUTH_REQUIRED.contains(&path) {
        return GateDecision::RedirectToLogin;
    }
    if has_token && GUEST_ONLY.contains(&path) {
        return GateDecision::RedirectToProfile;
    }
    GateDecision::PassThrough
}

pub async fn refresh_gate(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let token = session::get(req.headers(), SESSION_COOKIE);

    match decide(&path, token.is_some()) {
        GateDecision::RedirectToLogin => return Redirect::temporary("/login").into_response(),
        GateDecision::RedirectToProfile => return Redirect::temporary("/profile").into_response(),
        GateDecision::PassThrough => {}
    }

    let Some(token) = token else {
        return next.run(req).await;
    };

    let claims = match state.codec.verify(&token) {
        Ok(claims) => claims,
        Err(e) => {
            // Forced logout: clear the cookie and send the visitor back to login.
            debug!(target: "gate", "session rejected on {}: {}", path, e);
            let mut res = Redirect::temporary("/login").into_response();
            session::clear(res.headers_mut(), SESSION_COOKIE);
            return res;
        }
    };

    let mut res = next.run(req).await;

    // Handlers that reissued the session themselves win over the gate refresh.
    if !session::is_set(res.headers(), SESSION_COOKIE) {
        match state.codec.sign(&claims.user) {
            Ok(signed) => {
                session::set(res.headers_mut(), SESSION_COOKIE, &signed.token, &CookieAttributes::session(signed.expires));
            }
            Err(e) => error!(target: "gate", "session refresh failed on {}: {}", path, e),
        }
    }
    res
}
