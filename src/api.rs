//! Built-in REST endpoints: status and cookie-backed login sessions.

use std::sync::Arc;

use serde_json::json;

use crate::collections::ExpiringList;
use crate::http::exchange::Exchange;
use crate::http::request::Method;
use crate::http::response::StatusCode;
use crate::routing::{RouteError, Router};

pub const SESSION_COOKIE: &str = "session";
pub const LOGIN_REALM: &str = "Login Required";

/// Session store: user names keyed by session id.
pub type Sessions = Arc<ExpiringList<String>>;

/// Registers the API routes on `router`.
pub fn routes(router: Router, sessions: Sessions) -> Result<Router, RouteError> {
    let status_sessions = sessions.clone();
    let login_sessions = sessions.clone();
    let whoami_sessions = sessions.clone();
    let logout_sessions = sessions;

    router
        .route("/rest/status/?", move |ex, _| {
            let body = json!({ "status": "ok", "sessions": status_sessions.len() });
            ex.write_success(serde_json::to_vec(&body)?, None)?;
            Ok(())
        })?
        .route("/rest/login/?", move |ex, _| login(ex, &login_sessions))?
        .route("/rest/whoami/?", move |ex, _| whoami(ex, &whoami_sessions))?
        .route("/rest/logout/?", move |ex, _| logout(ex, &logout_sessions))
}

fn require_post(ex: &mut Exchange) -> anyhow::Result<bool> {
    if ex.request().method == Method::POST {
        return Ok(true);
    }
    ex.set_header("Allow", "POST");
    ex.write_response(StatusCode::MethodNotAllowed, "<b>405, use POST.</b>", None)?;
    Ok(false)
}

fn login(ex: &mut Exchange, sessions: &Sessions) -> anyhow::Result<()> {
    if !require_post(ex)? {
        return Ok(());
    }

    let user = match ex.request().basic_auth() {
        Some((user, _)) if !user.is_empty() => user,
        _ => {
            ex.write_auth_required(Some(LOGIN_REALM), None)?;
            return Ok(());
        }
    };

    let id = sessions.add_and_get_id(user.clone());
    tracing::info!(user = %user, "Session created");

    ex.set_cookie(SESSION_COOKIE, format!("{}; Path=/; HttpOnly", id));
    ex.write_success(serde_json::to_vec(&json!({ "user": user }))?, None)?;
    Ok(())
}

fn whoami(ex: &mut Exchange, sessions: &Sessions) -> anyhow::Result<()> {
    let user = ex
        .request()
        .cookie(SESSION_COOKIE)
        .and_then(|id| sessions.get_by_id(id));

    match user {
        Some(user) => ex.write_success(serde_json::to_vec(&json!({ "user": user }))?, None)?,
        None => ex.write_auth_required(Some(LOGIN_REALM), None)?,
    }
    Ok(())
}

fn logout(ex: &mut Exchange, sessions: &Sessions) -> anyhow::Result<()> {
    if !require_post(ex)? {
        return Ok(());
    }

    let removed = ex
        .request()
        .cookie(SESSION_COOKIE)
        .and_then(|id| sessions.remove_id(id))
        .is_some();

    ex.set_cookie(SESSION_COOKIE, "; Path=/; Max-Age=0");
    ex.write_success(serde_json::to_vec(&json!({ "logged_out": removed }))?, None)?;
    Ok(())
}
