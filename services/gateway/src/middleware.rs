//! Session authentication middleware

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use common::session::token_prefix;
use tracing::debug;

use crate::{
    cookies::{SESSION_COOKIE, session_cookie},
    error::ApiError,
    state::AppState,
};

/// Resolve the session cookie, renew the session and hand its record to
/// the handler through the request extensions
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    let session = state.sessions.lookup(&token).ok_or_else(|| {
        debug!("Rejected unknown or expired session {}", token_prefix(&token));
        ApiError::Unauthorized
    })?;
    state.sessions.touch(&token);

    // Insert the session into the request extensions
    req.extensions_mut().insert(session);

    let response = next.run(req).await;

    // Re-issue the cookie so the browser-side expiry slides with ours
    let jar = jar.add(session_cookie(
        &token,
        state.session_ttl_secs,
        state.cookie_secure,
    ));

    Ok((jar, response).into_response())
}
