//! Gateway routes

use axum::{
    Extension, Json, Router,
    body::{Body, Bytes},
    extract::{Query, State},
    http::{StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get, post},
};
use axum_extra::extract::CookieJar;
use common::SessionRecord;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use crate::{
    cookies::{SESSION_COOKIE, clear_session_cookie, session_cookie},
    error::{ApiError, ApiResult},
    middleware::session_middleware,
    models::{
        CoursesQuery, CoursesTodayRequest, HealthResponse, LegacyScheduleResponse, LoginRequest,
        ScheduleResponse, SignInRequest, UserResponse, profile_value,
    },
    state::AppState,
    upstream::{LoginOutcome, RawResponse, ScheduleOutcome},
};

/// Create the router for the gateway service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/me", get(me))
        .route("/courses/today", post(courses_today))
        .route("/get_courses", get(get_courses))
        .route("/api/sign-in", post(sign_in))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/login", post(login))
        .route("/logout", any(logout))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        service: "iclass-gateway",
        sessions: state.sessions.len(),
    })
}

/// Log in upstream and open a local session
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> ApiResult<Response> {
    let payload: LoginRequest = json_body(&body)?;
    let (profile, credential) = match state.upstream.login(&payload).await? {
        LoginOutcome::Parsed {
            profile,
            credential,
        } => (profile, credential),
        LoginOutcome::Raw(raw) => return Ok(raw.into_response()),
    };

    let stored_profile = profile_value(&profile).map_err(|e| {
        error!("Failed to serialize user profile: {}", e);
        ApiError::InternalServerError
    })?;
    let token = state.sessions.create(
        &credential.user_id,
        &credential.session_token,
        stored_profile,
    )?;

    info!("User {} logged in", credential.user_id);

    let jar = jar.add(session_cookie(
        &token,
        state.session_ttl_secs,
        state.cookie_secure,
    ));
    Ok((jar, Json(UserResponse { user: profile })).into_response())
}

/// Profile captured at login
pub async fn me(Extension(session): Extension<SessionRecord>) -> impl IntoResponse {
    Json(UserResponse {
        user: session.user_profile,
    })
}

/// Schedule for an explicit date, or today
pub async fn courses_today(
    State(state): State<AppState>,
    Extension(session): Extension<SessionRecord>,
    body: Bytes,
) -> ApiResult<Response> {
    // Body is optional; anything unreadable means "today".
    let payload: CoursesTodayRequest = serde_json::from_slice(&body).unwrap_or_default();
    let date_str = date_or_today(&state, &payload.date_str);

    match state
        .upstream
        .fetch_schedule(&session.credential(), &date_str)
        .await?
    {
        ScheduleOutcome::Parsed {
            status,
            schedule,
            delta,
        } => Ok((
            status,
            Json(ScheduleResponse {
                result: schedule.result,
                delta,
            }),
        )
            .into_response()),
        ScheduleOutcome::Raw(raw) => Ok(raw.into_response()),
    }
}

/// Legacy schedule endpoint; also archives the normalized schedule
pub async fn get_courses(
    State(state): State<AppState>,
    Extension(session): Extension<SessionRecord>,
    Query(query): Query<CoursesQuery>,
) -> ApiResult<Response> {
    let date_str = date_or_today(&state, &query.date_str);

    match state
        .upstream
        .fetch_schedule(&session.credential(), &date_str)
        .await?
    {
        ScheduleOutcome::Parsed {
            status,
            schedule,
            delta,
        } => {
            if let Err(e) = state.archive.store(&date_str, &schedule).await {
                warn!("Failed to archive schedule for {}: {}", date_str, e);
            }

            Ok((
                status,
                Json(LegacyScheduleResponse::new(schedule.result, delta)),
            )
                .into_response())
        }
        ScheduleOutcome::Raw(raw) => Ok(raw.into_response()),
    }
}

/// Sign in to a class; the upstream verdict is relayed verbatim
pub async fn sign_in(
    State(state): State<AppState>,
    Extension(session): Extension<SessionRecord>,
    body: Bytes,
) -> ApiResult<Response> {
    let payload: SignInRequest = json_body(&body)?;
    let raw = state
        .upstream
        .sign_in(
            &session.credential(),
            &payload.time_table_id,
            Some(payload.timestamp),
        )
        .await?;

    Ok(raw.into_response())
}

/// Drop the local session and expire the cookie
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let jar = match jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_string()) {
        Some(token) => {
            state.sessions.remove(&token);
            jar.add(clear_session_cookie())
        }
        None => jar,
    };

    (jar, StatusCode::NO_CONTENT)
}

/// Decode a JSON body regardless of its declared content type
fn json_body<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(|e| {
        debug!("Rejected request body: {}", e);
        ApiError::BadRequest("invalid json body".to_string())
    })
}

fn date_or_today(state: &AppState, requested: &str) -> String {
    match requested.trim() {
        "" => state.today(),
        date => date.to_string(),
    }
}

/// Hop-by-hop and framing headers are recomputed by our own server.
const UNRELAYED_HEADERS: [header::HeaderName; 6] = [
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::CONTENT_LENGTH,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
];

impl IntoResponse for RawResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        for (name, value) in self.headers.iter() {
            let hop_by_hop = name.as_str() == "keep-alive" || name.as_str().starts_with("proxy-");
            if UNRELAYED_HEADERS.contains(name) || hop_by_hop {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }

        response
    }
}
