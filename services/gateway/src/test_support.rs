//! Scripted upstream and server helpers shared by the gateway tests

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Form, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use crate::config::GatewayConfig;
use crate::upstream::{LOGIN_PATH, SCHEDULE_PATH, SESSION_HEADER, SIGN_IN_PATH};

/// Serve a router on an ephemeral localhost port and return its base URL
pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Gateway configuration pointing at a test upstream
pub fn test_config(upstream_base_url: &str, data_dir: PathBuf) -> GatewayConfig {
    GatewayConfig {
        bind_address: "127.0.0.1".to_string(),
        port: 0,
        upstream_base_url: upstream_base_url.to_string(),
        upstream_timeout: Duration::from_secs(5),
        data_dir,
        ..GatewayConfig::default()
    }
}

/// Format an instant as an IMF-fixdate HTTP `Date` value
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// One request received by the fake upstream
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: &'static str,
    pub path: &'static str,
    pub session_header: Option<String>,
    pub query: HashMap<String, String>,
    pub form: HashMap<String, String>,
}

#[derive(Debug, Clone)]
struct Script {
    login: (StatusCode, String),
    schedule: (StatusCode, String),
    schedule_date: Option<String>,
    sign_in: StatusCode,
    delay: Duration,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            login: (
                StatusCode::OK,
                json!({ "result": { "id": "42", "sessionId": "abc" } }).to_string(),
            ),
            schedule: (
                StatusCode::OK,
                json!({ "STATUS": "2", "total": "0", "result": [] }).to_string(),
            ),
            schedule_date: None,
            sign_in: StatusCode::OK,
            delay: Duration::ZERO,
        }
    }
}

#[derive(Clone, Default)]
struct Shared {
    script: Arc<Mutex<Script>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl Shared {
    fn record(
        &self,
        method: &'static str,
        path: &'static str,
        headers: &HeaderMap,
        query: HashMap<String, String>,
        form: HashMap<String, String>,
    ) -> Script {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            path,
            session_header: headers
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            query,
            form,
        });
        self.script.lock().unwrap().clone()
    }
}

/// Scripted stand-in for the upstream attendance API
pub struct FakeUpstream {
    pub base_url: String,
    shared: Shared,
}

impl FakeUpstream {
    pub async fn spawn() -> Self {
        let shared = Shared::default();
        let router = Router::new()
            .route(LOGIN_PATH, post(login))
            .route(SCHEDULE_PATH, post(schedule))
            .route(SIGN_IN_PATH, get(sign_in))
            .with_state(shared.clone());

        Self {
            base_url: serve(router).await,
            shared,
        }
    }

    pub fn set_login(&self, body: Value) {
        self.shared.script.lock().unwrap().login = (StatusCode::OK, body.to_string());
    }

    pub fn set_login_raw(&self, status: StatusCode, body: &str) {
        self.shared.script.lock().unwrap().login = (status, body.to_string());
    }

    pub fn set_schedule(&self, body: Value, date: Option<String>) {
        let mut script = self.shared.script.lock().unwrap();
        script.schedule = (StatusCode::OK, body.to_string());
        script.schedule_date = date;
    }

    pub fn set_schedule_raw(&self, status: StatusCode, body: &str) {
        self.shared.script.lock().unwrap().schedule = (status, body.to_string());
    }

    pub fn set_sign_in_status(&self, status: StatusCode) {
        self.shared.script.lock().unwrap().sign_in = status;
    }

    pub fn set_delay(&self, delay: Duration) {
        self.shared.script.lock().unwrap().delay = delay;
    }

    pub fn calls(&self) -> usize {
        self.shared.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<RecordedCall> {
        self.shared.calls.lock().unwrap().last().cloned()
    }
}

async fn login(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let script = shared.record("POST", LOGIN_PATH, &headers, query, form);
    tokio::time::sleep(script.delay).await;

    let (status, body) = script.login;
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn schedule(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let script = shared.record("POST", SCHEDULE_PATH, &headers, query, form);
    tokio::time::sleep(script.delay).await;

    let (status, body) = script.schedule;
    let mut response = (status, [(header::CONTENT_TYPE, "application/json")], body).into_response();
    if let Some(date) = script.schedule_date {
        response
            .headers_mut()
            .insert(header::DATE, date.parse().unwrap());
    }
    response
}

async fn sign_in(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let script = shared.record("GET", SIGN_IN_PATH, &headers, query.clone(), HashMap::new());
    tokio::time::sleep(script.delay).await;

    (
        script.sign_in,
        [("x-upstream-verdict", "recorded")],
        Json(json!({ "STATUS": "0", "timeTableId": query.get("timeTableId") })),
    )
        .into_response()
}
