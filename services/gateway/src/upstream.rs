//! Client for the upstream attendance API
//!
//! Wraps the three calls the gateway proxies (login, schedule, sign-in).
//! Responses that parse into the expected shape come back normalized;
//! anything else is handed back as a [`RawResponse`] so the router can
//! relay it untouched.

use std::sync::Arc;

use anyhow::Result;
use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use chrono::{DateTime, NaiveDateTime, Utc};
use common::{Clock, UpstreamCredential};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::GatewayConfig;
use crate::models::{LoginEnvelope, LoginRequest, ScheduleEnvelope, UserInfo};
use crate::validation::{or_default, required, validate_date_str};

pub const LOGIN_PATH: &str = "/app/user/login.action";
pub const SCHEDULE_PATH: &str = "/app/course/get_stu_course_sched.action";
pub const SIGN_IN_PATH: &str = "/app/course/stu_scan_sign.action";

/// Header carrying the upstream session token
pub const SESSION_HEADER: &str = "sessionId";

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X) AppleWebKit/537.36 (KHTML, like Gecko) Chrome Safari MicroMessenger";
const REFERER: &str = "https://servicewechat.com/wxdd3bd7d4acf54723/56/page-frame.html";

const DEFAULT_USER_LEVEL: &str = "1";
const DEFAULT_VERIFICATION_TYPE: &str = "1";
const DEFAULT_VERIFICATION_URL: &str = "http://iclass.ucas.edu.cn:88/ve/webservices/mobileCheck.shtml?method=mobileLogin&username=${0}&password=${1}&lx=${2}";

/// Upstream call failures
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// Caller input failed local validation; nothing was sent
    #[error("{0}")]
    InvalidInput(String),

    /// Upstream answered but did not authenticate the user
    #[error("login failed: empty user id")]
    LoginRejected,

    /// Transport-level failure talking to upstream
    #[error("upstream request failed: {0}")]
    Unreachable(#[source] reqwest::Error),
}

/// Type alias for upstream results
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Upstream response captured verbatim
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Result of the upstream login call
#[derive(Debug)]
pub enum LoginOutcome {
    Parsed {
        profile: UserInfo,
        credential: UpstreamCredential,
    },
    Raw(RawResponse),
}

/// Result of the upstream schedule call
#[derive(Debug)]
pub enum ScheduleOutcome {
    Parsed {
        status: StatusCode,
        schedule: ScheduleEnvelope,
        /// Upstream `Date` minus local send time, in seconds
        delta: i64,
    },
    Raw(RawResponse),
}

/// Upstream API client
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
    legacy_session_id: String,
    clock: Arc<dyn Clock>,
}

impl UpstreamClient {
    /// Initialize a new upstream client
    pub fn new(config: &GatewayConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(header::REFERER, HeaderValue::from_static(REFERER));

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(config.upstream_timeout)
            .build()?;

        info!(
            "Upstream client initialized for {} (timeout {:?})",
            config.upstream_base_url, config.upstream_timeout
        );

        Ok(Self {
            http,
            base_url: config.upstream_base_url.trim_end_matches('/').to_string(),
            legacy_session_id: config.legacy_session_id.clone(),
            clock,
        })
    }

    /// Authenticate against upstream
    pub async fn login(&self, request: &LoginRequest) -> UpstreamResult<LoginOutcome> {
        let phone = request.phone.trim();
        let password = request.password.trim();
        if phone.is_empty() || password.is_empty() {
            return Err(UpstreamError::InvalidInput(
                "phone and password required".to_string(),
            ));
        }

        let form = [
            ("phone", phone),
            ("password", password),
            (
                "userLevel",
                or_default(&request.user_level, DEFAULT_USER_LEVEL),
            ),
            (
                "verificationType",
                or_default(&request.verification_type, DEFAULT_VERIFICATION_TYPE),
            ),
            (
                "verificationUrl",
                or_default(&request.verification_url, DEFAULT_VERIFICATION_URL),
            ),
        ];
        let session_header = or_default(&request.session_id, &self.legacy_session_id);

        info!("Upstream login for phone {}", phone);

        let response = self
            .http
            .post(self.url(LOGIN_PATH))
            .header(SESSION_HEADER, session_header)
            .form(&form)
            .send()
            .await
            .map_err(|e| transport_error("login", e))?;
        let raw = read_raw("login", response).await?;

        let envelope: LoginEnvelope = match serde_json::from_slice(&raw.body) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(
                    "Upstream login body did not parse ({}), relaying status {}",
                    e, raw.status
                );
                return Ok(LoginOutcome::Raw(raw));
            }
        };

        let user_id = envelope.result.id.trim();
        if user_id.is_empty() {
            warn!("Upstream login returned no user id for phone {}", phone);
            return Err(UpstreamError::LoginRejected);
        }

        let session_token = match envelope.result.session_id.trim() {
            "" => {
                warn!(
                    "Upstream login returned no session id for user {}, using legacy fallback",
                    user_id
                );
                self.legacy_session_id.clone()
            }
            token => token.to_string(),
        };

        let credential = UpstreamCredential {
            user_id: user_id.to_string(),
            session_token,
        };

        Ok(LoginOutcome::Parsed {
            profile: envelope.result,
            credential,
        })
    }

    /// Fetch the course schedule for a `YYYYMMDD` date
    pub async fn fetch_schedule(
        &self,
        credential: &UpstreamCredential,
        date_str: &str,
    ) -> UpstreamResult<ScheduleOutcome> {
        validate_date_str(date_str).map_err(UpstreamError::InvalidInput)?;

        let sent_at = self.clock.now();
        let response = self
            .http
            .post(self.url(SCHEDULE_PATH))
            .query(&[("_cb", sent_at.timestamp_millis())])
            .header(SESSION_HEADER, self.session_header(credential))
            .form(&[
                ("id", credential.user_id.as_str()),
                ("dateStr", date_str),
            ])
            .send()
            .await
            .map_err(|e| transport_error("schedule", e))?;

        let delta = clock_delta(response.headers(), sent_at);
        let raw = read_raw("schedule", response).await?;

        match serde_json::from_slice::<ScheduleEnvelope>(&raw.body) {
            Ok(schedule) => {
                debug!(
                    "Upstream schedule for {} on {}: {} classes, delta {}s",
                    credential.user_id,
                    date_str,
                    schedule.result.len(),
                    delta
                );
                Ok(ScheduleOutcome::Parsed {
                    status: raw.status,
                    schedule,
                    delta,
                })
            }
            Err(e) => {
                warn!(
                    "Upstream schedule body did not parse ({}), relaying status {}",
                    e, raw.status
                );
                Ok(ScheduleOutcome::Raw(raw))
            }
        }
    }

    /// Sign in to a scheduled class; the upstream verdict is returned as-is
    pub async fn sign_in(
        &self,
        credential: &UpstreamCredential,
        time_table_id: &str,
        timestamp: Option<i64>,
    ) -> UpstreamResult<RawResponse> {
        let time_table_id =
            required("timeTableId", time_table_id).map_err(UpstreamError::InvalidInput)?;
        let timestamp = timestamp
            .filter(|ts| *ts != 0)
            .unwrap_or_else(|| self.clock.now().timestamp_millis())
            .to_string();

        let response = self
            .http
            .get(self.url(SIGN_IN_PATH))
            .query(&[
                ("id", credential.user_id.as_str()),
                ("timeTableId", time_table_id),
                ("timestamp", timestamp.as_str()),
            ])
            .header(SESSION_HEADER, self.session_header(credential))
            .send()
            .await
            .map_err(|e| transport_error("sign-in", e))?;
        let raw = read_raw("sign-in", response).await?;

        debug!(
            "Upstream sign-in response for timeTableId {}: {}",
            time_table_id,
            String::from_utf8_lossy(&raw.body)
        );

        Ok(raw)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn session_header<'a>(&'a self, credential: &'a UpstreamCredential) -> &'a str {
        or_default(&credential.session_token, &self.legacy_session_id)
    }
}

fn transport_error(call: &str, e: reqwest::Error) -> UpstreamError {
    error!("Upstream {} request failed: {}", call, e);
    UpstreamError::Unreachable(e)
}

async fn read_raw(call: &str, response: reqwest::Response) -> UpstreamResult<RawResponse> {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await.map_err(|e| transport_error(call, e))?;

    Ok(RawResponse {
        status,
        headers,
        body,
    })
}

/// Obsolete HTTP-date layouts: RFC 850 and asctime.
const OBSOLETE_HTTP_DATE_FORMATS: [&str; 2] =
    ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"];

/// Seconds between the upstream `Date` header and `sent_at`; zero when the
/// header is missing or not an HTTP-date.
pub fn clock_delta(headers: &HeaderMap, sent_at: DateTime<Utc>) -> i64 {
    headers
        .get(header::DATE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| parse_http_date(value.trim()))
        .map(|upstream| upstream.timestamp() - sent_at.timestamp())
        .unwrap_or(0)
}

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.with_timezone(&Utc));
    }

    OBSOLETE_HTTP_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}
