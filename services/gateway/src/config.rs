//! Gateway configuration loaded from the process environment

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use common::session::MAX_SESSION_TTL_SECS;

/// Session id the upstream historically accepted when it returned none
pub const LEGACY_SESSION_ID: &str = "220B4BF64B92633F236393F811A8586A";

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address the HTTP listener binds to
    pub bind_address: String,
    /// Port the HTTP listener binds to
    pub port: u16,
    /// Scheme, host and port of the upstream attendance API
    pub upstream_base_url: String,
    /// Upper bound for a single upstream call
    pub upstream_timeout: Duration,
    /// Fallback upstream session id
    pub legacy_session_id: String,
    /// Session lifetime in seconds, renewed on every authorized request
    pub session_ttl_secs: i64,
    /// Directory receiving archived schedule responses
    pub data_dir: PathBuf,
    /// Whether the session cookie carries the `Secure` attribute
    pub cookie_secure: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8081,
            upstream_base_url: "https://iclass.ucas.edu.cn:8181".to_string(),
            upstream_timeout: Duration::from_secs(15),
            legacy_session_id: LEGACY_SESSION_ID.to_string(),
            session_ttl_secs: common::session::DEFAULT_SESSION_TTL_SECS,
            data_dir: PathBuf::from("data"),
            cookie_secure: false,
        }
    }
}

impl GatewayConfig {
    /// Create a new GatewayConfig from environment variables
    ///
    /// # Environment Variables
    /// - `PORT`: Listener port (default: 8081)
    /// - `BIND_ADDRESS`: Listener address (default: "0.0.0.0")
    /// - `UPSTREAM_BASE_URL`: Upstream API origin (default: "https://iclass.ucas.edu.cn:8181")
    /// - `UPSTREAM_TIMEOUT_SECS`: Per-call upstream timeout (default: 15)
    /// - `LEGACY_SESSION_ID`: Fallback upstream session id
    /// - `SESSION_TTL_SECS`: Session lifetime, at most ten years (default: 86400)
    /// - `DATA_DIR`: Schedule archive directory (default: "data")
    /// - `COOKIE_SECURE`: Mark the session cookie `Secure` (default: false)
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let bind_address = std::env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address);

        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.port);

        let upstream_base_url = std::env::var("UPSTREAM_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.upstream_base_url);

        let upstream_timeout = std::env::var("UPSTREAM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.upstream_timeout);

        let legacy_session_id = std::env::var("LEGACY_SESSION_ID")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.legacy_session_id);

        let session_ttl_secs = std::env::var("SESSION_TTL_SECS")
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .unwrap_or(defaults.session_ttl_secs);
        if !(1..=MAX_SESSION_TTL_SECS).contains(&session_ttl_secs) {
            anyhow::bail!(
                "SESSION_TTL_SECS must be between 1 and {}, got {}",
                MAX_SESSION_TTL_SECS,
                session_ttl_secs
            );
        }

        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let cookie_secure = std::env::var("COOKIE_SECURE")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.cookie_secure);

        Ok(GatewayConfig {
            bind_address,
            port,
            upstream_base_url,
            upstream_timeout,
            legacy_session_id,
            session_ttl_secs,
            data_dir,
            cookie_secure,
        })
    }

    /// Address string suitable for `TcpListener::bind`
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
