//! In-memory session store
//!
//! Maps the opaque local token handed to browsers onto the upstream
//! credential and profile captured at login. Records expire after a fixed
//! TTL that slides forward on every authorized access; expired records are
//! evicted lazily the next time they are looked up.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::SessionResult;
use crate::token;

/// Default session lifetime: 24 hours.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 24 * 60 * 60;

/// Longest lifetime a store is configured with: ten years.
pub const MAX_SESSION_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Credential pair required on every proxied upstream call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamCredential {
    pub user_id: String,
    pub session_token: String,
}

/// Snapshot of a stored session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub local_token: String,
    pub upstream_user_id: String,
    pub upstream_session_token: String,
    /// Profile returned by the upstream login, kept verbatim
    pub user_profile: Value,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Upstream credential derived from this session
    pub fn credential(&self) -> UpstreamCredential {
        UpstreamCredential {
            user_id: self.upstream_user_id.clone(),
            session_token: self.upstream_session_token.clone(),
        }
    }
}

/// Session storage operations used by the gateway
pub trait SessionStore: Send + Sync + 'static {
    /// Store a new session and return its freshly generated local token
    fn create(
        &self,
        upstream_user_id: &str,
        upstream_session_token: &str,
        user_profile: Value,
    ) -> SessionResult<String>;

    /// Fetch a live session, evicting it if it has expired
    fn lookup(&self, local_token: &str) -> Option<SessionRecord>;

    /// Push the expiry of a live session one TTL into the future
    fn touch(&self, local_token: &str);

    /// Delete a session; unknown tokens are ignored
    fn remove(&self, local_token: &str);

    /// Number of records currently held, expired or not
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stored form of a session. Everything but the expiry is immutable after
/// insertion, so the expiry carries its own lock and `touch` only needs the
/// shared table lock.
#[derive(Debug)]
struct SessionEntry {
    upstream_user_id: String,
    upstream_session_token: String,
    user_profile: Value,
    expires_at: Mutex<DateTime<Utc>>,
}

impl SessionEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now <= *self.expires_at.lock()
    }

    fn snapshot(&self, local_token: &str) -> SessionRecord {
        SessionRecord {
            local_token: local_token.to_string(),
            upstream_user_id: self.upstream_user_id.clone(),
            upstream_session_token: self.upstream_session_token.clone(),
            user_profile: self.user_profile.clone(),
            expires_at: *self.expires_at.lock(),
        }
    }
}

/// Process-local session store guarded by a single reader/writer lock
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl MemorySessionStore {
    /// Create an empty store with the default 24 hour TTL
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(clock, Duration::seconds(DEFAULT_SESSION_TTL_SECS))
    }

    /// Create an empty store with a custom TTL
    pub fn with_ttl(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            clock,
            ttl,
        }
    }

    /// Session lifetime applied on create and touch
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Expiry for a record renewed at `now`, saturating at the latest
    /// representable instant
    fn expiry_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl SessionStore for MemorySessionStore {
    fn create(
        &self,
        upstream_user_id: &str,
        upstream_session_token: &str,
        user_profile: Value,
    ) -> SessionResult<String> {
        let expires_at = self.expiry_after(self.clock.now());

        let mut sessions = self.sessions.write();
        let local_token = loop {
            let candidate = token::generate()?;
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };

        sessions.insert(
            local_token.clone(),
            SessionEntry {
                upstream_user_id: upstream_user_id.to_string(),
                upstream_session_token: upstream_session_token.to_string(),
                user_profile,
                expires_at: Mutex::new(expires_at),
            },
        );

        info!(
            "Created session {} for upstream user {}",
            token_prefix(&local_token),
            upstream_user_id
        );
        Ok(local_token)
    }

    fn lookup(&self, local_token: &str) -> Option<SessionRecord> {
        let now = self.clock.now();

        {
            let sessions = self.sessions.read();
            match sessions.get(local_token) {
                None => return None,
                Some(entry) if entry.is_live(now) => return Some(entry.snapshot(local_token)),
                Some(_) => {}
            }
        }

        // Expired under the read lock; re-check under the write lock in case a
        // concurrent touch renewed it in between.
        let mut sessions = self.sessions.write();
        match sessions.get(local_token) {
            Some(entry) if entry.is_live(now) => Some(entry.snapshot(local_token)),
            Some(_) => {
                sessions.remove(local_token);
                debug!("Evicted expired session {}", token_prefix(local_token));
                None
            }
            None => None,
        }
    }

    fn touch(&self, local_token: &str) {
        let sessions = self.sessions.read();
        if let Some(entry) = sessions.get(local_token) {
            *entry.expires_at.lock() = self.expiry_after(self.clock.now());
        }
    }

    fn remove(&self, local_token: &str) {
        if self.sessions.write().remove(local_token).is_some() {
            info!("Removed session {}", token_prefix(local_token));
        }
    }

    fn len(&self) -> usize {
        self.sessions.read().len()
    }
}

/// Leading characters of a token, safe to put in logs
pub fn token_prefix(token: &str) -> &str {
    token.get(..8).unwrap_or(token)
}
