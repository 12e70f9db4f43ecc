//! Common library for the iclass bridge
//!
//! This crate provides the session layer shared by the gateway service:
//! local token generation, the in-memory session store and the clock
//! abstraction both of them read time from.

pub mod clock;
pub mod error;
pub mod session;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{SessionError, SessionResult};
pub use session::{MemorySessionStore, SessionRecord, SessionStore, UpstreamCredential};

/// Example usage of the session store
///
/// ```rust
/// use std::sync::Arc;
/// use common::{MemorySessionStore, SessionStore, SystemClock};
///
/// let store = MemorySessionStore::new(Arc::new(SystemClock));
/// let token = store
///     .create("42", "upstream-session", serde_json::json!({ "id": "42" }))
///     .expect("token generation");
/// assert!(store.lookup(&token).is_some());
/// store.remove(&token);
/// assert!(store.lookup(&token).is_none());
/// ```
pub fn example_usage() {}
