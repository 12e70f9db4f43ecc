//! Application state shared across handlers

use std::sync::Arc;

use common::{Clock, SessionStore};

use crate::archive::ScheduleArchive;
use crate::upstream::UpstreamClient;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<dyn SessionStore>,
    pub upstream: UpstreamClient,
    pub archive: ScheduleArchive,
    pub clock: Arc<dyn Clock>,
    pub session_ttl_secs: i64,
    pub cookie_secure: bool,
}

impl AppState {
    /// Today's date in `YYYYMMDD`, in the server's local timezone
    pub fn today(&self) -> String {
        self.clock
            .now()
            .with_timezone(&chrono::Local)
            .format("%Y%m%d")
            .to_string()
    }
}
