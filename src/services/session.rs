// src/services/session.rs
use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::services::cache::Clock;
use crate::services::tariff::TariffConfig;

pub const DEFAULT_SESSION: &str = "default";

/// Sessions not seen for this long are forgotten.
pub const SESSION_MAX_IDLE_HOURS: i64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// A message for the user, shown once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Per-user dashboard state: edit mode, tariff inputs and pending notices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub edit_mode: bool,
    pub tariff: TariffConfig,
    notices: Vec<Notice>,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Success, message.into());
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Info, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message.into());
    }

    fn push(&mut self, level: NoticeLevel, message: String) {
        self.notices.push(Notice { level, message });
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn toggle_edit_mode(&mut self) -> bool {
        self.edit_mode = !self.edit_mode;
        self.edit_mode
    }
}

struct Slot {
    session: Session,
    last_seen: DateTime<Utc>,
}

/// Sessions keyed by client-supplied id.
///
/// Handlers check a session out, work on it, and put it back; two
/// concurrent requests of the same session keep whichever finishes last.
/// Only sessions that differ from the defaults are kept, and only until
/// they have been idle for `max_idle`.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Slot>>,
    clock: Clock,
    max_idle: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_clock(Arc::new(Utc::now), Duration::hours(SESSION_MAX_IDLE_HOURS))
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry::default()
    }

    pub fn with_clock(clock: Clock, max_idle: Duration) -> Self {
        SessionRegistry {
            sessions: Mutex::new(HashMap::new()),
            clock,
            max_idle,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        match self.sessions.lock() {
            Ok(sessions) => sessions,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn checkout(&self, id: &str) -> Session {
        let now = (self.clock)();
        self.lock()
            .get(id)
            .filter(|slot| now - slot.last_seen <= self.max_idle)
            .map(|slot| slot.session.clone())
            .unwrap_or_default()
    }

    pub fn store(&self, id: &str, session: Session) {
        let now = (self.clock)();
        let mut sessions = self.lock();

        let before = sessions.len();
        sessions.retain(|_, slot| now - slot.last_seen <= self.max_idle);
        if sessions.len() < before {
            debug!("Evicted {} idle sessions", before - sessions.len());
        }

        if session == Session::default() {
            sessions.remove(id);
        } else {
            sessions.insert(id.to_string(), Slot { session, last_seen: now });
        }
    }

    /// Number of sessions currently held.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
