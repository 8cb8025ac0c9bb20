//! Session Registry
//!
//! Per-process table of live sessions, indexed by session id and, once a
//! session has logged in, by user id. A user id maps to at most one session;
//! registering a newer session for the same user evicts the older one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use super::frame::Frame;
use super::session::Session;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("session {0} has no authenticated user")]
    Unauthenticated(String),

    #[error("session {0} is closing")]
    Closing(String),
}

#[derive(Default)]
struct RegistryState {
    by_session: HashMap<String, Arc<Session>>,
    by_user: HashMap<i64, Arc<Session>>,
}

#[derive(Default)]
pub struct SessionRegistry {
    state: Mutex<RegistryState>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly accepted, not yet authenticated session.
    pub fn insert(&self, session: Arc<Session>) {
        let id = session.id().to_string();
        self.state.lock().by_session.insert(id, session);
    }

    /// Bind the session's user id to it, evicting any prior session for that
    /// user.
    ///
    /// The evicted session gets `notice` queued ahead of its close, so the
    /// peer learns why it was dropped. Returns the evicted session. A session
    /// that is already closing is refused and evicts nothing.
    pub fn register(
        &self,
        session: &Arc<Session>,
        notice: Option<Frame>,
    ) -> Result<Option<Arc<Session>>, RegistryError> {
        let uid = session
            .user_id()
            .ok_or_else(|| RegistryError::Unauthenticated(session.id().to_string()))?;

        let prior = {
            let mut state = self.state.lock();
            if session.is_closing() {
                return Err(RegistryError::Closing(session.id().to_string()));
            }
            state
                .by_session
                .insert(session.id().to_string(), Arc::clone(session));
            state.by_user.insert(uid, Arc::clone(session))
        };

        let evicted = prior.filter(|prior| prior.id() != session.id());
        if let Some(prior) = &evicted {
            info!(
                user_id = uid,
                evicted_session = %prior.id(),
                session_id = %session.id(),
                "Evicting previous session for user"
            );
            if let Some(notice) = notice {
                prior.send(notice);
            }
            prior.close();
        }
        Ok(evicted)
    }

    /// Forget a session. Returns whether it was present.
    ///
    /// The user index is only cleared if it still points at this session, so
    /// unregistering an evicted session never drops its replacement.
    pub fn unregister(&self, session_id: &str) -> bool {
        let mut state = self.state.lock();
        let Some(session) = state.by_session.remove(session_id) else {
            return false;
        };

        if let Some(uid) = session.user_id() {
            if state
                .by_user
                .get(&uid)
                .is_some_and(|current| current.id() == session_id)
            {
                state.by_user.remove(&uid);
            }
        }
        true
    }

    /// The session currently logged in as `uid`.
    pub fn lookup(&self, uid: i64) -> Option<Arc<Session>> {
        self.state.lock().by_user.get(&uid).cloned()
    }

    pub fn lookup_session(&self, session_id: &str) -> Option<Arc<Session>> {
        self.state.lock().by_session.get(session_id).cloned()
    }

    pub fn is_online(&self, uid: i64) -> bool {
        self.state.lock().by_user.contains_key(&uid)
    }

    /// Number of logged-in users.
    pub fn online_count(&self) -> usize {
        self.state.lock().by_user.len()
    }

    /// Number of tracked sessions, authenticated or not.
    pub fn len(&self) -> usize {
        self.state.lock().by_session.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close and unregister every session silent for longer than
    /// `threshold`. Returns the sessions removed.
    ///
    /// The lock is held only to snapshot the table and then once per removal.
    pub fn sweep(&self, now: Instant, threshold: Duration) -> Vec<Arc<Session>> {
        let snapshot: Vec<Arc<Session>> = self.state.lock().by_session.values().cloned().collect();

        let mut expired = Vec::new();
        for session in snapshot {
            if !session.is_expired(now, threshold) {
                continue;
            }
            debug!(
                session_id = %session.id(),
                user_id = ?session.user_id(),
                "Heartbeat expired"
            );
            session.close();
            if self.unregister(session.id()) {
                expired.push(session);
            }
        }
        expired
    }

    /// Ask every session to close. Sessions unregister themselves as their
    /// connections wind down.
    pub fn close_all(&self) -> usize {
        let snapshot: Vec<Arc<Session>> = self.state.lock().by_session.values().cloned().collect();
        snapshot.iter().filter(|session| session.close()).count()
    }
}
