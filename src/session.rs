use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::{PainCareError, Result};

/// Greeting every new session opens with
pub const GREETING: &str =
    "สวัสดีค่ะ ฉันสามารถช่วยคุณประเมินอาการปวดมะเร็งได้จากการบรรยายอาการ 5 มิติค่ะ 💊";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the conversation. Never modified after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Awaiting,
}

/// Append-only transcript for one user
#[derive(Debug, Clone)]
pub struct ConversationSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    messages: Vec<Turn>,
    state: SessionState,
}

impl ConversationSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            messages: vec![Turn::assistant(GREETING)],
            state: SessionState::Idle,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn append_user_turn(&mut self, text: impl Into<String>) {
        self.messages.push(Turn::user(text));
    }

    pub fn append_assistant_turn(&mut self, text: impl Into<String>) {
        self.messages.push(Turn::assistant(text));
    }

    /// Every turn so far, oldest first
    pub fn history(&self) -> &[Turn] {
        &self.messages
    }

    /// Idle -> Awaiting. Only one submission may be outstanding.
    pub fn begin_submit(&mut self) -> Result<()> {
        match self.state {
            SessionState::Idle => {
                self.state = SessionState::Awaiting;
                Ok(())
            }
            SessionState::Awaiting => Err(PainCareError::SessionBusy(self.id)),
        }
    }

    /// Back to Idle, whether or not a reply was appended
    pub fn finish_submit(&mut self) {
        self.state = SessionState::Idle;
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

pub type SessionHandle = Arc<Mutex<ConversationSession>>;

const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_MAX_SESSIONS: usize = 10_000;

struct SessionEntry {
    handle: SessionHandle,
    last_seen: DateTime<Utc>,
}

impl SessionEntry {
    // Awaiting sessions are never dropped; the in-flight call still owns them.
    fn is_awaiting(&self) -> bool {
        match self.handle.try_lock() {
            Ok(session) => session.state() == SessionState::Awaiting,
            Err(_) => true,
        }
    }
}

/// Independent sessions keyed by id; nothing here outlives the process.
///
/// A session ends when it has not been touched for `idle_ttl`. The store also
/// never holds more than `max_sessions`: creating one past the limit evicts the
/// least recently seen idle session.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
    idle_ttl: chrono::Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_IDLE_TTL, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle_ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_ttl: chrono::Duration::from_std(idle_ttl)
                .unwrap_or_else(|_| chrono::Duration::days(365 * 100)),
            max_sessions: max_sessions.max(1),
        }
    }

    fn is_expired(&self, entry: &SessionEntry, now: DateTime<Utc>) -> bool {
        now - entry.last_seen >= self.idle_ttl
    }

    pub async fn create(&self) -> (Uuid, SessionHandle) {
        let now = Utc::now();
        let session = ConversationSession::new();
        let id = session.id();
        let handle = Arc::new(Mutex::new(session));

        let mut sessions = self.sessions.write().await;
        self.purge_locked(&mut sessions, now);
        if sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .filter(|(_, entry)| !entry.is_awaiting())
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                tracing::warn!(
                    session_id = %oldest,
                    "Session limit reached, evicted least recently used session"
                );
            }
        }
        sessions.insert(
            id,
            SessionEntry {
                handle: Arc::clone(&handle),
                last_seen: now,
            },
        );
        drop(sessions);

        tracing::info!(session_id = %id, "Created conversation session");
        (id, handle)
    }

    /// Look up a live session and mark it as seen
    pub async fn get(&self, id: Uuid) -> Result<SessionHandle> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let expired = match sessions.get(&id) {
            Some(entry) => self.is_expired(entry, now) && !entry.is_awaiting(),
            None => return Err(PainCareError::SessionNotFound(id)),
        };
        if expired {
            sessions.remove(&id);
            tracing::info!(session_id = %id, "Session expired");
            return Err(PainCareError::SessionNotFound(id));
        }

        match sessions.get_mut(&id) {
            Some(entry) => {
                entry.last_seen = now;
                Ok(Arc::clone(&entry.handle))
            }
            None => Err(PainCareError::SessionNotFound(id)),
        }
    }

    pub async fn discard(&self, id: Uuid) -> Result<()> {
        match self.sessions.write().await.remove(&id) {
            Some(_) => {
                tracing::info!(session_id = %id, "Discarded conversation session");
                Ok(())
            }
            None => Err(PainCareError::SessionNotFound(id)),
        }
    }

    /// Drop every idle session last seen more than `idle_ttl` before `now`
    pub async fn purge_idle(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        self.purge_locked(&mut sessions, now)
    }

    fn purge_locked(
        &self,
        sessions: &mut HashMap<Uuid, SessionEntry>,
        now: DateTime<Utc>,
    ) -> usize {
        let before = sessions.len();
        sessions.retain(|_, entry| !self.is_expired(entry, now) || entry.is_awaiting());
        let purged = before - sessions.len();
        if purged > 0 {
            tracing::info!(purged, remaining = sessions.len(), "Purged idle sessions");
        }
        purged
    }

    /// Periodically purge idle sessions for as long as the store is alive
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        let store = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match store.upgrade() {
                    Some(store) => {
                        store.purge_idle(Utc::now()).await;
                    }
                    None => break,
                }
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
