use std::collections::{hash_map::Entry, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::generate_session_code;

pub const DEFAULT_SESSION_TTL_SECS: i64 = 5 * 60;

/// Tokens and profile produced by a completed provider exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
    /// Provider profile, passed through untouched
    pub user: serde_json::Value,
}

#[derive(Debug)]
struct SessionEntry {
    credentials: Credentials,
    expires_at: DateTime<Utc>,
}

impl SessionEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Time-bounded, single-use storage for credentials waiting to be exchanged.
///
/// Every operation is atomic with respect to the others. In particular two concurrent
/// `take` calls for the same code never both see the credentials.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store the credentials under a freshly generated code and return the code
    async fn put(&self, credentials: Credentials) -> String;

    /// Remove and return the credentials for `code`.
    ///
    /// Unknown, already consumed, and expired codes all yield `None`.
    async fn take(&self, code: &str) -> Option<Credentials>;

    /// Drop every entry that expired at or before `now`, returning how many were removed
    async fn sweep(&self, now: DateTime<Utc>) -> usize;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Process-local [`SessionStore`]. Entries do not survive a restart and are not shared
/// between instances.
pub struct InMemorySessionStore {
    entries: Mutex<HashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_SESSION_TTL_SECS))
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, credentials: Credentials) -> String {
        let expires_at = Utc::now() + self.ttl;
        let mut entries = self.entries.lock().await;

        // Draw again rather than overwrite a live entry
        loop {
            if let Entry::Vacant(slot) = entries.entry(generate_session_code()) {
                let code = slot.key().clone();
                slot.insert(SessionEntry {
                    credentials,
                    expires_at,
                });
                return code;
            }
        }
    }

    async fn take(&self, code: &str) -> Option<Credentials> {
        let entry = self.entries.lock().await.remove(code)?;

        if entry.is_expired(Utc::now()) {
            return None;
        }

        Some(entry.credentials)
    }

    async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();

        entries.retain(|_, entry| !entry.is_expired(now));

        before - entries.len()
    }

    async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
