//! Registry of live contribution sessions.
//!
//! Each session sits behind its own async mutex so one contributor's
//! actions are applied in order, while different sessions never contend.
//! Removing a session from the registry drops it once no request holds it,
//! which cancels any reset it had scheduled.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use ivd_core::error::CoreError;
use ivd_flows::ContributionSession;

/// A session plus the bookkeeping the host needs for it.
pub struct HostedSession {
    pub session: tokio::sync::Mutex<ContributionSession>,
    last_active: Mutex<Instant>,
}

impl std::fmt::Debug for HostedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedSession").finish_non_exhaustive()
    }
}

impl HostedSession {
    fn new(session: ContributionSession) -> Self {
        Self {
            session: tokio::sync::Mutex::new(session),
            last_active: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_active.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(
            *self.last_active.lock().unwrap_or_else(PoisonError::into_inner),
        )
    }
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<HostedSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: ContributionSession) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(HostedSession::new(session)));
        id
    }

    /// Look up a session and mark it active.
    pub async fn get(&self, id: Uuid) -> Result<Arc<HostedSession>, CoreError> {
        let hosted = self
            .sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: "ContributionSession",
                id,
            })?;
        hosted.touch();
        Ok(hosted)
    }

    /// Tear a session down. Returns whether it existed.
    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drop every session idle for longer than `max_idle`. Returns how many
    /// were removed.
    pub async fn sweep_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, hosted| hosted.idle_for(now) <= max_idle);
        before - sessions.len()
    }
}
