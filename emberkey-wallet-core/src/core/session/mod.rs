//! Session authentication state machine
//!
//! `Unauthenticated -> Authenticated -> Expired | LoggedOut`.
//!
//! A session stays valid only while heartbeats keep arriving: every
//! `has_valid_session` check compares the age of the last heartbeat with the
//! policy timeout, and also checks that the process-scoped session record
//! still carries our session id. Any failed check expires the session.
//! Activity signals arrive as [`ActivityEvent`]s from whatever drives the
//! engine (UI, CLI, a timer); the authority does not know their source.

use crate::core::storage::EncryptedStore;
use crate::domain::{Session, SessionRecord};
use crate::infrastructure::platform::PlatformStorage;
use crate::shared::constants::{DEFAULT_HEARTBEAT_INTERVAL_MS, DEFAULT_SESSION_TIMEOUT_MS, SESSION_STORAGE_KEY};
use crate::shared::types::WalletResult;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    Expired,
    LoggedOut,
}

/// Liveness signals fed into the authority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityEvent {
    Focus,
    Input,
    /// Periodic heartbeat timer
    Tick,
    Backgrounded,
    Foregrounded,
}

/// Liveness-heartbeat session policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionPolicy {
    /// Maximum heartbeat age before the session expires
    pub timeout_ms: u64,
    /// Cadence of the heartbeat timer
    pub heartbeat_interval_ms: u64,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_SESSION_TIMEOUT_MS,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
        }
    }
}

impl SessionPolicy {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

struct SessionInner {
    state: SessionState,
    session: Option<Session>,
    heartbeat_at: Option<Instant>,
    foreground: bool,
}

impl SessionInner {
    fn reset(&mut self, state: SessionState) {
        self.state = state;
        self.session = None;
        self.heartbeat_at = None;
    }
}

/// Shared handle to the session state machine
#[derive(Clone)]
pub struct SessionAuthority {
    inner: Arc<Mutex<SessionInner>>,
    ephemeral: Arc<dyn PlatformStorage>,
    policy: SessionPolicy,
}

impl SessionAuthority {
    /// `ephemeral` must be process-scoped so a restart never resurrects a session
    pub fn new(ephemeral: Arc<dyn PlatformStorage>, policy: SessionPolicy) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                state: SessionState::Unauthenticated,
                session: None,
                heartbeat_at: None,
                foreground: true,
            })),
            ephemeral,
            policy,
        }
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn current_session(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    /// Open a session for `address` with a fresh random id
    pub fn create_session(&self, address: &str) -> WalletResult<Session> {
        let now = Utc::now();
        let session = Session {
            address: address.to_string(),
            session_id: uuid::Uuid::new_v4().to_string(),
            started_at: now,
            last_heartbeat: now,
        };
        self.write_record(&session)?;

        let mut inner = self.lock();
        inner.state = SessionState::Authenticated;
        inner.session = Some(session.clone());
        inner.heartbeat_at = Some(Instant::now());
        inner.foreground = true;
        drop(inner);

        log::info!("Session created for {}", address);
        Ok(session)
    }

    /// Authenticated, record id matches, heartbeat within the timeout.
    /// Any failed check expires the session.
    pub fn has_valid_session(&self) -> bool {
        let mut inner = self.lock();
        if inner.state != SessionState::Authenticated {
            return false;
        }
        let current = inner
            .session
            .as_ref()
            .map(|s| s.session_id.clone())
            .zip(inner.heartbeat_at);
        let Some((session_id, heartbeat_at)) = current else {
            self.expire(&mut inner, "session fields missing");
            return false;
        };

        match self.read_record() {
            Some(record) if record.session_id == session_id => {}
            _ => {
                self.expire(&mut inner, "session record diverged");
                return false;
            }
        }

        if heartbeat_at.elapsed() > self.policy.timeout() {
            self.expire(&mut inner, "heartbeat timed out");
            return false;
        }
        true
    }

    /// Durable identity present and the state machine still authenticated
    pub fn is_fully_authenticated(&self) -> bool {
        let inner = self.lock();
        inner.state == SessionState::Authenticated && inner.session.is_some()
    }

    /// Refresh the heartbeat if the session is still valid
    pub fn heartbeat(&self) -> bool {
        if !self.has_valid_session() {
            return false;
        }
        let mut inner = self.lock();
        if !inner.foreground {
            return true;
        }
        let Some(session) = inner.session.as_mut() else {
            return false;
        };
        session.last_heartbeat = Utc::now();
        let record = SessionRecord::from(&*session);
        inner.heartbeat_at = Some(Instant::now());
        drop(inner);

        if let Err(e) = self.store_record(&record) {
            log::warn!("Failed to persist heartbeat: {}", e);
        }
        true
    }

    /// Apply a liveness signal. Returns whether the session is still valid.
    pub fn record_activity(&self, event: ActivityEvent) -> bool {
        match event {
            ActivityEvent::Backgrounded => {
                self.lock().foreground = false;
                log::debug!("Heartbeat suspended");
                self.has_valid_session()
            }
            ActivityEvent::Foregrounded | ActivityEvent::Focus => {
                self.lock().foreground = true;
                self.heartbeat()
            }
            ActivityEvent::Input | ActivityEvent::Tick => self.heartbeat(),
        }
    }

    /// Emit `Tick` on the policy cadence until the session it was started for ends
    pub fn spawn_heartbeat(&self) -> JoinHandle<()> {
        let authority = self.clone();
        let session_id = self.current_session().map(|s| s.session_id);
        let period = self.policy.heartbeat_interval().max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if authority.current_session().map(|s| s.session_id) != session_id {
                    break;
                }
                if !authority.record_activity(ActivityEvent::Tick) {
                    break;
                }
            }
            log::debug!("Heartbeat task stopped");
        })
    }

    /// Feed events from a channel until it closes
    pub fn drive(&self, mut events: mpsc::Receiver<ActivityEvent>) -> JoinHandle<()> {
        let authority = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                authority.record_activity(event);
            }
        })
    }

    /// Explicit logout; clears the ephemeral record
    pub fn clear_session(&self) {
        let mut inner = self.lock();
        let had_session = inner.session.is_some();
        inner.reset(SessionState::LoggedOut);
        drop(inner);

        if let Err(e) = self.ephemeral.delete(SESSION_STORAGE_KEY) {
            log::warn!("Failed to clear session record: {}", e);
        }
        if had_session {
            log::info!("Session cleared");
        }
    }

    /// Logout and remove the durable wallet record
    pub fn clear_all(&self, store: &EncryptedStore) -> WalletResult<()> {
        self.clear_session();
        store.delete()
    }

    fn expire(&self, inner: &mut SessionInner, reason: &str) {
        inner.reset(SessionState::Expired);
        log::info!("Session expired: {}", reason);
    }

    fn write_record(&self, session: &Session) -> WalletResult<()> {
        self.store_record(&SessionRecord::from(session))
    }

    fn store_record(&self, record: &SessionRecord) -> WalletResult<()> {
        let raw = serde_json::to_vec(record)?;
        self.ephemeral.store(SESSION_STORAGE_KEY, &raw)
    }

    fn read_record(&self) -> Option<SessionRecord> {
        let raw = self.ephemeral.retrieve(SESSION_STORAGE_KEY).ok()?;
        serde_json::from_slice(&raw).ok()
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::crypto::password::KdfConfig;
    use crate::infrastructure::platform::MemoryStorage;

    const ADDRESS: &str = "0x9858effd232b4033e47d90003d41ec34ecaeda94";

    fn authority() -> (SessionAuthority, Arc<MemoryStorage>) {
        let ephemeral = Arc::new(MemoryStorage::new());
        (SessionAuthority::new(ephemeral.clone(), SessionPolicy::default()), ephemeral)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_session_is_valid() {
        let (authority, _) = authority();
        assert_eq!(authority.state(), SessionState::Unauthenticated);
        assert!(!authority.has_valid_session());

        let session = authority.create_session(ADDRESS).expect("Failed to create session");
        assert_eq!(session.address, ADDRESS);
        assert!(authority.has_valid_session());
        assert!(authority.is_fully_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_expires_without_heartbeat() {
        let (authority, _) = authority();
        authority.create_session(ADDRESS).expect("Failed to create session");

        tokio::time::advance(Duration::from_millis(DEFAULT_SESSION_TIMEOUT_MS + 1)).await;
        assert!(!authority.has_valid_session());
        assert_eq!(authority.state(), SessionState::Expired);
        assert!(!authority.is_fully_authenticated());
        assert!(authority.current_session().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_keeps_session_alive() {
        let (authority, _) = authority();
        authority.create_session(ADDRESS).expect("Failed to create session");

        for _ in 0..5 {
            tokio::time::advance(Duration::from_secs(20)).await;
            assert!(authority.record_activity(ActivityEvent::Input));
        }
        assert!(authority.has_valid_session());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_heartbeat_does_not_revive() {
        let (authority, _) = authority();
        authority.create_session(ADDRESS).expect("Failed to create session");

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(!authority.record_activity(ActivityEvent::Focus));
        assert!(!authority.has_valid_session());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backgrounded_session_stops_refreshing() {
        let (authority, _) = authority();
        authority.create_session(ADDRESS).expect("Failed to create session");

        assert!(authority.record_activity(ActivityEvent::Backgrounded));
        tokio::time::advance(Duration::from_secs(20)).await;
        assert!(authority.record_activity(ActivityEvent::Tick));
        tokio::time::advance(Duration::from_secs(20)).await;
        assert!(!authority.record_activity(ActivityEvent::Foregrounded));
        assert_eq!(authority.state(), SessionState::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_diverged_record_expires_session() {
        let (authority, ephemeral) = authority();
        authority.create_session(ADDRESS).expect("Failed to create session");

        let foreign = SessionRecord {
            session_id: "someone-else".to_string(),
            last_heartbeat: Utc::now().timestamp_millis(),
        };
        ephemeral
            .store(SESSION_STORAGE_KEY, &serde_json::to_vec(&foreign).expect("Failed to encode"))
            .expect("Failed to overwrite record");
        assert!(!authority.has_valid_session());
        assert_eq!(authority.state(), SessionState::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleared_record_expires_session() {
        let (authority, ephemeral) = authority();
        authority.create_session(ADDRESS).expect("Failed to create session");
        ephemeral.delete(SESSION_STORAGE_KEY).expect("Failed to delete record");
        assert!(!authority.has_valid_session());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_does_not_resurrect() {
        let (authority, _) = authority();
        authority.create_session(ADDRESS).expect("Failed to create session");

        // A new process gets a new ephemeral store
        let (restarted, _) = self::authority();
        assert!(!restarted.has_valid_session());
        assert_eq!(restarted.state(), SessionState::Unauthenticated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_session() {
        let (authority, ephemeral) = authority();
        authority.create_session(ADDRESS).expect("Failed to create session");
        authority.clear_session();
        assert_eq!(authority.state(), SessionState::LoggedOut);
        assert!(!authority.has_valid_session());
        assert!(!ephemeral.exists(SESSION_STORAGE_KEY).expect("Failed to check"));

        // Re-entry through a new session
        authority.create_session(ADDRESS).expect("Failed to create session");
        assert!(authority.has_valid_session());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_all_removes_durable_record() {
        let (authority, _) = authority();
        let store = EncryptedStore::new(Arc::new(MemoryStorage::new()), KdfConfig::insecure_fast());
        store
            .store(ADDRESS, &crate::core::crypto::keys::SecureSeedPhrase::new("a b c"), "pw")
            .await
            .expect("Failed to store");
        authority.create_session(ADDRESS).expect("Failed to create session");

        authority.clear_all(&store).expect("Failed to clear");
        assert_eq!(authority.state(), SessionState::LoggedOut);
        assert!(!store.has_wallet().expect("Failed to check"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_task_keeps_session_alive() {
        let (authority, _) = authority();
        authority.create_session(ADDRESS).expect("Failed to create session");
        let handle = authority.spawn_heartbeat();

        for _ in 0..10 {
            tokio::time::sleep(Duration::from_secs(10)).await;
        }
        assert!(authority.has_valid_session());

        authority.clear_session();
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_applies_events() {
        let (authority, _) = authority();
        authority.create_session(ADDRESS).expect("Failed to create session");
        let (tx, rx) = mpsc::channel(8);
        let handle = authority.drive(rx);

        tokio::time::advance(Duration::from_secs(25)).await;
        tx.send(ActivityEvent::Input).await.expect("Failed to send event");
        drop(tx);
        handle.await.expect("Driver task panicked");

        tokio::time::advance(Duration::from_secs(25)).await;
        assert!(authority.has_valid_session());
    }
}
