//! Per-connection session state and the broadcast registry.
//!
//! Each session owns an unbounded outbound queue drained by its writer
//! task, so sends never block and stay FIFO per session. Broadcast is
//! best-effort fan-out: a failed send is swallowed, never propagated.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc::UnboundedSender;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use crate::messages::Frame;

/// One connected diagnostic client.
pub struct Session {
    id: u64,
    remote_addr: String,
    client_id: Mutex<String>,
    sender: UnboundedSender<Message>,
    connected_at: i64,
    last_activity: AtomicI64,
    sent_count: AtomicU64,
    initialized: AtomicBool,
    paused: AtomicBool,
}

impl Session {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    #[must_use]
    pub fn connected_at(&self) -> i64 {
        self.connected_at
    }

    #[must_use]
    pub fn last_activity(&self) -> i64 {
        self.last_activity.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn sent_count(&self) -> u64 {
        self.sent_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn client_id(&self) -> String {
        self.client_id.lock().clone()
    }

    pub fn set_client_id(&self, client_id: impl Into<String>) {
        *self.client_id.lock() = client_id.into();
    }

    /// Record inbound activity.
    pub fn touch(&self) {
        self.last_activity
            .store(chrono::Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    /// Only initialized sessions participate in broadcast.
    pub fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Relaxed)
    }

    /// A paused session keeps its connection but stops receiving push
    /// events; direct responses still flow.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    /// Queue a frame for this session. Failures (a closed writer) are
    /// swallowed; the return value exists for bookkeeping only.
    pub fn send_frame(&self, frame: &Frame) -> bool {
        let ok = self.sender.send(Message::Text(frame.encode())).is_ok();
        if ok {
            self.sent_count.fetch_add(1, Ordering::Relaxed);
            self.last_activity
                .store(chrono::Utc::now().timestamp_millis(), Ordering::Relaxed);
        }
        ok
    }
}

/// All live sessions, bounded by `max_clients`.
pub struct SessionRegistry {
    max_clients: AtomicUsize,
    next_id: AtomicU64,
    sessions: RwLock<HashMap<u64, Arc<Session>>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(max_clients: usize) -> Self {
        Self {
            max_clients: AtomicUsize::new(max_clients.max(1)),
            next_id: AtomicU64::new(0),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_max_clients(&self, max_clients: usize) {
        self.max_clients
            .store(max_clients.max(1), Ordering::Relaxed);
    }

    /// Register a new session unless the registry is at capacity.
    #[must_use]
    pub fn try_register(
        &self,
        sender: UnboundedSender<Message>,
        remote_addr: impl Into<String>,
    ) -> Option<Arc<Session>> {
        let mut sessions = self.sessions.write();
        if sessions.len() >= self.max_clients.load(Ordering::Relaxed) {
            return None;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let remote_addr = remote_addr.into();
        let now = chrono::Utc::now().timestamp_millis();
        let session = Arc::new(Session {
            id,
            client_id: Mutex::new(remote_addr.clone()),
            remote_addr,
            sender,
            connected_at: now,
            last_activity: AtomicI64::new(now),
            sent_count: AtomicU64::new(0),
            initialized: AtomicBool::new(false),
            paused: AtomicBool::new(false),
        });
        sessions.insert(id, session.clone());
        debug!(session = id, "session registered");
        Some(session)
    }

    /// Drop a session. No further broadcasts reach it.
    pub fn remove(&self, session_id: u64) {
        if self.sessions.write().remove(&session_id).is_some() {
            debug!(session = session_id, "session removed");
        }
    }

    #[must_use]
    pub fn get(&self, session_id: u64) -> Option<Arc<Session>> {
        self.sessions.read().get(&session_id).cloned()
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Best-effort fan-out to every initialized, unpaused session.
    pub fn broadcast(&self, frame: &Frame) {
        let sessions: Vec<Arc<Session>> = self.sessions.read().values().cloned().collect();
        for session in sessions {
            if session.is_initialized() && !session.is_paused() {
                let _ = session.send_frame(frame);
            }
        }
    }

    /// Drop every session (teardown). Writer tasks see their queues close
    /// and shut the connections down.
    pub fn clear(&self) {
        self.sessions.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc::unbounded_channel;

    use super::*;
    use crate::messages::MessageType;

    fn registry_with_session(
        registry: &SessionRegistry,
    ) -> (Arc<Session>, tokio::sync::mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = unbounded_channel();
        let session = registry.try_register(tx, "127.0.0.1:1").unwrap();
        (session, rx)
    }

    #[test]
    fn test_capacity_is_enforced() {
        let registry = SessionRegistry::new(2);
        let (tx, _rx1) = unbounded_channel();
        let _a = registry.try_register(tx, "a").unwrap();
        let (tx, _rx2) = unbounded_channel();
        let _b = registry.try_register(tx, "b").unwrap();
        let (tx, _rx3) = unbounded_channel();
        assert!(registry.try_register(tx, "c").is_none());
        assert_eq!(registry.session_count(), 2);
    }

    #[test]
    fn test_broadcast_skips_uninitialized_and_paused() {
        let registry = SessionRegistry::new(10);
        let (ready, mut ready_rx) = registry_with_session(&registry);
        let (_fresh, mut fresh_rx) = registry_with_session(&registry);
        let (paused, mut paused_rx) = registry_with_session(&registry);

        ready.mark_initialized();
        paused.mark_initialized();
        paused.set_paused(true);

        registry.broadcast(&Frame::new(MessageType::TimeSync));

        assert!(ready_rx.try_recv().is_ok());
        assert!(fresh_rx.try_recv().is_err());
        assert!(paused_rx.try_recv().is_err());
    }

    #[test]
    fn test_send_failure_is_swallowed() {
        let registry = SessionRegistry::new(10);
        let (session, rx) = registry_with_session(&registry);
        session.mark_initialized();
        drop(rx);
        // A dead writer never panics the broadcast path.
        registry.broadcast(&Frame::new(MessageType::TimeSync));
        assert!(!session.send_frame(&Frame::new(MessageType::TimeSync)));
    }

    #[test]
    fn test_send_updates_counters() {
        let registry = SessionRegistry::new(10);
        let (session, mut rx) = registry_with_session(&registry);
        assert_eq!(session.sent_count(), 0);
        assert!(session.send_frame(&Frame::new(MessageType::Pong)));
        assert_eq!(session.sent_count(), 1);
        let Message::Text(text) = rx.try_recv().unwrap() else {
            panic!("expected text frame");
        };
        assert!(text.contains("PONG"));
    }

    #[test]
    fn test_remove_stops_delivery() {
        let registry = SessionRegistry::new(10);
        let (session, mut rx) = registry_with_session(&registry);
        session.mark_initialized();
        registry.remove(session.id());
        registry.broadcast(&Frame::new(MessageType::TimeSync));
        assert!(rx.try_recv().is_err());
        assert_eq!(registry.session_count(), 0);
    }
}
