//! Session registry
//!
//! Stream callbacks arrive from graph-owned threads carrying nothing but
//! a session id. The registry is the bridge back to session context: a
//! shared id to handle map that tolerates lookups from any thread while
//! the owning side registers and removes entries.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use crossbeam_channel::Sender;

use crate::error::SessionError;
use crate::session::dispatch::StreamEvent;

/// Identifier for one tracking session. Assigned by the registry,
/// starting at 1, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u32);

impl SessionId {
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-session context recovered by stream callbacks.
///
/// Cheap to clone; the interesting part is the sender for the session's
/// event queue.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    events: Sender<StreamEvent>,
}

impl SessionHandle {
    pub fn new(events: Sender<StreamEvent>) -> Self {
        Self { events }
    }

    /// Queue an event for the owning thread. The queue is unbounded, so
    /// an accepted callback always lands exactly one event; a send only
    /// fails once the session side has dropped the receiver during
    /// teardown, and then the event is dropped with it.
    pub fn enqueue(&self, event: StreamEvent) {
        let _ = self.events.send(event);
    }
}

/// Shared id to handle map with a fixed capacity.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    next_id: AtomicU32,
    capacity: usize,
}

impl SessionRegistry {
    /// Default capacity, sized for a handful of concurrent sessions.
    pub const DEFAULT_CAPACITY: usize = 20;

    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU32::new(1),
            capacity,
        }
    }

    /// Register a new session and assign its id.
    ///
    /// Fails once the registry is at capacity. Ids of removed sessions
    /// stay retired so a stale callback can never alias a new session.
    pub fn register(&self, handle: SessionHandle) -> Result<SessionId, SessionError> {
        let mut sessions = self.sessions.write();
        if sessions.len() >= self.capacity {
            return Err(SessionError::RegistryFull {
                capacity: self.capacity,
            });
        }
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        sessions.insert(id, handle);
        tracing::debug!("Session {} registered", id);
        Ok(id)
    }

    /// Look up a session handle. Callable from any thread.
    pub fn lookup(&self, id: SessionId) -> Option<SessionHandle> {
        self.sessions.read().get(&id).cloned()
    }

    /// Remove a session on teardown. Returns whether it was present.
    pub fn remove(&self, id: SessionId) -> bool {
        let removed = self.sessions.write().remove(&id).is_some();
        if removed {
            tracing::debug!("Session {} removed", id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
