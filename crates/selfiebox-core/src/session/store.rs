use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Opaque session identifier, derived from the external user identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SessionKey {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for SessionKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// Observable phase of one session key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No entry; the next image is a subject
    Empty,
    /// Subject stored; the next image is the backdrop
    AwaitingBackdrop,
    /// Both images received, composite in flight
    Ready,
}

enum Slot {
    AwaitingBackdrop { subject: Vec<u8> },
    Ready,
}

impl Slot {
    fn phase(&self) -> SessionPhase {
        match self {
            Slot::AwaitingBackdrop { .. } => SessionPhase::AwaitingBackdrop,
            Slot::Ready => SessionPhase::Ready,
        }
    }
}

/// Result of handing one image to the store.
pub(crate) enum Admission {
    /// First image stored as subject
    Stored,
    /// Pair complete; the caller owns the composite and the guard
    Triggered {
        subject: Vec<u8>,
        backdrop: Vec<u8>,
        guard: ReadyGuard,
    },
    /// A composite is already running for this key; image dropped
    Busy,
}

/// In-memory session table, shared by clones.
///
/// The lock is never held across an await.
#[derive(Clone, Default)]
pub struct SessionStore {
    entries: Arc<Mutex<HashMap<SessionKey, Slot>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock leaves the map itself consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<SessionKey, Slot>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self, key: &SessionKey) -> SessionPhase {
        self.lock()
            .get(key)
            .map_or(SessionPhase::Empty, Slot::phase)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub(crate) fn admit(&self, key: &SessionKey, image: Vec<u8>) -> Admission {
        let mut entries = self.lock();
        match entries.get_mut(key) {
            None => {
                entries.insert(key.clone(), Slot::AwaitingBackdrop { subject: image });
                Admission::Stored
            }
            Some(slot) => match std::mem::replace(slot, Slot::Ready) {
                Slot::Ready => Admission::Busy,
                Slot::AwaitingBackdrop { subject } => Admission::Triggered {
                    subject,
                    backdrop: image,
                    guard: ReadyGuard {
                        store: self.clone(),
                        key: key.clone(),
                    },
                },
            },
        }
    }

    /// Drops a waiting subject. Ready entries belong to their composite.
    pub(crate) fn cancel(&self, key: &SessionKey) -> bool {
        let mut entries = self.lock();
        if matches!(entries.get(key), Some(Slot::AwaitingBackdrop { .. })) {
            entries.remove(key);
            true
        } else {
            false
        }
    }

    fn remove(&self, key: &SessionKey) {
        self.lock().remove(key);
    }
}

/// Removes a `Ready` entry when dropped, on every exit path.
pub(crate) struct ReadyGuard {
    store: SessionStore,
    key: SessionKey,
}

impl Drop for ReadyGuard {
    fn drop(&mut self) {
        self.store.remove(&self.key);
        tracing::debug!(session = %self.key, "session removed");
    }
}
