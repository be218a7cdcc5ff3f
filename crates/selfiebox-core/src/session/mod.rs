//! Per-user photo pairing.
//!
//! A session collects a subject, then a backdrop. The second image triggers
//! exactly one composite, after which the session is gone whatever the
//! result:
//!
//! ```text
//! Empty --image--> AwaitingBackdrop --image--> Ready --done/failed--> Empty
//! ```
//!
//! Images arriving while a session is `Ready` are ignored ([`Outcome::Busy`]).

use std::sync::Arc;

use crate::compositor::Compositor;
use crate::error::CompositeError;

mod store;

use store::Admission;
pub use store::{SessionKey, SessionPhase, SessionStore};

/// What happened to a submitted image.
#[derive(Debug)]
pub enum Outcome {
    /// Stored as subject; prompt for the backdrop
    AwaitingBackdrop,
    /// Pair composited; PNG bytes
    Composited(Vec<u8>),
    /// Pair failed; the session was torn down
    Failed(CompositeError),
    /// A composite for this key is still running; the image was dropped
    Busy,
}

#[derive(Clone)]
pub struct SessionTracker {
    store: SessionStore,
    compositor: Arc<Compositor>,
}

impl SessionTracker {
    pub fn new(store: SessionStore, compositor: Arc<Compositor>) -> Self {
        Self { store, compositor }
    }

    /// Feeds one image into the session for `key`.
    ///
    /// The second image for a key runs the composite before returning. The
    /// entry is removed on every exit path, including panics and the
    /// returned future being dropped mid-composite.
    pub async fn submit_image(&self, key: &SessionKey, image: Vec<u8>) -> Outcome {
        let (subject, backdrop, guard) = match self.store.admit(key, image) {
            Admission::Stored => {
                tracing::info!(session = %key, "subject stored, awaiting backdrop");
                return Outcome::AwaitingBackdrop;
            }
            Admission::Busy => {
                tracing::info!(session = %key, "composite already running, image ignored");
                return Outcome::Busy;
            }
            Admission::Triggered {
                subject,
                backdrop,
                guard,
            } => (subject, backdrop, guard),
        };

        tracing::info!(
            session = %key,
            subject_bytes = subject.len(),
            backdrop_bytes = backdrop.len(),
            "both images received, compositing"
        );
        let result = self.compositor.composite(subject, backdrop).await;
        drop(guard);

        match result {
            Ok(png) => {
                tracing::info!(session = %key, bytes = png.len(), "composite finished");
                Outcome::Composited(png)
            }
            Err(err) => {
                tracing::error!(session = %key, kind = %err.kind, "composite failed: {err}");
                Outcome::Failed(err)
            }
        }
    }

    pub fn phase(&self, key: &SessionKey) -> SessionPhase {
        self.store.phase(key)
    }

    /// Drops a waiting subject; returns whether anything was removed.
    pub fn cancel(&self, key: &SessionKey) -> bool {
        let removed = self.store.cancel(key);
        if removed {
            tracing::info!(session = %key, "pending session cancelled");
        }
        removed
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
