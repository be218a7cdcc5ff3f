//! Core selfiebox library (session pairing, compositing, config).

pub mod compositor;
pub mod config;
pub mod error;
pub mod segment;
pub mod session;

pub use compositor::Compositor;
pub use error::{CompositeError, CompositeErrorKind};
pub use segment::{HttpSegmenter, Segmenter};
pub use session::{Outcome, SessionKey, SessionPhase, SessionStore, SessionTracker};
