//! Error type for the compositing pipeline.

use std::fmt;

/// Message shown to end users for every composite failure.
pub const USER_FACING_FAILURE: &str = "❌ Sorry, I ran out of memory. Try again in a minute!";

/// Which stage of the pipeline failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeErrorKind {
    /// The segmentation collaborator failed or returned unusable data
    Segmentation,
    /// Backdrop bytes could not be decoded
    Decode,
    /// Resizing or PNG encoding failed
    Encode,
    /// The composite exceeded its wall-clock budget
    Timeout,
    /// The blocking worker panicked or was cancelled
    Internal,
}

impl fmt::Display for CompositeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompositeErrorKind::Segmentation => write!(f, "segmentation_failed"),
            CompositeErrorKind::Decode => write!(f, "decode_failed"),
            CompositeErrorKind::Encode => write!(f, "encode_failed"),
            CompositeErrorKind::Timeout => write!(f, "timed_out"),
            CompositeErrorKind::Internal => write!(f, "internal"),
        }
    }
}

/// Structured composite failure with kind and details.
///
/// The kind and details are for diagnostics only. Users always get
/// [`USER_FACING_FAILURE`] regardless of kind.
#[derive(Debug, Clone)]
pub struct CompositeError {
    pub kind: CompositeErrorKind,
    /// One-line summary suitable for logs
    pub message: String,
    /// Optional underlying cause
    pub details: Option<String>,
}

impl CompositeError {
    pub fn new(kind: CompositeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        kind: CompositeErrorKind,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            details: Some(details.into()),
        }
    }

    pub fn segmentation(details: impl fmt::Display) -> Self {
        Self::with_details(
            CompositeErrorKind::Segmentation,
            "segmentation failed",
            details.to_string(),
        )
    }

    pub fn decode(details: impl fmt::Display) -> Self {
        Self::with_details(
            CompositeErrorKind::Decode,
            "backdrop decode failed",
            details.to_string(),
        )
    }

    pub fn encode(details: impl fmt::Display) -> Self {
        Self::with_details(
            CompositeErrorKind::Encode,
            "output encode failed",
            details.to_string(),
        )
    }

    pub fn timeout(after_secs: u64) -> Self {
        Self::new(
            CompositeErrorKind::Timeout,
            format!("composite timed out after {after_secs}s"),
        )
    }

    pub fn internal(details: impl fmt::Display) -> Self {
        Self::with_details(
            CompositeErrorKind::Internal,
            "composite worker aborted",
            details.to_string(),
        )
    }

    /// Generic text for the end user; never exposes the stage.
    pub fn user_message(&self) -> &'static str {
        USER_FACING_FAILURE
    }
}

impl fmt::Display for CompositeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{} ({}): {}", self.message, self.kind, details),
            None => write!(f, "{} ({})", self.message, self.kind),
        }
    }
}

impl std::error::Error for CompositeError {}

/// Result type for compositing operations.
pub type CompositeResult<T> = std::result::Result<T, CompositeError>;
