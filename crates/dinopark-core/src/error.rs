//! Error types for the reconciliation engine.

use dinopark_types::EventKind;

use crate::store::StoreError;

/// Errors produced while applying one feed event.
///
/// Validation failures are only raised for the event kinds whose loss
/// would be unsafe (`dino_added`, `maintenance_performed`); the
/// tolerated kinds are skipped with a diagnostic instead and never
/// produce this error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// A required field was missing or invalid on an event kind that
    /// must not be silently dropped.
    #[error("invalid {kind} event: {reason}")]
    Validation {
        /// The kind of the rejected event.
        kind: EventKind,
        /// What was wrong with the payload.
        reason: String,
    },

    /// The entity store failed while applying the merge.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReconcileError {
    /// Shorthand for a validation failure.
    pub fn validation(kind: EventKind, reason: impl Into<String>) -> Self {
        Self::Validation {
            kind,
            reason: reason.into(),
        }
    }
}
