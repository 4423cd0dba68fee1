//! Screen-level error types
//!
//! Collaborator failures are translated into [`ScreenError`] at the session
//! boundary. Only a few of them end the screen; the rest leave the displayed
//! state untouched and let the next reload show the truth.

use thiserror::Error;

use crate::audit::AuditError;
use crate::collab::StoreError;

/// Errors surfaced by a screen session
#[derive(Debug, Error)]
pub enum ScreenError {
    /// The app identity could not be resolved
    #[error("Application not found: {0}")]
    AppNotFound(String),

    /// Reading the grant store failed for another reason
    #[error("Failed to load permission groups: {0}")]
    Load(#[source] StoreError),

    /// The grant store returned a snapshot that breaks the model rules
    #[error("Invalid permission snapshot: {0}")]
    InvalidSnapshot(String),

    /// A grant, revoke or op-mode write was not applied
    #[error("Failed to write '{target}': {source}")]
    StoreWriteFailed {
        target: String,
        #[source]
        source: StoreError,
    },

    /// The toggled group is not part of the loaded model
    #[error("Unknown permission group: {0}")]
    UnknownGroup(String),

    /// The edited permission is not part of the loaded model
    #[error("Unknown permission: {0}")]
    UnknownPermission(String),

    /// The permission has no backing operation
    #[error("Permission '{0}' has no backing operation")]
    NoOperation(String),

    /// A list value was written to a switch, or the other way round
    #[error("Permission '{permission}' is controlled by a {expected}")]
    ControlMismatch {
        permission: String,
        expected: &'static str,
    },

    /// Reporting toggles to the audit sink failed
    #[error("Audit reporting failed: {0}")]
    Audit(#[from] AuditError),
}

impl ScreenError {
    /// Create a write failure error
    pub fn write_failed(target: impl Into<String>, source: StoreError) -> Self {
        Self::StoreWriteFailed {
            target: target.into(),
            source,
        }
    }

    /// Whether the screen cannot continue (no group data can be shown)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::AppNotFound(_) | Self::Load(_) | Self::InvalidSnapshot(_)
        )
    }
}
