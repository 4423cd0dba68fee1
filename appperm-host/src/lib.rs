//! appperm-host: Screen core for per-app permission management
//!
//! This crate turns a grant store and an op-mode store into the rows of an
//! app's permission screen, and reconciles user toggles back into those
//! stores: overlay and policy checks, revoke confirmations, special consent
//! flows, and reporting of toggled groups when the screen is left.
//!
//! # Quick Start
//!
//! ```rust
//! use appperm_api::{AppIdentity, PermissionGroup};
//! use appperm_host::collab::{MemoryGrantStore, MemoryOpModeStore};
//! use appperm_host::{load_screen, HostPresets, SessionOptions};
//!
//! let app = AppIdentity::new("com.example.maps", 10_077);
//! let grants = MemoryGrantStore::new().with_app(
//!     app.clone(),
//!     vec![PermissionGroup::new("android.permission-group.LOCATION", "Location")],
//! );
//! let config = HostPresets::testing(grants, MemoryOpModeStore::new());
//!
//! let screen = load_screen(&config, &app, SessionOptions::primary()).unwrap();
//! assert_eq!(screen.groups.len(), 1);
//! ```

pub mod aggregator;
pub mod audit;
pub mod collab;
pub mod error;
pub mod model;
pub mod presets;
pub mod prompt;
pub mod reconciler;
pub mod resolver;
pub mod session;

#[cfg(feature = "subscriber")]
pub mod tracing_support;

pub use aggregator::{
    AdditionalEntry, AdditionalPermissionsAggregator, GroupRow, OpRow, RowSummary, ScreenMode,
    ScreenModel,
};
pub use audit::{
    AuditError, AuditSink, JournalAuditSink, NullAuditSink, RecordingAuditSink, ToggleAuditLog,
    ToggleReport, ToggledGroup, TracingAuditSink,
};
pub use error::ScreenError;
pub use model::PermissionModel;
pub use presets::{HostConfig, HostConfigBuilder, HostPresets, PresetError, SessionOptions};
pub use prompt::{
    AutoConfirmationHandler, ConfirmChoice, ConfirmationHandler, PromptError,
    RecordingConfirmationHandler, TerminalConfirmationHandler,
};
pub use reconciler::{BlockReason, ConfirmMessage, Outcome, PendingRevoke, ToggleReconciler};
pub use resolver::{OpControl, OpModeResolver};
pub use session::{load_screen, ScreenSession};

pub use appperm_api::{AppIdentity, OpId, OpMode, Permission, PermissionGroup};
