//! System collaborators consumed by the screen core
//!
//! The core never talks to the platform directly. Every system service it
//! needs is a trait here, with default implementations that hosts can use
//! directly, wrap, or replace.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                              HostConfig                                  │
//! │ ┌────────────┐ ┌───────────┐ ┌────────────┐ ┌──────────┐ ┌─────────────┐ │
//! │ │   Grants   │ │    Ops    │ │ Visibility │ │ Overlay  │ │   Special   │ │
//! │ │            │ │           │ │            │ │          │ │             │ │
//! │ │ - Memory   │ │ - Memory  │ │ - Platform │ │ - Flag   │ │ - Location  │ │
//! │ │ - ReadOnly │ │           │ │ - ShowAll  │ │ - Never  │ │ - Recording │ │
//! │ │            │ │           │ │ - Fn       │ │          │ │ - None      │ │
//! │ └────────────┘ └───────────┘ └────────────┘ └──────────┘ └─────────────┘ │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Audit sinks and confirmation handlers live in [`crate::audit`] and
//! [`crate::prompt`].
//!
//! # Example
//!
//! ```rust
//! use appperm_api::{AppIdentity, OpId, OpMode, Permission, PermissionGroup};
//! use appperm_host::collab::{MemoryGrantStore, MemoryOpModeStore, PermissionGrantStore};
//!
//! let app = AppIdentity::new("com.example.camera", 10_042);
//! let grants = MemoryGrantStore::new().with_app(
//!     app.clone(),
//!     vec![PermissionGroup::new("group.CAMERA", "Camera")
//!         .permission(Permission::new("perm.CAMERA").with_app_op(OpId(26)))],
//! );
//! let ops = MemoryOpModeStore::new().default_for(OpId(26), OpMode::Ask);
//!
//! assert_eq!(grants.list_groups(&app).unwrap().len(), 1);
//! ```

pub mod grant;
pub mod ops;
pub mod overlay;
pub mod special;
pub mod visibility;

pub use grant::{AppFixture, GrantFixture, StoreError};
pub use grant::{MemoryGrantStore, PermissionGrantStore, ReadOnlyGrantStore};
pub use ops::{MemoryOpModeStore, OpModeStore};
pub use overlay::{FlagOverlayGuard, NeverObscured, OverlayGuard};
pub use special::{
    LocationProviderDispatcher, NoSpecialFlows, RecordingSpecialFlow, SpecialConsentDispatcher,
};
pub use visibility::{PlatformGroupPolicy, ShowAll, VisibilityPolicy};
