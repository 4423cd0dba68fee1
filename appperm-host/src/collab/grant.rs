//! Permission-grant store: the authoritative runtime grant state
//!
//! Provides the trait the loader and reconciler read and write through,
//! plus an in-memory store (seedable from a JSON fixture) and a read-only
//! wrapper.

use appperm_api::{AppIdentity, PermissionGroup, MODEL_VERSION};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use thiserror::Error;

/// Error type for collaborator store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Application not found: {0}")]
    AppNotFound(String),

    #[error("Permission group not found: {0}")]
    GroupNotFound(String),

    #[error("Group '{0}' is fixed by device policy")]
    PolicyFixed(String),

    #[error("Store is read-only")]
    ReadOnly,

    #[error("Failed to read store fixture: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse store fixture: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Unsupported fixture version: {0}")]
    UnsupportedVersion(u32),
}

/// Trait for the permission-grant service
///
/// Hosts implement this over the platform's package manager. Grants and
/// revokes apply to every runtime permission of the group.
pub trait PermissionGrantStore: Send + Sync {
    /// List the app's permission groups in declaration order
    fn list_groups(&self, app: &AppIdentity) -> Result<Vec<PermissionGroup>, StoreError>;

    /// Grant all runtime permissions of a group
    fn grant(&self, app: &AppIdentity, group: &str) -> Result<(), StoreError>;

    /// Revoke all runtime permissions of a group
    fn revoke(&self, app: &AppIdentity, group: &str) -> Result<(), StoreError>;

    /// Whether device policy forbids changing the group
    fn is_policy_fixed(&self, app: &AppIdentity, group: &str) -> bool;
}

// ============================================================================
// Fixture format
// ============================================================================

/// Serialized grant state for a set of apps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantFixture {
    pub version: u32,
    pub apps: Vec<AppFixture>,
}

/// Serialized grant state for one app
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppFixture {
    pub app: AppIdentity,
    #[serde(default)]
    pub groups: Vec<PermissionGroup>,
}

// ============================================================================
// In-Memory Grant Store
// ============================================================================

/// In-memory grant store
///
/// Behaves like the platform service: writes mark the group as user-set,
/// and policy-fixed groups refuse writes.
pub struct MemoryGrantStore {
    apps: RwLock<HashMap<AppIdentity, Vec<PermissionGroup>>>,
    writes: AtomicUsize,
}

impl MemoryGrantStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            apps: RwLock::new(HashMap::new()),
            writes: AtomicUsize::new(0),
        }
    }

    /// Add (or replace) an app's groups
    pub fn with_app(self, app: AppIdentity, groups: Vec<PermissionGroup>) -> Self {
        self.insert_app(app, groups);
        self
    }

    /// Insert (or replace) an app's groups
    pub fn insert_app(&self, app: AppIdentity, mut groups: Vec<PermissionGroup>) {
        for group in &mut groups {
            group.claim_permissions();
        }
        self.apps.write().unwrap().insert(app, groups);
    }

    /// Seed a store from a JSON fixture
    pub fn from_reader(reader: impl Read) -> Result<Self, StoreError> {
        let fixture: GrantFixture = serde_json::from_reader(reader)?;
        if fixture.version != MODEL_VERSION {
            return Err(StoreError::UnsupportedVersion(fixture.version));
        }

        let store = Self::new();
        for entry in fixture.apps {
            store.insert_app(entry.app, entry.groups);
        }
        Ok(store)
    }

    /// Seed a store from a JSON fixture file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Number of successful grant/revoke writes
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Get the number of known apps
    pub fn len(&self) -> usize {
        self.apps.read().unwrap().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.apps.read().unwrap().is_empty()
    }

    fn write(&self, app: &AppIdentity, group: &str, granted: bool) -> Result<(), StoreError> {
        let mut apps = self.apps.write().unwrap();
        let groups = apps
            .get_mut(app)
            .ok_or_else(|| StoreError::AppNotFound(app.package_name.clone()))?;
        let entry = groups
            .iter_mut()
            .find(|g| g.name == group)
            .ok_or_else(|| StoreError::GroupNotFound(group.to_string()))?;

        if entry.policy_fixed {
            return Err(StoreError::PolicyFixed(group.to_string()));
        }

        entry.runtime_granted = granted;
        entry.user_set = true;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Default for MemoryGrantStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionGrantStore for MemoryGrantStore {
    fn list_groups(&self, app: &AppIdentity) -> Result<Vec<PermissionGroup>, StoreError> {
        let apps = self.apps.read().unwrap();
        apps.get(app)
            .cloned()
            .ok_or_else(|| StoreError::AppNotFound(app.package_name.clone()))
    }

    fn grant(&self, app: &AppIdentity, group: &str) -> Result<(), StoreError> {
        self.write(app, group, true)
    }

    fn revoke(&self, app: &AppIdentity, group: &str) -> Result<(), StoreError> {
        self.write(app, group, false)
    }

    fn is_policy_fixed(&self, app: &AppIdentity, group: &str) -> bool {
        let apps = self.apps.read().unwrap();
        apps.get(app)
            .and_then(|groups| groups.iter().find(|g| g.name == group))
            .map(|g| g.policy_fixed)
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for MemoryGrantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryGrantStore")
            .field("apps", &self.len())
            .field("writes", &self.write_count())
            .finish()
    }
}

// ============================================================================
// Read-Only Grant Store
// ============================================================================

/// Read-only wrapper for any grant store
///
/// Useful for kiosk or demo devices where the screen may be browsed but
/// grants must not change.
pub struct ReadOnlyGrantStore<S: PermissionGrantStore> {
    inner: S,
}

impl<S: PermissionGrantStore> ReadOnlyGrantStore<S> {
    /// Create a read-only wrapper
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Access the wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: PermissionGrantStore> PermissionGrantStore for ReadOnlyGrantStore<S> {
    fn list_groups(&self, app: &AppIdentity) -> Result<Vec<PermissionGroup>, StoreError> {
        self.inner.list_groups(app)
    }

    fn grant(&self, _app: &AppIdentity, _group: &str) -> Result<(), StoreError> {
        Err(StoreError::ReadOnly)
    }

    fn revoke(&self, _app: &AppIdentity, _group: &str) -> Result<(), StoreError> {
        Err(StoreError::ReadOnly)
    }

    fn is_policy_fixed(&self, app: &AppIdentity, group: &str) -> bool {
        self.inner.is_policy_fixed(app, group)
    }
}

impl<S: PermissionGrantStore + std::fmt::Debug> std::fmt::Debug for ReadOnlyGrantStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadOnlyGrantStore")
            .field("inner", &self.inner)
            .finish()
    }
}
