//! Permission model loader
//!
//! A [`PermissionModel`] is a snapshot of one app's groups taken from the
//! grant store. It is never patched in place; every mutation elsewhere is
//! followed by a fresh [`PermissionModel::load`].

use appperm_api::{AppIdentity, Permission, PermissionGroup};
use std::collections::HashSet;

use crate::collab::{PermissionGrantStore, StoreError};
use crate::error::ScreenError;

/// Snapshot of an app's permission groups for one load cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionModel {
    app: AppIdentity,
    groups: Vec<PermissionGroup>,
}

impl PermissionModel {
    /// Load the app's groups from the grant store
    ///
    /// Fails with [`ScreenError::AppNotFound`] when the store does not know
    /// the app.
    pub fn load(store: &dyn PermissionGrantStore, app: &AppIdentity) -> Result<Self, ScreenError> {
        let mut groups = store.list_groups(app).map_err(|e| match e {
            StoreError::AppNotFound(package) => ScreenError::AppNotFound(package),
            other => ScreenError::Load(other),
        })?;

        let mut seen = HashSet::with_capacity(groups.len());
        for group in &mut groups {
            if !seen.insert(group.name.clone()) {
                return Err(ScreenError::InvalidSnapshot(format!(
                    "group '{}' listed twice",
                    group.name
                )));
            }
            group.claim_permissions();
            group.policy_fixed = group.policy_fixed || store.is_policy_fixed(app, &group.name);
        }

        tracing::debug!(package = %app.package_name, groups = groups.len(), "Loaded permission groups");

        Ok(Self {
            app: app.clone(),
            groups,
        })
    }

    /// App the snapshot belongs to
    pub fn app(&self) -> &AppIdentity {
        &self.app
    }

    /// Groups in declaration order
    pub fn groups(&self) -> &[PermissionGroup] {
        &self.groups
    }

    /// Find a group by name
    pub fn group(&self, name: &str) -> Option<&PermissionGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Find a permission by name across all groups
    pub fn find_permission(&self, name: &str) -> Option<&Permission> {
        self.groups.iter().find_map(|g| g.find_permission(name))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
