//! Primary / additional partitioning and screen models
//!
//! Groups the visibility policy does not surface are hidden behind an
//! "additional permissions" entry whose count is the number of
//! operation-backed permissions inside them. The additional page itself
//! lists every operation-backed permission as its own row.

use appperm_api::{AppIdentity, IconRef, OpId, Permission, PermissionGroup};
use serde::Serialize;

use crate::collab::VisibilityPolicy;
use crate::model::PermissionModel;
use crate::resolver::{OpControl, OpModeResolver};

/// Which page a session renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenMode {
    /// Group switches for the primary groups
    #[default]
    Primary,
    /// Individual operation rows
    Additional,
}

/// Summary line under a group row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowSummary {
    EnforcedByPolicy,
}

/// Row for one operation-backed permission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpRow {
    pub permission: String,
    pub group: String,
    pub op: OpId,
    pub control: OpControl,
}

/// Row for one primary group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRow {
    pub name: String,
    pub label: String,
    pub icon: IconRef,
    pub checked: bool,
    pub enabled: bool,
    pub summary: Option<RowSummary>,
    /// Per-operation rows, listed when the group is off and has several
    /// permissions
    pub ops: Vec<OpRow>,
}

/// Entry point to the additional page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdditionalEntry {
    pub count: usize,
}

/// Everything a host needs to render one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreenModel {
    pub app: AppIdentity,
    pub mode: ScreenMode,
    pub groups: Vec<GroupRow>,
    /// Top-level operation rows (additional page only)
    pub ops: Vec<OpRow>,
    pub additional: Option<AdditionalEntry>,
}

impl ScreenModel {
    /// Find a group row by name
    pub fn group(&self, name: &str) -> Option<&GroupRow> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Find an operation row by permission name, nested rows included
    pub fn op(&self, permission: &str) -> Option<&OpRow> {
        self.ops
            .iter()
            .chain(self.groups.iter().flat_map(|g| g.ops.iter()))
            .find(|row| row.permission == permission)
    }

    /// Re-sync group switches from the current grant state
    pub fn sync_checked(&mut self, model: &PermissionModel) {
        for row in &mut self.groups {
            if let Some(group) = model.group(&row.name) {
                row.checked = group.runtime_granted;
            }
        }
    }
}

/// Groups split by visibility
#[derive(Debug)]
pub struct Partition<'m> {
    pub primary: Vec<&'m PermissionGroup>,
    pub additional: Vec<&'m PermissionGroup>,
}

impl Partition<'_> {
    /// Operation-backed permissions inside the hidden groups
    pub fn additional_op_count(&self) -> usize {
        self.additional
            .iter()
            .map(|g| g.op_backed_permissions().count())
            .sum()
    }
}

/// Builds screen models from a loaded permission model
pub struct AdditionalPermissionsAggregator<'a> {
    policy: &'a dyn VisibilityPolicy,
}

impl<'a> AdditionalPermissionsAggregator<'a> {
    pub fn new(policy: &'a dyn VisibilityPolicy) -> Self {
        Self { policy }
    }

    /// Split groups into primary and additional, keeping declaration order
    pub fn partition<'m>(&self, model: &'m PermissionModel) -> Partition<'m> {
        let (primary, additional): (Vec<_>, Vec<_>) = model
            .groups()
            .iter()
            .partition(|g| self.policy.should_show_primarily(g, model.app()));
        Partition {
            primary,
            additional,
        }
    }

    /// Count shown on the additional-permissions entry
    pub fn additional_count(&self, model: &PermissionModel) -> usize {
        self.partition(model).additional_op_count()
    }

    /// Build the requested page
    pub fn build(
        &self,
        model: &PermissionModel,
        resolver: &OpModeResolver<'_>,
        mode: ScreenMode,
    ) -> ScreenModel {
        match mode {
            ScreenMode::Primary => self.build_primary(model, resolver),
            ScreenMode::Additional => self.build_additional(model, resolver),
        }
    }

    /// Primary page: one switch per primary group
    pub fn build_primary(&self, model: &PermissionModel, resolver: &OpModeResolver<'_>) -> ScreenModel {
        let partition = self.partition(model);
        let count = partition.additional_op_count();

        let groups = partition
            .primary
            .iter()
            .map(|group| {
                let checked = group.displayed_checked();
                let ops = if !checked && group.permissions.len() > 1 {
                    op_rows(group.permissions.iter(), model.app(), resolver)
                } else {
                    Vec::new()
                };
                GroupRow {
                    name: group.name.clone(),
                    label: group.label.clone(),
                    icon: group.icon.clone(),
                    checked,
                    enabled: !group.policy_fixed,
                    summary: group.policy_fixed.then_some(RowSummary::EnforcedByPolicy),
                    ops,
                }
            })
            .collect();

        ScreenModel {
            app: model.app().clone(),
            mode: ScreenMode::Primary,
            groups,
            ops: Vec::new(),
            additional: (count > 0).then_some(AdditionalEntry { count }),
        }
    }

    /// Additional page: every operation-backed permission on its own row
    pub fn build_additional(
        &self,
        model: &PermissionModel,
        resolver: &OpModeResolver<'_>,
    ) -> ScreenModel {
        let permissions = model.groups().iter().flat_map(|g| g.permissions.iter());

        ScreenModel {
            app: model.app().clone(),
            mode: ScreenMode::Additional,
            groups: Vec::new(),
            ops: op_rows(permissions, model.app(), resolver),
            additional: None,
        }
    }
}

fn op_rows<'p>(
    permissions: impl Iterator<Item = &'p Permission>,
    app: &AppIdentity,
    resolver: &OpModeResolver<'_>,
) -> Vec<OpRow> {
    permissions
        .filter_map(|permission| {
            let (Some(op), Some(control)) = (permission.app_op, resolver.control(permission, app))
            else {
                tracing::warn!(permission = %permission.name, "No app op for permission");
                return None;
            };
            Some(OpRow {
                permission: permission.name.clone(),
                group: permission.group.clone(),
                op,
                control,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{MemoryGrantStore, MemoryOpModeStore, PlatformGroupPolicy, ShowAll};
    use appperm_api::{OpMode, Permission};

    const PLATFORM: &str = "android";

    fn model() -> PermissionModel {
        let app = AppIdentity::new("com.example.social", 10_060);
        let store = MemoryGrantStore::new().with_app(
            app.clone(),
            vec![
                PermissionGroup::new("android.permission-group.CAMERA", "Camera")
                    .declared_by(PLATFORM)
                    .user_set()
                    .granted(true)
                    .permission(Permission::new("perm.CAMERA").with_app_op(OpId(26))),
                PermissionGroup::new("android.permission-group.STORAGE", "Storage")
                    .declared_by(PLATFORM)
                    .permission(Permission::new("perm.READ_STORAGE").with_app_op(OpId(59)))
                    .permission(Permission::new("perm.WRITE_STORAGE").with_app_op(OpId(60)))
                    .permission(Permission::new("perm.MEDIA_LOCATION")),
                PermissionGroup::new("android.permission-group.PHONE", "Phone")
                    .declared_by(PLATFORM)
                    .policy_fixed(),
                PermissionGroup::new("android.permission-group.WIFI", "Wi-Fi")
                    .declared_by(PLATFORM)
                    .permission(Permission::new("perm.CHANGE_WIFI").with_app_op(OpId(71)))
                    .permission(Permission::new("perm.WIFI_SCAN")),
                PermissionGroup::new("android.permission-group.BOOT", "Boot")
                    .declared_by(PLATFORM)
                    .permission(Permission::new("perm.BOOT_COMPLETED").with_app_op(OpId(80))),
            ],
        );
        PermissionModel::load(&store, &app).unwrap()
    }

    #[test]
    fn test_partition_and_count() {
        let model = model();
        let policy = PlatformGroupPolicy::android_defaults();
        let aggregator = AdditionalPermissionsAggregator::new(&policy);
        let partition = aggregator.partition(&model);

        let primary: Vec<_> = partition.primary.iter().map(|g| g.label.as_str()).collect();
        let hidden: Vec<_> = partition.additional.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(primary, ["Camera", "Storage", "Phone"]);
        assert_eq!(hidden, ["Wi-Fi", "Boot"]);
        assert_eq!(partition.additional_op_count(), 2);
        assert_eq!(aggregator.additional_count(&model), 2);
    }

    #[test]
    fn test_primary_page() {
        let model = model();
        let ops = MemoryOpModeStore::new()
            .strict(OpId(60))
            .default_for(OpId(59), OpMode::Ask)
            .default_for(OpId(60), OpMode::Ignored);
        let resolver = OpModeResolver::new(&ops);
        let policy = PlatformGroupPolicy::android_defaults();
        let screen = AdditionalPermissionsAggregator::new(&policy).build_primary(&model, &resolver);

        assert_eq!(screen.mode, ScreenMode::Primary);
        assert_eq!(screen.additional, Some(AdditionalEntry { count: 2 }));

        let camera = screen.group("android.permission-group.CAMERA").unwrap();
        assert!(camera.checked);
        assert!(camera.ops.is_empty());

        // Unchecked with several permissions: op rows, minus the one without an op
        let storage = screen.group("android.permission-group.STORAGE").unwrap();
        assert!(!storage.checked);
        assert_eq!(storage.ops.len(), 2);
        assert_eq!(
            screen.op("perm.READ_STORAGE").unwrap().control,
            OpControl::List {
                selected: OpMode::Ask
            }
        );
        assert_eq!(
            screen.op("perm.WRITE_STORAGE").unwrap().control,
            OpControl::Switch { on: false }
        );

        let phone = screen.group("android.permission-group.PHONE").unwrap();
        assert!(!phone.enabled);
        assert_eq!(phone.summary, Some(RowSummary::EnforcedByPolicy));
    }

    #[test]
    fn test_no_additional_entry_when_nothing_hidden() {
        let model = model();
        let ops = MemoryOpModeStore::new();
        let resolver = OpModeResolver::new(&ops);
        let screen = AdditionalPermissionsAggregator::new(&ShowAll).build_primary(&model, &resolver);

        assert_eq!(screen.groups.len(), 5);
        assert!(screen.additional.is_none());
    }

    #[test]
    fn test_additional_page_lists_every_op() {
        let model = model();
        let ops = MemoryOpModeStore::new();
        let resolver = OpModeResolver::new(&ops);
        let policy = PlatformGroupPolicy::android_defaults();
        let screen = AdditionalPermissionsAggregator::new(&policy)
            .build(&model, &resolver, ScreenMode::Additional);

        let names: Vec<_> = screen.ops.iter().map(|r| r.permission.as_str()).collect();
        assert_eq!(
            names,
            [
                "perm.CAMERA",
                "perm.READ_STORAGE",
                "perm.WRITE_STORAGE",
                "perm.CHANGE_WIFI",
                "perm.BOOT_COMPLETED"
            ]
        );
        assert!(screen.groups.is_empty());
        assert!(screen.additional.is_none());
    }

    #[test]
    fn test_sync_checked_uses_grant_state() {
        let model = model();
        let ops = MemoryOpModeStore::new();
        let resolver = OpModeResolver::new(&ops);
        let mut screen = AdditionalPermissionsAggregator::new(&ShowAll).build_primary(&model, &resolver);

        screen.groups[0].checked = false;
        screen.sync_checked(&model);
        assert!(screen.groups[0].checked);
    }
}
