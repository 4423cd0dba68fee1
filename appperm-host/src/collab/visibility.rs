//! Visibility policy: which groups get a row on the primary screen

use appperm_api::{AppIdentity, PermissionGroup};
use std::collections::BTreeSet;

/// Package that declares the built-in groups
pub const PLATFORM_PACKAGE: &str = "android";

/// Built-in groups that are surfaced on the primary screen
pub const MODERN_PLATFORM_GROUPS: [&str; 9] = [
    "android.permission-group.CALENDAR",
    "android.permission-group.CAMERA",
    "android.permission-group.CONTACTS",
    "android.permission-group.LOCATION",
    "android.permission-group.MICROPHONE",
    "android.permission-group.PHONE",
    "android.permission-group.SENSORS",
    "android.permission-group.SMS",
    "android.permission-group.STORAGE",
];

/// Trait deciding whether a group is shown directly or behind the
/// "additional permissions" entry
///
/// Any `Fn(&PermissionGroup, &AppIdentity) -> bool` is a policy.
pub trait VisibilityPolicy: Send + Sync {
    fn should_show_primarily(&self, group: &PermissionGroup, app: &AppIdentity) -> bool;
}

impl<F> VisibilityPolicy for F
where
    F: Fn(&PermissionGroup, &AppIdentity) -> bool + Send + Sync,
{
    fn should_show_primarily(&self, group: &PermissionGroup, app: &AppIdentity) -> bool {
        self(group, app)
    }
}

/// Shows every group on the primary screen
#[derive(Debug, Default)]
pub struct ShowAll;

impl VisibilityPolicy for ShowAll {
    fn should_show_primarily(&self, _group: &PermissionGroup, _app: &AppIdentity) -> bool {
        true
    }
}

/// Hides platform-declared groups that are not modern runtime groups
///
/// Groups declared by apps are always shown.
#[derive(Debug, Clone)]
pub struct PlatformGroupPolicy {
    platform_package: String,
    modern_groups: BTreeSet<String>,
}

impl PlatformGroupPolicy {
    /// Policy for the given platform package and modern groups
    pub fn new<I, S>(platform_package: impl Into<String>, modern_groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            platform_package: platform_package.into(),
            modern_groups: modern_groups.into_iter().map(Into::into).collect(),
        }
    }

    /// Stock platform groups
    pub fn android_defaults() -> Self {
        Self::new(PLATFORM_PACKAGE, MODERN_PLATFORM_GROUPS)
    }

    /// Whether the group is a modern platform group
    pub fn is_modern(&self, group: &str) -> bool {
        self.modern_groups.contains(group)
    }
}

impl Default for PlatformGroupPolicy {
    fn default() -> Self {
        Self::android_defaults()
    }
}

impl VisibilityPolicy for PlatformGroupPolicy {
    fn should_show_primarily(&self, group: &PermissionGroup, _app: &AppIdentity) -> bool {
        let is_platform = group.declaring_package == self.platform_package;
        !is_platform || self.is_modern(&group.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> AppIdentity {
        AppIdentity::new("com.example", 10_000)
    }

    #[test]
    fn test_platform_policy() {
        let policy = PlatformGroupPolicy::android_defaults();

        let camera =
            PermissionGroup::new("android.permission-group.CAMERA", "Camera").declared_by("android");
        let wifi = PermissionGroup::new("android.permission-group.WIFI", "Wi-Fi").declared_by("android");
        let custom = PermissionGroup::new("com.vendor.group.SYNC", "Sync").declared_by("com.vendor");

        assert!(policy.should_show_primarily(&camera, &app()));
        assert!(!policy.should_show_primarily(&wifi, &app()));
        assert!(policy.should_show_primarily(&custom, &app()));
    }

    #[test]
    fn test_closure_policy() {
        let policy = |group: &PermissionGroup, _: &AppIdentity| !group.name.ends_with("HIDDEN");
        let hidden = PermissionGroup::new("group.HIDDEN", "Hidden");

        assert!(!policy.should_show_primarily(&hidden, &app()));
        assert!(ShowAll.should_show_primarily(&hidden, &app()));
    }
}
