//! appperm-api: Shared types for the appperm screen core
//!
//! This crate defines the permission model exchanged between the screen core
//! and the system collaborators (grant store, op-mode store, audit sinks).
//! Everything here is plain data; no collaborator is reachable from it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version of the serialized snapshot format
pub const MODEL_VERSION: u32 = 1;

/// Identity of an installed application
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AppIdentity {
    /// Package name (e.g., "com.example.camera")
    pub package_name: String,

    /// Kernel-level user id the package runs as
    pub uid: u32,
}

impl AppIdentity {
    /// Create a new app identity
    pub fn new(package_name: impl Into<String>, uid: u32) -> Self {
        Self {
            package_name: package_name.into(),
            uid,
        }
    }
}

impl fmt::Display for AppIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.package_name, self.uid)
    }
}

/// Identifier of a low-level operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpId(pub u32);

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

/// Mode of a low-level operation for one app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpMode {
    /// Operation is allowed
    Allowed,
    /// Operation is silently refused
    Ignored,
    /// No explicit decision; the system default applies
    Default,
    /// Ask the user every time
    Ask,
}

impl OpMode {
    /// All modes in list-control order
    pub const ALL: [OpMode; 4] = [OpMode::Allowed, OpMode::Ask, OpMode::Ignored, OpMode::Default];

    /// Stable numeric code used by list controls and fixtures
    pub fn code(self) -> u8 {
        match self {
            Self::Allowed => 0,
            Self::Ignored => 1,
            Self::Default => 3,
            Self::Ask => 4,
        }
    }

    /// Parse a numeric code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Allowed),
            1 => Some(Self::Ignored),
            3 => Some(Self::Default),
            4 => Some(Self::Ask),
            _ => None,
        }
    }

    /// Whether a strict (two-state) operation reads as switched on
    ///
    /// Only [`OpMode::Allowed`] does. Switching on writes [`OpMode::Ask`],
    /// which reads back as off until the platform resolves it.
    pub fn is_switched_on(self) -> bool {
        matches!(self, Self::Allowed)
    }
}

impl fmt::Display for OpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Allowed => "allowed",
            Self::Ignored => "ignored",
            Self::Default => "default",
            Self::Ask => "ask",
        };
        f.write_str(name)
    }
}

/// Error returned when an op-mode value cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOpModeError(pub String);

impl fmt::Display for ParseOpModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid op mode: {:?}", self.0)
    }
}

impl std::error::Error for ParseOpModeError {}

impl FromStr for OpMode {
    type Err = ParseOpModeError;

    /// Accepts either the numeric code ("4") or the name ("ask")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<u8>() {
            return Self::from_code(code).ok_or_else(|| ParseOpModeError(s.to_string()));
        }
        match s.to_ascii_lowercase().as_str() {
            "allowed" | "allow" => Ok(Self::Allowed),
            "ignored" | "ignore" | "deny" => Ok(Self::Ignored),
            "default" => Ok(Self::Default),
            "ask" => Ok(Self::Ask),
            _ => Err(ParseOpModeError(s.to_string())),
        }
    }
}

/// Reference to an icon resource; loading it is the host's business
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconRef {
    /// Package holding the resource
    pub package: String,

    /// Resource id inside that package
    pub resource_id: u32,
}

impl IconRef {
    pub fn new(package: impl Into<String>, resource_id: u32) -> Self {
        Self {
            package: package.into(),
            resource_id,
        }
    }
}

/// A single fine-grained permission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Permission name (e.g., "android.permission.CAMERA")
    pub name: String,

    /// Name of the owning group
    #[serde(default)]
    pub group: String,

    /// Backing low-level operation, if any
    #[serde(default)]
    pub app_op: Option<OpId>,
}

impl Permission {
    /// Create a permission without a backing operation
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: String::new(),
            app_op: None,
        }
    }

    /// Attach a backing operation
    pub fn with_app_op(mut self, op: OpId) -> Self {
        self.app_op = Some(op);
        self
    }

    /// Whether the permission is backed by a low-level operation
    pub fn has_app_op(&self) -> bool {
        self.app_op.is_some()
    }
}

fn default_true() -> bool {
    true
}

/// A permission group: the unit of toggle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGroup {
    /// Group name (e.g., "android.permission-group.CAMERA")
    pub name: String,

    /// Human-readable label
    pub label: String,

    /// Icon reference
    #[serde(default)]
    pub icon: IconRef,

    /// Package that declared the group
    #[serde(default)]
    pub declaring_package: String,

    /// Member permissions in declaration order
    #[serde(default)]
    pub permissions: Vec<Permission>,

    /// Device policy forbids changes
    #[serde(default)]
    pub policy_fixed: bool,

    /// The user has explicitly set this group before
    #[serde(default)]
    pub user_set: bool,

    /// The system grants this group without asking
    #[serde(default)]
    pub granted_by_default: bool,

    /// Current effective grant state
    #[serde(default)]
    pub runtime_granted: bool,

    /// The app uses runtime grants for this group (false for legacy apps)
    #[serde(default = "default_true")]
    pub has_runtime_permission: bool,
}

impl PermissionGroup {
    /// Create an empty, ungranted group
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            icon: IconRef::default(),
            declaring_package: String::new(),
            permissions: Vec::new(),
            policy_fixed: false,
            user_set: false,
            granted_by_default: false,
            runtime_granted: false,
            has_runtime_permission: true,
        }
    }

    /// Add a member permission; ownership is set to this group
    pub fn permission(mut self, mut permission: Permission) -> Self {
        permission.group = self.name.clone();
        self.permissions.push(permission);
        self
    }

    /// Point every member permission at this group (used after deserializing)
    pub fn claim_permissions(&mut self) {
        for permission in &mut self.permissions {
            permission.group.clone_from(&self.name);
        }
    }

    /// Set the icon
    pub fn icon(mut self, icon: IconRef) -> Self {
        self.icon = icon;
        self
    }

    /// Set the declaring package
    pub fn declared_by(mut self, package: impl Into<String>) -> Self {
        self.declaring_package = package.into();
        self
    }

    /// Mark as fixed by device policy
    pub fn policy_fixed(mut self) -> Self {
        self.policy_fixed = true;
        self
    }

    /// Mark as explicitly set by the user
    pub fn user_set(mut self) -> Self {
        self.user_set = true;
        self
    }

    /// Mark as granted by default
    pub fn granted_by_default(mut self) -> Self {
        self.granted_by_default = true;
        self
    }

    /// Set the runtime grant state
    pub fn granted(mut self, granted: bool) -> Self {
        self.runtime_granted = granted;
        self
    }

    /// Mark the app as a legacy app for this group
    pub fn legacy(mut self) -> Self {
        self.has_runtime_permission = false;
        self
    }

    /// State the group's switch should show
    pub fn displayed_checked(&self) -> bool {
        if self.user_set {
            self.runtime_granted
        } else {
            self.granted_by_default
        }
    }

    /// Find a member permission by name
    pub fn find_permission(&self, name: &str) -> Option<&Permission> {
        self.permissions.iter().find(|p| p.name == name)
    }

    /// Member permissions backed by an operation
    pub fn op_backed_permissions(&self) -> impl Iterator<Item = &Permission> {
        self.permissions.iter().filter(|p| p.has_app_op())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_mode_codes() {
        for mode in OpMode::ALL {
            assert_eq!(OpMode::from_code(mode.code()), Some(mode));
        }
        assert_eq!(OpMode::from_code(2), None);
    }

    #[test]
    fn test_op_mode_from_str() {
        assert_eq!("4".parse::<OpMode>().unwrap(), OpMode::Ask);
        assert_eq!("ignored".parse::<OpMode>().unwrap(), OpMode::Ignored);
        assert_eq!(" Allowed ".parse::<OpMode>().unwrap(), OpMode::Allowed);
        assert!("2".parse::<OpMode>().is_err());
        assert!("sometimes".parse::<OpMode>().is_err());
    }

    #[test]
    fn test_only_allowed_is_switched_on() {
        assert!(OpMode::Allowed.is_switched_on());
        assert!(!OpMode::Ask.is_switched_on());
        assert!(!OpMode::Ignored.is_switched_on());
        assert!(!OpMode::Default.is_switched_on());
    }

    #[test]
    fn test_group_builder_sets_ownership() {
        let group = PermissionGroup::new("group.CAMERA", "Camera")
            .permission(Permission::new("perm.CAMERA").with_app_op(OpId(26)))
            .permission(Permission::new("perm.FLASH"));

        assert_eq!(group.permissions.len(), 2);
        assert!(group.permissions.iter().all(|p| p.group == "group.CAMERA"));
        assert_eq!(group.op_backed_permissions().count(), 1);
        assert!(group.find_permission("perm.FLASH").is_some());
    }

    #[test]
    fn test_displayed_checked() {
        let untouched = PermissionGroup::new("g", "G").granted_by_default();
        assert!(untouched.displayed_checked());

        let touched = PermissionGroup::new("g", "G").granted_by_default().user_set();
        assert!(!touched.displayed_checked());

        let granted = PermissionGroup::new("g", "G").user_set().granted(true);
        assert!(granted.displayed_checked());
    }

    #[test]
    fn test_group_deserialize_defaults() {
        let json = r#"{"name":"g","label":"G","permissions":[{"name":"p","app_op":7}]}"#;
        let group: PermissionGroup = serde_json::from_str(json).unwrap();
        assert!(group.has_runtime_permission);
        assert!(!group.policy_fixed);
        assert_eq!(group.permissions[0].app_op, Some(OpId(7)));
    }
}
