//! Operation-mode resolution
//!
//! Computes the mode a permission's backing operation is in for an app and
//! which control a row uses to edit it. Strict operations read and write as
//! a switch; everything else is a list of modes.
//!
//! Writes go straight to the [`OpModeStore`]; nothing is cached here. The
//! caller reloads after every write.

use appperm_api::{AppIdentity, OpId, OpMode, Permission};
use serde::Serialize;

use crate::collab::OpModeStore;
use crate::error::ScreenError;

/// Control used to edit an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum OpControl {
    /// On/off switch for strict operations
    Switch { on: bool },
    /// Multi-valued list for everything else
    List { selected: OpMode },
}

/// Resolves and edits operation modes through an [`OpModeStore`]
pub struct OpModeResolver<'a> {
    store: &'a dyn OpModeStore,
}

impl<'a> OpModeResolver<'a> {
    pub fn new(store: &'a dyn OpModeStore) -> Self {
        Self { store }
    }

    /// Effective mode of the permission's operation
    ///
    /// Strict operations collapse to [`OpMode::Allowed`] or
    /// [`OpMode::Ignored`].
    pub fn effective_mode(
        &self,
        permission: &Permission,
        app: &AppIdentity,
    ) -> Result<OpMode, ScreenError> {
        let op = op_of(permission)?;
        let mode = self.raw_mode(op, app);

        if self.store.is_strict(op) {
            Ok(if mode.is_switched_on() {
                OpMode::Allowed
            } else {
                OpMode::Ignored
            })
        } else {
            Ok(mode)
        }
    }

    /// Control a row should render, or `None` for permissions without an
    /// operation
    pub fn control(&self, permission: &Permission, app: &AppIdentity) -> Option<OpControl> {
        let op = permission.app_op?;
        let mode = self.raw_mode(op, app);

        Some(if self.store.is_strict(op) {
            OpControl::Switch {
                on: mode.is_switched_on(),
            }
        } else {
            OpControl::List { selected: mode }
        })
    }

    /// Write a list value
    pub fn set_mode(
        &self,
        permission: &Permission,
        app: &AppIdentity,
        mode: OpMode,
    ) -> Result<(), ScreenError> {
        let op = op_of(permission)?;
        if self.store.is_strict(op) {
            return Err(ScreenError::ControlMismatch {
                permission: permission.name.clone(),
                expected: "switch",
            });
        }
        self.write(permission, op, app, mode)
    }

    /// Write a switch value; on means ask-each-time, off means ignored
    pub fn set_switch(
        &self,
        permission: &Permission,
        app: &AppIdentity,
        on: bool,
    ) -> Result<(), ScreenError> {
        let op = op_of(permission)?;
        if !self.store.is_strict(op) {
            return Err(ScreenError::ControlMismatch {
                permission: permission.name.clone(),
                expected: "list",
            });
        }
        let mode = if on { OpMode::Ask } else { OpMode::Ignored };
        self.write(permission, op, app, mode)
    }

    fn raw_mode(&self, op: OpId, app: &AppIdentity) -> OpMode {
        self.store
            .get_mode(op, app)
            .unwrap_or_else(|| self.store.default_mode(op))
    }

    fn write(
        &self,
        permission: &Permission,
        op: OpId,
        app: &AppIdentity,
        mode: OpMode,
    ) -> Result<(), ScreenError> {
        self.store.set_mode(op, app, mode).map_err(|e| {
            tracing::warn!(permission = %permission.name, op = %op, error = %e, "Failed to set op mode");
            ScreenError::write_failed(&permission.name, e)
        })?;
        tracing::info!(package = %app.package_name, permission = %permission.name, mode = %mode, "Op mode set");
        Ok(())
    }
}

fn op_of(permission: &Permission) -> Result<OpId, ScreenError> {
    permission
        .app_op
        .ok_or_else(|| ScreenError::NoOperation(permission.name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{MemoryOpModeStore, StoreError};

    const CAMERA_OP: OpId = OpId(26);
    const SMS_OP: OpId = OpId(14);

    fn app() -> AppIdentity {
        AppIdentity::new("com.example.chat", 10_030)
    }

    fn store() -> MemoryOpModeStore {
        MemoryOpModeStore::new()
            .strict(SMS_OP)
            .default_for(CAMERA_OP, OpMode::Ask)
            .default_for(SMS_OP, OpMode::Ignored)
    }

    #[test]
    fn test_default_applies_without_override() {
        let store = store();
        let resolver = OpModeResolver::new(&store);
        let camera = Permission::new("perm.CAMERA").with_app_op(CAMERA_OP);

        assert_eq!(resolver.effective_mode(&camera, &app()).unwrap(), OpMode::Ask);
    }

    #[test]
    fn test_override_wins() {
        let store = store().with_override(CAMERA_OP, app(), OpMode::Ignored);
        let resolver = OpModeResolver::new(&store);
        let camera = Permission::new("perm.CAMERA").with_app_op(CAMERA_OP);

        assert_eq!(
            resolver.effective_mode(&camera, &app()).unwrap(),
            OpMode::Ignored
        );
        assert_eq!(
            resolver.control(&camera, &app()),
            Some(OpControl::List {
                selected: OpMode::Ignored
            })
        );
    }

    #[test]
    fn test_strict_is_boolean() {
        let store = store();
        let resolver = OpModeResolver::new(&store);
        let sms = Permission::new("perm.SEND_SMS").with_app_op(SMS_OP);

        assert_eq!(resolver.effective_mode(&sms, &app()).unwrap(), OpMode::Ignored);
        assert_eq!(
            resolver.control(&sms, &app()),
            Some(OpControl::Switch { on: false })
        );

        resolver.set_switch(&sms, &app(), true).unwrap();
        assert_eq!(store.get_mode(SMS_OP, &app()), Some(OpMode::Ask));
        assert_eq!(resolver.effective_mode(&sms, &app()).unwrap(), OpMode::Ignored);
        assert_eq!(
            resolver.control(&sms, &app()),
            Some(OpControl::Switch { on: false })
        );

        resolver.set_switch(&sms, &app(), false).unwrap();
        assert_eq!(store.get_mode(SMS_OP, &app()), Some(OpMode::Ignored));
    }

    #[test]
    fn test_strict_on_only_when_allowed() {
        let sms = Permission::new("perm.SEND_SMS").with_app_op(SMS_OP);

        let asked = store().with_override(SMS_OP, app(), OpMode::Ask);
        let resolver = OpModeResolver::new(&asked);
        assert_eq!(resolver.effective_mode(&sms, &app()).unwrap(), OpMode::Ignored);
        assert_eq!(
            resolver.control(&sms, &app()),
            Some(OpControl::Switch { on: false })
        );

        let allowed = store().with_override(SMS_OP, app(), OpMode::Allowed);
        let resolver = OpModeResolver::new(&allowed);
        assert_eq!(resolver.effective_mode(&sms, &app()).unwrap(), OpMode::Allowed);
        assert_eq!(
            resolver.control(&sms, &app()),
            Some(OpControl::Switch { on: true })
        );
    }

    #[test]
    fn test_control_mismatch_does_not_write() {
        let store = store();
        let resolver = OpModeResolver::new(&store);
        let sms = Permission::new("perm.SEND_SMS").with_app_op(SMS_OP);
        let camera = Permission::new("perm.CAMERA").with_app_op(CAMERA_OP);

        assert!(matches!(
            resolver.set_mode(&sms, &app(), OpMode::Allowed),
            Err(ScreenError::ControlMismatch { expected: "switch", .. })
        ));
        assert!(matches!(
            resolver.set_switch(&camera, &app(), true),
            Err(ScreenError::ControlMismatch { expected: "list", .. })
        ));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_permission_without_op() {
        let store = store();
        let resolver = OpModeResolver::new(&store);
        let plain = Permission::new("perm.INTERNET");

        assert!(resolver.control(&plain, &app()).is_none());
        assert!(matches!(
            resolver.effective_mode(&plain, &app()),
            Err(ScreenError::NoOperation(_))
        ));
    }

    struct FailingOps;

    impl OpModeStore for FailingOps {
        fn get_mode(&self, _op: OpId, _app: &AppIdentity) -> Option<OpMode> {
            None
        }

        fn set_mode(&self, _op: OpId, _app: &AppIdentity, _mode: OpMode) -> Result<(), StoreError> {
            Err(StoreError::ReadOnly)
        }

        fn is_strict(&self, _op: OpId) -> bool {
            false
        }

        fn default_mode(&self, _op: OpId) -> OpMode {
            OpMode::Default
        }
    }

    #[test]
    fn test_failed_write_surfaces() {
        let resolver = OpModeResolver::new(&FailingOps);
        let camera = Permission::new("perm.CAMERA").with_app_op(CAMERA_OP);

        let err = resolver.set_mode(&camera, &app(), OpMode::Allowed).unwrap_err();
        assert!(matches!(err, ScreenError::StoreWriteFailed { .. }));
        assert!(!err.is_terminal());
    }
}
