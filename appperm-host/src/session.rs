//! Screen sessions
//!
//! A [`ScreenSession`] is one visit of the permission screen for one app.
//! It owns the loaded [`PermissionModel`], the toggle log and the
//! session-scoped revoke confirmation state, and drives every user action
//! through the collaborators in its [`HostConfig`].
//!
//! Every write is followed by a full reload from the grant store; the
//! session never patches its model in place.
//!
//! # Example
//!
//! ```rust
//! use appperm_api::{AppIdentity, PermissionGroup};
//! use appperm_host::collab::{MemoryGrantStore, MemoryOpModeStore};
//! use appperm_host::{HostPresets, Outcome, ScreenSession, SessionOptions};
//!
//! let app = AppIdentity::new("com.example.camera", 10_042);
//! let grants = MemoryGrantStore::new().with_app(
//!     app.clone(),
//!     vec![PermissionGroup::new("android.permission-group.CAMERA", "Camera")],
//! );
//! let config = HostPresets::testing(grants, MemoryOpModeStore::new());
//!
//! let mut session = ScreenSession::open(config, app, SessionOptions::primary()).unwrap();
//! let outcome = session
//!     .apply_toggle("android.permission-group.CAMERA", true)
//!     .unwrap();
//! assert_eq!(outcome, Outcome::Applied);
//! session.exit().unwrap();
//! ```

use appperm_api::{AppIdentity, OpMode, Permission};

use crate::aggregator::{AdditionalPermissionsAggregator, ScreenModel};
use crate::audit::ToggleAuditLog;
use crate::error::ScreenError;
use crate::model::PermissionModel;
use crate::presets::{HostConfig, SessionOptions};
use crate::prompt::ConfirmChoice;
use crate::reconciler::{BlockReason, Decision, Outcome, PendingRevoke, ToggleReconciler};
use crate::resolver::OpModeResolver;

/// Load an app's screen without keeping a session
pub fn load_screen(
    config: &HostConfig,
    app: &AppIdentity,
    options: SessionOptions,
) -> Result<ScreenModel, ScreenError> {
    let model = PermissionModel::load(config.grants.as_ref(), app)?;
    Ok(render(config, &model, options))
}

fn render(config: &HostConfig, model: &PermissionModel, options: SessionOptions) -> ScreenModel {
    let resolver = OpModeResolver::new(config.ops.as_ref());
    AdditionalPermissionsAggregator::new(config.visibility.as_ref()).build(
        model,
        &resolver,
        options.mode,
    )
}

/// One visit of the permission screen for one app
#[derive(Debug)]
pub struct ScreenSession {
    config: HostConfig,
    options: SessionOptions,
    model: PermissionModel,
    reconciler: ToggleReconciler,
    toggles: ToggleAuditLog,
}

impl ScreenSession {
    /// Load the app and start a session
    ///
    /// [`ScreenError::AppNotFound`] is terminal: no partial screen exists.
    pub fn open(
        config: HostConfig,
        app: AppIdentity,
        options: SessionOptions,
    ) -> Result<Self, ScreenError> {
        let model = PermissionModel::load(config.grants.as_ref(), &app)?;
        tracing::info!(package = %app.package_name, mode = ?options.mode, "Opened permission screen");

        Ok(Self {
            config,
            options,
            model,
            reconciler: ToggleReconciler::new(),
            toggles: ToggleAuditLog::new(),
        })
    }

    pub fn app(&self) -> &AppIdentity {
        self.model.app()
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    /// Current snapshot
    pub fn model(&self) -> &PermissionModel {
        &self.model
    }

    /// Toggles recorded since the last flush
    pub fn toggles(&self) -> &ToggleAuditLog {
        &self.toggles
    }

    /// Whether a non-default revoke was confirmed in this session
    pub fn has_confirmed_revoke(&self) -> bool {
        self.reconciler.has_confirmed_revoke()
    }

    /// Render the session's page from the current snapshot
    pub fn screen(&self) -> ScreenModel {
        render(&self.config, &self.model, self.options)
    }

    /// Re-read the authoritative state
    pub fn reload(&mut self) -> Result<(), ScreenError> {
        self.model = PermissionModel::load(self.config.grants.as_ref(), self.model.app())?;
        tracing::debug!(package = %self.app().package_name, "Reloaded permission screen");
        Ok(())
    }

    /// Reload on resume and re-sync group switches with the grant state
    pub fn refresh(&mut self) -> Result<ScreenModel, ScreenError> {
        self.reload()?;
        let mut screen = self.screen();
        screen.sync_checked(&self.model);
        Ok(screen)
    }

    /// Handle a user toggle of a group's switch
    pub fn apply_toggle(&mut self, group: &str, new_value: bool) -> Result<Outcome, ScreenError> {
        if self.config.overlay.is_touch_obscured() {
            self.config.overlay.present_overlay_warning();
            tracing::warn!(package = %self.app().package_name, group, "Toggle blocked: touch obscured");
            return Ok(Outcome::Blocked(BlockReason::TouchObscured));
        }

        let entry = self
            .model
            .group(group)
            .ok_or_else(|| ScreenError::UnknownGroup(group.to_string()))?;

        if let Some(reason) = ToggleReconciler::precheck(entry) {
            tracing::warn!(package = %self.app().package_name, group, ?reason, "Toggle blocked");
            return Ok(Outcome::Blocked(reason));
        }

        self.toggles.record(group);

        let special = self.config.special.is_special_flow(entry, self.model.app());
        match self.reconciler.decide(entry, new_value, special) {
            Decision::Delegate => {
                self.config.special.launch_special_flow(entry, self.model.app());
                Ok(Outcome::DelegatedToSpecialFlow)
            }
            Decision::Grant => {
                self.write_grant(group, true)?;
                Ok(Outcome::Applied)
            }
            Decision::Revoke => {
                self.write_grant(group, false)?;
                Ok(Outcome::Applied)
            }
            Decision::Confirm(pending) => {
                tracing::debug!(group, message = ?pending.message(), "Revoke needs confirmation");
                Ok(Outcome::ConfirmRequired(pending))
            }
        }
    }

    /// The user confirmed a pending revoke
    pub fn confirm(&mut self, pending: PendingRevoke) -> Result<Outcome, ScreenError> {
        self.write_grant(pending.group(), false)?;
        self.reconciler.note_confirmed(&pending);
        tracing::info!(
            package = %self.app().package_name,
            group = pending.group(),
            confirmed_revoke = self.reconciler.has_confirmed_revoke(),
            "Revoke confirmed"
        );
        Ok(Outcome::Applied)
    }

    /// The user declined a pending revoke; nothing changes
    pub fn cancel(&mut self, pending: PendingRevoke) -> Outcome {
        tracing::debug!(group = pending.group(), "Revoke cancelled");
        Outcome::Declined
    }

    /// Toggle and resolve any confirmation through the configured handler
    ///
    /// A handler error (e.g., no terminal) counts as a cancel.
    pub fn apply_toggle_interactive(
        &mut self,
        group: &str,
        new_value: bool,
    ) -> Result<Outcome, ScreenError> {
        let pending = match self.apply_toggle(group, new_value)? {
            Outcome::ConfirmRequired(pending) => pending,
            other => return Ok(other),
        };

        let choice = self
            .config
            .confirmations
            .confirm(self.model.app(), pending.label(), pending.message())
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Confirmation unavailable, keeping permission");
                ConfirmChoice::Cancel
            });

        match choice {
            ConfirmChoice::Deny => self.confirm(pending),
            ConfirmChoice::Cancel => Ok(self.cancel(pending)),
        }
    }

    /// Write a list value for a permission's operation, then reload
    pub fn set_op_mode(&mut self, permission: &str, mode: OpMode) -> Result<(), ScreenError> {
        let permission = self.permission(permission)?;
        OpModeResolver::new(self.config.ops.as_ref()).set_mode(&permission, self.model.app(), mode)?;
        self.reload()
    }

    /// Write a switch value for a strict operation, then reload
    pub fn set_op_switch(&mut self, permission: &str, on: bool) -> Result<(), ScreenError> {
        let permission = self.permission(permission)?;
        OpModeResolver::new(self.config.ops.as_ref()).set_switch(&permission, self.model.app(), on)?;
        self.reload()
    }

    /// Effective mode of a permission's operation
    pub fn effective_mode(&self, permission: &str) -> Result<OpMode, ScreenError> {
        let permission = self.permission(permission)?;
        OpModeResolver::new(self.config.ops.as_ref()).effective_mode(&permission, self.model.app())
    }

    /// Flush recorded toggles to the audit sink (screen paused)
    pub fn pause(&mut self) -> Result<usize, ScreenError> {
        Ok(self.toggles.flush(&self.model, self.config.audit.as_ref())?)
    }

    /// Leave the screen, flushing recorded toggles
    pub fn exit(mut self) -> Result<(), ScreenError> {
        self.pause()?;
        tracing::info!(package = %self.app().package_name, "Closed permission screen");
        Ok(())
    }

    fn permission(&self, name: &str) -> Result<Permission, ScreenError> {
        self.model
            .find_permission(name)
            .cloned()
            .ok_or_else(|| ScreenError::UnknownPermission(name.to_string()))
    }

    fn write_grant(&mut self, group: &str, granted: bool) -> Result<(), ScreenError> {
        let app = self.model.app();
        let result = if granted {
            self.config.grants.grant(app, group)
        } else {
            self.config.grants.revoke(app, group)
        };

        if let Err(e) = result {
            tracing::warn!(package = %app.package_name, group, granted, error = %e, "Grant write failed");
            return Err(ScreenError::write_failed(group, e));
        }

        tracing::info!(package = %app.package_name, group, granted, "Grant state changed");
        self.reload()
    }
}
