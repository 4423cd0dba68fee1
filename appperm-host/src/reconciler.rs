//! Toggle reconciliation
//!
//! Decides what a user toggle on a group's switch turns into. The order of
//! the checks matters and is driven by [`crate::session::ScreenSession`]:
//!
//! ```text
//! toggle(group, value)
//!   │
//!   ├─ touch obscured? ───────────────► Blocked(TouchObscured)   (nothing recorded)
//!   ├─ policy fixed? ─────────────────► Blocked(PolicyFixed)     (nothing recorded)
//!   ├─ record parity flip in the toggle log
//!   ├─ special consent flow? ─────────► DelegatedToSpecialFlow
//!   ├─ value == on ───────────────────► grant, reload, Applied
//!   └─ value == off
//!        ├─ granted by default ───────► ConfirmRequired(SystemWarning)
//!        ├─ legacy app and no revoke
//!        │  confirmed this session ───► ConfirmRequired(LegacyAppDenyWarning)
//!        └─ otherwise ────────────────► revoke, reload, Applied
//! ```
//!
//! The only state the reconciler keeps is whether the user already confirmed
//! a non-default revoke in this session. It lives on the session, so two
//! screens never share it.

use appperm_api::PermissionGroup;
use serde::Serialize;

/// Result of a toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The change was written and the model reloaded
    Applied,
    /// A blocking choice is needed before anything is written
    ConfirmRequired(PendingRevoke),
    /// The toggle was rejected; nothing was written
    Blocked(BlockReason),
    /// A dedicated consent flow took over; the switch reverts until reload
    DelegatedToSpecialFlow,
    /// The user declined a confirmation; nothing was written
    Declined,
}

impl Outcome {
    /// Whether the grant state was changed by this outcome
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Why a toggle was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    /// An overlay may be intercepting touches
    TouchObscured,
    /// Device policy forbids changing the group
    PolicyFixed,
}

/// Message shown in a revoke confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmMessage {
    /// Revoking a permission the system granted by default
    SystemWarning,
    /// Revoking from an app built before runtime permissions
    LegacyAppDenyWarning,
}

impl ConfirmMessage {
    /// Default English text
    pub fn text(self) -> &'static str {
        match self {
            Self::SystemWarning => {
                "If you deny this permission, basic features of your device may no longer function as intended."
            }
            Self::LegacyAppDenyWarning => {
                "This app was designed for an older version of Android. Denying permission may cause it to no longer function as intended."
            }
        }
    }
}

/// A revoke waiting for the user's confirmation
///
/// Hand it back to [`crate::session::ScreenSession::confirm`] or
/// [`crate::session::ScreenSession::cancel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRevoke {
    group: String,
    label: String,
    message: ConfirmMessage,
    granted_by_default: bool,
}

impl PendingRevoke {
    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn message(&self) -> ConfirmMessage {
        self.message
    }

    /// Whether the group was granted by default when the toggle happened
    pub fn granted_by_default(&self) -> bool {
        self.granted_by_default
    }
}

/// What the session should do for a recorded toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Hand off to the special consent flow
    Delegate,
    /// Grant the group's runtime permissions
    Grant,
    /// Revoke the group's runtime permissions
    Revoke,
    /// Ask first
    Confirm(PendingRevoke),
}

/// Session-scoped toggle state machine
#[derive(Debug, Default)]
pub struct ToggleReconciler {
    has_confirmed_revoke: bool,
}

impl ToggleReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a non-default revoke was confirmed in this session
    pub fn has_confirmed_revoke(&self) -> bool {
        self.has_confirmed_revoke
    }

    /// Policy check on a known group, before anything is recorded
    ///
    /// The overlay check comes first and needs no group; the session does it.
    pub fn precheck(group: &PermissionGroup) -> Option<BlockReason> {
        group.policy_fixed.then_some(BlockReason::PolicyFixed)
    }

    /// Decide a recorded toggle
    pub fn decide(&self, group: &PermissionGroup, new_value: bool, special_flow: bool) -> Decision {
        if special_flow {
            return Decision::Delegate;
        }
        if new_value {
            return Decision::Grant;
        }
        match self.revoke_confirmation(group) {
            Some(message) => Decision::Confirm(PendingRevoke {
                group: group.name.clone(),
                label: group.label.clone(),
                message,
                granted_by_default: group.granted_by_default,
            }),
            None => Decision::Revoke,
        }
    }

    /// Confirmation a revoke of this group needs, if any
    pub fn revoke_confirmation(&self, group: &PermissionGroup) -> Option<ConfirmMessage> {
        if group.granted_by_default {
            Some(ConfirmMessage::SystemWarning)
        } else if !group.has_runtime_permission && !self.has_confirmed_revoke {
            Some(ConfirmMessage::LegacyAppDenyWarning)
        } else {
            None
        }
    }

    /// Record that the user confirmed a revoke
    ///
    /// Default-granted groups never set the flag; they ask every time.
    pub fn note_confirmed(&mut self, pending: &PendingRevoke) {
        if !pending.granted_by_default {
            self.has_confirmed_revoke = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy() -> PermissionGroup {
        PermissionGroup::new("group.CONTACTS", "Contacts")
            .legacy()
            .granted(true)
    }

    fn modern() -> PermissionGroup {
        PermissionGroup::new("group.CALENDAR", "Calendar").granted(true)
    }

    fn system() -> PermissionGroup {
        PermissionGroup::new("group.PHONE", "Phone")
            .granted_by_default()
            .granted(true)
    }

    #[test]
    fn test_precheck_blocks_policy_fixed_only() {
        assert_eq!(
            ToggleReconciler::precheck(&modern().policy_fixed()),
            Some(BlockReason::PolicyFixed)
        );
        assert_eq!(ToggleReconciler::precheck(&modern()), None);
        assert_eq!(ToggleReconciler::precheck(&system()), None);
    }

    #[test]
    fn test_special_flow_wins_over_grant_and_revoke() {
        let reconciler = ToggleReconciler::new();
        assert_eq!(reconciler.decide(&system(), true, true), Decision::Delegate);
        assert_eq!(reconciler.decide(&system(), false, true), Decision::Delegate);
    }

    #[test]
    fn test_grant_is_unconditional() {
        let reconciler = ToggleReconciler::new();
        for group in [legacy(), modern(), system()] {
            assert_eq!(reconciler.decide(&group, true, false), Decision::Grant);
        }
    }

    #[test]
    fn test_modern_revoke_applies_directly() {
        let reconciler = ToggleReconciler::new();
        assert_eq!(reconciler.decide(&modern(), false, false), Decision::Revoke);
    }

    #[test]
    fn test_legacy_revoke_confirms_once() {
        let mut reconciler = ToggleReconciler::new();

        let pending = match reconciler.decide(&legacy(), false, false) {
            Decision::Confirm(pending) => pending,
            other => panic!("Expected Confirm, got {:?}", other),
        };
        assert_eq!(pending.message(), ConfirmMessage::LegacyAppDenyWarning);

        reconciler.note_confirmed(&pending);
        assert!(reconciler.has_confirmed_revoke());
        assert_eq!(reconciler.decide(&legacy(), false, false), Decision::Revoke);
    }

    #[test]
    fn test_default_granted_always_confirms() {
        let mut reconciler = ToggleReconciler::new();

        for _ in 0..3 {
            let pending = match reconciler.decide(&system(), false, false) {
                Decision::Confirm(pending) => pending,
                other => panic!("Expected Confirm, got {:?}", other),
            };
            assert_eq!(pending.message(), ConfirmMessage::SystemWarning);
            reconciler.note_confirmed(&pending);
            assert!(!reconciler.has_confirmed_revoke());
        }

        // Even after a non-default confirmation
        reconciler.has_confirmed_revoke = true;
        assert!(matches!(
            reconciler.decide(&system(), false, false),
            Decision::Confirm(_)
        ));
    }

    #[test]
    fn test_confirm_message_text() {
        assert!(ConfirmMessage::SystemWarning.text().contains("basic features"));
        assert!(ConfirmMessage::LegacyAppDenyWarning.text().contains("older version"));
    }
}
