//! Collaborator bundles for common hosts
//!
//! [`HostConfig`] carries every collaborator a screen session needs. Build
//! one with [`HostConfigBuilder`] or start from a [`HostPresets`] entry.

use std::sync::Arc;

use crate::aggregator::ScreenMode;
use crate::audit::{AuditSink, JournalAuditSink, NullAuditSink, RecordingAuditSink};
use crate::collab::{
    MemoryOpModeStore, NeverObscured, NoSpecialFlows, OpModeStore, OverlayGuard,
    PermissionGrantStore, PlatformGroupPolicy, ReadOnlyGrantStore, SpecialConsentDispatcher,
    VisibilityPolicy,
};
use crate::prompt::{AutoConfirmationHandler, ConfirmationHandler, TerminalConfirmationHandler};

/// Complete collaborator bundle
#[derive(Clone)]
pub struct HostConfig {
    /// Runtime grant service
    pub grants: Arc<dyn PermissionGrantStore>,
    /// Operation-mode service
    pub ops: Arc<dyn OpModeStore>,
    /// Primary/additional visibility
    pub visibility: Arc<dyn VisibilityPolicy>,
    /// Touch-obscured signal
    pub overlay: Arc<dyn OverlayGuard>,
    /// Dedicated consent flows
    pub special: Arc<dyn SpecialConsentDispatcher>,
    /// Toggle reporting
    pub audit: Arc<dyn AuditSink>,
    /// Confirmation dialogs for interactive toggles
    pub confirmations: Arc<dyn ConfirmationHandler>,
}

impl std::fmt::Debug for HostConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostConfig")
            .field("interactive", &self.confirmations.is_interactive())
            .finish_non_exhaustive()
    }
}

/// Per-session options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Page the session renders
    pub mode: ScreenMode,
}

impl SessionOptions {
    /// Options for the primary page
    pub fn primary() -> Self {
        Self {
            mode: ScreenMode::Primary,
        }
    }

    /// Options for the additional-permissions page
    pub fn additional_page() -> Self {
        Self {
            mode: ScreenMode::Additional,
        }
    }
}

/// Builder for host configurations
#[derive(Default)]
pub struct HostConfigBuilder {
    grants: Option<Arc<dyn PermissionGrantStore>>,
    ops: Option<Arc<dyn OpModeStore>>,
    visibility: Option<Arc<dyn VisibilityPolicy>>,
    overlay: Option<Arc<dyn OverlayGuard>>,
    special: Option<Arc<dyn SpecialConsentDispatcher>>,
    audit: Option<Arc<dyn AuditSink>>,
    confirmations: Option<Arc<dyn ConfirmationHandler>>,
    app_name: Option<String>,
}

impl HostConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name (used for the default audit log path)
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    pub fn grants(mut self, grants: impl PermissionGrantStore + 'static) -> Self {
        self.grants = Some(Arc::new(grants));
        self
    }

    /// Use an already shared grant store
    pub fn shared_grants(mut self, grants: Arc<dyn PermissionGrantStore>) -> Self {
        self.grants = Some(grants);
        self
    }

    pub fn ops(mut self, ops: impl OpModeStore + 'static) -> Self {
        self.ops = Some(Arc::new(ops));
        self
    }

    /// Use an already shared op-mode store
    pub fn shared_ops(mut self, ops: Arc<dyn OpModeStore>) -> Self {
        self.ops = Some(ops);
        self
    }

    pub fn visibility(mut self, visibility: impl VisibilityPolicy + 'static) -> Self {
        self.visibility = Some(Arc::new(visibility));
        self
    }

    pub fn overlay(mut self, overlay: Arc<dyn OverlayGuard>) -> Self {
        self.overlay = Some(overlay);
        self
    }

    pub fn special(mut self, special: Arc<dyn SpecialConsentDispatcher>) -> Self {
        self.special = Some(special);
        self
    }

    pub fn audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn confirmations(mut self, confirmations: Arc<dyn ConfirmationHandler>) -> Self {
        self.confirmations = Some(confirmations);
        self
    }

    /// Build the configuration
    ///
    /// The grant store is required. Without an explicit audit sink, a named
    /// app logs to `<config dir>/<app>/toggles.jsonl` and an unnamed one
    /// discards reports.
    pub fn build(self) -> Result<HostConfig, PresetError> {
        let grants = self
            .grants
            .ok_or_else(|| PresetError::InvalidConfig("a grant store is required".into()))?;

        let audit: Arc<dyn AuditSink> = match (self.audit, self.app_name.as_deref()) {
            (Some(audit), _) => audit,
            (None, Some(app_name)) => {
                let sink = JournalAuditSink::default_for_app(app_name)
                    .map_err(|e| PresetError::AuditInit(e.to_string()))?;
                Arc::new(sink)
            }
            (None, None) => Arc::new(NullAuditSink),
        };

        Ok(HostConfig {
            grants,
            ops: self
                .ops
                .unwrap_or_else(|| Arc::new(MemoryOpModeStore::new())),
            visibility: self
                .visibility
                .unwrap_or_else(|| Arc::new(PlatformGroupPolicy::android_defaults())),
            overlay: self.overlay.unwrap_or_else(|| Arc::new(NeverObscured)),
            special: self.special.unwrap_or_else(|| Arc::new(NoSpecialFlows)),
            audit,
            confirmations: self
                .confirmations
                .unwrap_or_else(|| Arc::new(AutoConfirmationHandler::always_cancel())),
        })
    }
}

/// Error type for preset initialization
#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("Failed to initialize audit: {0}")]
    AuditInit(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// ============================================================================
// Preset Configurations
// ============================================================================

/// Preset configurations for common hosts
pub struct HostPresets;

impl HostPresets {
    /// Interactive terminal host
    ///
    /// - Toggle journal under the config directory
    /// - Terminal confirmations
    /// - Stock platform visibility
    pub fn interactive(
        app_name: &str,
        grants: impl PermissionGrantStore + 'static,
        ops: impl OpModeStore + 'static,
    ) -> Result<HostConfig, PresetError> {
        HostConfigBuilder::new()
            .app_name(app_name)
            .grants(grants)
            .ops(ops)
            .confirmations(Arc::new(TerminalConfirmationHandler::new()))
            .build()
    }

    /// Kiosk host: grants can be browsed but not changed
    ///
    /// - Read-only grant store
    /// - Confirmations always cancelled
    /// - Reports discarded
    pub fn kiosk(
        grants: impl PermissionGrantStore + 'static,
        ops: impl OpModeStore + 'static,
    ) -> HostConfig {
        HostConfig {
            grants: Arc::new(ReadOnlyGrantStore::new(grants)),
            ops: Arc::new(ops),
            visibility: Arc::new(PlatformGroupPolicy::android_defaults()),
            overlay: Arc::new(NeverObscured),
            special: Arc::new(NoSpecialFlows),
            audit: Arc::new(NullAuditSink),
            confirmations: Arc::new(AutoConfirmationHandler::always_cancel()),
        }
    }

    /// Testing host (in-memory, no persistence)
    ///
    /// - In-memory audit
    /// - Confirmations always denied
    pub fn testing(
        grants: impl PermissionGrantStore + 'static,
        ops: impl OpModeStore + 'static,
    ) -> HostConfig {
        HostConfig {
            grants: Arc::new(grants),
            ops: Arc::new(ops),
            visibility: Arc::new(PlatformGroupPolicy::android_defaults()),
            overlay: Arc::new(NeverObscured),
            special: Arc::new(NoSpecialFlows),
            audit: Arc::new(RecordingAuditSink::new()),
            confirmations: Arc::new(AutoConfirmationHandler::always_deny()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::MemoryGrantStore;

    #[test]
    fn test_builder_requires_grants() {
        assert!(matches!(
            HostConfigBuilder::new().build(),
            Err(PresetError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_builder_defaults() {
        let config = HostConfigBuilder::new()
            .grants(MemoryGrantStore::new())
            .build()
            .unwrap();

        assert!(!config.confirmations.is_interactive());
        assert!(!config.overlay.is_touch_obscured());
        let app = appperm_api::AppIdentity::new("com.example", 1);
        assert!(config.audit.report_toggles(&app, &[]).is_ok());
    }

    #[test]
    fn test_session_options() {
        assert_eq!(SessionOptions::default(), SessionOptions::primary());
        assert_eq!(SessionOptions::additional_page().mode, ScreenMode::Additional);
    }

    #[test]
    fn test_testing_preset() {
        let config = HostPresets::testing(MemoryGrantStore::new(), MemoryOpModeStore::new());
        assert!(!config.confirmations.is_interactive());
    }
}
