//! Special-consent dispatch
//!
//! Some groups have their own consent flow owned by another component (for
//! example the location group of an app that is itself a location
//! provider). Toggles on those groups are handed off instead of applied.

use appperm_api::{AppIdentity, PermissionGroup};
use std::collections::HashSet;
use std::sync::Mutex;

/// Name of the platform location group
pub const LOCATION_GROUP: &str = "android.permission-group.LOCATION";

/// Trait for handing toggles to a dedicated consent flow
pub trait SpecialConsentDispatcher: Send + Sync {
    /// Whether the group's toggles belong to a dedicated flow
    fn is_special_flow(&self, group: &PermissionGroup, app: &AppIdentity) -> bool;

    /// Start the dedicated flow; the screen reloads when the host resumes it
    fn launch_special_flow(&self, group: &PermissionGroup, app: &AppIdentity);
}

/// Dispatcher with no special flows
#[derive(Debug, Default)]
pub struct NoSpecialFlows;

impl SpecialConsentDispatcher for NoSpecialFlows {
    fn is_special_flow(&self, _group: &PermissionGroup, _app: &AppIdentity) -> bool {
        false
    }

    fn launch_special_flow(&self, _group: &PermissionGroup, _app: &AppIdentity) {}
}

type LaunchHook = Box<dyn Fn(&PermissionGroup, &AppIdentity) + Send + Sync>;

/// Routes the location group of location-provider apps to the host's
/// location settings flow
pub struct LocationProviderDispatcher {
    location_group: String,
    providers: HashSet<String>,
    on_launch: Option<LaunchHook>,
}

impl LocationProviderDispatcher {
    /// Create a dispatcher for the given provider packages
    pub fn new<I, S>(providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            location_group: LOCATION_GROUP.to_string(),
            providers: providers.into_iter().map(Into::into).collect(),
            on_launch: None,
        }
    }

    /// Use a different group name for location
    pub fn with_location_group(mut self, group: impl Into<String>) -> Self {
        self.location_group = group.into();
        self
    }

    /// Run a hook when the flow is launched (e.g., open the settings page)
    pub fn on_launch(
        mut self,
        hook: impl Fn(&PermissionGroup, &AppIdentity) + Send + Sync + 'static,
    ) -> Self {
        self.on_launch = Some(Box::new(hook));
        self
    }
}

impl SpecialConsentDispatcher for LocationProviderDispatcher {
    fn is_special_flow(&self, group: &PermissionGroup, app: &AppIdentity) -> bool {
        group.name == self.location_group && self.providers.contains(&app.package_name)
    }

    fn launch_special_flow(&self, group: &PermissionGroup, app: &AppIdentity) {
        tracing::info!(package = %app.package_name, group = %group.name, "Launching location consent flow");
        if let Some(hook) = &self.on_launch {
            hook(group, app);
        }
    }
}

impl std::fmt::Debug for LocationProviderDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationProviderDispatcher")
            .field("location_group", &self.location_group)
            .field("providers", &self.providers)
            .finish_non_exhaustive()
    }
}

/// Dispatcher that records launches for testing
#[derive(Debug, Default)]
pub struct RecordingSpecialFlow {
    groups: HashSet<String>,
    launches: Mutex<Vec<String>>,
}

impl RecordingSpecialFlow {
    /// Treat the named groups as special for every app
    pub fn for_groups<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            groups: groups.into_iter().map(Into::into).collect(),
            launches: Mutex::new(Vec::new()),
        }
    }

    /// Groups for which a flow was launched, in order
    pub fn launches(&self) -> Vec<String> {
        self.launches.lock().unwrap().clone()
    }
}

impl SpecialConsentDispatcher for RecordingSpecialFlow {
    fn is_special_flow(&self, group: &PermissionGroup, _app: &AppIdentity) -> bool {
        self.groups.contains(&group.name)
    }

    fn launch_special_flow(&self, group: &PermissionGroup, _app: &AppIdentity) {
        self.launches.lock().unwrap().push(group.name.clone());
    }
}
