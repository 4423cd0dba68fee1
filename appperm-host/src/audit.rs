//! Toggle auditing
//!
//! [`ToggleAuditLog`] collects the groups a user toggled during one visit of
//! the screen. Toggling a group back cancels the entry, so only odd-parity
//! toggles are reported. On pause the log is flushed to an [`AuditSink`]
//! together with each group's grant state at that moment.

use appperm_api::AppIdentity;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

use crate::model::PermissionModel;

/// One batch of toggles reported on screen exit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleReport {
    /// When the batch was flushed (RFC 3339)
    pub timestamp: String,
    /// App whose groups were toggled
    pub app: AppIdentity,
    /// Toggled groups in first-toggle order
    pub groups: Vec<ToggledGroup>,
}

/// A toggled group and its grant state at flush time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggledGroup {
    pub name: String,
    pub granted: bool,
}

impl ToggleReport {
    /// Create a report stamped with the current time
    pub fn new(app: AppIdentity, groups: Vec<ToggledGroup>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            app,
            groups,
        }
    }

    /// Names of the reported groups
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }
}

/// Failure to deliver a toggle report
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Toggle journal I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed toggle report: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Toggle reports rejected: {0}")]
    Rejected(String),
}

// ============================================================================
// Toggle log
// ============================================================================

/// Odd-parity set of groups toggled since the screen became visible
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToggleAuditLog {
    toggled: Vec<String>,
}

impl ToggleAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the group's membership; returns whether it is now present
    pub fn record(&mut self, group: &str) -> bool {
        match self.toggled.iter().position(|g| g == group) {
            Some(index) => {
                self.toggled.remove(index);
                false
            }
            None => {
                self.toggled.push(group.to_string());
                true
            }
        }
    }

    pub fn contains(&self, group: &str) -> bool {
        self.toggled.iter().any(|g| g == group)
    }

    /// Outstanding groups in first-toggle order
    pub fn groups(&self) -> &[String] {
        &self.toggled
    }

    pub fn len(&self) -> usize {
        self.toggled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toggled.is_empty()
    }

    /// Report the outstanding set and clear it
    ///
    /// The log is cleared before the sink is called, so a failing sink never
    /// causes the same toggles to be reported twice. An empty log reports
    /// nothing. Returns the number of reported groups.
    pub fn flush(
        &mut self,
        model: &PermissionModel,
        sink: &dyn AuditSink,
    ) -> Result<usize, AuditError> {
        let toggled = std::mem::take(&mut self.toggled);
        if toggled.is_empty() {
            return Ok(0);
        }

        let groups: Vec<ToggledGroup> = toggled
            .into_iter()
            .map(|name| {
                let granted = model
                    .group(&name)
                    .map(|g| g.runtime_granted)
                    .unwrap_or(false);
                ToggledGroup { name, granted }
            })
            .collect();
        let count = groups.len();

        sink.report_toggles(model.app(), &groups)?;
        tracing::info!(package = %model.app().package_name, groups = count, "Reported toggled groups");
        Ok(count)
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Destination for the groups toggled during one visit of the screen
///
/// Called at most once per pause, with the groups in first-toggle order.
pub trait AuditSink: Send + Sync {
    fn report_toggles(&self, app: &AppIdentity, groups: &[ToggledGroup]) -> Result<(), AuditError>;
}

/// Discards reports
#[derive(Debug, Default)]
pub struct NullAuditSink;

impl NullAuditSink {
    pub fn new() -> Self {
        Self
    }
}

impl AuditSink for NullAuditSink {
    fn report_toggles(&self, _app: &AppIdentity, _groups: &[ToggledGroup]) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Emits one `info` event per toggled group under the `appperm::toggles`
/// target
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn report_toggles(&self, app: &AppIdentity, groups: &[ToggledGroup]) -> Result<(), AuditError> {
        for group in groups {
            tracing::info!(
                target: "appperm::toggles",
                package = %app.package_name,
                uid = app.uid,
                group = %group.name,
                granted = group.granted,
                "Permission group toggled"
            );
        }
        Ok(())
    }
}

/// Journal of toggle reports, one JSON object per line
///
/// The file is opened in append mode for each report, so several sessions
/// (or processes) can share a journal.
#[derive(Debug, Clone)]
pub struct JournalAuditSink {
    path: PathBuf,
}

impl JournalAuditSink {
    /// Journal at `path`, creating parent directories
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, AuditError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    /// `<config dir>/<app_name>/toggles.jsonl`
    pub fn default_for_app(app_name: &str) -> Result<Self, AuditError> {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config"));
        Self::new(config_dir.join(app_name).join("toggles.jsonl"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every report in the journal, oldest first
    ///
    /// A missing journal reads as empty.
    pub fn read_reports(&self) -> Result<Vec<ToggleReport>, AuditError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut reports = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            reports.push(serde_json::from_str(&line)?);
        }
        Ok(reports)
    }
}

impl AuditSink for JournalAuditSink {
    fn report_toggles(&self, app: &AppIdentity, groups: &[ToggledGroup]) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(&ToggleReport::new(app.clone(), groups.to_vec()))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        tracing::debug!(path = %self.path.display(), groups = groups.len(), "Appended toggle report");
        Ok(())
    }
}

/// Keeps every report in memory (tests and previews)
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    reports: Mutex<Vec<ToggleReport>>,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<ToggleReport> {
        self.reports.lock().unwrap().clone()
    }

    /// Reports for one package, oldest first
    pub fn reports_for(&self, package: &str) -> Vec<ToggleReport> {
        self.reports
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.app.package_name == package)
            .cloned()
            .collect()
    }

    /// Whether the package had a group reported as toggled
    pub fn was_reported(&self, package: &str, group: &str) -> bool {
        self.reports_for(package)
            .iter()
            .any(|r| r.groups.iter().any(|g| g.name == group))
    }
}

impl AuditSink for RecordingAuditSink {
    fn report_toggles(&self, app: &AppIdentity, groups: &[ToggledGroup]) -> Result<(), AuditError> {
        self.reports
            .lock()
            .unwrap()
            .push(ToggleReport::new(app.clone(), groups.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::MemoryGrantStore;
    use appperm_api::PermissionGroup;

    fn model() -> PermissionModel {
        let app = AppIdentity::new("com.example.audit", 10_040);
        let store = MemoryGrantStore::new().with_app(
            app.clone(),
            vec![
                PermissionGroup::new("group.CAMERA", "Camera").granted(true),
                PermissionGroup::new("group.SMS", "SMS"),
                PermissionGroup::new("group.PHONE", "Phone"),
            ],
        );
        PermissionModel::load(&store, &app).unwrap()
    }

    struct RejectingSink;

    impl AuditSink for RejectingSink {
        fn report_toggles(&self, _app: &AppIdentity, _groups: &[ToggledGroup]) -> Result<(), AuditError> {
            Err(AuditError::Rejected("collector offline".into()))
        }
    }

    #[test]
    fn test_parity() {
        let mut log = ToggleAuditLog::new();

        assert!(log.record("group.CAMERA"));
        assert!(log.record("group.SMS"));
        assert!(!log.record("group.CAMERA"));
        assert!(log.record("group.PHONE"));
        assert!(log.record("group.CAMERA"));

        assert_eq!(log.groups(), ["group.SMS", "group.PHONE", "group.CAMERA"]);
        assert!(!log.record("group.SMS"));
        assert!(!log.contains("group.SMS"));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_flush_reports_and_clears() {
        let model = model();
        let sink = RecordingAuditSink::new();
        let mut log = ToggleAuditLog::new();
        log.record("group.CAMERA");
        log.record("group.SMS");

        assert_eq!(log.flush(&model, &sink).unwrap(), 2);
        assert!(log.is_empty());

        let reports = sink.reports_for("com.example.audit");
        assert_eq!(reports.len(), 1);
        assert_eq!(
            reports[0].groups,
            vec![
                ToggledGroup {
                    name: "group.CAMERA".into(),
                    granted: true
                },
                ToggledGroup {
                    name: "group.SMS".into(),
                    granted: false
                },
            ]
        );
        assert!(sink.was_reported("com.example.audit", "group.SMS"));
        assert!(!sink.was_reported("com.example.audit", "group.PHONE"));
    }

    #[test]
    fn test_flush_cancelled_toggles_reports_nothing() {
        let model = model();
        let sink = RecordingAuditSink::new();
        let mut log = ToggleAuditLog::new();
        log.record("group.CAMERA");
        log.record("group.CAMERA");

        assert_eq!(log.flush(&model, &sink).unwrap(), 0);
        assert!(sink.reports().is_empty());
    }

    #[test]
    fn test_failed_report_is_not_retried() {
        let model = model();
        let mut log = ToggleAuditLog::new();
        log.record("group.PHONE");

        assert!(matches!(
            log.flush(&model, &RejectingSink),
            Err(AuditError::Rejected(_))
        ));
        assert!(log.is_empty());
        assert_eq!(log.flush(&model, &RejectingSink).unwrap(), 0);
    }

    #[test]
    fn test_journal_appends_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let journal = JournalAuditSink::new(dir.path().join("audit").join("toggles.jsonl")).unwrap();
        assert!(journal.read_reports().unwrap().is_empty());

        let model = model();
        let mut log = ToggleAuditLog::new();
        log.record("group.PHONE");
        log.flush(&model, &journal).unwrap();
        log.record("group.CAMERA");
        log.flush(&model, &journal).unwrap();

        let reports = journal.read_reports().unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].app.package_name, "com.example.audit");
        assert_eq!(reports[0].group_names(), ["group.PHONE"]);
        assert!(reports[1].groups[0].granted);
        assert!(chrono::DateTime::parse_from_rfc3339(&reports[1].timestamp).is_ok());
    }

    #[test]
    fn test_journal_rejects_garbage_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toggles.jsonl");
        std::fs::write(&path, "not json\n").unwrap();

        let journal = JournalAuditSink::new(&path).unwrap();
        assert!(matches!(journal.read_reports(), Err(AuditError::Format(_))));
    }
}
