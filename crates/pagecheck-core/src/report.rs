//! Run reports.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
    /// Not reached because an earlier step failed.
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub kind: String,
    pub label: String,
    pub status: StepStatus,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of running one scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub scenario: String,
    pub url: String,
    pub started_at: DateTime<Utc>,
    pub steps: Vec<StepOutcome>,
    pub screenshots: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    pub fn new(scenario: &str, url: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            scenario: scenario.to_string(),
            url: url.to_string(),
            started_at: Utc::now(),
            steps: Vec::new(),
            screenshots: Vec::new(),
            error: None,
        }
    }

    /// A run that never reached its first step, e.g. the browser failed to launch.
    pub fn aborted(scenario: &str, url: &str, error: impl std::fmt::Display) -> Self {
        let mut report = Self::new(scenario, url);
        report.error = Some(error.to_string());
        report
    }

    pub fn passed(&self) -> bool {
        self.error.is_none()
            && self
                .steps
                .iter()
                .all(|s| s.status == StepStatus::Passed)
    }

    pub fn record(&mut self, outcome: StepOutcome) {
        self.steps.push(outcome);
    }

    pub fn add_screenshot(&mut self, path: &Path) {
        self.screenshots.push(path.to_path_buf());
    }

    /// One-line summary for terminal output.
    pub fn summary(&self) -> String {
        let passed = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Passed)
            .count();
        let status = if self.passed() { "PASS" } else { "FAIL" };
        format!(
            "{status} {} ({passed}/{} steps)",
            self.scenario,
            self.steps.len()
        )
    }
}

/// Write reports as pretty JSON.
pub fn write_reports(path: &Path, reports: &[RunReport]) -> crate::error::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(reports)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: StepStatus) -> StepOutcome {
        StepOutcome {
            kind: "goto".into(),
            label: "goto http://localhost:3000".into(),
            status,
            elapsed_ms: 12,
            error: None,
        }
    }

    #[test]
    fn test_empty_report_passes() {
        let report = RunReport::new("verify-changes", "http://localhost:3000");
        assert!(report.passed());
        assert_eq!(report.summary(), "PASS verify-changes (0/0 steps)");
    }

    #[test]
    fn test_failed_step_fails_report() {
        let mut report = RunReport::new("verify-changes", "http://localhost:3000");
        report.record(outcome(StepStatus::Passed));
        report.record(outcome(StepStatus::Failed));
        report.record(outcome(StepStatus::Skipped));
        assert!(!report.passed());
        assert_eq!(report.summary(), "FAIL verify-changes (1/3 steps)");
    }

    #[test]
    fn test_aborted_report_fails() {
        let report = RunReport::aborted("verify-changes", "http://localhost:3000", "no chrome");
        assert!(!report.passed());
        assert!(report.steps.is_empty());
        assert_eq!(report.error.as_deref(), Some("no chrome"));
        assert_eq!(report.summary(), "FAIL verify-changes (0/0 steps)");
    }

    #[test]
    fn test_write_reports_creates_parent() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("reports/run.json");
        let mut report = RunReport::new("changelog-light", "http://localhost:3000/changelog");
        report.add_screenshot(Path::new("verification-light.png"));
        write_reports(&path, &[report]).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed[0]["scenario"], "changelog-light");
        assert_eq!(parsed[0]["screenshots"][0], "verification-light.png");
        assert!(parsed[0].get("error").is_none());
    }
}
