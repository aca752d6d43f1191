//! Per-run outcome records, rendered as text for terminals or JSON for CI.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use gridproof_common::{ErrorKind, GridproofError};
use serde::Serialize;
use uuid::Uuid;

use crate::artifact::ArtifactRecord;
use crate::state::FlowState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
    Skipped,
}

impl StepStatus {
    fn label(self) -> &'static str {
        match self {
            StepStatus::Passed => "ok",
            StepStatus::Failed => "FAILED",
            StepStatus::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub name: String,
    pub action: &'static str,
    pub status: StepStatus,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub steps: Vec<StepRecord>,
    pub state: FlowState,
    pub artifact: Option<ArtifactRecord>,
}

impl RunReport {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            target: target.into(),
            started_at: Utc::now(),
            finished_at: None,
            steps: Vec::new(),
            state: FlowState::Pending,
            artifact: None,
        }
    }

    pub fn passed(&mut self, name: &str, action: &'static str, elapsed_ms: u64) {
        self.push(name, action, StepStatus::Passed, elapsed_ms, None);
    }

    pub fn failed(&mut self, name: &str, action: &'static str, elapsed_ms: u64, error: &GridproofError) {
        self.push(name, action, StepStatus::Failed, elapsed_ms, Some(error));
    }

    pub fn skipped(&mut self, name: &str, action: &'static str) {
        self.push(name, action, StepStatus::Skipped, 0, None);
    }

    fn push(
        &mut self,
        name: &str,
        action: &'static str,
        status: StepStatus,
        elapsed_ms: u64,
        error: Option<&GridproofError>,
    ) {
        self.steps.push(StepRecord {
            name: name.to_string(),
            action,
            status,
            elapsed_ms,
            error: error.map(ToString::to_string),
            error_kind: error.map(GridproofError::kind),
        });
    }

    pub fn finish(&mut self, state: FlowState) {
        self.state = state;
        self.finished_at = Some(Utc::now());
    }

    pub fn succeeded(&self) -> bool {
        !self.state.is_failed() && self.steps.iter().all(|s| s.status == StepStatus::Passed)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "run {} against {}", self.run_id, self.target);
        let width = self.steps.iter().map(|s| s.name.len()).max().unwrap_or(0);
        for step in &self.steps {
            let _ = write!(
                out,
                "  {:<width$}  {:<8} {:>6} ms",
                step.name,
                step.status.label(),
                step.elapsed_ms
            );
            if let Some(err) = &step.error {
                let _ = write!(out, "  {err}");
            }
            out.push('\n');
        }
        match &self.artifact {
            Some(a) => {
                let _ = writeln!(out, "artifact {} ({} bytes, blake3 {})", a.path.display(), a.bytes, a.blake3);
            }
            None => out.push_str("no artifact written\n"),
        }
        let verdict = if self.succeeded() { "PASSED" } else { "FAILED" };
        let _ = writeln!(out, "{verdict}: {}", self.state);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Milestone;

    #[test]
    fn failed_steps_carry_their_kind() {
        let mut report = RunReport::new("file:///app/index.html");
        report.passed("navigate", "navigate", 12);
        report.failed(
            "open-new-game",
            "click",
            5000,
            &GridproofError::ElementNotFound {
                target: "button \"New Game\"".into(),
                timeout_ms: 5000,
            },
        );
        report.skipped("capture", "screenshot");
        report.finish(FlowState::Pending.advance(0, Milestone::Navigated).unwrap().fail(1));

        assert!(!report.succeeded());
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["steps"][1]["status"], "failed");
        assert_eq!(json["steps"][1]["error_kind"], "element_not_found");
        assert_eq!(json["steps"][2]["status"], "skipped");
        assert!(json["steps"][0].get("error").is_none());
        assert_eq!(json["state"]["state"], "failed");
    }

    #[test]
    fn text_rendering_lists_every_step() {
        let mut report = RunReport::new("http://localhost:8000/");
        report.passed("navigate", "navigate", 3);
        report.finish(FlowState::Pending.advance(0, Milestone::Navigated).unwrap());

        let text = report.render_text();
        assert!(text.contains("navigate"));
        assert!(text.contains("no artifact written"));
        assert!(text.trim_end().ends_with("PASSED: Navigated"));
    }
}
