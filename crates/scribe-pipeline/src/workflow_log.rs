//! Execution trace for a single pipeline run.
//!
//! Every phase records what it did and with which inputs; the rendered
//! trace can be saved next to the generated document for audit. Logged
//! values are clipped so a large code summary cannot bloat the trace.

use chrono::{DateTime, Utc};

use crate::budget::clip_chars;

/// Maximum characters stored per logged value.
const STORED_VALUE_LIMIT: usize = 1000;

/// Maximum characters rendered per value in the saved trace.
const RENDERED_VALUE_LIMIT: usize = 500;

/// One recorded pipeline step.
#[derive(Debug, Clone)]
pub struct WorkflowStep {
    /// Step name, e.g. `Dispatch` or `Document Generation`.
    pub step: String,
    /// When the step was recorded.
    pub timestamp: DateTime<Utc>,
    /// Named values attached to the step, clipped at record time.
    pub fields: Vec<(String, String)>,
}

/// Ordered trace of the steps a pipeline run executed.
#[derive(Debug, Clone, Default)]
pub struct WorkflowLog {
    steps: Vec<WorkflowStep>,
}

impl WorkflowLog {
    /// Creates an empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a step with its attached values.
    pub fn record(&mut self, step: &str, fields: &[(&str, &str)]) {
        let clipped = fields
            .iter()
            .map(|(key, value)| ((*key).to_owned(), clip_for_storage(value)))
            .collect();
        self.steps.push(WorkflowStep {
            step: step.to_owned(),
            timestamp: Utc::now(),
            fields: clipped,
        });
    }

    /// Recorded steps, in execution order.
    #[must_use]
    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Renders the trace as a plain-text report.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::from("WORKFLOW LOG\n");
        out.push_str(&"=".repeat(70));
        out.push_str("\n\n");

        for step in &self.steps {
            out.push_str(&format!("Step: {}\n", step.step));
            out.push_str(&format!(
                "Time: {}\n",
                step.timestamp.format("%Y%m%d_%H%M%S")
            ));
            for (key, value) in &step.fields {
                out.push_str(&format!(
                    "  {key}: {}\n",
                    clip_chars(value, RENDERED_VALUE_LIMIT)
                ));
            }
            out.push_str(&"-".repeat(70));
            out.push_str("\n\n");
        }

        out
    }
}

/// Clips a value for storage, marking how much was dropped.
fn clip_for_storage(value: &str) -> String {
    let total = value.chars().count();
    if total <= STORED_VALUE_LIMIT {
        return value.to_owned();
    }
    let omitted = total - STORED_VALUE_LIMIT;
    format!(
        "{}... [truncated {omitted} chars]",
        clip_chars(value, STORED_VALUE_LIMIT)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_steps_in_order() {
        let mut log = WorkflowLog::new();
        log.record("Workflow Started", &[("request", "Create FRD")]);
        log.record("Dispatch", &[("decision", "proceed")]);

        let steps = log.steps();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].step, "Workflow Started");
        assert_eq!(steps[1].step, "Dispatch");
        assert_eq!(steps[0].fields[0].1, "Create FRD");
    }

    #[test]
    fn long_values_are_clipped_at_record_time() {
        let mut log = WorkflowLog::new();
        let huge = "x".repeat(5000);
        log.record("Draft", &[("document", &huge)]);

        let stored = &log.steps()[0].fields[0].1;
        assert!(
            stored.len() < huge.len(),
            "Stored value should be shorter than the input"
        );
        assert!(
            stored.contains("[truncated 4000 chars]"),
            "Clip marker missing from: {stored}"
        );
    }

    #[test]
    fn render_includes_header_and_steps() {
        let mut log = WorkflowLog::new();
        log.record("Quality Check", &[("confidence", "high")]);

        let report = log.render();
        assert!(report.starts_with("WORKFLOW LOG\n"));
        assert!(report.contains("Step: Quality Check"));
        assert!(report.contains("  confidence: high"));
    }

    #[test]
    fn empty_log_reports_empty() {
        let log = WorkflowLog::new();
        assert!(log.is_empty());
        assert!(!log.render().contains("Step:"));
    }
}
