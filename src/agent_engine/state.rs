use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Planning,
    Executing,
    /// Every step ran and succeeded.
    Completed,
    /// At least one step failed, or the failure policy stopped the plan.
    Failed,
    Cancelled,
}

/// Ordered free-text steps, executed strictly in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPlan {
    pub steps: Vec<String>,
}

impl TaskPlan {
    pub fn new(steps: Vec<String>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub index: usize,
    pub step: String,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReport {
    pub session_id: String,
    pub task: String,
    pub status: TaskStatus,
    pub plan: TaskPlan,
    pub outcomes: Vec<StepOutcome>,
}

impl TaskReport {
    pub fn failed_steps(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.success).count()
    }

    /// One line per executed step, for the CLI.
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "Task \"{}\" {:?}: {}/{} steps run, {} failed",
            self.task,
            self.status,
            self.outcomes.len(),
            self.plan.len(),
            self.failed_steps()
        )];
        for o in &self.outcomes {
            let mark = if o.success { "ok" } else { "FAILED" };
            lines.push(format!("  {}. [{mark}] {}", o.index + 1, o.step));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(index: usize, success: bool) -> StepOutcome {
        StepOutcome {
            index,
            step: format!("step {index}"),
            success,
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn summary_lists_each_step() {
        let report = TaskReport {
            session_id: "s".into(),
            task: "demo".into(),
            status: TaskStatus::Failed,
            plan: TaskPlan::new(vec!["a".into(), "b".into(), "c".into()]),
            outcomes: vec![outcome(0, true), outcome(1, false)],
        };
        assert_eq!(report.failed_steps(), 1);
        let text = report.summary();
        assert!(text.starts_with("Task \"demo\" Failed: 2/3 steps run, 1 failed"));
        assert!(text.contains("2. [FAILED] step 1"));
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&TaskStatus::Cancelled).unwrap(), "\"cancelled\"");
    }
}
