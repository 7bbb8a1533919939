use std::sync::Arc;

use crate::agent_engine::state::TaskPlan;
use crate::llm::reasoner::{plan_prompt, ReasoningService, PLAN_SYSTEM_PROMPT};

pub const DEFAULT_PLAN: &[&str] = &["Analyze screen", "Perform actions based on visual feedback"];

/// Breaks a task into free-text steps.
pub struct TaskPlanner {
    reasoner: Option<Arc<dyn ReasoningService>>,
}

impl TaskPlanner {
    pub fn new(reasoner: Option<Arc<dyn ReasoningService>>) -> Self {
        Self { reasoner }
    }

    /// Never fails: without a usable answer the default plan is returned.
    pub async fn plan(&self, task: &str) -> TaskPlan {
        let Some(reasoner) = &self.reasoner else {
            tracing::info!("no reasoning service, using default plan");
            return default_plan();
        };

        match reasoner.complete(PLAN_SYSTEM_PROMPT, &plan_prompt(task)).await {
            Ok(answer) => {
                let steps = parse_plan(&answer);
                if steps.is_empty() {
                    tracing::warn!("planner answered with no steps, using default plan");
                    return default_plan();
                }
                tracing::info!(steps = steps.len(), "plan ready");
                TaskPlan::new(steps)
            }
            Err(e) => {
                tracing::warn!("planning failed, using default plan: {e}");
                default_plan()
            }
        }
    }
}

pub fn default_plan() -> TaskPlan {
    TaskPlan::new(DEFAULT_PLAN.iter().map(|s| s.to_string()).collect())
}

/// One step per non-empty line, list markers removed.
pub fn parse_plan(answer: &str) -> Vec<String> {
    answer
        .lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix(['-', '*', '•']) {
        return rest.trim_start();
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(['.', ')']) {
            return rest.trim_start();
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DeskPilotError;
    use crate::test_support::ScriptedReasoner;

    #[test]
    fn markers_are_stripped() {
        let steps = parse_plan("1. Open the browser\n2) Type the address\n\n- press enter\n* wait 2 seconds\n");
        assert_eq!(
            steps,
            vec!["Open the browser", "Type the address", "press enter", "wait 2 seconds"]
        );
    }

    #[test]
    fn numbers_without_a_marker_are_kept() {
        assert_eq!(parse_plan("2024 report"), vec!["2024 report"]);
    }

    #[tokio::test]
    async fn without_reasoner_the_default_plan_is_used() {
        let plan = TaskPlanner::new(None).plan("anything").await;
        assert_eq!(plan, default_plan());
        assert_eq!(plan.steps[0], "Analyze screen");
    }

    #[tokio::test]
    async fn reasoner_answer_becomes_the_plan() {
        let reasoner = Arc::new(ScriptedReasoner::from_fn(|_| Ok("1. click OK\n2. press enter".into())));
        let planner = TaskPlanner::new(Some(reasoner.clone()));

        let plan = planner.plan("confirm the dialog").await;

        assert_eq!(plan.steps, vec!["click OK", "press enter"]);
        assert!(reasoner.prompts()[0].starts_with("Task: confirm the dialog"));
    }

    #[tokio::test]
    async fn failure_or_blank_answer_falls_back() {
        let failing = TaskPlanner::new(Some(Arc::new(ScriptedReasoner::from_fn(|_| {
            Err(DeskPilotError::LlmProvider("quota".into()))
        }))));
        assert_eq!(failing.plan("x").await, default_plan());

        let blank = TaskPlanner::new(Some(Arc::new(ScriptedReasoner::from_fn(|_| Ok(" \n- \n".into())))));
        assert_eq!(blank.plan("x").await, default_plan());
    }
}
