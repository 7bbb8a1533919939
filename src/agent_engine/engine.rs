use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::agent_engine::event_bus::{AgentMessage, EventBus};
use crate::agent_engine::history::SessionHistory;
use crate::agent_engine::loop_control::{CancellationToken, LoopController};
use crate::agent_engine::planner::TaskPlanner;
use crate::agent_engine::state::{StepOutcome, TaskPlan, TaskReport, TaskStatus};
use crate::config::PlanConfig;
use crate::errors::{DeskPilotError, DeskPilotResult};
use crate::executor::dispatcher::StepDispatcher;

/// Runs a task: plan it, then execute the steps one at a time.
pub struct AgentEngine {
    planner: TaskPlanner,
    dispatcher: Arc<StepDispatcher>,
    config: PlanConfig,
    events: EventBus,
    history_dir: Option<PathBuf>,
}

/// Handle to a task running on its own tokio task.
pub struct TaskHandle {
    pub cancel: CancellationToken,
    pub join: JoinHandle<TaskReport>,
}

impl TaskHandle {
    /// Takes effect before the next step; the current one finishes.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn wait(self) -> DeskPilotResult<TaskReport> {
        self.join
            .await
            .map_err(|e| DeskPilotError::Agent(format!("task worker failed: {e}")))
    }
}

impl AgentEngine {
    pub fn new(planner: TaskPlanner, dispatcher: Arc<StepDispatcher>, config: PlanConfig) -> Self {
        Self {
            planner,
            dispatcher,
            config,
            events: EventBus::new(),
            history_dir: None,
        }
    }

    /// Write session logs here instead of the data directory.
    pub fn with_history_dir(mut self, dir: PathBuf) -> Self {
        self.history_dir = Some(dir);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgentMessage> {
        self.events.subscribe()
    }

    pub fn spawn(self: Arc<Self>, task: String) -> TaskHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let join = tokio::spawn(async move { self.execute(&task, &token).await });
        TaskHandle { cancel, join }
    }

    pub async fn execute(&self, task: &str, cancel: &CancellationToken) -> TaskReport {
        let history = match &self.history_dir {
            Some(dir) => SessionHistory::in_dir(dir),
            None => SessionHistory::new(),
        };
        tracing::info!(session = %history.session_id, task, "task started");
        self.emit(
            &history,
            AgentMessage::TaskStarted {
                session_id: history.session_id.clone(),
                task: task.to_string(),
            },
        );

        let mut report = TaskReport {
            session_id: history.session_id.clone(),
            task: task.to_string(),
            status: TaskStatus::Planning,
            plan: TaskPlan::default(),
            outcomes: Vec::new(),
        };

        if cancel.is_cancelled() {
            return self.finish(&history, report, TaskStatus::Cancelled);
        }

        report.plan = self.planner.plan(task).await;
        report.status = TaskStatus::Executing;
        self.emit(&history, AgentMessage::PlanReady { steps: report.plan.steps.clone() });

        let status = self.run_steps(&history, &mut report, cancel).await;
        self.finish(&history, report, status)
    }

    async fn run_steps(
        &self,
        history: &SessionHistory,
        report: &mut TaskReport,
        cancel: &CancellationToken,
    ) -> TaskStatus {
        let total = report.plan.len();
        let delay = Duration::from_millis(self.config.step_delay_ms);
        let mut control = LoopController::new(&self.config);

        for (index, step) in report.plan.steps.iter().enumerate() {
            if let Err(e) = cancel.check() {
                tracing::info!(step = index + 1, "{e}");
                return TaskStatus::Cancelled;
            }

            tracing::info!(step = index + 1, total, "executing: {step}");
            self.emit(
                history,
                AgentMessage::StepStarted {
                    index,
                    total,
                    step: step.clone(),
                },
            );

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let started_at = Utc::now();
            let success = self.dispatcher.interpret(step).await;
            let outcome = StepOutcome {
                index,
                step: step.clone(),
                success,
                started_at,
                finished_at: Utc::now(),
            };
            if !success {
                tracing::error!(step = index + 1, "step failed: {step}");
            }
            report.outcomes.push(outcome.clone());
            self.emit(history, AgentMessage::StepFinished { outcome });

            control.record(success);
            if control.should_stop() {
                tracing::warn!(
                    failures = control.failure_count(),
                    "stopping plan after step {}",
                    index + 1
                );
                return TaskStatus::Failed;
            }
        }

        if report.failed_steps() > 0 {
            TaskStatus::Failed
        } else {
            TaskStatus::Completed
        }
    }

    fn finish(&self, history: &SessionHistory, mut report: TaskReport, status: TaskStatus) -> TaskReport {
        report.status = status;
        tracing::info!(
            ?status,
            steps = report.outcomes.len(),
            failed = report.failed_steps(),
            "task finished"
        );
        self.emit(history, AgentMessage::TaskFinished { status });
        report
    }

    fn emit(&self, history: &SessionHistory, message: AgentMessage) {
        if let Err(e) = history.append(&message) {
            tracing::warn!("failed to write session history: {e}");
        }
        self.events.send(message);
    }
}
