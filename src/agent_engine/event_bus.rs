use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::agent_engine::state::{StepOutcome, TaskStatus};

/// Progress events of a running task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AgentMessage {
    TaskStarted {
        session_id: String,
        task: String,
    },
    PlanReady {
        steps: Vec<String>,
    },
    StepStarted {
        index: usize,
        total: usize,
        step: String,
    },
    StepFinished {
        outcome: StepOutcome,
    },
    TaskFinished {
        status: TaskStatus,
    },
}

pub struct EventBus {
    tx: broadcast::Sender<AgentMessage>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(100);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgentMessage> {
        self.tx.subscribe()
    }

    /// Publish to every current subscriber; nobody listening is fine.
    pub fn send(&self, msg: AgentMessage) {
        if self.tx.send(msg).is_err() {
            tracing::trace!("no event subscribers");
        }
    }
}
