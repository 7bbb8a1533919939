use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent_engine::event_bus::AgentMessage;
use crate::errors::DeskPilotResult;

/// One line of the session log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub ts: DateTime<Utc>,
    pub session_id: String,
    #[serde(flatten)]
    pub message: AgentMessage,
}

/// Append-only JSONL log of one task run.
pub struct SessionHistory {
    pub session_id: String,
    file_path: PathBuf,
}

impl SessionHistory {
    /// Log under the platform data directory.
    pub fn new() -> Self {
        Self::in_dir(&default_sessions_dir())
    }

    pub fn in_dir(dir: &Path) -> Self {
        let session_id = uuid::Uuid::new_v4().to_string();
        let file_path = dir.join(format!("session_{session_id}.jsonl"));
        Self { session_id, file_path }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn append(&self, message: &AgentMessage) -> DeskPilotResult<()> {
        let entry = HistoryEntry {
            ts: Utc::now(),
            session_id: self.session_id.clone(),
            message: message.clone(),
        };
        let line = serde_json::to_string(&entry)?;
        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        writeln!(file, "{line}")?;
        tracing::debug!(path = %self.file_path.display(), "history entry written");
        Ok(())
    }
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// `<data dir>/deskpilot/sessions`, falling back to the working directory.
pub fn default_sessions_dir() -> PathBuf {
    match dirs::data_local_dir() {
        Some(base) => base.join("deskpilot").join("sessions"),
        None => std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("sessions"),
    }
}
