//! Opening a terminal: an ordered chain of strategies, stopping at the
//! first one that completes without error.

use std::time::Duration;

use crate::errors::{DeskPilotError, DeskPilotResult};
use crate::executor::input::Actuator;

const TERMINAL_SHORTCUT: [&str; 3] = ["ctrl", "alt", "t"];
const LAUNCHER_KEY: &str = "super";
const LAUNCHER_QUERY: &str = "terminal";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStrategy {
    Shortcut,
    AppLauncher,
    /// Index into the candidate list.
    Program(usize),
}

pub struct TerminalLauncher {
    candidates: Vec<String>,
    /// Pause between launcher keystrokes.
    settle: Duration,
    type_interval: Duration,
}

impl TerminalLauncher {
    pub fn new(candidates: Vec<String>, settle: Duration, type_interval: Duration) -> Self {
        Self {
            candidates,
            settle,
            type_interval,
        }
    }

    /// Try every strategy in order. Returns the one that worked, or `None`
    /// once all of them failed.
    pub async fn launch(&self, actuator: &dyn Actuator) -> Option<TerminalStrategy> {
        let shortcut: Vec<String> = TERMINAL_SHORTCUT.iter().map(|k| k.to_string()).collect();
        match actuator.hotkey(&shortcut).await {
            Ok(()) => return Some(TerminalStrategy::Shortcut),
            Err(e) => tracing::warn!("terminal shortcut failed: {e}"),
        }

        match self.via_app_launcher(actuator).await {
            Ok(()) => return Some(TerminalStrategy::AppLauncher),
            Err(e) => tracing::warn!("application launcher failed: {e}"),
        }

        for (i, program) in self.candidates.iter().enumerate() {
            match actuator.launch_process(program).await {
                Ok(()) => {
                    tracing::info!(program = %program, "terminal launched");
                    return Some(TerminalStrategy::Program(i));
                }
                Err(DeskPilotError::ProgramNotFound(_)) => {
                    tracing::debug!(program = %program, "terminal program not installed");
                }
                Err(e) => tracing::warn!(program = %program, "terminal launch failed: {e}"),
            }
        }

        tracing::error!("no way to open a terminal worked");
        None
    }

    async fn via_app_launcher(&self, actuator: &dyn Actuator) -> DeskPilotResult<()> {
        actuator.press_key(LAUNCHER_KEY).await?;
        tokio::time::sleep(self.settle).await;
        actuator.type_text(LAUNCHER_QUERY, self.type_interval).await?;
        tokio::time::sleep(self.settle).await;
        actuator.press_key("enter").await
    }
}
