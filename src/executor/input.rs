// Physical input through enigo, plus process launching.
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use enigo::{Axis, Button, Coordinate, Direction, Enigo, Keyboard, Mouse, Settings};

use crate::errors::{DeskPilotError, DeskPilotResult};
use crate::executor::keys::string_to_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }
}

/// Primitive input actions on the desktop.
///
/// Every call reports failure through `Err`; callers decide whether a
/// failed action aborts anything.
#[async_trait]
pub trait Actuator: Send + Sync {
    async fn move_to(&self, x: i32, y: i32, duration: Duration) -> DeskPilotResult<()>;

    /// Click at `at`, or at the current pointer position when `None`.
    async fn click(&self, at: Option<(i32, i32)>, button: MouseButton) -> DeskPilotResult<()>;

    /// Type `text` one character at a time, pausing `interval` in between.
    async fn type_text(&self, text: &str, interval: Duration) -> DeskPilotResult<()>;

    async fn press_key(&self, key: &str) -> DeskPilotResult<()>;

    /// Hold every key in order, then release in reverse.
    async fn hotkey(&self, keys: &[String]) -> DeskPilotResult<()>;

    async fn scroll(&self, direction: ScrollDirection, amount: i32) -> DeskPilotResult<()>;

    /// Start `program` detached. A program that does not exist yields
    /// [`DeskPilotError::ProgramNotFound`].
    async fn launch_process(&self, program: &str) -> DeskPilotResult<()>;
}

/// Actuator backed by enigo. Each call opens its own connection on a
/// blocking thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnigoActuator;

impl EnigoActuator {
    pub fn new() -> Self {
        Self
    }
}

const MOVE_STEP: Duration = Duration::from_millis(10);

fn connect() -> DeskPilotResult<Enigo> {
    Enigo::new(&Settings::default())
        .map_err(|e| DeskPilotError::Executor(format!("input connection failed: {e}")))
}

fn input_err(e: enigo::InputError) -> DeskPilotError {
    DeskPilotError::Executor(format!("input failed: {e}"))
}

fn resolve_key(name: &str) -> DeskPilotResult<enigo::Key> {
    string_to_key(name).ok_or_else(|| DeskPilotError::Executor(format!("unknown key '{name}'")))
}

async fn blocking<F>(f: F) -> DeskPilotResult<()>
where
    F: FnOnce() -> DeskPilotResult<()> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DeskPilotError::Executor(format!("input task failed: {e}")))?
}

/// Linear pointer glide from the current position to `(x, y)`.
fn glide(enigo: &mut Enigo, x: i32, y: i32, duration: Duration) -> DeskPilotResult<()> {
    let steps = (duration.as_millis() / MOVE_STEP.as_millis()).max(1) as i32;
    let (sx, sy) = enigo.location().map_err(input_err)?;
    for i in 1..steps {
        let px = sx + (x - sx) * i / steps;
        let py = sy + (y - sy) * i / steps;
        enigo.move_mouse(px, py, Coordinate::Abs).map_err(input_err)?;
        std::thread::sleep(MOVE_STEP);
    }
    enigo.move_mouse(x, y, Coordinate::Abs).map_err(input_err)
}

#[async_trait]
impl Actuator for EnigoActuator {
    async fn move_to(&self, x: i32, y: i32, duration: Duration) -> DeskPilotResult<()> {
        tracing::debug!(x, y, ?duration, "move");
        blocking(move || glide(&mut connect()?, x, y, duration)).await
    }

    async fn click(&self, at: Option<(i32, i32)>, button: MouseButton) -> DeskPilotResult<()> {
        tracing::debug!(?at, ?button, "click");
        let button = match button {
            MouseButton::Left => Button::Left,
            MouseButton::Right => Button::Right,
            MouseButton::Middle => Button::Middle,
        };
        blocking(move || {
            let mut enigo = connect()?;
            if let Some((x, y)) = at {
                enigo.move_mouse(x, y, Coordinate::Abs).map_err(input_err)?;
            }
            enigo.button(button, Direction::Click).map_err(input_err)
        })
        .await
    }

    async fn type_text(&self, text: &str, interval: Duration) -> DeskPilotResult<()> {
        tracing::debug!(chars = text.chars().count(), "type");
        let text = text.to_string();
        blocking(move || {
            let mut enigo = connect()?;
            let mut buf = [0u8; 4];
            for (i, c) in text.chars().enumerate() {
                if i > 0 && !interval.is_zero() {
                    std::thread::sleep(interval);
                }
                enigo.text(c.encode_utf8(&mut buf)).map_err(input_err)?;
            }
            Ok(())
        })
        .await
    }

    async fn press_key(&self, key: &str) -> DeskPilotResult<()> {
        tracing::debug!(key, "press");
        let key = resolve_key(key)?;
        blocking(move || connect()?.key(key, Direction::Click).map_err(input_err)).await
    }

    async fn hotkey(&self, keys: &[String]) -> DeskPilotResult<()> {
        tracing::debug!(?keys, "hotkey");
        let keys = keys
            .iter()
            .map(|k| resolve_key(k))
            .collect::<DeskPilotResult<Vec<_>>>()?;
        if keys.is_empty() {
            return Err(DeskPilotError::Executor("empty hotkey".into()));
        }
        blocking(move || {
            let mut enigo = connect()?;
            for k in &keys {
                enigo.key(*k, Direction::Press).map_err(input_err)?;
            }
            for k in keys.iter().rev() {
                enigo.key(*k, Direction::Release).map_err(input_err)?;
            }
            Ok(())
        })
        .await
    }

    async fn scroll(&self, direction: ScrollDirection, amount: i32) -> DeskPilotResult<()> {
        tracing::debug!(?direction, amount, "scroll");
        // Positive wheel steps scroll the content down.
        let delta = match direction {
            ScrollDirection::Up => -amount.abs(),
            ScrollDirection::Down => amount.abs(),
        };
        blocking(move || connect()?.scroll(delta, Axis::Vertical).map_err(input_err)).await
    }

    async fn launch_process(&self, program: &str) -> DeskPilotResult<()> {
        launch_detached(program)
    }
}

/// Spawn `program` without waiting for it; output is discarded.
pub fn launch_detached(program: &str) -> DeskPilotResult<()> {
    let program = program.trim();
    if program.is_empty() {
        return Err(DeskPilotError::Executor("empty program name".into()));
    }
    match tokio::process::Command::new(program)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => {
            tracing::info!(program, pid = ?child.id(), "process launched");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(DeskPilotError::ProgramNotFound(program.to_string()))
        }
        Err(e) => Err(DeskPilotError::Executor(format!("failed to launch '{program}': {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_direction_parses_case_insensitively() {
        assert_eq!(ScrollDirection::parse("UP"), Some(ScrollDirection::Up));
        assert_eq!(ScrollDirection::parse("down"), Some(ScrollDirection::Down));
        assert_eq!(ScrollDirection::parse("sideways"), None);
    }

    #[tokio::test]
    async fn missing_program_is_reported_as_not_found() {
        let err = launch_detached("deskpilot-no-such-program-xyz").unwrap_err();
        assert!(matches!(err, DeskPilotError::ProgramNotFound(ref p) if p == "deskpilot-no-such-program-xyz"));
    }

    #[tokio::test]
    async fn empty_program_name_is_rejected() {
        let err = launch_detached("   ").unwrap_err();
        assert!(matches!(err, DeskPilotError::Executor(_)));
    }
}
