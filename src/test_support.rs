//! Test doubles for the external services: capture, text extraction,
//! input actuation and reasoning.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::RgbImage;

use crate::config::PerceptionConfig;
use crate::errors::{DeskPilotError, DeskPilotResult};
use crate::executor::input::{Actuator, MouseButton, ScrollDirection};
use crate::llm::reasoner::ReasoningService;
use crate::perception::pipeline::{ScreenAnalyzer, ScreenState};
use crate::perception::traits::{ScreenCapture, TextExtractor};
use crate::perception::types::{Element, ElementTable, Region};

pub fn element(id: usize, bounds: Region, text: &str) -> Element {
    Element {
        id,
        bounds,
        text: text.to_string(),
    }
}

/// Screen state seeded with `elements`. Re-analysing yields an empty
/// table because the capture always fails.
pub async fn screen_with(elements: Vec<Element>) -> Arc<ScreenState> {
    let analyzer = ScreenAnalyzer::new(
        Arc::new(FixedCapture::failing()),
        Arc::new(ScriptedExtractor::new(Vec::new())),
        &PerceptionConfig::default(),
    );
    let state = Arc::new(ScreenState::new(Arc::new(analyzer)));
    state.publish(ElementTable::new(elements, (1920, 1080))).await;
    state
}

/// Returns the same image on every capture, or fails every time.
pub struct FixedCapture {
    image: Option<RgbImage>,
    count: Arc<AtomicUsize>,
}

impl FixedCapture {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image: Some(image),
            count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            image: None,
            count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of captures taken so far.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.count)
    }
}

#[async_trait]
impl ScreenCapture for FixedCapture {
    async fn capture(&self, region: Option<Region>) -> DeskPilotResult<RgbImage> {
        self.count.fetch_add(1, Ordering::SeqCst);
        let image = self
            .image
            .clone()
            .ok_or_else(|| DeskPilotError::Capture("no display".into()))?;
        crate::perception::screenshot::crop_to_region(image, region)
    }
}

/// Answers extraction calls from a script. `Err` entries become
/// extraction errors. Past the end of the script it answers with empty
/// text, or starts over when built with [`ScriptedExtractor::repeating`].
pub struct ScriptedExtractor {
    script: Vec<Result<String, String>>,
    repeat: bool,
    next: AtomicUsize,
    crops: Mutex<Vec<(u32, u32)>>,
}

impl ScriptedExtractor {
    pub fn new(script: Vec<Result<String, String>>) -> Self {
        Self {
            script,
            repeat: false,
            next: AtomicUsize::new(0),
            crops: Mutex::new(Vec::new()),
        }
    }

    pub fn repeating(script: Vec<Result<String, String>>) -> Self {
        Self {
            repeat: true,
            ..Self::new(script)
        }
    }

    /// Dimensions of every crop received, in call order.
    pub fn crop_sizes(&self) -> Vec<(u32, u32)> {
        self.crops.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextExtractor for ScriptedExtractor {
    async fn extract_text(&self, image: &RgbImage) -> DeskPilotResult<String> {
        self.crops.lock().unwrap().push(image.dimensions());
        let i = self.next.fetch_add(1, Ordering::SeqCst);
        let entry = if self.repeat && !self.script.is_empty() {
            self.script.get(i % self.script.len())
        } else {
            self.script.get(i)
        };
        match entry {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(e)) => Err(DeskPilotError::TextExtraction(e.clone())),
            None => Ok(String::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorCall {
    MoveTo(i32, i32),
    Click(Option<(i32, i32)>, MouseButton),
    TypeText(String),
    PressKey(String),
    Hotkey(Vec<String>),
    Scroll(ScrollDirection, i32),
    LaunchProcess(String),
}

/// Records every call, including the ones it is told to fail.
#[derive(Default)]
pub struct RecordingActuator {
    calls: Mutex<Vec<ActuatorCall>>,
    fail_hotkeys: bool,
    failing_keys: Vec<String>,
    /// `None` lets every program launch.
    launchable: Option<Vec<String>>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_hotkeys(mut self) -> Self {
        self.fail_hotkeys = true;
        self
    }

    pub fn failing_key(mut self, key: &str) -> Self {
        self.failing_keys.push(key.to_string());
        self
    }

    /// Only these programs launch; everything else is not found.
    pub fn launchable(mut self, programs: &[&str]) -> Self {
        self.launchable = Some(programs.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn calls(&self) -> Vec<ActuatorCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: ActuatorCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Actuator for RecordingActuator {
    async fn move_to(&self, x: i32, y: i32, _duration: Duration) -> DeskPilotResult<()> {
        self.record(ActuatorCall::MoveTo(x, y));
        Ok(())
    }

    async fn click(&self, at: Option<(i32, i32)>, button: MouseButton) -> DeskPilotResult<()> {
        self.record(ActuatorCall::Click(at, button));
        Ok(())
    }

    async fn type_text(&self, text: &str, _interval: Duration) -> DeskPilotResult<()> {
        self.record(ActuatorCall::TypeText(text.to_string()));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> DeskPilotResult<()> {
        self.record(ActuatorCall::PressKey(key.to_string()));
        if self.failing_keys.iter().any(|k| k == key) {
            return Err(DeskPilotError::Executor(format!("key '{key}' rejected")));
        }
        Ok(())
    }

    async fn hotkey(&self, keys: &[String]) -> DeskPilotResult<()> {
        self.record(ActuatorCall::Hotkey(keys.to_vec()));
        if self.fail_hotkeys {
            return Err(DeskPilotError::Executor("hotkey rejected".into()));
        }
        Ok(())
    }

    async fn scroll(&self, direction: ScrollDirection, amount: i32) -> DeskPilotResult<()> {
        self.record(ActuatorCall::Scroll(direction, amount));
        Ok(())
    }

    async fn launch_process(&self, program: &str) -> DeskPilotResult<()> {
        self.record(ActuatorCall::LaunchProcess(program.to_string()));
        match &self.launchable {
            Some(ok) if !ok.iter().any(|p| p == program) => {
                Err(DeskPilotError::ProgramNotFound(program.to_string()))
            }
            _ => Ok(()),
        }
    }
}

type ReasonFn = dyn Fn(&str) -> DeskPilotResult<String> + Send + Sync;

/// Reasoning service answering through a closure over the user prompt.
pub struct ScriptedReasoner {
    answer: Box<ReasonFn>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedReasoner {
    pub fn from_fn(f: impl Fn(&str) -> DeskPilotResult<String> + Send + Sync + 'static) -> Self {
        Self {
            answer: Box::new(f),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReasoningService for ScriptedReasoner {
    async fn complete(&self, _system: &str, user: &str) -> DeskPilotResult<String> {
        self.prompts.lock().unwrap().push(user.to_string());
        (self.answer)(user)
    }
}
