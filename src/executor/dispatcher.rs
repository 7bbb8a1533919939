//! Step interpretation.
//!
//! A free-text step goes through three stages, stopping at the first that
//! applies:
//!
//! 1. the ordered pattern table (first match wins, its handler decides);
//! 2. the reasoning service, whose answer is split into lines that are
//!    interpreted recursively;
//! 3. a heuristic search of the element table for any word of the step
//!    longer than three characters, re-analysing the screen once when the
//!    latest snapshot has no match.
//!
//! Stage 2 ANDs the sub-results but always runs every sub-step, even after
//! one has failed.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};

use crate::config::ExecutorConfig;
use crate::errors::DeskPilotResult;
use crate::executor::input::{Actuator, MouseButton, ScrollDirection};
use crate::executor::keys::split_combo;
use crate::executor::rules::{Action, RuleMatch, RuleTable};
use crate::executor::terminal::TerminalLauncher;
use crate::llm::reasoner::{interpret_prompt, ReasoningService, INTERPRET_SYSTEM_PROMPT};
use crate::perception::pipeline::ScreenState;
use crate::perception::types::{Element, ElementTable};

/// Words the feedback handler looks for, highest priority first.
pub const FEEDBACK_KEYWORDS: &[&str] = &[
    "submit", "ok", "yes", "continue", "next", "start", "login", "sign in", "search", "send",
    "apply",
];

const SEARCH_LABEL: &str = "Search";
const MIN_HEURISTIC_TOKEN_LEN: usize = 4;

pub struct StepDispatcher {
    rules: RuleTable,
    actuator: Arc<dyn Actuator>,
    screen: Arc<ScreenState>,
    reasoner: Option<Arc<dyn ReasoningService>>,
    terminal: TerminalLauncher,
    config: ExecutorConfig,
}

impl StepDispatcher {
    pub fn new(
        rules: RuleTable,
        actuator: Arc<dyn Actuator>,
        screen: Arc<ScreenState>,
        config: ExecutorConfig,
    ) -> Self {
        let terminal = TerminalLauncher::new(
            config.terminal_candidates.clone(),
            Duration::from_millis(config.field_settle_ms),
            Duration::from_millis(config.type_interval_ms),
        );
        Self {
            rules,
            actuator,
            screen,
            reasoner: None,
            terminal,
            config,
        }
    }

    pub fn with_reasoner(mut self, reasoner: Option<Arc<dyn ReasoningService>>) -> Self {
        self.reasoner = reasoner;
        self
    }

    pub fn screen(&self) -> &Arc<ScreenState> {
        &self.screen
    }

    /// Interpret and execute one step. `true` when it was carried out.
    pub async fn interpret(&self, step: &str) -> bool {
        self.interpret_at_depth(step, 0).await
    }

    fn interpret_at_depth<'a>(&'a self, step: &'a str, depth: usize) -> BoxFuture<'a, bool> {
        async move {
            let step = step.trim();
            tracing::info!(step, depth, "interpreting step");

            if let Some(m) = self.rules.resolve(step) {
                tracing::debug!(action = ?m.action, args = ?m.args, "pattern matched");
                return self.run_action(&m).await;
            }

            if let Some(reasoner) = &self.reasoner {
                if depth < self.config.max_reasoning_depth {
                    if let Some(ok) = self.reason(reasoner.as_ref(), step, depth).await {
                        return ok;
                    }
                } else {
                    tracing::warn!(step, depth, "reasoning depth limit reached");
                }
            }

            tracing::warn!(step, "no pattern matched, searching screen for its words");
            self.heuristic(step).await
        }
        .boxed()
    }

    /// `None` when the service failed or had nothing to say.
    async fn reason(&self, reasoner: &dyn ReasoningService, step: &str, depth: usize) -> Option<bool> {
        let answer = match reasoner
            .complete(INTERPRET_SYSTEM_PROMPT, &interpret_prompt(step))
            .await
        {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(step, "reasoning service failed: {e}");
                return None;
            }
        };

        let sub_steps: Vec<&str> = answer.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        if sub_steps.is_empty() {
            tracing::warn!(step, "reasoning service returned nothing");
            return None;
        }

        tracing::info!(step, sub_steps = sub_steps.len(), "step expanded by reasoning service");
        let mut all_ok = true;
        for sub in sub_steps {
            // Every sub-step runs, even after a failure.
            let ok = self.interpret_at_depth(sub, depth + 1).await;
            if !ok {
                tracing::warn!(sub_step = sub, "sub-step failed");
            }
            all_ok &= ok;
        }
        Some(all_ok)
    }

    async fn heuristic(&self, step: &str) -> bool {
        let words: Vec<&str> = step
            .split_whitespace()
            .filter(|w| w.chars().count() >= MIN_HEURISTIC_TOKEN_LEN)
            .collect();
        if words.is_empty() {
            tracing::error!(step, "could not interpret step");
            return false;
        }

        let mut target = find_any_word(&*self.screen.snapshot().await, &words);
        if target.is_none() {
            tracing::debug!(step, "no word of the step in snapshot, re-analysing screen");
            target = find_any_word(&*self.screen.refresh().await, &words);
        }
        match target {
            Some(element) => self.click_element(&element).await,
            None => {
                tracing::error!(step, "could not interpret step");
                false
            }
        }
    }

    async fn run_action(&self, m: &RuleMatch) -> bool {
        match m.action {
            Action::Click => match m.arg(0) {
                Some(text) => self.click_text(text).await,
                None => false,
            },
            Action::TypeInto => match (m.arg(0), m.arg(1)) {
                (Some(text), Some(field)) => self.type_into(text, field).await,
                _ => false,
            },
            Action::PressKey => match m.arg(0) {
                Some(key) => self.press(key).await,
                None => false,
            },
            Action::RunTerminal => self.terminal.launch(self.actuator.as_ref()).await.is_some(),
            Action::OpenApplication => match m.arg(0) {
                Some(app) => self.open_application(app).await,
                None => false,
            },
            Action::Wait => match m.arg(0) {
                Some(secs) => self.wait(secs).await,
                None => false,
            },
            Action::Scroll => match m.arg(0).and_then(ScrollDirection::parse) {
                Some(direction) => self.scroll(direction, m.arg(1)).await,
                None => false,
            },
            Action::Search => match m.arg(0) {
                Some(query) => self.search(query).await,
                None => false,
            },
            Action::AnalyzeScreen => {
                let table = self.screen.refresh().await;
                tracing::info!("{}", table.describe());
                true
            }
            Action::ActOnFeedback => self.act_on_feedback().await,
        }
    }

    fn succeeded(&self, what: &str, result: DeskPilotResult<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("{what} failed: {e}");
                false
            }
        }
    }

    async fn click_element(&self, element: &Element) -> bool {
        let (x, y) = element.center();
        let glide = Duration::from_millis(self.config.move_duration_ms);
        if !self.succeeded("pointer move", self.actuator.move_to(x, y, glide).await) {
            return false;
        }
        let result = self.actuator.click(Some((x, y)), MouseButton::Left).await;
        self.succeeded("click", result)
    }

    async fn click_text(&self, text: &str) -> bool {
        match self.screen.find_or_refresh(text).await {
            Some(element) => self.click_element(&element).await,
            None => {
                tracing::warn!(text, "no element with this text");
                false
            }
        }
    }

    async fn type_into(&self, text: &str, field: &str) -> bool {
        if !self.click_text(field).await {
            tracing::error!(field, "could not find field");
            return false;
        }
        tokio::time::sleep(Duration::from_millis(self.config.field_settle_ms)).await;
        self.type_text(text).await
    }

    async fn type_text(&self, text: &str) -> bool {
        let interval = Duration::from_millis(self.config.type_interval_ms);
        let result = self.actuator.type_text(text, interval).await;
        self.succeeded("typing", result)
    }

    /// A single key, or a combination written as "ctrl+c".
    async fn press(&self, key: &str) -> bool {
        let keys = split_combo(key);
        let result = if keys.len() > 1 {
            self.actuator.hotkey(&keys).await
        } else {
            self.actuator.press_key(key).await
        };
        self.succeeded("key press", result)
    }

    async fn open_application(&self, app: &str) -> bool {
        let program = app.to_lowercase();
        if !self.succeeded("launch", self.actuator.launch_process(&program).await) {
            return false;
        }
        tracing::info!(program = %program, "application launched");
        tokio::time::sleep(Duration::from_millis(self.config.app_launch_settle_ms)).await;
        true
    }

    async fn wait(&self, secs: &str) -> bool {
        match secs.parse::<u64>() {
            Ok(secs) => {
                tracing::info!(secs, "waiting");
                tokio::time::sleep(Duration::from_secs(secs)).await;
                true
            }
            Err(e) => {
                tracing::error!(secs, "invalid wait time: {e}");
                false
            }
        }
    }

    async fn scroll(&self, direction: ScrollDirection, amount: Option<&str>) -> bool {
        let amount = match amount.map(str::parse::<i32>) {
            None => self.config.default_scroll_amount,
            Some(Ok(n)) => n,
            Some(Err(e)) => {
                tracing::error!("invalid scroll amount: {e}");
                return false;
            }
        };
        let result = self.actuator.scroll(direction, amount).await;
        self.succeeded("scroll", result)
    }

    async fn search(&self, query: &str) -> bool {
        if let Some(field) = self.screen.find_or_refresh(SEARCH_LABEL).await {
            if !self.click_element(&field).await {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(self.config.field_settle_ms)).await;
        } else {
            tracing::debug!("no search field, typing into the focused window");
        }
        if !self.type_text(query).await {
            return false;
        }
        self.press("enter").await
    }

    async fn act_on_feedback(&self) -> bool {
        let table = self.screen.refresh().await;
        match pick_feedback_target(&table) {
            Some(element) => {
                tracing::info!(id = element.id, text = %element.text, "acting on screen feedback");
                self.click_element(element).await
            }
            None => {
                tracing::warn!("no element with text to act on");
                false
            }
        }
    }
}

/// First element containing any of `words`, trying the words in order.
fn find_any_word(table: &ElementTable, words: &[&str]) -> Option<Element> {
    words.iter().find_map(|word| {
        let element = table.find_by_text(word)?;
        tracing::info!(word, id = element.id, "element found by word");
        Some(element.clone())
    })
}

/// The element to click after looking at the screen: the first element
/// containing the highest-priority keyword, else the first element with
/// any text.
pub fn pick_feedback_target(table: &ElementTable) -> Option<&Element> {
    FEEDBACK_KEYWORDS
        .iter()
        .find_map(|kw| table.find_by_text(kw))
        .or_else(|| table.elements.iter().find(|e| e.has_text()))
}
