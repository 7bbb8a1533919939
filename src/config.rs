use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{DeskPilotError, DeskPilotResult};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub perception: PerceptionConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub plan: PlanConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmConfig {
    #[serde(default)]
    pub active_provider: String,
    #[serde(default)]
    pub providers: HashMap<String, ProviderEntry>,
    /// Role-to-model mapping. If a role is absent, falls back to active_provider defaults.
    #[serde(default)]
    pub roles: RolesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub display_name: String,
    /// Full chat-completions endpoint URL.
    pub api_base: String,
    /// Default model for this provider (used as fallback when no role config exists).
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Optional API key stored in config.toml (env var DESKPILOT_<ID>_API_KEY wins).
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub stream: bool,
}

/// Maps reasoning roles to specific provider+model combinations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RolesConfig {
    /// Breaks a whole task into ordered steps.
    pub planning: Option<RoleEntry>,
    /// Translates a single unmatched step into basic operations.
    pub interpretation: Option<RoleEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleEntry {
    /// Must match a key under [llm.providers.*].
    pub provider: String,
    /// Model name sent to the API.
    pub model: String,
    #[serde(default)]
    pub stream: bool,
    /// Overrides the provider-level temperature for this role.
    pub temperature: Option<f64>,
}

fn default_temperature() -> f64 {
    0.1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    /// Intersection over the smaller area above which a candidate is dropped.
    pub overlap_threshold: f64,
    /// When set, the last raw and annotated screenshots are written here.
    pub debug_dir: Option<PathBuf>,
    pub ocr_command: String,
    pub ocr_language: String,
    pub ocr_psm: u32,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            overlap_threshold: 0.7,
            debug_dir: None,
            ocr_command: "tesseract".into(),
            ocr_language: "eng".into(),
            ocr_psm: 6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub type_interval_ms: u64,
    /// Pointer glide before each click.
    pub move_duration_ms: u64,
    /// Pause between focusing a field and typing into it.
    pub field_settle_ms: u64,
    pub app_launch_settle_ms: u64,
    pub default_scroll_amount: i32,
    /// Tried in order by the run-terminal fallback chain.
    pub terminal_candidates: Vec<String>,
    /// Recursion cap for reasoning-service sub-steps.
    pub max_reasoning_depth: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            type_interval_ms: 10,
            move_duration_ms: 500,
            field_settle_ms: 500,
            app_launch_settle_ms: 2000,
            default_scroll_amount: 5,
            terminal_candidates: vec![
                "x-terminal-emulator".into(),
                "gnome-terminal".into(),
                "konsole".into(),
                "xfce4-terminal".into(),
                "xterm".into(),
            ],
            max_reasoning_depth: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// Pause before each step so the operator can follow along.
    pub step_delay_ms: u64,
    /// 0 disables the limit.
    pub max_consecutive_failures: u32,
    pub abort_on_failure: bool,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            step_delay_ms: 1000,
            max_consecutive_failures: 5,
            abort_on_failure: false,
        }
    }
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Some(candidate);
            }
        }
    }

    let candidate = std::env::current_dir().ok()?.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Some(candidate);
    }
    None
}

/// Load the config from `explicit` or the default search locations.
///
/// An explicit path must exist. Without one, a missing file means the
/// built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> DeskPilotResult<AppConfig> {
    let path = match explicit {
        Some(p) if !p.exists() => {
            return Err(DeskPilotError::Config(format!("{} does not exist", p.display())));
        }
        Some(p) => p.to_path_buf(),
        None => match resolve_config_path() {
            Some(p) => p,
            None => {
                tracing::info!("no config.toml found, using defaults");
                return Ok(AppConfig::default());
            }
        },
    };
    let content = std::fs::read_to_string(&path)?;
    let config: AppConfig = toml::from_str(&content)?;
    tracing::info!(
        path = %path.display(),
        provider = %config.llm.active_provider,
        "config loaded"
    );
    Ok(config)
}

pub fn save_config(config: &AppConfig, path: &Path) -> DeskPilotResult<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}
