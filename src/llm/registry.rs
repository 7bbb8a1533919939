use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{AppConfig, LlmConfig, ProviderEntry};
use crate::errors::{DeskPilotError, DeskPilotResult};
use crate::llm::provider::LlmProvider;
use crate::llm::providers::openai_compatible::OpenAiCompatibleProvider;
use crate::llm::reasoner::{LlmReasoner, ReasoningService};
use crate::llm::types::CallConfig;

/// Shared fallback key, used when neither the provider-specific variable
/// nor the config file carries one.
const SHARED_KEY_VAR: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmRole {
    Planning,
    Interpretation,
}

impl LlmRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Interpretation => "interpretation",
        }
    }
}

/// Registry of all available LLM providers, keyed by their config.toml identifier.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    active: String,
    /// Kept for role-to-model lookups.
    llm_config: LlmConfig,
}

impl ProviderRegistry {
    pub fn new(active: String) -> Self {
        Self {
            providers: HashMap::new(),
            active,
            llm_config: LlmConfig::default(),
        }
    }

    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn get_active(&self) -> DeskPilotResult<Arc<dyn LlmProvider>> {
        self.providers.get(&self.active).cloned().ok_or_else(|| {
            DeskPilotError::Config(format!("Active provider '{}' not found in registry", self.active))
        })
    }

    /// Return the provider and call configuration for a role.
    ///
    /// Resolution order:
    /// 1. `[llm.roles.<role>]` in config.toml
    /// 2. the active provider with its own model, temperature and stream flag
    pub fn call_config_for_role(&self, role: LlmRole) -> DeskPilotResult<(Arc<dyn LlmProvider>, CallConfig)> {
        let role_entry = match role {
            LlmRole::Planning => self.llm_config.roles.planning.as_ref(),
            LlmRole::Interpretation => self.llm_config.roles.interpretation.as_ref(),
        };

        if let Some(entry) = role_entry {
            let provider = self.providers.get(&entry.provider).cloned().ok_or_else(|| {
                DeskPilotError::Config(format!(
                    "Role '{}' references unknown provider '{}'",
                    role.as_str(),
                    entry.provider
                ))
            })?;
            let temperature = entry.temperature.unwrap_or_else(|| {
                self.llm_config
                    .providers
                    .get(&entry.provider)
                    .map(|p| p.temperature)
                    .unwrap_or(0.1)
            });
            tracing::debug!(
                role = role.as_str(),
                provider = %entry.provider,
                model = %entry.model,
                stream = entry.stream,
                temperature,
                "resolved role config"
            );
            return Ok((
                provider,
                CallConfig {
                    model: entry.model.clone(),
                    stream: entry.stream,
                    temperature,
                },
            ));
        }

        let provider = self.get_active()?;
        let (model, stream, temperature) = self
            .llm_config
            .providers
            .get(&self.active)
            .map(|p| (p.model.clone(), p.stream, p.temperature))
            .unwrap_or_else(|| (String::new(), false, 0.1));
        tracing::debug!(
            role = role.as_str(),
            provider = %self.active,
            model = %model,
            "role not configured, using active provider"
        );
        Ok((provider, CallConfig { model, stream, temperature }))
    }

    /// Reasoning service for `role`, or `None` when nothing usable is
    /// configured.
    pub fn reasoner_for_role(&self, role: LlmRole) -> Option<Arc<dyn ReasoningService>> {
        if self.is_empty() {
            return None;
        }
        match self.call_config_for_role(role) {
            Ok((provider, call)) => Some(Arc::new(LlmReasoner::new(provider, call))),
            Err(e) => {
                tracing::warn!(role = role.as_str(), "no reasoning service: {e}");
                None
            }
        }
    }

    /// Build a registry from the loaded app config. Providers without an
    /// API key are skipped.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut registry = Self {
            providers: HashMap::new(),
            active: config.llm.active_provider.clone(),
            llm_config: config.llm.clone(),
        };
        for (id, entry) in &config.llm.providers {
            let Some(api_key) = resolve_api_key(id, entry, |k| std::env::var(k).ok()) else {
                tracing::warn!(provider = %id, "no API key, provider not registered");
                continue;
            };
            let provider = OpenAiCompatibleProvider::new(id.clone(), entry.api_base.clone(), api_key);
            registry.register(Arc::new(provider));
        }
        tracing::info!(providers = ?registry.list_names(), active = %registry.active, "LLM registry ready");
        registry
    }
}

/// `DESKPILOT_<ID>_API_KEY`, then the config value, then the shared key.
fn resolve_api_key(
    id: &str,
    entry: &ProviderEntry,
    env: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env(&format!("DESKPILOT_{}_API_KEY", id.to_uppercase()))
        .or_else(|| entry.api_key.clone())
        .or_else(|| env(SHARED_KEY_VAR))
        .filter(|k| !k.trim().is_empty())
}
