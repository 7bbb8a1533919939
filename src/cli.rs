//! Command-line front end.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::agent_engine::engine::AgentEngine;
use crate::agent_engine::planner::TaskPlanner;
use crate::agent_engine::state::TaskStatus;
use crate::config::{load_config, save_config, AppConfig};
use crate::errors::{DeskPilotError, DeskPilotResult};
use crate::executor::dispatcher::StepDispatcher;
use crate::executor::input::EnigoActuator;
use crate::executor::rules::RuleTable;
use crate::llm::registry::{LlmRole, ProviderRegistry};
use crate::perception::ocr::TesseractExtractor;
use crate::perception::pipeline::{ScreenAnalyzer, ScreenState};
use crate::perception::screenshot::XcapCapture;

/// Desktop automation from plain-language instructions.
///
/// Detects UI elements on screen, reads their text and drives mouse and
/// keyboard to carry out steps such as "click Submit" or "type hello into
/// Search".
#[derive(Debug, Parser)]
#[command(name = "deskpilot", version)]
pub struct Cli {
    /// Path to config.toml [default: next to the executable, then the working directory]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Plan a task and execute it step by step
    #[command(after_help = "\
Examples:
  deskpilot run \"open firefox and search for rust\"
  deskpilot run --events \"log in\"       # Progress events as JSON lines

Ctrl-C stops the task after the current step.")]
    Run {
        task: String,
        /// Print progress events as JSON lines
        #[arg(long)]
        events: bool,
    },

    /// Interpret and execute a single instruction
    #[command(after_help = "\
Examples:
  deskpilot step \"click Submit\"
  deskpilot step \"type hello into Search\"
  deskpilot step \"press ctrl+s\"")]
    Step { instruction: String },

    /// Analyze the screen and print the detected elements
    Analyze {
        /// Write the raw and annotated screenshots here
        #[arg(long)]
        debug_dir: Option<PathBuf>,
    },

    /// Write a config file with every default filled in
    InitConfig {
        #[arg(default_value = "config.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn execute(cli: Cli) -> DeskPilotResult<()> {
    if let Commands::InitConfig { path, force } = &cli.command {
        return init_config(path, *force);
    }

    let mut config = load_config(cli.config.as_deref())?;
    let registry = ProviderRegistry::from_config(&config);

    match cli.command {
        Commands::Run { task, events } => {
            let dispatcher = build_dispatcher(&config, &registry)?;
            run_task(&config, &registry, dispatcher, task, events).await
        }
        Commands::Step { instruction } => {
            let dispatcher = build_dispatcher(&config, &registry)?;
            if dispatcher.interpret(&instruction).await {
                println!("ok: {instruction}");
                Ok(())
            } else {
                Err(DeskPilotError::Agent(format!("could not carry out: {instruction}")))
            }
        }
        Commands::Analyze { debug_dir } => {
            if debug_dir.is_some() {
                config.perception.debug_dir = debug_dir;
            }
            let screen = build_screen(&config);
            let table = screen.refresh().await;
            println!("{}", table.describe());
            Ok(())
        }
        Commands::InitConfig { .. } => Ok(()),
    }
}

fn init_config(path: &Path, force: bool) -> DeskPilotResult<()> {
    if path.exists() && !force {
        return Err(DeskPilotError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    save_config(&AppConfig::default(), path)?;
    println!("wrote {}", path.display());
    Ok(())
}

fn build_screen(config: &AppConfig) -> Arc<ScreenState> {
    let analyzer = ScreenAnalyzer::new(
        Arc::new(XcapCapture::new()),
        Arc::new(TesseractExtractor::from_config(&config.perception)),
        &config.perception,
    );
    Arc::new(ScreenState::new(Arc::new(analyzer)))
}

fn build_dispatcher(config: &AppConfig, registry: &ProviderRegistry) -> DeskPilotResult<Arc<StepDispatcher>> {
    let dispatcher = StepDispatcher::new(
        RuleTable::builtin()?,
        Arc::new(EnigoActuator::new()),
        build_screen(config),
        config.executor.clone(),
    )
    .with_reasoner(registry.reasoner_for_role(LlmRole::Interpretation));
    Ok(Arc::new(dispatcher))
}

async fn run_task(
    config: &AppConfig,
    registry: &ProviderRegistry,
    dispatcher: Arc<StepDispatcher>,
    task: String,
    print_events: bool,
) -> DeskPilotResult<()> {
    let planner = TaskPlanner::new(registry.reasoner_for_role(LlmRole::Planning));
    let engine = Arc::new(AgentEngine::new(planner, dispatcher, config.plan.clone()));

    if print_events {
        let mut rx = engine.subscribe();
        tokio::spawn(async move {
            while let Ok(msg) = rx.recv().await {
                match serde_json::to_string(&msg) {
                    Ok(line) => println!("{line}"),
                    Err(e) => tracing::warn!("unprintable event: {e}"),
                }
            }
        });
    }

    let handle = engine.spawn(task);
    let cancel = handle.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current step");
            cancel.cancel();
        }
    });

    let report = handle.wait().await?;
    println!("{}", report.summary());
    match report.status {
        TaskStatus::Completed => Ok(()),
        TaskStatus::Cancelled => Err(DeskPilotError::Cancelled),
        status => Err(DeskPilotError::Agent(format!("task ended as {status:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_global_config() {
        let cli = Cli::try_parse_from(["deskpilot", "run", "open mail", "--config", "/tmp/c.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        match cli.command {
            Commands::Run { task, events } => {
                assert_eq!(task, "open mail");
                assert!(!events);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_step_and_analyze() {
        let cli = Cli::try_parse_from(["deskpilot", "step", "click Submit"]).unwrap();
        assert!(matches!(cli.command, Commands::Step { ref instruction } if instruction == "click Submit"));

        let cli = Cli::try_parse_from(["deskpilot", "analyze", "--debug-dir", "out"]).unwrap();
        assert!(matches!(cli.command, Commands::Analyze { debug_dir: Some(_) }));
    }

    #[test]
    fn init_config_defaults_to_local_file() {
        let cli = Cli::try_parse_from(["deskpilot", "init-config"]).unwrap();
        match cli.command {
            Commands::InitConfig { path, force } => {
                assert_eq!(path, PathBuf::from("config.toml"));
                assert!(!force);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn init_config_refuses_to_overwrite() {
        let dir = std::env::temp_dir().join(format!("deskpilot-cli-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        init_config(&path, false).unwrap();
        assert!(matches!(init_config(&path, false), Err(DeskPilotError::Config(_))));
        init_config(&path, true).unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.plan.step_delay_ms, 1000);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn default_config_builds_a_dispatcher() {
        let config = AppConfig::default();
        let registry = ProviderRegistry::from_config(&config);
        assert!(build_dispatcher(&config, &registry).is_ok());
    }

    #[test]
    fn step_requires_an_instruction() {
        assert!(Cli::try_parse_from(["deskpilot", "step"]).is_err());
    }
}
