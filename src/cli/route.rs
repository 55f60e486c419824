//! CLI route: run context and command dispatch.

use crate::cli::ledger_file::{load_ledger, save_ledger};
use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_ledger_json, format_ledger_text, format_plan_json, format_plan_text,
    format_sync_report,
};
use crate::config::{ConfigLoader, SyncConfig};
use crate::content::{ContentSource, DirectoryContentSource};
use crate::discovery::{BindTarget, DesiredEmotes};
use crate::emote::{Handle, SlotId};
use crate::error::SyncError;
use crate::manifest::EmoteManifest;
use crate::registry::{HttpRegistryClient, RegistryClient};
use crate::sync::EmoteSynchronizer;
use anyhow::Context;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Exit code when a sync completed but some keys failed to reconcile
pub const EXIT_PARTIAL: i32 = 2;

/// Text to print and the process exit code
#[derive(Debug)]
pub struct CommandOutput {
    pub text: String,
    pub exit_code: i32,
}

impl CommandOutput {
    fn success(text: String) -> Self {
        Self { text, exit_code: 0 }
    }
}

/// Runtime context for CLI execution: workspace root and loaded configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: SyncConfig,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, SyncError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        Ok(Self::with_config(workspace_root, config.validated()?))
    }

    pub fn with_config(workspace_root: PathBuf, config: SyncConfig) -> Self {
        Self {
            workspace_root,
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Execute a command and return its output
    pub fn execute(&self, command: &Commands) -> anyhow::Result<CommandOutput> {
        let start = Instant::now();
        info!(command = command.name(), "Executing command");

        let output = match command {
            Commands::Sync { manifest, ledger } => {
                self.sync(manifest.as_deref(), ledger.as_deref())?
            }
            Commands::Plan {
                manifest,
                ledger,
                format,
            } => self.plan(manifest.as_deref(), ledger.as_deref(), format)?,
            Commands::Status { ledger, format } => self.status(ledger.as_deref(), format)?,
        };

        info!(
            command = command.name(),
            exit_code = output.exit_code,
            duration_ms = start.elapsed().as_millis(),
            "Command finished"
        );
        Ok(output)
    }

    fn sync(
        &self,
        manifest: Option<&Path>,
        ledger: Option<&Path>,
    ) -> anyhow::Result<CommandOutput> {
        let manifest = self.load_manifest(manifest)?;
        let ledger_path = self.ledger_path(ledger);
        let mut ledger = load_ledger(&ledger_path)?;

        let bindings = Arc::new(Mutex::new(Vec::new()));
        let desired = manifest.to_desired(|slot| printing_sink(slot, &bindings));
        let synchronizer = self.synchronizer()?;

        let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
        let result = runtime.block_on(synchronizer.synchronize(&desired, &mut ledger));

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                if !e.is_pre_mutation() {
                    // Remote state may already have moved; keep what the ledger learned.
                    save_ledger(&ledger_path, &ledger)?;
                }
                return Err(e.into());
            }
        };
        save_ledger(&ledger_path, &ledger)?;

        let text = format_sync_report(&report, &bindings.lock());
        let exit_code = if report.is_converged() { 0 } else { EXIT_PARTIAL };
        if exit_code != 0 {
            warn!(failures = report.failures.len(), "Sync finished with failures");
        }
        Ok(CommandOutput { text, exit_code })
    }

    fn plan(
        &self,
        manifest: Option<&Path>,
        ledger: Option<&Path>,
        format: &str,
    ) -> anyhow::Result<CommandOutput> {
        let manifest = self.load_manifest(manifest)?;
        let ledger = load_ledger(&self.ledger_path(ledger))?;
        let desired: DesiredEmotes = manifest.to_desired(|_| noop_sink());
        let synchronizer = self.synchronizer()?;

        let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
        let plan = runtime.block_on(synchronizer.plan(&desired, &ledger))?;

        let text = match format {
            "json" => format_plan_json(&plan)?,
            _ => format_plan_text(&plan),
        };
        Ok(CommandOutput::success(text))
    }

    fn status(&self, ledger: Option<&Path>, format: &str) -> anyhow::Result<CommandOutput> {
        let ledger = load_ledger(&self.ledger_path(ledger))?;
        let text = match format {
            "json" => format_ledger_json(&ledger)?,
            _ => format_ledger_text(&ledger),
        };
        Ok(CommandOutput::success(text))
    }

    fn load_manifest(&self, path: Option<&Path>) -> anyhow::Result<EmoteManifest> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => self.config.manifest_path(&self.workspace_root),
        };
        Ok(EmoteManifest::load(&path)?)
    }

    fn ledger_path(&self, path: Option<&Path>) -> PathBuf {
        match path {
            Some(path) => path.to_path_buf(),
            None => self.config.ledger_path(&self.workspace_root),
        }
    }

    fn synchronizer(&self) -> anyhow::Result<EmoteSynchronizer> {
        let content: Arc<dyn ContentSource> = Arc::new(
            DirectoryContentSource::new(self.config.content_directory(&self.workspace_root))
                .with_extensions(self.config.content.extensions.clone()),
        );
        let http_config = self.config.registry.to_http_config()?;
        let registry: Arc<dyn RegistryClient> = Arc::new(
            HttpRegistryClient::new(http_config).context("Failed to build registry client")?,
        );
        Ok(EmoteSynchronizer::new(content, registry))
    }
}

/// Sink that records `slot → handle` for the command output
fn printing_sink(slot: &SlotId, lines: &Arc<Mutex<Vec<String>>>) -> BindTarget {
    let slot = slot.clone();
    let lines = Arc::clone(lines);
    Arc::new(move |handle: &Handle| lines.lock().push(format!("{} → {}", slot, handle)))
}

fn noop_sink() -> BindTarget {
    Arc::new(|_: &Handle| {})
}
