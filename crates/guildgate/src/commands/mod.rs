//! CLI command handlers.

pub mod check;
pub mod serve;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use guildgate_config::{ResolvedConfig, load_config, load_config_file, process_env};
use tracing_appender::non_blocking::WorkerGuard;

use crate::logging;

/// Shared context for all commands.
pub struct Context {
    /// Validated configuration.
    pub config: ResolvedConfig,
    /// Config files that contributed to `config`.
    pub sources: Vec<PathBuf>,
    /// Verbose output enabled.
    pub verbose: bool,
    _log_guard: Option<WorkerGuard>,
}

impl Context {
    /// Load, merge and resolve configuration, then start logging.
    pub fn load(explicit: Option<&Path>, verbose: bool) -> Result<Self> {
        let (config, sources, load_warnings) = match explicit {
            Some(path) => {
                let config = load_config_file(path)
                    .with_context(|| format!("loading {}", path.display()))?;
                (config, vec![path.to_path_buf()], Vec::new())
            }
            None => {
                let loaded = load_config(None)?;
                let sources = loaded
                    .loaded_from()
                    .into_iter()
                    .map(Path::to_path_buf)
                    .collect();
                (loaded.config, sources, loaded.warnings)
            }
        };

        let resolved = config
            .resolve(&process_env)
            .context("invalid configuration")?;

        let guard = logging::init(&resolved.logging, verbose);

        for path in &sources {
            tracing::debug!(path = %path.display(), "Loaded config file");
        }
        for warning in load_warnings.iter().chain(&resolved.warnings) {
            tracing::warn!("{}", warning);
        }

        Ok(Self {
            config: resolved,
            sources,
            verbose,
            _log_guard: guard,
        })
    }
}
