//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use kickstore_commerce::config::CommerceConfig;

use crate::output::Output;

/// File names searched, in order, in each directory up the tree.
pub const CONFIG_NAMES: [&str; 3] = ["kickstore.toml", ".kickstore.toml", "kickstore.json"];

/// Execution context for CLI commands.
pub struct Context {
    /// Storefront configuration.
    pub config: CommerceConfig,
    /// Where the configuration came from, if a file was found.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Load context from an explicit config file or the nearest one up the tree.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (config, config_path) = if let Some(path) = config_path {
            let config = CommerceConfig::load(path)
                .with_context(|| format!("Failed to load config: {}", path))?;
            (config, Some(PathBuf::from(path)))
        } else {
            match find_config(&cwd) {
                Some((config, path)) => (config, Some(path)),
                None => (CommerceConfig::default(), None),
            }
        };

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
        })
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        if Path::new(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.cwd.join(path)
        }
    }
}

/// Find a config file in the directory tree.
fn find_config(start: &Path) -> Option<(CommerceConfig, PathBuf)> {
    let mut current = start.to_path_buf();
    loop {
        for name in &CONFIG_NAMES {
            let candidate = current.join(name);
            if candidate.exists() {
                match CommerceConfig::load(&candidate) {
                    Ok(config) => return Some((config, candidate)),
                    Err(e) => {
                        tracing::warn!(path = %candidate.display(), error = %e, "ignoring unreadable config")
                    }
                }
            }
        }

        if !current.pop() {
            return None;
        }
    }
}
