//! Configuration loader with tier-based merging.
//!
//! Loads configuration from multiple tiers and merges them field-by-field.

use super::merge::deep_merge_all;
use super::types::Config;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// Built-in defaults (lowest priority)
    Defaults = 0,
    /// Project-level config ($CWD/task-manager/)
    Project = 1,
    /// User-level config (~/.task-manager/)
    User = 2,
    /// Environment variables (highest priority)
    Environment = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Where each configuration tier lives.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// Explicit config file; when set, the project and user tiers are skipped.
    pub explicit_file: Option<PathBuf>,
    /// Project-level config directory
    pub project_dir: Option<PathBuf>,
    /// User-level config directory
    pub user_dir: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover configuration paths from environment and defaults.
    pub fn discover() -> Self {
        let explicit_file = std::env::var("TASK_MANAGER_CONFIG_PATH")
            .ok()
            .map(PathBuf::from);

        // User dir: TASK_MANAGER_USER_DIR or ~/.task-manager
        let user_dir = std::env::var("TASK_MANAGER_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".task-manager")));

        // Project dir: TASK_MANAGER_PROJECT_DIR or $CWD/task-manager
        let project_dir = std::env::var("TASK_MANAGER_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("task-manager")));

        Self {
            explicit_file,
            project_dir,
            user_dir,
        }
    }

    /// Create paths with explicit directories.
    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            explicit_file: None,
            project_dir,
            user_dir,
        }
    }

    /// Use a single config file instead of the project and user tiers.
    pub fn with_explicit_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_file = Some(path.into());
        self
    }
}

/// Configuration loader that handles tier-based merging.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Loaded configuration
    config: Config,
    /// Config files that contributed, lowest tier first
    sources: Vec<(ConfigTier, PathBuf)>,
}

impl ConfigLoader {
    /// Load configuration with explicit paths, reading overrides from the
    /// process environment.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        Self::load_with_env(paths, |key| std::env::var(key).ok())
    }

    /// Load configuration with explicit paths and environment lookup.
    pub fn load_with_env<F>(paths: ConfigPaths, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut sources = Vec::new();

        let mut config = if let Some(explicit) = &paths.explicit_file {
            let config = Config::load(explicit)
                .with_context(|| format!("Failed to load config file {}", explicit.display()))?;
            sources.push((ConfigTier::User, explicit.clone()));
            config
        } else {
            let mut configs: Vec<Value> = Vec::new();

            // Tier 1: Defaults
            configs.push(serde_json::to_value(Config::default())?);

            // Tier 2: Project config
            if let Some(project_dir) = &paths.project_dir
                && let Some((value, file)) = read_tier_file(project_dir)
            {
                configs.push(value);
                sources.push((ConfigTier::Project, file));
            }

            // Tier 3: User config
            if let Some(user_dir) = &paths.user_dir
                && let Some((value, file)) = read_tier_file(user_dir)
            {
                configs.push(value);
                sources.push((ConfigTier::User, file));
            }

            let merged = deep_merge_all(configs);
            serde_json::from_value(merged).context("Invalid configuration")?
        };

        // Tier 4: Environment variable overrides
        Self::apply_env_overrides(&mut config, env);

        for (tier, file) in &sources {
            debug!(tier = %tier, path = %file.display(), "Loaded config file");
        }

        Ok(Self { config, sources })
    }

    /// Apply environment variable overrides to config.
    fn apply_env_overrides<F>(config: &mut Config, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db_path) = env("TASK_MANAGER_DB_PATH") {
            config.server.db_path = PathBuf::from(db_path);
        }

        if let Some(host) = env("TASK_MANAGER_HOST") {
            config.server.host = host;
        }

        if let Some(port) = env("TASK_MANAGER_PORT") {
            match port.parse() {
                Ok(port) => config.server.port = port,
                Err(_) => warn!(value = %port, "Ignoring invalid TASK_MANAGER_PORT"),
            }
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Config files that were read, lowest tier first.
    pub fn sources(&self) -> &[(ConfigTier, PathBuf)] {
        &self.sources
    }
}

/// Read `config.yaml` from a tier directory. Unreadable or malformed files
/// are skipped with a warning.
fn read_tier_file(dir: &Path) -> Option<(Value, PathBuf)> {
    let file = dir.join("config.yaml");
    if !file.exists() {
        return None;
    }

    let content = match std::fs::read_to_string(&file) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %file.display(), error = %e, "Skipping unreadable config file");
            return None;
        }
    };

    match serde_yaml::from_str::<Value>(&content) {
        Ok(value) => Some((value, file)),
        Err(e) => {
            warn!(path = %file.display(), error = %e, "Skipping malformed config file");
            None
        }
    }
}
