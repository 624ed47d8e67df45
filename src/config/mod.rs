pub mod paths;

use crate::error::{Result, WatchdogError};
use crate::process::spec::{validate_all, ProcessSpec};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub use paths::{expand_env_vars, resolve_path, PathContext};

/// File name searched for when no config path is given
pub const CONFIG_FILE_NAME: &str = "procwatch.config.json";

/// Folder below the per-user application data folder
pub const APP_DIR_NAME: &str = "procwatch";

/// The set of processes to keep alive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchdogConfig {
    #[serde(default)]
    pub processes: Vec<ProcessSpec>,
}

impl WatchdogConfig {
    /// Template written by `default-config`
    pub fn template() -> Self {
        Self {
            processes: vec![ProcessSpec::new(".", "", "")],
        }
    }

    /// Locate the config file: app data folder, then the current directory,
    /// then the directory of the running executable
    pub fn discover(ctx: &PathContext) -> Result<PathBuf> {
        let candidates = Self::candidate_paths(ctx);

        for candidate in &candidates {
            if candidate.is_file() {
                return Ok(candidate.clone());
            }
            info!("Config not found in {}", candidate.display());
        }

        Err(WatchdogError::ConfigNotFound(candidates))
    }

    /// Every location `discover` looks at, in order
    pub fn candidate_paths(ctx: &PathContext) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Some(app_dir) = app_dir(ctx) {
            candidates.push(app_dir.join(CONFIG_FILE_NAME));
        }

        candidates.push(ctx.current_dir.join(CONFIG_FILE_NAME));

        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            let candidate = exe_dir.join(CONFIG_FILE_NAME);
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }

        candidates
    }

    /// Load, resolve and validate a config file (JSON, or TOML by extension)
    pub fn from_file(path: &Path, ctx: &PathContext) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            WatchdogError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        let config = match extension {
            "toml" => Self::parse_toml(&contents)?,
            "json" => Self::parse_json(&contents)?,
            _ => {
                return Err(WatchdogError::InvalidConfig(format!(
                    "Unsupported file format: {}. Use .json or .toml",
                    extension
                )))
            }
        };

        let config = config.resolved(ctx);
        config.validate()?;

        info!(
            "Config loaded successfully from {} ({} process(es))",
            path.display(),
            config.processes.len()
        );

        Ok(config)
    }

    /// Load from an explicit path, or discover the file
    pub fn load(explicit: Option<&Path>, ctx: &PathContext) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path, ctx),
            None => {
                let path = Self::discover(ctx)?;
                Self::from_file(&path, ctx)
            }
        }
    }

    fn parse_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| WatchdogError::InvalidConfig(format!("Failed to parse JSON: {}", e)))
    }

    fn parse_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| WatchdogError::InvalidConfig(format!("Failed to parse TOML: {}", e)))
    }

    /// Resolve placeholders and relative paths; arguments are left untouched
    pub fn resolved(mut self, ctx: &PathContext) -> Self {
        for spec in &mut self.processes {
            spec.working_directory =
                resolve_path(&spec.working_directory.to_string_lossy(), ctx);

            // An empty executable stays empty so validation can say so
            if !spec.executable_path.as_os_str().is_empty() {
                spec.executable_path =
                    resolve_path(&spec.executable_path.to_string_lossy(), ctx);
            }
        }
        self
    }

    /// Validate the whole set before anything is launched
    pub fn validate(&self) -> Result<()> {
        validate_all(&self.processes)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| WatchdogError::SerializationError(e.to_string()))
    }

    /// Write the template to `path`; an existing file is kept unless `force`
    pub fn write_template(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            return Err(WatchdogError::ConfigError(format!(
                "{} already exists, use --force to overwrite",
                path.display()
            )));
        }

        let mut contents = Self::template().to_json_pretty()?;
        contents.push('\n');
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Application folder below the per-user data folder
pub fn app_dir(ctx: &PathContext) -> Option<PathBuf> {
    ctx.app_data_dir().map(|dir| dir.join(APP_DIR_NAME))
}
