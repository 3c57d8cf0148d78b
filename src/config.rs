use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

static SETTINGS_FILE_NAME: &str = "settings.json";

/// Environment variable that overrides `bot_token` from the settings file.
pub const TOKEN_ENV_VAR: &str = "DISCORD_FS_TOKEN";

pub struct ProjectConfig {
    pub settings: Settings,
    pub project_dirs: ProjectDirs,
    pub settings_path: PathBuf,
}

impl ProjectConfig {
    /// Load settings from `config_file`, or from the per-user config directory.
    pub fn new(config_file: Option<&Path>) -> Result<Self> {
        let proj_dirs = ProjectDirs::from("com", "discord-fs", "discord-fs")
            .ok_or_else(|| anyhow!("Failed to get project directories"))?;
        for x in [proj_dirs.config_dir(), proj_dirs.data_dir()] {
            if !x.exists() {
                fs::create_dir_all(x).context("Failed to create project directory")?;
            }
        }

        let settings_path = match config_file {
            Some(path) => path.to_path_buf(),
            None => proj_dirs.config_dir().join(SETTINGS_FILE_NAME),
        };
        let mut settings = Settings::new(&settings_path)?;
        if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
            settings.bot_token = Some(token);
        }

        Ok(Self {
            settings,
            project_dirs: proj_dirs,
            settings_path,
        })
    }

    pub fn data_dir(&self) -> PathBuf {
        self.project_dirs.data_dir().to_path_buf()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    /// Bot token used for every API call
    pub bot_token: Option<String>,
    /// Id of the text channel acting as the mount root; its category holds the directories
    pub root_channel_id: Option<String>,
    pub log_level: String,
    pub bridge: BridgeConfig,
    pub store: StoreConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bot_token: None,
            root_channel_id: None,
            log_level: "info".to_string(),
            bridge: BridgeConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BridgeConfig {
    /// Deadline for a single remote call
    pub request_timeout: Duration,
    /// Submissions that may wait for the dispatcher at once
    pub queue_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            queue_capacity: 64,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Largest content a single object may carry
    pub max_object_size: u64,
    /// Keep fetched content in memory until the object is replaced
    pub cache_content: bool,
    /// Bytes of content kept in memory; least recently read objects go first
    pub cache_budget: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_object_size: 25 * 1024 * 1024,
            cache_content: true,
            cache_budget: 64 * 1024 * 1024,
        }
    }
}

impl Settings {
    /// Load settings, writing defaults first when the file does not exist yet.
    ///
    /// An existing file that fails to parse is left untouched and reported.
    pub fn new(config_file_path: &Path) -> Result<Self> {
        if !config_file_path.exists() {
            warn!(
                "No settings at {} - creating default config",
                config_file_path.display()
            );
            let default = Self::default();
            default.save_to_file(config_file_path)?;
            return Ok(default);
        }
        Self::load_settings_from_file(config_file_path)
            .with_context(|| format!("Failed to load settings from {}", config_file_path.display()))
    }

    pub fn load_settings_from_file(config_file_path: &Path) -> Result<Self> {
        if !config_file_path.exists() {
            return Err(anyhow!("Config file not found"));
        }
        let data = fs::read_to_string(config_file_path)?;
        let settings: Self = serde_json::from_str(&data)?;
        Ok(settings)
    }

    pub fn save_to_file(&self, config_file_path: &Path) -> Result<()> {
        if let Some(parent_path) = config_file_path.parent() {
            fs::create_dir_all(parent_path).context("Failed to create config directory")?;
        }

        let data = serde_json::to_string_pretty(self)?;
        fs::write(config_file_path, data)?;
        Ok(())
    }

    /// Token and root channel, or an error naming what is missing.
    pub fn credentials(&self) -> Result<(&str, &str)> {
        let token = self
            .bot_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| anyhow!("bot_token is not set (or export {})", TOKEN_ENV_VAR))?;
        let root = self
            .root_channel_id
            .as_deref()
            .filter(|r| !r.is_empty())
            .ok_or_else(|| anyhow!("root_channel_id is not set"))?;
        Ok((token, root))
    }
}
