use serde::{Deserialize, Serialize};
use anyhow::Result;
use std::path::{Path, PathBuf};
use crate::storage::manager::PagingOptions;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub swap: SwapConfig,
    pub paging: PagingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapConfig {
    pub path: String,
    pub element_count: usize,
    /// Seconds to wait before exiting when the swap file cannot be zero-filled.
    pub exit_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagingConfig {
    pub frame_limit: usize,
    pub restore_bitmap: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub log_to_file: bool,
}

impl LoggingConfig {
    /// Per-element driver output is only logged at debug level and below.
    pub fn verbose(&self) -> bool {
        matches!(self.level.to_ascii_lowercase().as_str(), "debug" | "trace")
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn default() -> Self {
        Self {
            swap: SwapConfig {
                path: "file.bin".to_string(),
                element_count: 10000,
                exit_delay_secs: 10,
            },
            paging: PagingConfig {
                frame_limit: 3,
                restore_bitmap: false,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                log_to_file: true,
            },
        }
    }

    pub fn swap_path(&self) -> PathBuf {
        PathBuf::from(&self.swap.path)
    }

    pub fn paging_options(&self) -> PagingOptions {
        PagingOptions {
            frame_limit: self.paging.frame_limit,
            restore_bitmap: self.paging.restore_bitmap,
        }
    }
}

pub struct ConfigManager {
    pub root_dir: PathBuf,
    config_dir: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        let root_dir = directories::ProjectDirs::from("com", "swapvm", "swapvm")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".swapvm"));

        Ok(Self::with_root(root_dir))
    }

    pub fn with_root(root_dir: PathBuf) -> Self {
        let config_dir = root_dir.join("config");
        Self { root_dir, config_dir }
    }

    pub fn init(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(self.log_dir())?;

        if !self.config_path().exists() {
            self.save_config(&Config::default())?;
        }
        Ok(())
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root_dir.join("log")
    }

    pub fn load_config(&self) -> Result<Config> {
        let path = self.config_path();
        if path.exists() {
            Config::load_from_file(path)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save_config(&self, config: &Config) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        let content = toml::to_string_pretty(config)?;
        std::fs::write(self.config_path(), content)?;
        Ok(())
    }
}
