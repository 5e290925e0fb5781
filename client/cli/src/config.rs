use directories::ProjectDirs;
use picshelf_core::ApiConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub server_url: Option<String>,
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub yield_between_chunks: bool,
}

impl Config {
    pub fn config_path() -> anyhow::Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "picshelf", "picshelf")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;

        Ok(config_dir.join("config.toml"))
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Build the immutable client config. `server` (flag or env) wins over
    /// the saved URL.
    pub fn api_config(&self, server: Option<&str>) -> anyhow::Result<ApiConfig> {
        let url = server
            .or(self.server_url.as_deref())
            .ok_or_else(|| anyhow::anyhow!("No server configured. Run: picshelf setup <url>"))?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!("Server URL must start with http:// or https://: {}", url);
        }

        let mut config = ApiConfig::new(url).with_yield_between_chunks(self.yield_between_chunks);
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}
