//! Host configuration.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use linplayer_remote::AppInfo;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON file holding the token, preferred port and server list
    pub store_path: PathBuf,

    /// Preferred port; overrides the one remembered in the store
    pub port: Option<u16>,

    /// Name reported by /api/info
    pub app_name: String,

    /// Version reported by /api/info
    pub app_version: String,

    /// Attach a simulated player with this title
    pub demo_title: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let app = AppInfo::default();
        Self {
            store_path: PathBuf::from("linplayer-remote.json"),
            port: None,
            app_name: app.name,
            app_version: app.version,
            demo_title: None,
        }
    }
}

impl Config {
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn app_info(&self) -> AppInfo {
        AppInfo {
            name: self.app_name.clone(),
            version: self.app_version.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str("port = 38080\ndemo_title = \"Big Buck Bunny\"").unwrap();
        assert_eq!(config.port, Some(38080));
        assert_eq!(config.demo_title.as_deref(), Some("Big Buck Bunny"));
        assert_eq!(config.store_path, PathBuf::from("linplayer-remote.json"));
        assert_eq!(config.app_name, "LinPlayer");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load_or_default("does-not-exist.toml").unwrap();
        assert_eq!(config.port, None);
        assert!(config.demo_title.is_none());
    }
}
