use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config '{path}'")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// User settings for the platform loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct PluginConfig {
    pub platforms_directory: PathBuf,
    /// Native extension modules; `None` means `<platforms_directory>/Scripts`.
    pub scripts_directory: Option<PathBuf>,
    pub bundle_extension: String,
    pub script_extension: String,
    pub load_custom_scripts: bool,
    pub max_concurrent_loads: usize,
    pub show_in_menu: bool,
    pub shuffle_platforms: bool,
    pub show_heart: bool,
    pub singleplayer_platform_path: Option<PathBuf>,
    pub multiplayer_platform_path: Option<PathBuf>,
    pub a360_platform_path: Option<PathBuf>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self {
            platforms_directory: cwd.join("CustomPlatforms"),
            scripts_directory: None,
            bundle_extension: "plat".into(),
            script_extension: "dll".into(),
            load_custom_scripts: true,
            max_concurrent_loads: 4,
            show_in_menu: false,
            shuffle_platforms: false,
            show_heart: true,
            singleplayer_platform_path: None,
            multiplayer_platform_path: None,
            a360_platform_path: None,
        }
    }
}

impl PluginConfig {
    /// Reads the config at `path`. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("[Config] '{}' not found, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_owned(),
                    source,
                });
            }
        };

        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_owned(),
            source,
        })
    }

    pub fn scripts_directory(&self) -> PathBuf {
        self.scripts_directory
            .clone()
            .unwrap_or_else(|| self.platforms_directory.join("Scripts"))
    }

    /// Zero would stall every load, so it is treated as one.
    pub fn load_permits(&self) -> usize {
        self.max_concurrent_loads.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PluginConfig::load(dir.path().join("nope.json")).unwrap();
        assert_eq!(config, PluginConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "PlatformsDirectory": "/tmp/plats", "MaxConcurrentLoads": 0, "ShufflePlatforms": true }"#,
        )
        .unwrap();

        let config = PluginConfig::load(&path).unwrap();
        assert_eq!(config.platforms_directory, PathBuf::from("/tmp/plats"));
        assert_eq!(config.scripts_directory(), PathBuf::from("/tmp/plats/Scripts"));
        assert!(config.shuffle_platforms);
        assert_eq!(config.load_permits(), 1);
        assert_eq!(config.bundle_extension, "plat");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            PluginConfig::load(&path),
            Err(ConfigError::Json { .. })
        ));
    }
}
