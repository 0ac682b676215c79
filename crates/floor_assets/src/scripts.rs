use std::path::Path;

use floor_core::PluginConfig;
use thiserror::Error;

use crate::{error::CatalogError, scanner};

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ModuleLoadError(pub String);

/// Hands native extension modules to whatever can load them.
pub trait ModuleLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<(), ModuleLoadError>;
}

/// Loads every script module from the configured scripts directory.
///
/// Returns how many modules loaded; failing modules are logged and skipped.
pub async fn load_scripts(
    config: &PluginConfig,
    loader: &dyn ModuleLoader,
) -> Result<usize, CatalogError> {
    if !config.load_custom_scripts {
        log::debug!("[Scripts] custom scripts disabled");
        return Ok(0);
    }

    let dir = config.scripts_directory();
    let modules = scanner::scan(&dir, &config.script_extension).await?;

    let mut loaded = 0;
    for path in modules {
        match loader.load(&path) {
            Ok(()) => {
                log::info!("[Scripts] loaded {}", path.display());
                loaded += 1;
            }
            Err(e) => log::warn!("[Scripts] skipping {}: {}", path.display(), e),
        }
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, sync::Mutex};

    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<PathBuf>>,
    }

    impl ModuleLoader for Recorder {
        fn load(&self, path: &Path) -> Result<(), ModuleLoadError> {
            self.seen.lock().unwrap().push(path.to_owned());
            if path.file_stem().is_some_and(|s| s == "broken") {
                return Err(ModuleLoadError("bad image".into()));
            }
            Ok(())
        }
    }

    fn config(root: &Path) -> PluginConfig {
        PluginConfig {
            platforms_directory: root.to_owned(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn loads_modules_and_skips_failures() {
        let dir = tempfile::tempdir().unwrap();
        let scripts = dir.path().join("Scripts");
        std::fs::create_dir(&scripts).unwrap();
        for name in ["a.dll", "broken.dll", "readme.md"] {
            std::fs::write(scripts.join(name), b"MZ").unwrap();
        }

        let recorder = Recorder::default();
        let loaded = load_scripts(&config(dir.path()), &recorder).await.unwrap();

        assert_eq!(loaded, 1);
        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec![scripts.join("a.dll"), scripts.join("broken.dll")]
        );
    }

    #[tokio::test]
    async fn disabled_scripts_touch_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = PluginConfig {
            load_custom_scripts: false,
            ..config(dir.path())
        };

        let recorder = Recorder::default();
        assert_eq!(load_scripts(&config, &recorder).await.unwrap(), 0);
        assert!(!dir.path().join("Scripts").exists());
    }

    #[tokio::test]
    async fn scripts_directory_is_bootstrapped() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::default();

        assert_eq!(load_scripts(&config(dir.path()), &recorder).await.unwrap(), 0);
        assert!(dir.path().join("Scripts").is_dir());
    }
}
