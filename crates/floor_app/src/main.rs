use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use floor_assets::{AssetPlugin, PlatformManager, PlatformType, error::describe};
use floor_core::{App, ConfigError, PluginConfig};
use floor_scene::ScenePlugin;

#[derive(Parser, Debug)]
#[command(name = "floor_app", version, about = "Loads a custom platform folder and lists the catalog")]
struct Args {
    /// Plugin settings file (JSON); defaults apply when omitted
    config: Option<PathBuf>,
    /// Overrides the platform folder named in the settings
    #[arg(long)]
    platforms_directory: Option<PathBuf>,
}

impl Args {
    fn plugin_config(&self) -> Result<PluginConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => PluginConfig::load(path)?,
            None => PluginConfig::default(),
        };
        if let Some(dir) = &self.platforms_directory {
            config.platforms_directory = dir.clone();
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();
    let config = match args.plugin_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", describe(&e));
            return ExitCode::FAILURE;
        }
    };

    let mut app = match App::new(config) {
        Ok(app) => app,
        Err(e) => {
            log::error!("starting the io runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };
    app.add_plugin(ScenePlugin);
    app.add_plugin(AssetPlugin::default());

    let Some(manager) = app.resource::<PlatformManager>() else {
        log::error!("platform manager was not installed");
        return ExitCode::FAILURE;
    };

    let catalog = match app.block_on(manager.catalog()) {
        Ok(catalog) => catalog,
        Err(e) => {
            log::error!("{}", describe(&e));
            return ExitCode::FAILURE;
        }
    };

    for (index, platform) in catalog.iter().enumerate() {
        let hash = platform.content_hash.get(..12).unwrap_or("-");
        let flag = if platform.legacy { " (legacy)" } else { "" };
        println!("{:>3}  {:<12}  {}{}", index, hash, platform.name, flag);
    }

    for context in PlatformType::ALL {
        if let Ok(index) = app.block_on(manager.index_for_context(context)) {
            println!("{:?}: {}", context, index);
        }
    }

    if app.config.shuffle_platforms {
        println!("Shuffle pick: {}", manager.random_index());
    }

    ExitCode::SUCCESS
}
