use std::sync::Arc;

use floor_core::{App, IoTaskPool, Plugin, SharedWorld};
use floor_scene::{EnrichmentRegistry, PlatformContainer};

pub mod asset_events;
pub mod assets;
pub mod bridge;
pub mod bundle;
pub mod catalog;
pub mod error;
pub mod hash;
pub mod loader;
pub mod manager;
pub mod scanner;
pub mod schema;
pub mod scripts;

pub use asset_events::CatalogEvent;
pub use assets::{Handle, Icon, Platform};
pub use bundle::{BundleBackend, BundleContainer, BundleWriter, Codec, PlatBackend, ROOT_ASSET_NAME};
pub use catalog::{Catalog, CatalogBuilder};
pub use error::{BundleError, CatalogError, LoadError};
pub use hash::ContentHasher;
pub use loader::BundleLoader;
pub use manager::{BuildStatus, PlatformManager, PlatformType, RescanReport};
pub use scripts::{ModuleLoadError, ModuleLoader, load_scripts};

/// Installs the [`PlatformManager`] resource. Needs the scene plugin first.
///
/// The catalog is not built here; the first consumer to await it starts the
/// build.
#[derive(Default)]
pub struct AssetPlugin {
    backend: Option<Arc<dyn BundleBackend>>,
}

impl AssetPlugin {
    /// Uses `backend` instead of the built-in `.plat` reader.
    pub fn with_backend(backend: Arc<dyn BundleBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }
}

impl Plugin for AssetPlugin {
    fn build(&self, app: &mut App) {
        let io_handle = app
            .resource::<IoTaskPool>()
            .map(|pool| pool.0)
            .unwrap_or_else(|| app.io_handle());

        let Some(PlatformContainer(parent)) = app.resource::<PlatformContainer>() else {
            log::error!("[AssetPlugin] no platform container; add ScenePlugin first");
            return;
        };
        let enrich = app.resource::<EnrichmentRegistry>().unwrap_or_default();

        let backend = self
            .backend
            .clone()
            .unwrap_or_else(|| Arc::new(PlatBackend::new(io_handle.clone())));

        let world: SharedWorld = app.world.clone();
        let loader = BundleLoader::new(backend, world, enrich);
        let builder = CatalogBuilder::from_config(loader, io_handle, &app.config);
        let manager = PlatformManager::new(builder, app.config.clone(), parent);

        app.insert_resource(manager);
        log::debug!("[AssetPlugin] platform manager installed");
    }
}
