use std::{io::ErrorKind, path::Path, sync::Arc};

use bevy_ecs::entity::Entity;
use floor_core::SharedWorld;
use floor_scene::EnrichmentRegistry;
use tokio::fs::File;

use crate::{
    assets::{FALLBACK_ICON, Handle, Icon, Platform},
    bridge::bridge,
    bundle::{BundleBackend, ROOT_ASSET_NAME},
    error::{BundleError, LoadError},
    hash::read_and_hash,
    schema,
};

/// Turns one bundle file into a [`Platform`] spawned (hidden) in the scene.
#[derive(Clone)]
pub struct BundleLoader {
    backend: Arc<dyn BundleBackend>,
    world: SharedWorld,
    enrich: Arc<EnrichmentRegistry>,
}

impl BundleLoader {
    pub fn new(
        backend: Arc<dyn BundleBackend>,
        world: SharedWorld,
        enrich: EnrichmentRegistry,
    ) -> Self {
        Self {
            backend,
            world,
            enrich: Arc::new(enrich),
        }
    }

    pub fn world(&self) -> &SharedWorld {
        &self.world
    }

    pub async fn load_from_file(&self, path: &Path, parent: Entity) -> Result<Platform, LoadError> {
        log::debug!("    [BundleLoader] Loading: {}", path.display());

        let size_hint = match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => meta.len() as usize,
            Ok(_) => return Err(LoadError::NotFound(path.to_owned())),
            Err(e) => return Err(not_found_or_io(e, path)),
        };

        // The file handle lives only inside this block. Bytes and digest come
        // from the same single read, so the hash always matches what is parsed.
        let (bytes, content_hash) = {
            let file = File::open(path).await.map_err(|e| not_found_or_io(e, path))?;
            read_and_hash(file, size_hint).await?
        };

        let container = bridge(|done| self.backend.load_from_memory_async(bytes, done))
            .await
            .map_err(|_| LoadError::Abandoned)?
            .map_err(LoadError::ParseFailure)?;

        let extracted = bridge(|done| container.load_asset_async(ROOT_ASSET_NAME, done)).await;

        // Packed memory goes now, on every outcome; the extracted graph is ours.
        container.unload();

        let mut prefab = match extracted {
            Ok(Ok(Some(prefab))) => prefab,
            Ok(Ok(None)) => return Err(LoadError::MissingAsset(ROOT_ASSET_NAME.to_owned())),
            Ok(Err(e)) => return Err(LoadError::ParseFailure(e)),
            Err(_) => return Err(LoadError::Abandoned),
        };

        let identity = schema::upgrade(&mut prefab)?;
        let descriptor = identity.descriptor;

        let name = Platform::display_label(&descriptor.plat_name, &descriptor.plat_author);
        if let Some(root) = prefab.root_mut() {
            root.name = name.clone();
        }

        let root = self
            .world
            .with(|world| floor_scene::spawn_prefab(world, &prefab, parent, &self.enrich))
            .map_err(|e| LoadError::ParseFailure(BundleError::Prefab(e)))?;

        let icon = descriptor
            .icon
            .map(|bytes| Icon::Embedded(bytes.into()))
            .unwrap_or(FALLBACK_ICON);

        Ok(Platform {
            handle: Handle::new(),
            name,
            display_name: descriptor.plat_name,
            author_name: descriptor.plat_author,
            content_hash,
            source_path: Some(path.to_owned()),
            icon,
            requirements: descriptor.requirements.into_iter().collect(),
            suggestions: descriptor.suggestions.into_iter().collect(),
            legacy: identity.legacy,
            root,
        })
    }

    /// Destroys the scene graph of a platform that will not be kept.
    pub fn discard(&self, platform: &Platform) {
        self.world
            .with(|world| floor_scene::despawn_platform(world, platform.root));
    }
}

fn not_found_or_io(e: std::io::Error, path: &Path) -> LoadError {
    if e.kind() == ErrorKind::NotFound {
        LoadError::NotFound(path.to_owned())
    } else {
        LoadError::IoFailure(e)
    }
}
