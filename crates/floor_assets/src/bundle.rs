use std::sync::Arc;

use floor_scene::PrefabData;
use tokio::runtime::Handle as TokioHandle;

use crate::{bridge::Callback, error::BundleError};

pub mod format;
mod writer;

pub use format::{Codec, PlatArchive};
pub use writer::BundleWriter;

/// Name of the root object every platform bundle must contain.
pub const ROOT_ASSET_NAME: &str = "_CustomPlatform";

pub type ContainerResult = Result<Box<dyn BundleContainer>, BundleError>;
pub type ObjectResult = Result<Option<PrefabData>, BundleError>;

/// Callback-style bundle primitive, the way the engine exposes it.
/// Each `done` is invoked at most once, from any thread, possibly before the
/// call returns.
pub trait BundleBackend: Send + Sync + 'static {
    fn load_from_memory_async(&self, bytes: Vec<u8>, done: Callback<ContainerResult>);
}

pub trait BundleContainer: Send + Sync {
    fn asset_names(&self) -> Vec<String>;

    /// Extracts object `name`; `Ok(None)` if the container has no such object.
    fn load_asset_async(&self, name: &str, done: Callback<ObjectResult>);

    /// Releases the packed backing memory. Objects already extracted stay valid.
    fn unload(self: Box<Self>);
}

/// Built-in backend for `.plat` files. Work runs on the blocking pool of the
/// I/O runtime and completes from the worker thread.
#[derive(Clone)]
pub struct PlatBackend {
    io_handle: TokioHandle,
}

impl PlatBackend {
    pub fn new(io_handle: TokioHandle) -> Self {
        Self { io_handle }
    }
}

impl BundleBackend for PlatBackend {
    fn load_from_memory_async(&self, bytes: Vec<u8>, done: Callback<ContainerResult>) {
        let io_handle = self.io_handle.clone();
        self.io_handle.spawn_blocking(move || {
            let result = PlatArchive::parse(bytes).map(|archive| {
                log::debug!("    [Bundle] parsed container with {} entries", archive.len());
                Box::new(PlatContainer {
                    archive: Arc::new(archive),
                    io_handle,
                }) as Box<dyn BundleContainer>
            });
            done(result);
        });
    }
}

struct PlatContainer {
    archive: Arc<PlatArchive>,
    io_handle: TokioHandle,
}

impl BundleContainer for PlatContainer {
    fn asset_names(&self) -> Vec<String> {
        self.archive.names().map(str::to_owned).collect()
    }

    fn load_asset_async(&self, name: &str, done: Callback<ObjectResult>) {
        let archive = self.archive.clone();
        let name = name.to_owned();
        self.io_handle.spawn_blocking(move || {
            done(archive.read_object(&name));
        });
    }

    fn unload(self: Box<Self>) {
        // In-flight extractions hold their own reference; the bytes go with the last one.
        log::debug!("    [Bundle] unloading container");
    }
}

#[cfg(test)]
mod tests {
    use floor_scene::PrefabNode;

    use super::*;
    use crate::bridge::bridge;

    fn bytes_with_root() -> Vec<u8> {
        let prefab = PrefabData {
            nodes: vec![PrefabNode::new(ROOT_ASSET_NAME)],
        };
        BundleWriter::new()
            .add_object(ROOT_ASSET_NAME, &prefab, Codec::Zlib)
            .unwrap()
            .finish()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn backend_round_trip_through_callbacks() {
        let backend = PlatBackend::new(TokioHandle::current());

        let container = bridge(|done| backend.load_from_memory_async(bytes_with_root(), done))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(container.asset_names(), vec![ROOT_ASSET_NAME.to_owned()]);

        let object = bridge(|done| container.load_asset_async(ROOT_ASSET_NAME, done))
            .await
            .unwrap()
            .unwrap();
        assert!(object.is_some());

        let missing = bridge(|done| container.load_asset_async("Other", done))
            .await
            .unwrap()
            .unwrap();
        assert!(missing.is_none());

        container.unload();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn corrupt_bytes_fail_in_the_callback() {
        let backend = PlatBackend::new(TokioHandle::current());
        let result = bridge(|done| backend.load_from_memory_async(b"junk".to_vec(), done))
            .await
            .unwrap();
        assert!(result.is_err());
    }
}
