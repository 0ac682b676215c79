pub use bevy_ecs::prelude::*;
pub use tokio;

use std::{
    future::Future,
    sync::{Arc, Mutex, PoisonError},
};

pub mod config;
pub mod transform;

pub use config::{ConfigError, PluginConfig};

#[derive(Resource, Clone)]
pub struct IoTaskPool(pub tokio::runtime::Handle);

/// The scene world, shared between the owner thread and the I/O workers.
/// Locked only for short synchronous sections, never across an `.await`.
#[derive(Resource, Clone, Default)]
pub struct SharedWorld(Arc<Mutex<World>>);

impl SharedWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut World) -> R) -> R {
        let mut world = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut world)
    }
}

/// The Plugin Trait
/// Every module (Scene, Assets) must implement this.
pub trait Plugin {
    fn build(&self, app: &mut App);
}

/// The Application
/// Holds the shared scene world, the configuration and the dedicated I/O pool.
pub struct App {
    pub world: SharedWorld,
    pub config: PluginConfig,
    pub io_runtime: tokio::runtime::Runtime,
}

impl App {
    pub fn new(config: PluginConfig) -> std::io::Result<Self> {
        // Dedicated multi-threaded runtime for bundle I/O; the caller's thread
        // stays free for the frame loop.
        let io_runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("floor-io")
            .build()?;

        let world = SharedWorld::new();
        world.with(|w| w.insert_resource(IoTaskPool(io_runtime.handle().clone())));

        log::debug!("[App] io runtime started");

        Ok(Self {
            world,
            config,
            io_runtime,
        })
    }

    pub fn add_plugin<P: Plugin>(&mut self, plugin: P) -> &mut Self {
        plugin.build(self);
        self
    }

    pub fn insert_resource<R: Resource>(&mut self, resource: R) -> &mut Self {
        self.world.with(|w| w.insert_resource(resource));
        self
    }

    /// Clones a resource out of the world. Resources stored here are cheap
    /// handles (`Arc` inside), so the clone is what callers keep.
    pub fn resource<R: Resource + Clone>(&self) -> Option<R> {
        self.world.with(|w| w.get_resource::<R>().cloned())
    }

    pub fn io_handle(&self) -> tokio::runtime::Handle {
        self.io_runtime.handle().clone()
    }

    /// Drives a future to completion on the I/O runtime from the owner thread.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.io_runtime.block_on(future)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Resource, Clone, Debug, PartialEq)]
    struct Marker(u32);

    struct MarkerPlugin;

    impl Plugin for MarkerPlugin {
        fn build(&self, app: &mut App) {
            app.insert_resource(Marker(7));
        }
    }

    #[test]
    fn plugins_register_resources() {
        let mut app = App::new(PluginConfig::default()).unwrap();
        app.add_plugin(MarkerPlugin);

        assert_eq!(app.resource::<Marker>(), Some(Marker(7)));
        assert!(app.resource::<IoTaskPool>().is_some());
    }

    #[test]
    fn block_on_runs_on_the_io_pool() {
        let app = App::new(PluginConfig::default()).unwrap();
        let name = app.block_on(async {
            tokio::task::spawn(async { std::thread::current().name().map(str::to_owned) })
                .await
                .unwrap()
        });
        assert_eq!(name.as_deref(), Some("floor-io"));
    }
}
