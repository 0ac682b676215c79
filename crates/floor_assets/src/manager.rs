use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

use bevy_ecs::{entity::Entity, resource::Resource};
use floor_core::PluginConfig;
use rand::Rng;
use tokio::sync::{Mutex, OnceCell, broadcast};

use crate::{
    asset_events::{self, CatalogEvent},
    assets::{Handle, Platform},
    catalog::{Catalog, CatalogBuilder},
    error::{CatalogError, describe},
    scanner,
};

/// Gameplay mode with its own current platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformType {
    Singleplayer,
    Multiplayer,
    A360,
}

impl PlatformType {
    pub const ALL: [PlatformType; 3] = [Self::Singleplayer, Self::Multiplayer, Self::A360];

    /// Path selected for this mode in a previous session.
    pub fn configured_path(self, config: &PluginConfig) -> Option<&Path> {
        match self {
            Self::Singleplayer => config.singleplayer_platform_path.as_deref(),
            Self::Multiplayer => config.multiplayer_platform_path.as_deref(),
            Self::A360 => config.a360_platform_path.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    NotStarted,
    Building,
    Ready,
}

/// What a [`PlatformManager::rescan`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RescanReport {
    pub added: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

/// Snapshot plus selections, swapped together so readers never see one
/// without the other.
struct State {
    catalog: Arc<Catalog>,
    selections: HashMap<PlatformType, Handle<Platform>>,
}

struct Inner {
    builder: CatalogBuilder,
    config: PluginConfig,
    parent: Entity,
    status: RwLock<BuildStatus>,
    ready: OnceCell<()>,
    state: RwLock<State>,
    writer: Mutex<()>,
    events: broadcast::Sender<CatalogEvent>,
}

/// Owner of the process-wide platform catalog.
///
/// The catalog is built once, on first request, by a single task every caller
/// awaits. Afterwards, additions and removals are serialized and each one
/// installs a new immutable snapshot.
#[derive(Resource, Clone)]
pub struct PlatformManager {
    inner: Arc<Inner>,
}

impl PlatformManager {
    pub fn new(builder: CatalogBuilder, config: PluginConfig, parent: Entity) -> Self {
        let placeholder = Catalog::new(Platform::default_environment(Entity::PLACEHOLDER));
        Self {
            inner: Arc::new(Inner {
                builder,
                config,
                parent,
                status: RwLock::new(BuildStatus::NotStarted),
                ready: OnceCell::new(),
                state: RwLock::new(State {
                    catalog: Arc::new(placeholder),
                    selections: HashMap::new(),
                }),
                writer: Mutex::new(()),
                events: asset_events::channel(),
            }),
        }
    }

    pub fn status(&self) -> BuildStatus {
        *self.inner.status.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.inner.events.subscribe()
    }

    /// Waits for the initial build, starting it if nobody has yet.
    ///
    /// The build runs on its own I/O task, so a caller that stops waiting
    /// does not stop it; whoever asks next picks up the same result.
    pub async fn ready(&self) -> Result<(), CatalogError> {
        if self.inner.ready.initialized() {
            return Ok(());
        }

        let manager = self.clone();
        self.inner
            .builder
            .io_handle()
            .spawn(async move {
                manager
                    .inner
                    .ready
                    .get_or_try_init(|| manager.initial_build())
                    .await
                    .map(|_| ())
            })
            .await
            .map_err(CatalogError::Interrupted)?
    }

    /// The finished catalog. Never returns a half-built one.
    pub async fn catalog(&self) -> Result<Arc<Catalog>, CatalogError> {
        self.ready().await?;
        Ok(self.snapshot())
    }

    /// The catalog if the initial build has completed.
    pub fn try_catalog(&self) -> Option<Arc<Catalog>> {
        self.inner.ready.initialized().then(|| self.snapshot())
    }

    pub async fn index_for_context(&self, context: PlatformType) -> Result<usize, CatalogError> {
        self.ready().await?;
        Ok(self.read_state(|state| Self::resolve(state, context)))
    }

    pub async fn selected(&self, context: PlatformType) -> Result<Arc<Platform>, CatalogError> {
        self.ready().await?;
        Ok(self.read_state(|state| {
            let index = Self::resolve(state, context);
            state.catalog.get_or_default(index)
        }))
    }

    /// Makes `index` current for `context`. False if out of range or the
    /// catalog is not built yet.
    pub fn select(&self, context: PlatformType, index: usize) -> bool {
        if !self.inner.ready.initialized() {
            return false;
        }

        let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
        let Some(handle) = state.catalog.get(index).map(|p| p.handle) else {
            return false;
        };
        state.selections.insert(context, handle);
        true
    }

    /// A uniformly random loaded entry, or 0 when only the default exists.
    pub fn random_index(&self) -> usize {
        let len = self.snapshot().len();
        if len <= 1 {
            return 0;
        }
        rand::thread_rng().gen_range(1..len)
    }

    /// Loads one bundle and inserts it in display order.
    ///
    /// Content already in the catalog is rejected with
    /// [`CatalogError::Duplicate`] and the new copy destroyed.
    pub async fn add_from_file(&self, path: impl AsRef<Path>) -> Result<Arc<Platform>, CatalogError> {
        self.ready().await?;

        let loader = self.inner.builder.loader();
        let platform = Arc::new(loader.load_from_file(path.as_ref(), self.inner.parent).await?);

        let _writer = self.inner.writer.lock().await;
        let inserted = {
            let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
            match state.catalog.position_of_hash(&platform.content_hash) {
                Some(existing) => Err(state.catalog.get_or_default(existing).name.clone()),
                None => {
                    let mut next = Catalog::clone(&state.catalog);
                    let index = next.insert_sorted(platform.clone());
                    state.catalog = Arc::new(next);
                    Ok(index)
                }
            }
        };

        match inserted {
            Ok(index) => {
                log::info!("[PlatformManager] added '{}' at {}", platform.name, index);
                asset_events::publish(
                    &self.inner.events,
                    CatalogEvent::Inserted {
                        index,
                        hash: platform.content_hash.clone(),
                    },
                );
                Ok(platform)
            }
            Err(existing) => {
                loader.discard(&platform);
                Err(CatalogError::Duplicate {
                    existing,
                    hash: platform.content_hash.clone(),
                })
            }
        }
    }

    /// Removes the entry with `hash` and destroys its scene graph. Contexts
    /// that had it selected fall back to the default entry.
    pub async fn remove_by_hash(&self, hash: &str) -> bool {
        if hash.is_empty() || self.ready().await.is_err() {
            return false;
        }
        let _writer = self.inner.writer.lock().await;
        self.remove_where(|catalog| catalog.position_of_hash(hash)).is_some()
    }

    pub async fn remove_by_path(&self, path: impl AsRef<Path>) -> bool {
        if self.ready().await.is_err() {
            return false;
        }
        let _writer = self.inner.writer.lock().await;
        self.remove_where(|catalog| catalog.position_of_path(path.as_ref()))
            .is_some()
    }

    /// Brings the catalog in line with the directory: new files are loaded,
    /// entries whose file is gone are removed.
    pub async fn rescan(&self) -> Result<RescanReport, CatalogError> {
        self.ready().await?;

        let directory = &self.inner.config.platforms_directory;
        let on_disk: HashSet<PathBuf> = scanner::scan(directory, self.inner.builder.extension())
            .await?
            .into_iter()
            .collect();

        let mut report = RescanReport::default();
        let known: HashSet<PathBuf> = self
            .snapshot()
            .loaded()
            .iter()
            .filter_map(|p| p.source_path.clone())
            .collect();

        for gone in known.difference(&on_disk) {
            if self.remove_by_path(gone).await {
                report.removed.push(gone.clone());
            }
        }

        let mut fresh: Vec<&PathBuf> = on_disk.difference(&known).collect();
        fresh.sort();
        for path in fresh {
            match self.add_from_file(path).await {
                Ok(_) => report.added.push(path.clone()),
                Err(CatalogError::Duplicate { existing, .. }) => {
                    log::debug!("[PlatformManager] {} duplicates '{}'", path.display(), existing);
                }
                Err(e) => log::warn!("[PlatformManager] skipping {}: {}", path.display(), describe(&e)),
            }
        }

        report.removed.sort();
        Ok(report)
    }

    async fn initial_build(&self) -> Result<(), CatalogError> {
        self.set_status(BuildStatus::Building);
        let _writer = self.inner.writer.lock().await;

        let built = self
            .inner
            .builder
            .build(&self.inner.config.platforms_directory, self.inner.parent)
            .await;

        let catalog = match built {
            Ok(catalog) => catalog,
            Err(e) => {
                log::warn!("[PlatformManager] build failed: {}", describe(&e));
                self.set_status(BuildStatus::NotStarted);
                return Err(e);
            }
        };

        let selections = PlatformType::ALL
            .into_iter()
            .map(|context| {
                let handle = context
                    .configured_path(&self.inner.config)
                    .and_then(|path| catalog.position_of_path(path))
                    .and_then(|index| catalog.get(index))
                    .unwrap_or_else(|| catalog.default_entry())
                    .handle;
                (context, handle)
            })
            .collect();

        let len = catalog.len();
        {
            let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
            *state = State {
                catalog: Arc::new(catalog),
                selections,
            };
        }
        self.set_status(BuildStatus::Ready);
        asset_events::publish(&self.inner.events, CatalogEvent::Rebuilt { len });
        Ok(())
    }

    fn remove_where(&self, find: impl FnOnce(&Catalog) -> Option<usize>) -> Option<Arc<Platform>> {
        let (index, removed) = {
            let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
            let index = find(&*state.catalog)?;
            let mut next = Catalog::clone(&state.catalog);
            let removed = next.remove(index)?;
            let fallback = next.default_entry().handle;
            for selected in state.selections.values_mut() {
                if *selected == removed.handle {
                    *selected = fallback;
                }
            }
            state.catalog = Arc::new(next);
            (index, removed)
        };

        self.inner.builder.loader().discard(&removed);
        log::info!("[PlatformManager] removed '{}'", removed.name);
        asset_events::publish(
            &self.inner.events,
            CatalogEvent::Removed {
                index,
                hash: removed.content_hash.clone(),
            },
        );
        Some(removed)
    }

    fn snapshot(&self) -> Arc<Catalog> {
        self.read_state(|state| state.catalog.clone())
    }

    fn read_state<R>(&self, f: impl FnOnce(&State) -> R) -> R {
        f(&self.inner.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn resolve(state: &State, context: PlatformType) -> usize {
        state
            .selections
            .get(&context)
            .and_then(|&handle| state.catalog.position_of_handle(handle))
            .unwrap_or(0)
    }

    fn set_status(&self, status: BuildStatus) {
        *self.inner.status.write().unwrap_or_else(PoisonError::into_inner) = status;
    }
}
