use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use bevy_ecs::{entity::Entity, hierarchy::ChildOf};
use floor_core::{PluginConfig, transform::Transform};
use floor_scene::{Inactive, NodeName};
use tokio::{runtime::Handle as TokioHandle, sync::Semaphore, task::JoinSet};

use crate::{
    assets::{Handle, Platform},
    error::{CatalogError, describe},
    loader::BundleLoader,
    scanner,
};

/// An immutable, ordered view of the loaded platforms.
///
/// Index 0 is always the default environment; the rest are sorted for
/// display and unique by content hash.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<Arc<Platform>>,
}

impl Catalog {
    /// A catalog holding only the default entry.
    pub fn new(default: Platform) -> Self {
        Self {
            entries: vec![Arc::new(default)],
        }
    }

    /// Default entry followed by `records` in the given order, then sorted.
    pub fn from_records(default: Platform, records: impl IntoIterator<Item = Arc<Platform>>) -> Self {
        let mut catalog = Self::new(default);
        catalog.entries.extend(records);
        catalog.sort();
        catalog
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Never true for a built catalog; the default entry is always there.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Platform>> {
        self.entries.get(index)
    }

    /// The entry at `index`, or the default one when out of range.
    pub fn get_or_default(&self, index: usize) -> Arc<Platform> {
        self.get(index).unwrap_or_else(|| self.default_entry()).clone()
    }

    pub fn default_entry(&self) -> &Arc<Platform> {
        &self.entries[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Platform>> {
        self.entries.iter()
    }

    /// Entries after the default one.
    pub fn loaded(&self) -> &[Arc<Platform>] {
        &self.entries[1..]
    }

    pub fn position_of_hash(&self, hash: &str) -> Option<usize> {
        self.position_where(|p| p.content_hash == hash)
    }

    /// Matches the full source path, or just the file name when `path` is a
    /// bare file name. An empty path matches nothing.
    pub fn position_of_path(&self, path: &Path) -> Option<usize> {
        if path.as_os_str().is_empty() {
            return None;
        }
        let bare_name = path.components().count() == 1;
        self.position_where(|p| {
            p.source_path.as_deref().is_some_and(|source| {
                source == path || (bare_name && source.file_name() == path.file_name())
            })
        })
    }

    pub fn position_of_handle(&self, handle: Handle<Platform>) -> Option<usize> {
        self.entries.iter().position(|p| p.handle == handle)
    }

    fn position_where(&self, pick: impl Fn(&Platform) -> bool) -> Option<usize> {
        self.loaded().iter().position(|p| pick(p)).map(|i| i + 1)
    }

    /// Inserts after any entries that compare equal, keeping the order stable.
    pub(crate) fn insert_sorted(&mut self, platform: Arc<Platform>) -> usize {
        let offset = self
            .loaded()
            .partition_point(|p| p.display_cmp(&platform).is_le());
        let index = offset + 1;
        self.entries.insert(index, platform);
        index
    }

    /// Removes a loaded entry; the default entry cannot be removed.
    pub(crate) fn remove(&mut self, index: usize) -> Option<Arc<Platform>> {
        if index == 0 || index >= self.entries.len() {
            return None;
        }
        Some(self.entries.remove(index))
    }

    fn sort(&mut self) {
        self.entries[1..].sort_by(|a, b| a.display_cmp(b));
    }
}

/// Turns a platform directory into a [`Catalog`].
#[derive(Clone)]
pub struct CatalogBuilder {
    loader: BundleLoader,
    io_handle: TokioHandle,
    extension: String,
    permits: usize,
}

impl CatalogBuilder {
    pub fn new(loader: BundleLoader, io_handle: TokioHandle) -> Self {
        let defaults = PluginConfig::default();
        Self {
            loader,
            io_handle,
            extension: defaults.bundle_extension,
            permits: defaults.max_concurrent_loads,
        }
    }

    pub fn from_config(loader: BundleLoader, io_handle: TokioHandle, config: &PluginConfig) -> Self {
        Self::new(loader, io_handle)
            .with_extension(&config.bundle_extension)
            .with_max_concurrent_loads(config.load_permits())
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_owned();
        self
    }

    pub fn with_max_concurrent_loads(mut self, permits: usize) -> Self {
        self.permits = permits.max(1);
        self
    }

    pub fn loader(&self) -> &BundleLoader {
        &self.loader
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn io_handle(&self) -> &TokioHandle {
        &self.io_handle
    }

    /// Loads every bundle in `directory` under `parent`.
    ///
    /// Candidates that fail are logged and skipped. Among candidates with the
    /// same content hash the first to finish loading is kept and the others
    /// are destroyed. Only a failure to create or list the directory is an
    /// error.
    pub async fn build(&self, directory: &Path, parent: Entity) -> Result<Catalog, CatalogError> {
        log::info!("[Catalog] Starting to load platforms from {}", directory.display());

        let candidates = scanner::scan(directory, &self.extension).await?;
        let default = self.spawn_default(parent);

        let semaphore = Arc::new(Semaphore::new(self.permits));
        let mut tasks = JoinSet::new();
        for (order, path) in candidates.into_iter().enumerate() {
            let loader = self.loader.clone();
            let semaphore = semaphore.clone();
            tasks.spawn_on(
                async move {
                    // The semaphore is never closed; a failed acquire just runs unbounded.
                    let _permit = semaphore.acquire_owned().await.ok();
                    let result = loader.load_from_file(&path, parent).await;
                    (order, path, result)
                },
                &self.io_handle,
            );
        }

        let mut first_by_hash: HashMap<String, PathBuf> = HashMap::new();
        let mut admitted = Vec::new();
        let mut skipped = 0;

        while let Some(joined) = tasks.join_next().await {
            let (order, path, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    log::warn!("[Catalog] load task failed: {}", e);
                    skipped += 1;
                    continue;
                }
            };

            let platform = match result {
                Ok(platform) => platform,
                Err(e) => {
                    log::warn!("[Catalog] skipping {}: {}", path.display(), describe(&e));
                    skipped += 1;
                    continue;
                }
            };

            if let Some(first) = first_by_hash.get(&platform.content_hash) {
                log::info!(
                    "[Catalog] {} has the same content as {}, discarding it",
                    path.display(),
                    first.display()
                );
                self.loader.discard(&platform);
                continue;
            }

            first_by_hash.insert(platform.content_hash.clone(), path);
            admitted.push((order, Arc::new(platform)));
        }

        admitted.sort_by_key(|(order, _)| *order);
        let catalog = Catalog::from_records(default, admitted.into_iter().map(|(_, p)| p));

        log::info!(
            "[Catalog] Finished loading platforms: {} loaded, {} skipped",
            catalog.len() - 1,
            skipped
        );
        Ok(catalog)
    }

    fn spawn_default(&self, parent: Entity) -> Platform {
        let label = Platform::display_label(Platform::DEFAULT_NAME, Platform::DEFAULT_AUTHOR);
        let root = self.loader.world().with(|world| {
            world
                .spawn((NodeName(label), Transform::default(), ChildOf(parent), Inactive))
                .id()
        });
        Platform::default_environment(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform(display: &str, author: &str, hash: &str) -> Arc<Platform> {
        let mut p = Platform::default_environment(Entity::PLACEHOLDER);
        p.handle = Handle::new();
        p.display_name = display.into();
        p.author_name = author.into();
        p.content_hash = hash.into();
        p.source_path = Some(PathBuf::from(format!("/platforms/{}.plat", hash)));
        Arc::new(p)
    }

    fn names(catalog: &Catalog) -> Vec<&str> {
        catalog.iter().map(|p| p.display_name.as_str()).collect()
    }

    #[test]
    fn records_sort_after_the_default_entry() {
        let default = Platform::default_environment(Entity::PLACEHOLDER);
        let catalog = Catalog::from_records(
            default,
            [
                platform("Zeta", "a", "1"),
                platform("Alpha", "a", "2"),
                platform("Mid", "a", "3"),
            ],
        );
        assert_eq!(
            names(&catalog),
            vec![Platform::DEFAULT_NAME, "Alpha", "Mid", "Zeta"]
        );
    }

    #[test]
    fn equal_names_keep_discovery_order() {
        let default = Platform::default_environment(Entity::PLACEHOLDER);
        let catalog = Catalog::from_records(
            default,
            [platform("Same", "x", "first"), platform("Same", "x", "second")],
        );
        assert_eq!(catalog.get(1).unwrap().content_hash, "first");
        assert_eq!(catalog.get(2).unwrap().content_hash, "second");
    }

    #[test]
    fn insertion_keeps_order_and_reports_index() {
        let default = Platform::default_environment(Entity::PLACEHOLDER);
        let mut catalog =
            Catalog::from_records(default, [platform("Alpha", "a", "1"), platform("Zeta", "a", "2")]);

        assert_eq!(catalog.insert_sorted(platform("Mid", "a", "3")), 2);
        assert_eq!(catalog.insert_sorted(platform("Zeta", "a", "4")), 4);
        assert_eq!(catalog.insert_sorted(platform("Aardvark", "a", "5")), 1);
        assert_eq!(
            names(&catalog),
            vec![Platform::DEFAULT_NAME, "Aardvark", "Alpha", "Mid", "Zeta", "Zeta"]
        );
    }

    #[test]
    fn lookups_skip_the_default_entry() {
        let default = Platform::default_environment(Entity::PLACEHOLDER);
        let mut catalog = Catalog::from_records(default, [platform("Neon", "kat", "abc")]);

        assert_eq!(catalog.position_of_hash(""), None);
        assert_eq!(catalog.position_of_hash("abc"), Some(1));
        assert_eq!(catalog.position_of_path(Path::new("/platforms/abc.plat")), Some(1));
        assert_eq!(catalog.position_of_path(Path::new("abc.plat")), Some(1));

        assert!(catalog.remove(0).is_none());
        assert!(catalog.remove(1).is_some());
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn empty_and_partial_paths_match_nothing() {
        let default = Platform::default_environment(Entity::PLACEHOLDER);
        let catalog = Catalog::from_records(default, [platform("Neon", "kat", "abc")]);

        assert_eq!(catalog.position_of_path(Path::new("")), None);
        assert_eq!(catalog.position_of_path(Path::new("c.plat")), None);
        assert_eq!(catalog.position_of_path(Path::new("elsewhere/abc.plat")), None);
    }
}
