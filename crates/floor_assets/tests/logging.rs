use std::sync::{Arc, Mutex, PoisonError};

use floor_assets::{
    BundleLoader, BundleWriter, CatalogBuilder, Codec, PlatBackend, PlatformManager,
    ROOT_ASSET_NAME,
};
use floor_core::{PluginConfig, SharedWorld};
use floor_scene::{
    ComponentData, EnrichmentRegistry, PlatformDescriptor, PrefabData, PrefabNode,
};
use log::{Level, LevelFilter, Log, Metadata, Record};

/// Keeps every record so the test can inspect what was logged.
struct Recorder {
    records: Mutex<Vec<(Level, String)>>,
}

impl Log for Recorder {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

static RECORDER: Recorder = Recorder {
    records: Mutex::new(Vec::new()),
};

fn warnings() -> Vec<String> {
    RECORDER
        .records
        .lock()
        .unwrap()
        .iter()
        .filter(|(level, _)| *level == Level::Warn)
        .map(|(_, line)| line.clone())
        .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn a_corrupt_bundle_is_reported_once() {
    log::set_logger(&RECORDER).unwrap();
    log::set_max_level(LevelFilter::Trace);

    let dir = tempfile::tempdir().unwrap();
    for (file, name) in [("a.plat", "Alpha"), ("b.plat", "Beta")] {
        let root = PrefabNode::new(ROOT_ASSET_NAME).with_component(ComponentData::CustomPlatform(
            PlatformDescriptor {
                plat_name: name.into(),
                plat_author: "x".into(),
                ..Default::default()
            },
        ));
        BundleWriter::new()
            .add_object(ROOT_ASSET_NAME, &PrefabData { nodes: vec![root] }, Codec::Zlib)
            .unwrap()
            .write_to(dir.path().join(file))
            .unwrap();
    }
    std::fs::write(dir.path().join("corrupt.plat"), b"PLAT but not really").unwrap();

    let config = PluginConfig {
        platforms_directory: dir.path().to_owned(),
        ..Default::default()
    };
    let world = SharedWorld::new();
    let parent = world.with(|w| w.spawn_empty().id());
    let io = tokio::runtime::Handle::current();
    let loader = BundleLoader::new(
        Arc::new(PlatBackend::new(io.clone())),
        world,
        EnrichmentRegistry::with_defaults(),
    );
    let builder = CatalogBuilder::from_config(loader, io, &config);
    let manager = PlatformManager::new(builder, config, parent);

    assert_eq!(manager.catalog().await.unwrap().len(), 3);

    let warnings = warnings();
    assert_eq!(warnings.len(), 1, "{warnings:?}");
    assert!(warnings[0].contains("corrupt.plat"), "{}", warnings[0]);
}
