use bevy_ecs::prelude::*;

use crate::{
    components::{
        EventManagerBinding, RotationEffectManager, SongEventManager, SpectrogramManager,
        TrackRingsManager,
    },
    prefab::ComponentData,
};

/// Attaches a behaviour to `node`, which belongs to the platform rooted at `platform`.
pub type EnrichFn = fn(world: &mut World, node: Entity, platform: Entity);

/// Ordered list of capability detectors run on every freshly spawned node.
/// Detectors fire in registration order; a marker may have several.
#[derive(Resource, Clone, Default)]
pub struct EnrichmentRegistry {
    detectors: Vec<(&'static str, EnrichFn)>,
}

impl EnrichmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the stock platform behaviours.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register("TrackRings", |world, node, platform| {
                world.entity_mut(node).insert(TrackRingsManager { platform });
            })
            .register("Spectrogram", |world, node, platform| {
                world.entity_mut(node).insert(SpectrogramManager { platform });
            })
            .register("RotationEventEffect", |world, node, platform| {
                world.entity_mut(node).insert(RotationEffectManager { platform });
            })
            .register("SongEventHandler", |world, node, platform| {
                world.entity_mut(node).insert(SongEventManager { platform });
            })
            .register("EventManager", |world, node, platform| {
                world.entity_mut(node).insert(EventManagerBinding { platform });
            });
        registry
    }

    pub fn register(&mut self, marker: &'static str, enrich: EnrichFn) -> &mut Self {
        self.detectors.push((marker, enrich));
        self
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Runs every detector whose marker is present on the node.
    /// Returns how many behaviours were attached.
    pub fn apply(
        &self,
        world: &mut World,
        node: Entity,
        platform: Entity,
        components: &[ComponentData],
    ) -> usize {
        let mut attached = 0;
        for (marker, enrich) in &self.detectors {
            if components.iter().any(|c| c.marker() == Some(*marker)) {
                enrich(world, node, platform);
                attached += 1;
            }
        }
        attached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Component)]
    struct Extra;

    #[test]
    fn detectors_fire_only_for_present_markers() {
        let mut world = World::new();
        let platform = world.spawn_empty().id();
        let node = world.spawn_empty().id();

        let registry = EnrichmentRegistry::with_defaults();
        let attached = registry.apply(
            &mut world,
            node,
            platform,
            &[ComponentData::TrackRings, ComponentData::AudioListener],
        );

        assert_eq!(attached, 1);
        assert_eq!(
            world.get::<TrackRingsManager>(node).map(|m| m.platform),
            Some(platform)
        );
        assert!(world.get::<SpectrogramManager>(node).is_none());
    }

    #[test]
    fn custom_detectors_extend_the_defaults() {
        let mut world = World::new();
        let platform = world.spawn_empty().id();
        let node = world.spawn_empty().id();

        let mut registry = EnrichmentRegistry::with_defaults();
        let before = registry.len();
        registry.register("Spectrogram", |world, node, _| {
            world.entity_mut(node).insert(Extra);
        });
        assert_eq!(registry.len(), before + 1);

        let attached = registry.apply(&mut world, node, platform, &[ComponentData::Spectrogram]);
        assert_eq!(attached, 2);
        assert!(world.get::<SpectrogramManager>(node).is_some());
        assert!(world.get::<Extra>(node).is_some());
    }
}
