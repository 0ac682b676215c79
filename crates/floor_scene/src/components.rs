use bevy_ecs::prelude::*;

use crate::prefab::{LegacyDescriptor, PlatformDescriptor};

#[derive(Component, Clone, Debug, PartialEq, Eq)]
pub struct NodeName(pub String);

// Tag: "hidden, don't render or tick me"
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Inactive;

/// Identity of a spawned platform, on the node that carried it in the prefab.
#[derive(Component, Clone, Debug)]
pub struct CustomPlatform(pub PlatformDescriptor);

#[derive(Component, Clone, Debug)]
pub struct LegacyCustomPlatform(pub LegacyDescriptor);

/// The entity every loaded platform is parented under.
#[derive(Resource, Clone, Copy, Debug)]
pub struct PlatformContainer(pub Entity);

// Behaviours attached by the enrichment registry. Each points back at the
// platform root that owns it; the actual effect wiring lives elsewhere.
#[derive(Component, Clone, Copy, Debug)]
pub struct TrackRingsManager {
    pub platform: Entity,
}

#[derive(Component, Clone, Copy, Debug)]
pub struct SpectrogramManager {
    pub platform: Entity,
}

#[derive(Component, Clone, Copy, Debug)]
pub struct RotationEffectManager {
    pub platform: Entity,
}

#[derive(Component, Clone, Copy, Debug)]
pub struct SongEventManager {
    pub platform: Entity,
}

#[derive(Component, Clone, Copy, Debug)]
pub struct EventManagerBinding {
    pub platform: Entity,
}
