use bevy_ecs::{
    hierarchy::{ChildOf, Children},
    prelude::*,
};
use floor_core::{App, Plugin, transform::Transform};
use thiserror::Error;

pub mod components;
pub mod enrich;
pub mod prefab;

pub use components::{CustomPlatform, Inactive, LegacyCustomPlatform, NodeName, PlatformContainer};
pub use enrich::{EnrichFn, EnrichmentRegistry};
pub use prefab::{ComponentData, LegacyDescriptor, PlatformDescriptor, PrefabData, PrefabNode};

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("prefab has no nodes")]
    EmptyPrefab,
    #[error("child index {0} is out of range or points at the root")]
    BadChildIndex(usize),
    #[error("node {0} has more than one parent")]
    SharedChild(usize),
    #[error("{0} node(s) are not reachable from the root")]
    Unreachable(usize),
}

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.world.with(|world| {
            let container = world
                .spawn((NodeName("CustomPlatforms".into()), Transform::default()))
                .id();
            world.insert_resource(PlatformContainer(container));

            if !world.contains_resource::<EnrichmentRegistry>() {
                world.insert_resource(EnrichmentRegistry::with_defaults());
            }
        });
    }
}

/// Instantiates `prefab` under `parent`. The new root starts inactive;
/// audio listeners are dropped and capability markers are enriched.
pub fn spawn_prefab(
    world: &mut World,
    prefab: &PrefabData,
    parent: Entity,
    enrich: &EnrichmentRegistry,
) -> Result<Entity, SceneError> {
    prefab.validate()?;

    let mut node_entities = Vec::with_capacity(prefab.nodes.len());
    let mut stripped = 0;

    for node in &prefab.nodes {
        let mut entity_cmd = world.spawn((NodeName(node.name.clone()), node.transform));

        if !node.active {
            entity_cmd.insert(Inactive);
        }

        for component in &node.components {
            match component {
                ComponentData::CustomPlatform(desc) => {
                    entity_cmd.insert(CustomPlatform(desc.clone()));
                }
                ComponentData::LegacyCustomPlatform(desc) => {
                    entity_cmd.insert(LegacyCustomPlatform(desc.clone()));
                }
                ComponentData::AudioListener => stripped += 1,
                _ => {}
            }
        }

        node_entities.push(entity_cmd.id());
    }

    for (i, node) in prefab.nodes.iter().enumerate() {
        let parent_entity = node_entities[i];
        for &child_index in &node.children {
            world
                .entity_mut(node_entities[child_index])
                .insert(ChildOf(parent_entity));
        }
    }

    let root = node_entities[0];
    world.entity_mut(root).insert((ChildOf(parent), Inactive));

    let mut attached = 0;
    for (i, node) in prefab.nodes.iter().enumerate() {
        attached += enrich.apply(world, node_entities[i], root, &node.components);
    }

    log::debug!(
        "[Scene] spawned '{}': {} node(s), {} behaviour(s), {} audio listener(s) dropped",
        prefab.nodes[0].name,
        node_entities.len(),
        attached,
        stripped
    );

    Ok(root)
}

/// Destroys a platform root and everything under it.
pub fn despawn_platform(world: &mut World, root: Entity) -> bool {
    world.despawn(root)
}

/// Shows or hides a platform root. Returns false if the entity is gone.
pub fn set_active(world: &mut World, root: Entity, active: bool) -> bool {
    let Ok(mut entity) = world.get_entity_mut(root) else {
        return false;
    };

    if active {
        entity.remove::<Inactive>();
    } else {
        entity.insert(Inactive);
    }
    true
}

pub fn is_active(world: &World, entity: Entity) -> bool {
    world.get_entity(entity).is_ok() && world.get::<Inactive>(entity).is_none()
}

/// All entities below `root`, depth-first.
pub fn descendants(world: &World, root: Entity) -> Vec<Entity> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(entity) = stack.pop() {
        if let Some(children) = world.get::<Children>(entity) {
            let children: &[Entity] = children;
            out.extend_from_slice(children);
            stack.extend_from_slice(children);
        }
    }
    out
}
