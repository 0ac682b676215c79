use floor_scene::{ComponentData, PlatformDescriptor, PrefabData};

use crate::error::LoadError;

/// Identity read from a bundle's object graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub descriptor: PlatformDescriptor,
    /// The graph carried the old schema and was migrated.
    pub legacy: bool,
}

/// Normalizes the identity component of `prefab` to the current schema.
///
/// Tries the current schema first, then the legacy one; a legacy component
/// is replaced in place by a current one carrying the same name and author.
/// Applying this twice leaves the graph as the first call did. Fails with
/// [`LoadError::InvalidFormat`] when neither schema is present.
pub fn upgrade(prefab: &mut PrefabData) -> Result<Identity, LoadError> {
    if let Some((node, component)) =
        prefab.find_component(|c| matches!(c, ComponentData::CustomPlatform(_)))
    {
        if let ComponentData::CustomPlatform(descriptor) = &prefab.nodes[node].components[component] {
            return Ok(Identity {
                descriptor: descriptor.clone(),
                legacy: false,
            });
        }
    }

    let Some((node, component)) =
        prefab.find_component(|c| matches!(c, ComponentData::LegacyCustomPlatform(_)))
    else {
        return Err(LoadError::InvalidFormat);
    };

    let slot = &mut prefab.nodes[node].components[component];
    let ComponentData::LegacyCustomPlatform(old) = &mut *slot else {
        return Err(LoadError::InvalidFormat);
    };

    let descriptor = PlatformDescriptor {
        plat_name: std::mem::take(&mut old.plat_name),
        plat_author: std::mem::take(&mut old.plat_author),
        hide_default_platform: true,
        ..Default::default()
    };
    *slot = ComponentData::CustomPlatform(descriptor.clone());

    Ok(Identity {
        descriptor,
        legacy: true,
    })
}

#[cfg(test)]
mod tests {
    use floor_scene::{LegacyDescriptor, PrefabNode};

    use super::*;

    fn legacy_prefab() -> PrefabData {
        PrefabData {
            nodes: vec![
                PrefabNode::new("_CustomPlatform").with_children([1]),
                PrefabNode::new("Meta").with_component(ComponentData::LegacyCustomPlatform(
                    LegacyDescriptor {
                        plat_name: "Old Glory".into(),
                        plat_author: "someone".into(),
                    },
                )),
            ],
        }
    }

    #[test]
    fn current_schema_is_used_unchanged() {
        let descriptor = PlatformDescriptor {
            plat_name: "Neon".into(),
            plat_author: "kat".into(),
            requirements: vec!["Chroma".into()],
            ..Default::default()
        };
        let mut prefab = PrefabData {
            nodes: vec![PrefabNode::new("_CustomPlatform")
                .with_component(ComponentData::CustomPlatform(descriptor.clone()))],
        };
        let before = prefab.clone();

        let identity = upgrade(&mut prefab).unwrap();
        assert_eq!(identity.descriptor, descriptor);
        assert!(!identity.legacy);
        assert_eq!(prefab, before);
    }

    #[test]
    fn legacy_schema_is_migrated_in_place() {
        let mut prefab = legacy_prefab();

        let identity = upgrade(&mut prefab).unwrap();
        assert!(identity.legacy);
        assert_eq!(identity.descriptor.plat_name, "Old Glory");
        assert_eq!(identity.descriptor.plat_author, "someone");
        assert!(identity.descriptor.hide_default_platform);

        let components = &prefab.nodes[1].components;
        assert_eq!(components.len(), 1);
        assert!(matches!(components[0], ComponentData::CustomPlatform(_)));
    }

    #[test]
    fn upgrading_twice_is_a_fixpoint() {
        let mut prefab = legacy_prefab();
        upgrade(&mut prefab).unwrap();
        let once = prefab.clone();

        let second = upgrade(&mut prefab).unwrap();
        assert_eq!(prefab, once);
        assert_eq!(second.descriptor.plat_name, "Old Glory");
    }

    #[test]
    fn current_wins_over_legacy() {
        let mut prefab = legacy_prefab();
        prefab.nodes[0]
            .components
            .push(ComponentData::CustomPlatform(PlatformDescriptor {
                plat_name: "New".into(),
                ..Default::default()
            }));

        let identity = upgrade(&mut prefab).unwrap();
        assert!(!identity.legacy);
        assert_eq!(identity.descriptor.plat_name, "New");
    }

    #[test]
    fn no_identity_is_rejected() {
        let mut prefab = PrefabData {
            nodes: vec![PrefabNode::new("_CustomPlatform").with_component(ComponentData::TrackRings)],
        };
        assert!(matches!(upgrade(&mut prefab), Err(LoadError::InvalidFormat)));
    }
}
