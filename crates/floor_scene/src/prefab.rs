use std::collections::VecDeque;

use floor_core::transform::Transform;
use serde::{Deserialize, Serialize};

use crate::SceneError;

/// The object graph stored under a bundle's root asset.
/// Node 0 is the root; every other node is reachable through `children`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PrefabData {
    pub nodes: Vec<PrefabNode>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrefabNode {
    pub name: String,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub components: Vec<ComponentData>,
    #[serde(default)]
    pub children: Vec<usize>, // Indices into `PrefabData::nodes`
}

fn default_active() -> bool {
    true
}

impl PrefabNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            active: true,
            components: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_component(mut self, component: ComponentData) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = usize>) -> Self {
        self.children.extend(children);
        self
    }
}

/// Components an author can attach to a node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ComponentData {
    /// Current identity schema.
    CustomPlatform(PlatformDescriptor),
    /// Identity schema of older bundles; upgraded on load.
    LegacyCustomPlatform(LegacyDescriptor),
    AudioListener,
    TrackRings,
    Spectrogram,
    RotationEventEffect,
    SongEventHandler,
    EventManager,
    #[serde(other)]
    Unknown,
}

impl ComponentData {
    /// Name of the capability marker, if this component is one.
    pub fn marker(&self) -> Option<&'static str> {
        match self {
            ComponentData::TrackRings => Some("TrackRings"),
            ComponentData::Spectrogram => Some("Spectrogram"),
            ComponentData::RotationEventEffect => Some("RotationEventEffect"),
            ComponentData::SongEventHandler => Some("SongEventHandler"),
            ComponentData::EventManager => Some("EventManager"),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlatformDescriptor {
    pub plat_name: String,
    pub plat_author: String,
    /// Encoded image bytes.
    pub icon: Option<Vec<u8>>,
    pub requirements: Vec<String>,
    pub suggestions: Vec<String>,
    /// Set on upgraded legacy platforms, which ship their own floor.
    pub hide_default_platform: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LegacyDescriptor {
    pub plat_name: String,
    pub plat_author: String,
}

impl PrefabData {
    pub fn root(&self) -> Option<&PrefabNode> {
        self.nodes.first()
    }

    pub fn root_mut(&mut self) -> Option<&mut PrefabNode> {
        self.nodes.first_mut()
    }

    /// Checks that the nodes form a single tree rooted at index 0.
    pub fn validate(&self) -> Result<(), SceneError> {
        if self.nodes.is_empty() {
            return Err(SceneError::EmptyPrefab);
        }

        let mut has_parent = vec![false; self.nodes.len()];
        for node in &self.nodes {
            for &child in &node.children {
                if child == 0 || child >= self.nodes.len() {
                    return Err(SceneError::BadChildIndex(child));
                }
                if std::mem::replace(&mut has_parent[child], true) {
                    return Err(SceneError::SharedChild(child));
                }
            }
        }

        // Every non-root node has exactly one parent; reachability rules out cycles.
        let reachable = self.breadth_first().count();
        if reachable != self.nodes.len() {
            return Err(SceneError::Unreachable(self.nodes.len() - reachable));
        }

        Ok(())
    }

    /// Node indices in breadth-first order from the root. Stops at malformed
    /// links instead of looping.
    pub fn breadth_first(&self) -> impl Iterator<Item = usize> + '_ {
        let mut seen = vec![false; self.nodes.len()];
        let mut queue = VecDeque::new();
        if !self.nodes.is_empty() {
            seen[0] = true;
            queue.push_back(0);
        }

        std::iter::from_fn(move || {
            let index = queue.pop_front()?;
            for &child in &self.nodes[index].children {
                if child < seen.len() && !seen[child] {
                    seen[child] = true;
                    queue.push_back(child);
                }
            }
            Some(index)
        })
    }

    /// First component matching `pick`, searching the root first, then its
    /// descendants breadth-first. Yields `(node index, component index)`.
    pub fn find_component<F>(&self, mut pick: F) -> Option<(usize, usize)>
    where
        F: FnMut(&ComponentData) -> bool,
    {
        self.breadth_first().find_map(|node| {
            self.nodes[node]
                .components
                .iter()
                .position(&mut pick)
                .map(|component| (node, component))
        })
    }
}
