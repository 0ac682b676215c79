use std::{
    cmp::Ordering,
    collections::BTreeSet,
    hash::{Hash, Hasher},
    marker::PhantomData,
    path::PathBuf,
    sync::Arc,
};

use bevy_ecs::entity::Entity;
use uuid::Uuid;

// 1. The ID (Handle)
// A stable logical identity. Survives re-sorting of the catalog.
#[derive(Debug)]
pub struct Handle<T> {
    pub id: Uuid,
    marker: PhantomData<T>,
}

impl<T> Handle<T> {
    pub fn new() -> Self {
        Self::from_id(Uuid::new_v4())
    }

    pub fn from_id(id: Uuid) -> Self {
        Self {
            id,
            marker: PhantomData,
        }
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Handle<T> {}

// Implemented by hand so `T` needs no bounds.
impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Image shown next to a platform in lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Icon {
    /// Encoded image bytes shipped inside the bundle.
    Embedded(Arc<[u8]>),
    /// Built-in sprite, by name.
    Builtin(&'static str),
}

/// Cover of the default environment entry.
pub const DEFAULT_COVER_ICON: Icon = Icon::Builtin("LvlInsaneCover");
/// Placeholder for bundles that declare no icon.
pub const FALLBACK_ICON: Icon = Icon::Builtin("FeetIcon");

/// A loaded platform, ready to display.
#[derive(Debug, Clone)]
pub struct Platform {
    pub handle: Handle<Platform>,
    /// `"{display_name} by {author_name}"`, not unique.
    pub name: String,
    pub display_name: String,
    pub author_name: String,
    /// Lowercase hex digest of the source file; empty for the default entry.
    pub content_hash: String,
    pub source_path: Option<PathBuf>,
    pub icon: Icon,
    pub requirements: BTreeSet<String>,
    pub suggestions: BTreeSet<String>,
    /// Migrated from the old schema; the default floor should stay hidden under it.
    pub legacy: bool,
    pub root: Entity,
}

impl Platform {
    pub const DEFAULT_NAME: &'static str = "Default Environment";
    pub const DEFAULT_AUTHOR: &'static str = "Beat Saber";

    pub fn display_label(display_name: &str, author_name: &str) -> String {
        format!("{} by {}", display_name, author_name)
    }

    /// The synthetic entry standing for the game's own environment.
    pub fn default_environment(root: Entity) -> Self {
        Self {
            handle: Handle::from_id(Uuid::nil()),
            name: Self::display_label(Self::DEFAULT_NAME, Self::DEFAULT_AUTHOR),
            display_name: Self::DEFAULT_NAME.to_owned(),
            author_name: Self::DEFAULT_AUTHOR.to_owned(),
            content_hash: String::new(),
            source_path: None,
            icon: DEFAULT_COVER_ICON,
            requirements: BTreeSet::new(),
            suggestions: BTreeSet::new(),
            legacy: false,
            root,
        }
    }

    pub fn is_default(&self) -> bool {
        self.source_path.is_none() && self.content_hash.is_empty()
    }

    /// Required components that are not currently loaded.
    pub fn missing_requirements<'a>(&'a self, loaded: &'a BTreeSet<String>) -> impl Iterator<Item = &'a str> {
        self.requirements.difference(loaded).map(String::as_str)
    }

    /// Suggested components that are not currently loaded.
    pub fn missing_suggestions<'a>(&'a self, loaded: &'a BTreeSet<String>) -> impl Iterator<Item = &'a str> {
        self.suggestions.difference(loaded).map(String::as_str)
    }

    /// Display order: case-sensitive by display name, then author.
    pub fn display_cmp(&self, other: &Self) -> Ordering {
        self.display_name
            .cmp(&other.display_name)
            .then_with(|| self.author_name.cmp(&other.author_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(display: &str, author: &str) -> Platform {
        let mut p = Platform::default_environment(Entity::PLACEHOLDER);
        p.handle = Handle::new();
        p.display_name = display.into();
        p.author_name = author.into();
        p.content_hash = "00".into();
        p
    }

    #[test]
    fn default_entry_is_fixed() {
        let p = Platform::default_environment(Entity::PLACEHOLDER);
        assert!(p.is_default());
        assert_eq!(p.name, "Default Environment by Beat Saber");
        assert_eq!(p.icon, DEFAULT_COVER_ICON);
        assert_eq!(p.handle, Platform::default_environment(Entity::PLACEHOLDER).handle);
    }

    #[test]
    fn ordering_is_case_sensitive_then_author() {
        assert_eq!(named("Zeta", "a").display_cmp(&named("alpha", "a")), Ordering::Less);
        assert_eq!(named("Mid", "b").display_cmp(&named("Mid", "a")), Ordering::Greater);
    }

    #[test]
    fn requirements_are_checked_against_loaded_names() {
        let mut p = named("Neon", "kat");
        p.requirements = ["Chroma", "Noodle"].map(String::from).into();
        p.suggestions = ["Camera2"].map(String::from).into();

        let loaded: BTreeSet<String> = ["Chroma"].map(String::from).into();
        assert_eq!(p.missing_requirements(&loaded).collect::<Vec<_>>(), vec!["Noodle"]);
        assert_eq!(p.missing_suggestions(&loaded).collect::<Vec<_>>(), vec!["Camera2"]);
    }
}
