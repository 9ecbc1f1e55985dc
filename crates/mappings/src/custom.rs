use crate::types::{Mapping, MappingField};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_CUSTOM_EXTENSION: &str = ".ext";

pub const DEFAULT_CUSTOM_BODY: &str = r#"[language "custom", extensions: ".ext"]

// Add your custom UAST mapping rules here
// Example:
// identifier <- (identifier) => uast(
//     type: "CustomIdentifier"
// )"#;

/// Stable identity of a custom mapping. Names can collide after user edits; ids never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomMappingId(u64);

impl CustomMappingId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CustomMappingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomEntry {
    pub id: CustomMappingId,
    pub mapping: Mapping,
}

/// User-authored mappings in insertion order.
#[derive(Debug, Default, Clone)]
pub struct CustomMappingStore {
    entries: Vec<CustomEntry>,
    next_id: u64,
}

impl CustomMappingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `custom_mapping_N` (N = count + 1) with placeholder content.
    pub fn create(&mut self) -> CustomEntry {
        self.next_id += 1;
        let entry = CustomEntry {
            id: CustomMappingId(self.next_id),
            mapping: Mapping::custom(
                format!("custom_mapping_{}", self.entries.len() + 1),
                vec![DEFAULT_CUSTOM_EXTENSION.to_string()],
                DEFAULT_CUSTOM_BODY,
            ),
        };
        self.entries.push(entry.clone());
        entry
    }

    /// Replaces one field of the entry at `index`; out-of-bounds indices are ignored.
    pub fn update(&mut self, index: usize, field: MappingField) -> Option<&CustomEntry> {
        let entry = self.entries.get_mut(index)?;
        entry.mapping.apply(field);
        Some(entry)
    }

    /// Same as [`Self::update`], addressed by identity so concurrent removals cannot shift it.
    pub fn update_by_id(&mut self, id: CustomMappingId, field: MappingField) -> Option<&CustomEntry> {
        let index = self.index_of(id)?;
        self.update(index, field)
    }

    pub fn remove(&mut self, index: usize) -> Option<CustomEntry> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    pub fn remove_by_id(&mut self, id: CustomMappingId) -> Option<CustomEntry> {
        let index = self.index_of(id)?;
        self.remove(index)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&CustomEntry> {
        self.entries.get(index)
    }

    #[must_use]
    pub fn get_by_id(&self, id: CustomMappingId) -> Option<&CustomEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    #[must_use]
    pub fn index_of(&self, id: CustomMappingId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    #[must_use]
    pub fn entries(&self) -> &[CustomEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
