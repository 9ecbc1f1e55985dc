use crate::custom::{CustomEntry, CustomMappingId, CustomMappingStore};
use crate::registry::MappingRegistry;
use crate::types::{Language, Mapping, MappingField};
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;
use uast_dev_protocol::MappingOverride;

/// Identity of the live selection. Custom selections are tracked by id, never by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum SelectionKey {
    Embedded(Language),
    Custom(CustomMappingId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionKind {
    PristineEmbedded,
    CustomizedEmbedded,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub key: SelectionKey,
    pub mapping: Mapping,
}

impl Selection {
    #[must_use]
    pub fn kind(&self) -> SelectionKind {
        match self.key {
            SelectionKey::Custom(_) => SelectionKind::Custom,
            SelectionKey::Embedded(_) if self.mapping.is_customized_embedded => {
                SelectionKind::CustomizedEmbedded
            }
            SelectionKey::Embedded(_) => SelectionKind::PristineEmbedded,
        }
    }

    /// Overrides to send with a parse request. The untouched baseline is already known to the
    /// parser, so it travels as an empty map.
    #[must_use]
    pub fn overrides(&self) -> BTreeMap<String, MappingOverride> {
        let mut overrides = BTreeMap::new();
        if self.kind() != SelectionKind::PristineEmbedded {
            overrides.insert(self.mapping.name.clone(), self.mapping.to_override());
        }
        overrides
    }
}

/// Decides which single mapping is active.
///
/// Every method returns whether the selection changed, so callers know when a re-parse is due.
#[derive(Debug, Default, Clone)]
pub struct MappingResolver {
    selection: Option<Selection>,
}

impl MappingResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    #[must_use]
    pub fn selected(&self) -> Option<&Mapping> {
        self.selection.as_ref().map(|s| &s.mapping)
    }

    /// Overlay if one exists, else the cached baseline, else nothing. The baseline must have
    /// been loaded through the registry beforehand.
    pub fn resolve_embedded(&mut self, language: &Language, registry: &MappingRegistry) -> bool {
        let mapping = registry
            .get_overlay(language)
            .or_else(|| registry.cached_baseline(language));
        let next = mapping.map(|mapping| Selection {
            key: SelectionKey::Embedded(language.clone()),
            mapping,
        });
        debug!(
            "Resolved embedded mapping for {language}: {}",
            next.as_ref()
                .map_or("none", |s| if s.mapping.is_customized_embedded {
                    "customized"
                } else {
                    "pristine"
                })
        );
        self.replace(next)
    }

    pub fn select_custom(&mut self, entry: &CustomEntry) -> bool {
        self.replace(Some(Selection {
            key: SelectionKey::Custom(entry.id),
            mapping: entry.mapping.clone(),
        }))
    }

    pub fn clear(&mut self) -> bool {
        self.replace(None)
    }

    /// Writes an edit of the selected mapping through to its owner: the custom store for custom
    /// selections, the language overlay for embedded ones.
    pub fn edit_selected(
        &mut self,
        field: MappingField,
        registry: &MappingRegistry,
        store: &mut CustomMappingStore,
    ) -> bool {
        let Some(selection) = self.selection.as_mut() else {
            return false;
        };
        match &selection.key {
            SelectionKey::Custom(id) => {
                let Some(entry) = store.update_by_id(*id, field) else {
                    return false;
                };
                if entry.mapping == selection.mapping {
                    return false;
                }
                selection.mapping = entry.mapping.clone();
                true
            }
            SelectionKey::Embedded(language) => {
                let mut edited = selection.mapping.clone();
                if !edited.apply(field) {
                    return false;
                }
                registry.set_overlay(language, edited);
                match registry.get_overlay(language) {
                    Some(overlay) => {
                        selection.mapping = overlay;
                        true
                    }
                    None => false,
                }
            }
        }
    }

    /// Drops the overlay of the selected embedded mapping and falls back to the baseline.
    /// Custom selections are left alone.
    pub fn reset_embedded(&mut self, registry: &MappingRegistry) -> bool {
        let Some(SelectionKey::Embedded(language)) = self.selection.as_ref().map(|s| s.key.clone())
        else {
            return false;
        };
        registry.clear_overlay(&language);
        self.resolve_embedded(&language, registry)
    }

    /// Refreshes a live custom selection after its store entry changed elsewhere.
    pub fn custom_updated(&mut self, entry: &CustomEntry) -> bool {
        match self.selection.as_mut() {
            Some(selection)
                if selection.key == SelectionKey::Custom(entry.id)
                    && selection.mapping != entry.mapping =>
            {
                selection.mapping = entry.mapping.clone();
                true
            }
            _ => false,
        }
    }

    /// Clears the selection if it points at the removed entry.
    pub fn custom_removed(&mut self, id: CustomMappingId) -> bool {
        if self.selection.as_ref().map(|s| &s.key) == Some(&SelectionKey::Custom(id)) {
            return self.clear();
        }
        false
    }

    fn replace(&mut self, next: Option<Selection>) -> bool {
        if self.selection == next {
            return false;
        }
        self.selection = next;
        true
    }
}
