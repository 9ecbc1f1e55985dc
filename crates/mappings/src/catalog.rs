use crate::types::Language;
use serde::Serialize;
use std::collections::BTreeMap;
use uast_dev_protocol::{CatalogEntry, CatalogPayload};

/// Languages tried, in order, when the current default is not in the catalog.
pub const PREFERRED_LANGUAGES: &[&str] = &["go", "python", "javascript", "java", "cpp", "rust"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingCatalog {
    entries: BTreeMap<Language, CatalogEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageOption {
    pub value: Language,
    pub label: String,
}

impl MappingCatalog {
    #[must_use]
    pub fn from_payload(payload: CatalogPayload) -> Self {
        Self {
            entries: payload
                .into_iter()
                .map(|(key, entry)| (Language::new(key), entry))
                .collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, language: &Language) -> bool {
        self.entries.contains_key(language)
    }

    #[must_use]
    pub fn entry(&self, language: &Language) -> Option<&CatalogEntry> {
        self.entries.get(language)
    }

    pub fn languages(&self) -> impl Iterator<Item = &Language> {
        self.entries.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Languages with human labels, sorted by label.
    #[must_use]
    pub fn formatted_languages(&self) -> Vec<LanguageOption> {
        let mut options: Vec<LanguageOption> = self
            .entries
            .keys()
            .map(|lang| LanguageOption {
                value: lang.clone(),
                label: display_label(lang.as_str()),
            })
            .collect();
        options.sort_by(|a, b| a.label.cmp(&b.label));
        options
    }

    /// Keeps `current` when the catalog has it, otherwise picks a preferred language, otherwise
    /// the first key. `None` only for an empty catalog.
    #[must_use]
    pub fn preferred_language(&self, current: Option<&Language>) -> Option<Language> {
        if let Some(current) = current.filter(|lang| self.contains(lang)) {
            return Some(current.clone());
        }
        PREFERRED_LANGUAGES
            .iter()
            .map(|key| Language::from(*key))
            .find(|lang| self.contains(lang))
            .or_else(|| self.entries.keys().next().cloned())
    }
}

#[must_use]
pub fn display_label(language: &str) -> String {
    let special = match language {
        "c_sharp" => Some("C#"),
        "cpp" => Some("C++"),
        "c" => Some("C"),
        "tsx" => Some("TSX"),
        "rust_with_rstml" => Some("Rust (RSTML)"),
        "markdown_inline" => Some("Markdown Inline"),
        "nim_format_string" => Some("Nim Format String"),
        "git_config" => Some("Git Config"),
        "ssh_config" => Some("SSH Config"),
        "gosum" => Some("Go Sum"),
        "gotmpl" => Some("Go Template"),
        "gowork" => Some("Go Work"),
        _ => None,
    };
    if let Some(label) = special {
        return label.to_string();
    }
    let mut chars = language.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
