use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use uast_dev_protocol::{BaselinePayload, MappingOverride};

/// Catalog key naming one embedded mapping (e.g. `go`, `c_sharp`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Language(String);

impl Language {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name given to the selection synthesized from this language's baseline.
    #[must_use]
    pub fn embedded_mapping_name(&self) -> String {
        format!("{}_embedded", self.0)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Language {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Language {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Language {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingOrigin {
    Embedded,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub name: String,
    pub extensions: Vec<String>,
    pub body: String,
    pub origin: MappingOrigin,
    /// Only ever true for embedded mappings that carry a recorded user edit.
    pub is_customized_embedded: bool,
}

impl Mapping {
    /// Pristine embedded mapping built from a fetched baseline. A baseline without extensions
    /// falls back to `.<language>`.
    #[must_use]
    pub fn embedded(language: &Language, baseline: BaselinePayload) -> Self {
        let extensions = if baseline.extensions.is_empty() {
            vec![format!(".{language}")]
        } else {
            baseline.extensions
        };
        Self {
            name: language.embedded_mapping_name(),
            extensions,
            body: baseline.body,
            origin: MappingOrigin::Embedded,
            is_customized_embedded: false,
        }
    }

    pub fn custom(name: impl Into<String>, extensions: Vec<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extensions,
            body: body.into(),
            origin: MappingOrigin::Custom,
            is_customized_embedded: false,
        }
    }

    #[must_use]
    pub const fn is_embedded(&self) -> bool {
        matches!(self.origin, MappingOrigin::Embedded)
    }

    #[must_use]
    pub const fn is_pristine_embedded(&self) -> bool {
        self.is_embedded() && !self.is_customized_embedded
    }

    /// Replaces one field. Returns `false` when the value is unchanged.
    pub fn apply(&mut self, field: MappingField) -> bool {
        match field {
            MappingField::Name(name) => replace_if_changed(&mut self.name, name),
            MappingField::Extensions(extensions) => {
                replace_if_changed(&mut self.extensions, extensions)
            }
            MappingField::Body(body) => replace_if_changed(&mut self.body, body),
        }
    }

    #[must_use]
    pub fn to_override(&self) -> MappingOverride {
        MappingOverride {
            extensions: self.extensions.clone(),
            body: self.body.clone(),
        }
    }
}

fn replace_if_changed<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// A single-field edit of a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum MappingField {
    Name(String),
    Extensions(Vec<String>),
    Body(String),
}

/// Splits comma-separated extension input (`".go, .mod"`), dropping blanks.
#[must_use]
pub fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|ext| !ext.is_empty())
        .map(str::to_string)
        .collect()
}
