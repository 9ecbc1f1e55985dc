//! # UAST Dev Mappings
//!
//! Everything that decides *which* mapping a parse runs with.
//!
//! ```text
//! MappingSource (catalog + baselines)
//!     │
//!     ├──> MappingRegistry ── baseline cache ── overlays (edited embedded mappings)
//!     │
//!     ├──> CustomMappingStore (user-authored, insertion order)
//!     │
//!     └──> MappingResolver ──> Selection (pristine / customized embedded, or custom)
//! ```
//!
//! Stores are plain values or `Arc`-shared handles injected by the caller; nothing here is
//! global, so tests build isolated instances.

mod catalog;
mod custom;
mod error;
mod registry;
mod resolver;
mod source;
mod types;

pub use catalog::{display_label, LanguageOption, MappingCatalog, PREFERRED_LANGUAGES};
pub use custom::{
    CustomEntry, CustomMappingId, CustomMappingStore, DEFAULT_CUSTOM_BODY,
    DEFAULT_CUSTOM_EXTENSION,
};
pub use error::{RegistryError, Result};
pub use registry::MappingRegistry;
pub use resolver::{MappingResolver, Selection, SelectionKey, SelectionKind};
pub use source::MappingSource;
pub use types::{parse_extensions, Language, Mapping, MappingField, MappingOrigin};
