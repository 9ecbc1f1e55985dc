use crate::catalog::MappingCatalog;
use crate::error::{RegistryError, Result};
use crate::source::MappingSource;
use crate::types::{Language, Mapping, MappingOrigin};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

type BaselineCell = Arc<OnceCell<Option<Mapping>>>;

/// Embedded mappings and the user overlays that shadow them.
///
/// The catalog and each baseline are fetched at most once per registry; concurrent callers
/// share the in-flight fetch. Failed fetches leave the cell empty so the next call retries.
/// Overlays are plain in-memory state.
pub struct MappingRegistry {
    source: Arc<dyn MappingSource>,
    catalog: OnceCell<MappingCatalog>,
    baselines: Mutex<HashMap<Language, BaselineCell>>,
    overlays: Mutex<HashMap<Language, Mapping>>,
}

impl MappingRegistry {
    pub fn new(source: Arc<dyn MappingSource>) -> Self {
        Self {
            source,
            catalog: OnceCell::new(),
            baselines: Mutex::new(HashMap::new()),
            overlays: Mutex::new(HashMap::new()),
        }
    }

    pub async fn list_languages(&self) -> Result<&MappingCatalog> {
        self.catalog
            .get_or_try_init(|| async {
                debug!("Fetching mapping catalog");
                match self.source.fetch_catalog().await {
                    Ok(payload) => {
                        let catalog = MappingCatalog::from_payload(payload);
                        info!("Mapping catalog loaded ({} languages)", catalog.len());
                        Ok(catalog)
                    }
                    Err(err) => {
                        warn!("Mapping catalog fetch failed: {err}");
                        Err(RegistryError::RegistryUnavailable(err.message))
                    }
                }
            })
            .await
    }

    /// The catalog if it has already been fetched.
    #[must_use]
    pub fn cached_catalog(&self) -> Option<&MappingCatalog> {
        self.catalog.get()
    }

    pub async fn load_baseline(&self, language: &Language) -> Result<Option<Mapping>> {
        if !self.list_languages().await?.contains(language) {
            debug!("No embedded mapping for {language}");
            return Ok(None);
        }

        let cell = {
            let mut baselines = self
                .baselines
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            baselines.entry(language.clone()).or_default().clone()
        };

        let mapping = cell
            .get_or_try_init(|| async {
                debug!("Fetching embedded mapping for {language}");
                match self.source.fetch_baseline(language.as_str()).await {
                    Ok(payload) => Ok(payload.map(|p| Mapping::embedded(language, p))),
                    Err(err) => {
                        warn!("Embedded mapping fetch for {language} failed: {err}");
                        Err(RegistryError::MappingFetch {
                            language: language.to_string(),
                            message: err.message,
                        })
                    }
                }
            })
            .await?;
        Ok(mapping.clone())
    }

    /// The baseline if it has already been fetched.
    #[must_use]
    pub fn cached_baseline(&self, language: &Language) -> Option<Mapping> {
        let baselines = self
            .baselines
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        baselines
            .get(language)
            .and_then(|cell| cell.get())
            .and_then(|mapping| mapping.clone())
    }

    #[must_use]
    pub fn get_overlay(&self, language: &Language) -> Option<Mapping> {
        self.overlays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(language)
            .cloned()
    }

    #[must_use]
    pub fn has_overlay(&self, language: &Language) -> bool {
        self.overlays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(language)
    }

    /// Stores `mapping` as the overlay for `language`, marked as a customized embedded mapping.
    pub fn set_overlay(&self, language: &Language, mut mapping: Mapping) {
        mapping.origin = MappingOrigin::Embedded;
        mapping.is_customized_embedded = true;
        self.overlays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(language.clone(), mapping);
    }

    pub fn clear_overlay(&self, language: &Language) -> Option<Mapping> {
        self.overlays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(language)
    }
}
