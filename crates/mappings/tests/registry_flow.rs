use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uast_dev_mappings::{
    CustomMappingStore, Language, MappingField, MappingRegistry, MappingResolver, MappingSource,
    RegistryError, SelectionKey, SelectionKind,
};
use uast_dev_protocol::{BaselinePayload, CatalogEntry, CatalogPayload, TransportError};

#[derive(Default)]
struct CountingSource {
    catalog_calls: AtomicUsize,
    baseline_calls: AtomicUsize,
    fail_catalog: AtomicBool,
    fail_baseline: AtomicBool,
}

#[async_trait]
impl MappingSource for CountingSource {
    async fn fetch_catalog(&self) -> Result<CatalogPayload, TransportError> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        if self.fail_catalog.load(Ordering::SeqCst) {
            return Err(TransportError::new("connection refused"));
        }
        let mut catalog = CatalogPayload::new();
        for lang in ["go", "python"] {
            catalog.insert(lang.to_string(), CatalogEntry::default());
        }
        Ok(catalog)
    }

    async fn fetch_baseline(&self, language: &str) -> Result<Option<BaselinePayload>, TransportError> {
        self.baseline_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        if self.fail_baseline.load(Ordering::SeqCst) {
            return Err(TransportError::new("HTTP error! status: 502"));
        }
        Ok(Some(BaselinePayload {
            extensions: vec![format!(".{language}")],
            body: format!("[language \"{language}\"] baseline"),
        }))
    }
}

fn registry_with(source: Arc<CountingSource>) -> MappingRegistry {
    MappingRegistry::new(source)
}

#[tokio::test(start_paused = true)]
async fn concurrent_catalog_callers_share_one_fetch() {
    let source = Arc::new(CountingSource::default());
    let registry = registry_with(source.clone());

    let (a, b, c) = tokio::join!(
        registry.list_languages(),
        registry.list_languages(),
        registry.list_languages()
    );
    assert_eq!(a.unwrap().len(), 2);
    assert_eq!(b.unwrap().len(), 2);
    assert_eq!(c.unwrap().len(), 2);
    assert_eq!(source.catalog_calls.load(Ordering::SeqCst), 1);

    registry.list_languages().await.unwrap();
    assert_eq!(source.catalog_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_baseline_loads_share_one_fetch() {
    let source = Arc::new(CountingSource::default());
    let registry = registry_with(source.clone());
    let go = Language::from("go");

    let (a, b) = tokio::join!(registry.load_baseline(&go), registry.load_baseline(&go));
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(source.baseline_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn catalog_failure_is_reported_and_not_cached() {
    let source = Arc::new(CountingSource::default());
    source.fail_catalog.store(true, Ordering::SeqCst);
    let registry = registry_with(source.clone());

    let err = registry.list_languages().await.unwrap_err();
    assert_eq!(
        err,
        RegistryError::RegistryUnavailable("connection refused".to_string())
    );
    let err = registry.load_baseline(&Language::from("go")).await.unwrap_err();
    assert!(matches!(err, RegistryError::RegistryUnavailable(_)));
    assert!(registry.cached_catalog().is_none());

    source.fail_catalog.store(false, Ordering::SeqCst);
    assert_eq!(registry.list_languages().await.unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn baseline_failure_is_retryable() {
    let source = Arc::new(CountingSource::default());
    source.fail_baseline.store(true, Ordering::SeqCst);
    let registry = registry_with(source.clone());
    let go = Language::from("go");

    let err = registry.load_baseline(&go).await.unwrap_err();
    assert_eq!(
        err,
        RegistryError::MappingFetch {
            language: "go".to_string(),
            message: "HTTP error! status: 502".to_string(),
        }
    );
    assert!(registry.cached_baseline(&go).is_none());

    source.fail_baseline.store(false, Ordering::SeqCst);
    let mapping = registry.load_baseline(&go).await.unwrap().unwrap();
    assert_eq!(mapping.body, "[language \"go\"] baseline");
    assert_eq!(source.baseline_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn overlay_survives_language_switch_and_reset_restores_baseline() {
    let registry = registry_with(Arc::new(CountingSource::default()));
    let mut store = CustomMappingStore::new();
    let mut resolver = MappingResolver::new();
    let go = Language::from("go");
    let python = Language::from("python");

    registry.load_baseline(&go).await.unwrap();
    registry.load_baseline(&python).await.unwrap();

    assert!(resolver.resolve_embedded(&go, &registry));
    assert_eq!(resolver.selection().unwrap().kind(), SelectionKind::PristineEmbedded);

    assert!(resolver.edit_selected(
        MappingField::Body("edited go".to_string()),
        &registry,
        &mut store
    ));
    assert_eq!(resolver.selection().unwrap().kind(), SelectionKind::CustomizedEmbedded);
    assert!(registry.has_overlay(&go));

    resolver.resolve_embedded(&python, &registry);
    assert_eq!(resolver.selected().unwrap().body, "[language \"python\"] baseline");

    resolver.resolve_embedded(&go, &registry);
    let selected = resolver.selected().unwrap();
    assert_eq!(selected.body, "edited go");
    assert!(selected.is_customized_embedded);

    assert!(resolver.reset_embedded(&registry));
    let selected = resolver.selected().unwrap();
    assert_eq!(selected.body, "[language \"go\"] baseline");
    assert!(!selected.is_customized_embedded);
    assert!(!registry.has_overlay(&go));

    assert!(!resolver.reset_embedded(&registry));
    assert_eq!(resolver.selected().unwrap().body, "[language \"go\"] baseline");
}

#[tokio::test(start_paused = true)]
async fn custom_selection_writes_through_and_ignores_overlays() {
    let registry = registry_with(Arc::new(CountingSource::default()));
    let mut store = CustomMappingStore::new();
    let mut resolver = MappingResolver::new();
    let go = Language::from("go");
    registry.load_baseline(&go).await.unwrap();

    let entry = store.create();
    assert!(resolver.select_custom(&entry));
    assert!(resolver.edit_selected(
        MappingField::Extensions(vec![".foo".to_string()]),
        &registry,
        &mut store
    ));
    assert_eq!(
        store.get_by_id(entry.id).unwrap().mapping.extensions,
        vec![".foo".to_string()]
    );
    assert!(!registry.has_overlay(&go));

    let selection = resolver.selection().unwrap();
    assert_eq!(selection.key, SelectionKey::Custom(entry.id));
    assert_eq!(selection.overrides().len(), 1);

    assert!(!resolver.reset_embedded(&registry));
    assert_eq!(resolver.selection().unwrap().kind(), SelectionKind::Custom);
}

#[tokio::test(start_paused = true)]
async fn removing_selected_custom_clears_selection() {
    let registry = registry_with(Arc::new(CountingSource::default()));
    let mut store = CustomMappingStore::new();
    let mut resolver = MappingResolver::new();

    let keep = store.create();
    let doomed = store.create();
    store.update_by_id(doomed.id, MappingField::Name(keep.mapping.name.clone()));
    resolver.select_custom(store.get_by_id(doomed.id).unwrap());

    assert!(!resolver.custom_removed(keep.id));
    let removed = store.remove_by_id(doomed.id).unwrap();
    assert!(resolver.custom_removed(removed.id));
    assert!(resolver.selection().is_none());

    let go = Language::from("go");
    registry.load_baseline(&go).await.unwrap();
    resolver.resolve_embedded(&go, &registry);
    assert!(resolver.selection().unwrap().overrides().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unknown_language_clears_selection() {
    let registry = registry_with(Arc::new(CountingSource::default()));
    let mut resolver = MappingResolver::new();
    let go = Language::from("go");
    registry.load_baseline(&go).await.unwrap();
    resolver.resolve_embedded(&go, &registry);

    let cobol = Language::from("cobol");
    assert!(registry.load_baseline(&cobol).await.unwrap().is_none());
    assert!(resolver.resolve_embedded(&cobol, &registry));
    assert!(resolver.selection().is_none());
}
