use async_trait::async_trait;
use uast_dev_protocol::{BaselinePayload, CatalogPayload, TransportError};

/// Where the registry fetches the catalog and baselines from.
#[async_trait]
pub trait MappingSource: Send + Sync {
    async fn fetch_catalog(&self) -> Result<CatalogPayload, TransportError>;

    /// `Ok(None)` when the backend does not know the language.
    async fn fetch_baseline(&self, language: &str)
        -> Result<Option<BaselinePayload>, TransportError>;
}
