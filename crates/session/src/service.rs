use async_trait::async_trait;
use std::sync::Arc;
use uast_dev_mappings::MappingRegistry;
use uast_dev_protocol::{ParseRequest, ParseResponse, QueryRequest, QueryResponse, TransportError};

/// Turns code plus mapping overrides into a UAST.
#[async_trait]
pub trait ParserService: Send + Sync {
    async fn parse(&self, request: ParseRequest) -> Result<ParseResponse, TransportError>;
}

/// Runs a query against a UAST.
#[async_trait]
pub trait QueryService: Send + Sync {
    async fn query(&self, request: QueryRequest) -> Result<QueryResponse, TransportError>;
}

/// External collaborators a session is started with.
#[derive(Clone)]
pub struct SessionServices {
    pub registry: Arc<MappingRegistry>,
    pub parser: Arc<dyn ParserService>,
    pub querier: Arc<dyn QueryService>,
}
