mod common;

use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use uast_dev_cli::HttpBackend;
use uast_dev_mappings::{
    CustomMappingStore, Language, MappingRegistry, MappingSource, RegistryError,
};
use uast_dev_protocol::{ParseRequest, QueryRequest, ServiceReply};
use uast_dev_session::{
    ParserService, QueryService, QueryState, SessionConfig, SessionController, SessionError,
    SessionServices,
};

#[tokio::test]
async fn catalog_and_baselines_are_fetched() {
    let backend = HttpBackend::new(common::spawn_stub_server().await).unwrap();

    let catalog = backend.fetch_catalog().await.unwrap();
    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog["go"].size, Some(1024));

    let go = backend.fetch_baseline("go").await.unwrap().unwrap();
    assert_eq!(go.extensions, vec![".go".to_string()]);
    assert!(go.body.starts_with("[language \"go\""));
}

#[tokio::test]
async fn missing_baseline_is_none_and_server_errors_are_transport_errors() {
    let backend = HttpBackend::new(common::spawn_stub_server().await).unwrap();

    assert_eq!(backend.fetch_baseline("cobol").await.unwrap(), None);
    let err = backend.fetch_baseline("broken").await.unwrap_err();
    assert_eq!(err.message, "HTTP error! status: 500");
}

#[tokio::test]
async fn parse_and_query_use_server_field_names() {
    let backend = HttpBackend::new(common::spawn_stub_server().await).unwrap();

    let response = backend
        .parse(ParseRequest {
            code: "package main".to_string(),
            language: "go".to_string(),
            mapping_overrides: BTreeMap::new(),
        })
        .await
        .unwrap();
    let ServiceReply::Payload(tree) = response.reply() else {
        panic!("expected a tree, got {response:?}");
    };

    let response = backend
        .query(QueryRequest {
            tree: tree.to_string(),
            query: "filter(.type == \"Function\")".to_string(),
        })
        .await
        .unwrap();
    let ServiceReply::Payload(results) = response.reply() else {
        panic!("expected results, got {response:?}");
    };
    let results: serde_json::Value = serde_json::from_str(results).unwrap();
    assert_eq!(results, json!([{ "type": "Function", "name": "main" }]));

    let response = backend
        .query(QueryRequest {
            tree: tree.to_string(),
            query: "bad(".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(
        response.reply(),
        ServiceReply::Error("Query error: unexpected end of input")
    );
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let backend = HttpBackend::new("http://127.0.0.1:9").unwrap();
    assert!(backend.fetch_catalog().await.is_err());

    let registry = MappingRegistry::new(Arc::new(backend));
    let err = registry.list_languages().await.unwrap_err();
    assert!(matches!(err, RegistryError::RegistryUnavailable(_)));
}

#[tokio::test]
async fn session_runs_end_to_end_over_http() {
    let backend = Arc::new(HttpBackend::new(common::spawn_stub_server().await).unwrap());
    let services = SessionServices {
        registry: Arc::new(MappingRegistry::new(backend.clone())),
        parser: backend.clone(),
        querier: backend,
    };
    let config = SessionConfig::default()
        .with_parse_debounce(Duration::from_millis(20))
        .with_query_debounce(Duration::from_millis(20));
    let controller = SessionController::start(services, CustomMappingStore::new(), config);

    controller.set_code("package main\nfunc main(){}").unwrap();
    controller.set_query("filter(.type == \"Function\")").unwrap();
    let snapshot = controller.settled().await.unwrap();

    assert_eq!(snapshot.language, Language::from("go"));
    let tree = snapshot.tree.tree().unwrap();
    assert_eq!(tree.value["language"], json!("go"));
    assert_eq!(tree.value["overrides"], json!([]));
    assert_eq!(
        snapshot.query_result,
        QueryState::Results(Arc::new(json!([{ "type": "Function", "name": "main" }])))
    );

    controller.set_code("syntax error").unwrap();
    let snapshot = controller.settled().await.unwrap();
    assert_eq!(
        snapshot.tree.error(),
        Some(&SessionError::ServiceReported {
            message: "Parse error: unexpected token".to_string()
        })
    );
    assert_eq!(snapshot.query_result, QueryState::NoTreeData);
}
