use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

/// Development server stand-in bound to an ephemeral loopback port. Returns its base URL.
///
/// Catalog: `go` and `python`; `broken` is listed but its baseline fails with 500. Code
/// containing `syntax error` is rejected, and the query `bad(` fails.
pub async fn spawn_stub_server() -> String {
    let app = Router::new()
        .route("/api/mappings", get(catalog))
        .route("/api/mappings/:language", get(baseline))
        .route("/api/parse", post(parse))
        .route("/api/query", post(query));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn catalog() -> Json<Value> {
    Json(json!({
        "go": { "size": 1024 },
        "python": { "extensions": [".py"] },
        "broken": {}
    }))
}

async fn baseline(Path(language): Path<String>) -> Result<Json<Value>, StatusCode> {
    match language.as_str() {
        "go" => Ok(Json(json!({
            "extensions": [".go"],
            "uast": "[language \"go\", extensions: \".go\"]"
        }))),
        "python" => Ok(Json(json!({
            "extensions": [".py"],
            "uast": "[language \"python\", extensions: \".py\"]"
        }))),
        "broken" => Err(StatusCode::INTERNAL_SERVER_ERROR),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn parse(Json(request): Json<Value>) -> Json<Value> {
    let code = request["code"].as_str().unwrap_or_default();
    if code.contains("syntax error") {
        return Json(json!({ "uast": "", "error": "Parse error: unexpected token" }));
    }
    let overrides: Vec<String> = request
        .get("uastmaps")
        .and_then(Value::as_object)
        .map(|maps| maps.keys().cloned().collect())
        .unwrap_or_default();
    let tree = json!({
        "type": "File",
        "language": request["language"],
        "overrides": overrides,
        "children": [{ "type": "Function", "name": "main" }]
    });
    Json(json!({ "uast": tree.to_string() }))
}

async fn query(Json(request): Json<Value>) -> Json<Value> {
    if request["query"] == "bad(" {
        return Json(json!({ "results": "", "error": "Query error: unexpected end of input" }));
    }
    let tree: Value = serde_json::from_str(request["uast"].as_str().unwrap_or("null")).unwrap();
    Json(json!({ "results": tree["children"].to_string() }))
}
