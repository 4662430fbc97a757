//! Scrape integration tests
//!
//! End-to-end tests for the scrape pipeline that verify:
//! - Rule-driven transformation of one bulk response
//! - Skipping of per-rule error entries
//! - HTTP surface (status codes, headers, body)

use axum::body::Body;
use axum::http::{Request, StatusCode};
use jolokia_exporter::config::{Config, RuleConfig};
use jolokia_exporter::server::{router, AppState};
use jolokia_exporter::transformer::{MetricType, RuleSet};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock Jolokia answering the three-rule bulk request of [`test_config`]
async fn create_mock_jolokia_server() -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jolokia"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "request": {"mbean": "java.lang:type=Memory", "attribute": "HeapMemoryUsage", "type": "read"},
                "value": {
                    "init": 268435456_i64,
                    "committed": 536870912_i64,
                    "max": 4294967296_i64,
                    "used": 123456789_i64
                },
                "status": 200,
                "timestamp": 1609459200
            },
            {
                "request": {"mbean": "com.example:type=Missing", "type": "read"},
                "error_type": "javax.management.InstanceNotFoundException",
                "error": "javax.management.InstanceNotFoundException : com.example:type=Missing",
                "stacktrace": "javax.management.InstanceNotFoundException: com.example:type=Missing\n\tat ...",
                "status": 404
            },
            {
                "request": {"mbean": "java.lang:type=GarbageCollector,name=*", "type": "read"},
                "value": [
                    {"Name": "G1 Young Generation", "CollectionCount": 12},
                    {"Name": "G1 Old Generation", "CollectionCount": 1}
                ],
                "status": 200,
                "timestamp": 1609459200
            }
        ])))
        .mount(&mock_server)
        .await;

    mock_server
}

fn rule(pattern: &str, name: &str, metric_type: MetricType) -> RuleConfig {
    RuleConfig {
        pattern: pattern.to_string(),
        name: name.to_string(),
        metric_type,
        ..RuleConfig::default()
    }
}

fn test_config(jolokia_url: String) -> Config {
    let mut heap = rule(
        "java.lang<type=Memory><>HeapMemoryUsage/(used|max)",
        "jvm_memory_heap_$1_bytes",
        MetricType::Gauge,
    );
    heap.help = Some("JVM heap memory usage in bytes".to_string());
    heap.labels = vec![("area".to_string(), "heap".to_string())];

    let missing = rule("com.example<type=Missing><>Value", "missing_value", MetricType::Gauge);

    let mut gc = rule(
        "java.lang<type=GarbageCollector,name=*><>CollectionCount",
        "jvm_gc_collections_total",
        MetricType::Counter,
    );
    gc.filter = vec![("Name".to_string(), json!("G1 Young Generation"))];
    gc.labels = vec![("gc".to_string(), "young".to_string())];

    let mut config = Config::default();
    config.jolokia.url = jolokia_url;
    config.server.warmup = false;
    config.rules = vec![heap, missing, gc];
    config
}

async fn create_app(mock_server: &MockServer) -> axum::Router {
    let config = test_config(format!("{}/jolokia", mock_server.uri()));
    let rules = RuleSet::from_config(&config.rules).unwrap();
    let state = AppState::new(config, rules, "1.2.3").unwrap();
    router(state)
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_full_scrape_pipeline() {
    let mock_server = create_mock_jolokia_server().await;
    let app = create_app(&mock_server).await;

    let (status, headers, body) = get(app, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers["content-type"],
        "text/plain; version=0.0.4; charset=utf-8"
    );
    assert_eq!(headers["x-app-version"], "1.2.3");

    let expected = "\
# HELP jvm_memory_heap_max_bytes JVM heap memory usage in bytes
# TYPE jvm_memory_heap_max_bytes gauge
jvm_memory_heap_max_bytes{area=\"heap\"} 4294967296
# HELP jvm_memory_heap_used_bytes JVM heap memory usage in bytes
# TYPE jvm_memory_heap_used_bytes gauge
jvm_memory_heap_used_bytes{area=\"heap\"} 123456789
# TYPE jvm_gc_collections_total counter
jvm_gc_collections_total{gc=\"young\"} 12
";
    assert_eq!(body, expected);
}

#[tokio::test]
async fn test_error_entry_contributes_nothing() {
    let mock_server = create_mock_jolokia_server().await;
    let app = create_app(&mock_server).await;

    let (status, _, body) = get(app, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("missing_value"));
}

#[tokio::test]
async fn test_scrape_is_idempotent() {
    let mock_server = create_mock_jolokia_server().await;
    let app = create_app(&mock_server).await;

    let (_, _, first) = get(app.clone(), "/metrics").await;
    let (_, _, second) = get(app, "/metrics").await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_transport_failure_is_bad_gateway() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jolokia"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let app = create_app(&mock_server).await;
    let (status, headers, body) = get(app, "/metrics").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(headers["x-app-version"], "1.2.3");
    assert!(!body.contains("503"));
}

#[tokio::test]
async fn test_root_and_health() {
    let mock_server = create_mock_jolokia_server().await;
    let app = create_app(&mock_server).await;

    let (status, headers, body) = get(app.clone(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
    assert_eq!(headers["x-app-version"], "1.2.3");

    let (status, _, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let health: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["version"], "1.2.3");
}

#[tokio::test]
async fn test_custom_metrics_path() {
    let mock_server = create_mock_jolokia_server().await;

    let mut config = test_config(format!("{}/jolokia", mock_server.uri()));
    config.server.path = "/jmx".to_string();
    let rules = RuleSet::from_config(&config.rules).unwrap();
    let app = router(AppState::new(config, rules, "dev").unwrap());

    let (status, _, body) = get(app.clone(), "/jmx").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("jvm_gc_collections_total"));

    let (status, _, _) = get(app, "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
