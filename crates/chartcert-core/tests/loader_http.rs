//! Integration tests for ChartLoader over HTTP.
//!
//! Uses wiremock for HTTP mocking. Tests cover successful loads, status
//! mapping (404/5xx), caching, size limits, timeouts and cancellation.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use chartcert_core::{
    Cancellation, CertifierConfig, ChartCache, ChartLoader, ChartSource, CertifyError,
};
use flate2::write::GzEncoder;
use flate2::Compression;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chart_archive(name: &str, version: &str) -> Vec<u8> {
    let chartfile = format!("apiVersion: v2\nname: {name}\nversion: {version}\n");
    let entries = [
        ("Chart.yaml", chartfile.as_str()),
        ("values.yaml", "replicaCount: 1\n"),
        ("README.md", "# demo\n"),
        ("templates/deployment.yaml", "kind: Deployment\n"),
    ];

    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (file, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("{name}/{file}"), data.as_bytes())
            .unwrap();
    }
    let mut encoder = builder.into_inner().unwrap();
    encoder.flush().unwrap();
    encoder.finish().unwrap()
}

fn create_test_loader(config: CertifierConfig) -> ChartLoader {
    let cache_dir = std::env::temp_dir().join("chartcert-tests");
    ChartLoader::with_cache(config, Arc::new(ChartCache::with_dir(cache_dir)))
        .expect("failed to create loader")
}

#[tokio::test]
async fn test_load_remote_chart_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/charts/demo-0.1.0.tgz"))
        .and(header("user-agent", concat!("chartcert/", env!("CARGO_PKG_VERSION"))))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(chart_archive("demo", "0.1.0")))
        .mount(&mock_server)
        .await;

    let loader = create_test_loader(CertifierConfig::default());
    let uri = format!("{}/charts/demo-0.1.0.tgz", mock_server.uri());
    let loaded = loader.load_from_uri(&uri).await.expect("load failed");

    assert_eq!(loaded.chart.name(), "demo");
    assert_eq!(loaded.chart.version(), "0.1.0");
    assert!(loaded.local_path().is_none());
    match &loaded.source {
        ChartSource::Remote { archive, .. } => assert!(!archive.is_empty()),
        other => panic!("expected remote source, got {other:?}"),
    }
}

#[tokio::test]
async fn test_second_load_is_served_from_cache() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/demo.tgz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(chart_archive("demo", "0.1.0")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let loader = create_test_loader(CertifierConfig::default());
    let uri = format!("{}/demo.tgz", mock_server.uri());

    let first = loader.load_from_uri(&uri).await.unwrap();
    let second = loader.load_from_uri(&uri).await.unwrap();
    assert!(Arc::ptr_eq(&first.chart, &second.chart));
    assert_eq!(loader.cache().len(), 1);
}

#[tokio::test]
async fn test_concurrent_first_loads_fetch_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/demo.tgz"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(chart_archive("demo", "0.1.0"))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let loader = Arc::new(create_test_loader(CertifierConfig::default()));
    let uri = format!("{}/demo.tgz", mock_server.uri());

    let mut handles = Vec::new();
    for _ in 0..4 {
        let loader = Arc::clone(&loader);
        let uri = uri.clone();
        handles.push(tokio::spawn(async move { loader.load_from_uri(&uri).await }));
    }
    for handle in handles {
        handle.await.unwrap().expect("load failed");
    }
}

#[tokio::test]
async fn test_load_remote_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing.tgz"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let loader = create_test_loader(CertifierConfig::default());
    let uri = format!("{}/missing.tgz", mock_server.uri());
    let err = loader.load_from_uri(&uri).await.unwrap_err();

    assert!(err.is_chart_not_found());
    assert_eq!(err.to_string(), format!("chart not found: {uri}"));
}

#[tokio::test]
async fn test_load_remote_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/demo.tgz"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let loader = create_test_loader(CertifierConfig::default());
    let uri = format!("{}/demo.tgz", mock_server.uri());
    let err = loader.load_from_uri(&uri).await.unwrap_err();

    match err {
        CertifyError::Load { message, .. } => assert!(message.contains("500"), "{message}"),
        other => panic!("expected Load, got {other:?}"),
    }
    assert!(loader.cache().is_empty());
}

#[tokio::test]
async fn test_load_remote_garbage_is_load_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/demo.tgz"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not a chart</html>"))
        .mount(&mock_server)
        .await;

    let loader = create_test_loader(CertifierConfig::default());
    let uri = format!("{}/demo.tgz", mock_server.uri());
    let err = loader.load_from_uri(&uri).await.unwrap_err();
    assert!(matches!(err, CertifyError::Load { .. }));
}

#[tokio::test]
async fn test_load_remote_exceeds_size_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/demo.tgz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(chart_archive("demo", "0.1.0")))
        .mount(&mock_server)
        .await;

    let loader = create_test_loader(CertifierConfig::default().with_max_chart_bytes(16));
    let uri = format!("{}/demo.tgz", mock_server.uri());
    let err = loader.load_from_uri(&uri).await.unwrap_err();

    match err {
        CertifyError::Load { message, .. } => assert!(message.contains("exceeds"), "{message}"),
        other => panic!("expected Load, got {other:?}"),
    }
}

#[tokio::test]
async fn test_load_remote_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow.tgz"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(chart_archive("demo", "0.1.0"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let loader = create_test_loader(CertifierConfig::default().with_timeout_secs(1));
    let uri = format!("{}/slow.tgz", mock_server.uri());
    let err = loader.load_from_uri(&uri).await.unwrap_err();

    match err {
        CertifyError::Load { message, .. } => assert_eq!(message, "request timed out"),
        other => panic!("expected Load, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cancel_in_flight_load() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow.tgz"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(chart_archive("demo", "0.1.0"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let loader = create_test_loader(CertifierConfig::default());
    let uri = format!("{}/slow.tgz", mock_server.uri());
    let cancel = Cancellation::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = loader
        .load_from_uri_with_cancel(&uri, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, CertifyError::Cancelled { .. }));
    assert!(loader.cache().is_empty());
}

#[tokio::test]
async fn test_cache_without_dir_reports_error_but_keeps_chart() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/demo.tgz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(chart_archive("demo", "0.1.0")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let loader = ChartLoader::with_cache(
        CertifierConfig::default(),
        Arc::new(ChartCache::without_dir()),
    )
    .unwrap();
    let uri = format!("{}/demo.tgz", mock_server.uri());

    let err = loader.load_from_uri(&uri).await.unwrap_err();
    assert!(matches!(err, CertifyError::CachePersistence { .. }));

    let cached = loader.load_from_uri(&uri).await.expect("served from memory");
    assert_eq!(cached.chart.name(), "demo");
}
