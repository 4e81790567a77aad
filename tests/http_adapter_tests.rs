//! HTTP adapter tests against a local mock server
//!
//! The renderer and discovery adapters are exercised directly with raw
//! `http://` URLs; canonicalization is not in play at this layer.

use driftnet::discover::{Discovery, HtmlDiscovery};
use driftnet::render::{HttpRenderer, RenderError, RenderOptions, Renderer};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn renderer() -> HttpRenderer {
    HttpRenderer::new(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_render_extracts_text_and_metadata() {
    let server = MockServer::start().await;
    let html = r#"<html>
        <head>
            <title>Auth Guide</title>
            <meta name="description" content="How to authenticate">
        </head>
        <body>
            <h1>Authentication</h1>
            <script>console.log("ignored");</script>
            <p>Use bearer   tokens.</p>
        </body>
    </html>"#;
    Mock::given(method("GET"))
        .and(path("/api/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html; charset=utf-8"))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/api/auth", server.uri())).unwrap();
    let page = renderer()
        .render(&url, &RenderOptions::default())
        .await
        .unwrap();

    assert!(page.html.contains("<h1>Authentication</h1>"));
    assert!(page.text.contains("Authentication"));
    assert!(page.text.contains("Use bearer tokens."));
    assert!(!page.text.contains("console.log"));

    let metadata = page.metadata.unwrap();
    assert_eq!(metadata.title.as_deref(), Some("Auth Guide"));
    assert_eq!(metadata.description.as_deref(), Some("How to authenticate"));
}

#[tokio::test]
async fn test_render_rejects_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/gone", server.uri())).unwrap();
    let err = renderer()
        .render(&url, &RenderOptions::default())
        .await
        .unwrap_err();
    match err {
        RenderError::Status { status, .. } => assert_eq!(status, 404),
        other => panic!("expected Status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_render_rejects_non_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"pages": []}"#)
                .insert_header("content-type", "application/json"),
        )
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/feed.json", server.uri())).unwrap();
    let err = renderer()
        .render(&url, &RenderOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RenderError::ContentType { .. }));
}

#[tokio::test]
async fn test_render_times_out_on_slow_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body>late</body></html>")
                .insert_header("content-type", "text/html")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/slow", server.uri())).unwrap();
    let err = HttpRenderer::new(Duration::from_millis(200))
        .unwrap()
        .render(&url, &RenderOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RenderError::Timeout { .. }));
}

#[tokio::test]
async fn test_discovery_reads_sitemap() {
    let server = MockServer::start().await;
    let sitemap = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset>
            <url><loc>{0}/docs/intro</loc></url>
            <url><loc>{0}/docs/auth</loc></url>
        </urlset>"#,
        server.uri()
    );
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(sitemap)
                .insert_header("content-type", "application/xml"),
        )
        .mount(&server)
        .await;

    let seed = Url::parse(&format!("{}/docs", server.uri())).unwrap();
    let urls = HtmlDiscovery::new()
        .unwrap()
        .discover_seed_urls(&seed)
        .await
        .unwrap();
    let paths: Vec<&str> = urls.iter().map(|u| u.path()).collect();
    assert_eq!(paths, vec!["/docs/intro", "/docs/auth"]);
}

#[tokio::test]
async fn test_discovery_tolerates_missing_sitemap() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let seed = Url::parse(&format!("{}/docs", server.uri())).unwrap();
    let urls = HtmlDiscovery::new()
        .unwrap()
        .discover_seed_urls(&seed)
        .await
        .unwrap();
    assert!(urls.is_empty());
}
