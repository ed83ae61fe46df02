use std::time::Duration;

use bookscout_core::error::AppError;
use bookscout_core::models::{BookSource, CrawlRequest};
use bookscout_core::traits::Backend;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::integration::common::{TIMEOUT, book, closed_port_url, setup};

#[tokio::test]
async fn health_reports_status() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "healthy"})))
        .expect(1)
        .mount(&server)
        .await;

    let report = backend.health(&server.uri(), TIMEOUT).await.unwrap();
    assert!(report.is_healthy());
}

#[tokio::test]
async fn health_with_other_status_is_not_healthy() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "starting"})))
        .mount(&server)
        .await;

    let report = backend.health(&server.uri(), TIMEOUT).await.unwrap();
    assert!(!report.is_healthy());
}

#[tokio::test]
async fn crawl_posts_request_body() {
    let (server, backend) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/crawl"))
        .and(body_json(json!({
            "keyword": "三体",
            "max_books": 20,
            "proxy": null,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "keyword": "三体",
            "count": 2,
            "books": [book("三体", "刘慈欣"), book("三体II", "刘慈欣")],
            "total_crawled": 12,
            "total_saved": 10,
            "total_duplicates": 2,
            "dedup_key": "标题 + 作者",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = CrawlRequest {
        keyword: "三体".into(),
        max_books: 20,
        proxy: None,
    };
    let response = backend
        .crawl(&server.uri(), BookSource::Dangdang, &request, TIMEOUT)
        .await
        .unwrap();

    assert!(response.success);
    assert_eq!(response.books.len(), 2);
    assert_eq!(response.books[0].title().as_deref(), Some("三体"));
    assert_eq!(response.total_crawled, 12);
    assert_eq!(response.total_saved, 10);
    assert_eq!(response.total_duplicates, 2);
}

#[tokio::test]
async fn books_sends_keyword_query() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/books"))
        .and(query_param("keyword", "三体"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "keyword": "三体",
            "count": 1,
            "books": [book("三体", "刘慈欣")],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = backend
        .books(&server.uri(), BookSource::Dangdang, Some("三体"), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(response.books.len(), 1);
    assert_eq!(response.books[0].author().as_deref(), Some("刘慈欣"));
}

#[tokio::test]
async fn books_without_keyword_has_no_query() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "keyword": "",
            "count": 0,
            "books": [],
        })))
        .mount(&server)
        .await;

    let response = backend
        .books(&server.uri(), BookSource::Dangdang, None, TIMEOUT)
        .await
        .unwrap();
    assert!(response.books.is_empty());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.query(), None);
}

#[tokio::test]
async fn fanqie_crawl_posts_to_fanqie_path() {
    let (server, backend) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/crawl/fanqie"))
        .and(body_json(json!({
            "keyword": "斗罗大陆",
            "max_books": 10,
            "proxy": null,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "keyword": "斗罗大陆",
            "count": 1,
            "books": [book("斗罗大陆", "唐家三少")],
            "total_crawled": 1,
            "total_saved": 1,
            "total_duplicates": 0,
            "dedup_key": "标题 + 作者",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = CrawlRequest {
        keyword: "斗罗大陆".into(),
        max_books: 10,
        proxy: None,
    };
    let response = backend
        .crawl(&server.uri(), BookSource::Fanqie, &request, TIMEOUT)
        .await
        .unwrap();

    assert_eq!(response.total_saved, 1);
    assert_eq!(response.books[0].author().as_deref(), Some("唐家三少"));
}

#[tokio::test]
async fn fanqie_books_reads_fanqie_store() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/books/fanqie"))
        .and(query_param("keyword", "斗罗大陆"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "keyword": "斗罗大陆",
            "count": 2,
            "books": [book("斗罗大陆", "唐家三少"), book("斗罗大陆II", "唐家三少")],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = backend
        .books(&server.uri(), BookSource::Fanqie, Some("斗罗大陆"), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(response.books.len(), 2);

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() == "/api/books/fanqie"));
}

#[tokio::test]
async fn stats_parses_totals() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "total_books": 42,
            "keywords": [{"keyword": "三体", "count": 15}],
            "status": "running",
        })))
        .mount(&server)
        .await;

    let stats = backend.stats(&server.uri(), TIMEOUT).await.unwrap();
    assert_eq!(stats.total_books, 42);
    assert_eq!(stats.keywords.len(), 1);
    assert_eq!(stats.status, "running");
    assert!(stats.error.is_none());
}

#[tokio::test]
async fn error_response_uses_detail() {
    let (server, backend) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/crawl"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"detail": "爬取失败: driver crashed"})),
        )
        .mount(&server)
        .await;

    let request = CrawlRequest {
        keyword: "三体".into(),
        max_books: 5,
        proxy: None,
    };
    let err = backend
        .crawl(&server.uri(), BookSource::Dangdang, &request, TIMEOUT)
        .await
        .unwrap_err();

    match err {
        AppError::BackendRejected {
            status_code,
            detail,
        } => {
            assert_eq!(status_code, 500);
            assert_eq!(detail, "爬取失败: driver crashed");
        }
        other => panic!("expected BackendRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn error_without_detail_uses_reason_phrase() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/books"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let err = backend
        .books(&server.uri(), BookSource::Dangdang, Some("x"), TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::BackendRejected { status_code: 503, ref detail } if detail == "Service Unavailable"
    ));
}

#[tokio::test]
async fn slow_response_is_timeout() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "healthy"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = backend
        .health(&server.uri(), Duration::from_millis(200))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Timeout(1)));
    assert!(!err.is_transport());
}

#[tokio::test]
async fn connection_refused_is_transport_failure() {
    let (_server, backend) = setup().await;
    let url = closed_port_url().await;

    let err = backend.health(&url, TIMEOUT).await.unwrap_err();
    assert!(err.is_transport(), "unexpected error: {err:?}");
}

#[tokio::test]
async fn malformed_body_is_serialization_error() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = backend.health(&server.uri(), TIMEOUT).await.unwrap_err();
    assert!(matches!(err, AppError::SerializationError(_)));
}
