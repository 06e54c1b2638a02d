mod common;

use axum::http::{header, StatusCode};
use common::{app, body_text, get, post_form, send};
use wiremock::MockServer;

#[tokio::test]
async fn health_check_works() {
    let server = MockServer::start().await;
    let app = app(&server.uri());

    let response = send(&app, get("/health", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(body_text(response).await, "OK");
}

#[tokio::test]
async fn signed_out_pages_redirect_to_login() {
    let server = MockServer::start().await;
    let app = app(&server.uri());

    for uri in ["/dashboard", "/clients", "/loans/4", "/reports"] {
        let response = send(&app, get(uri, None)).await;
        assert!(response.status().is_redirection(), "{uri} did not redirect");
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }
}

#[tokio::test]
async fn login_page_shows_the_tenant() {
    let server = MockServer::start().await;
    let app = app(&server.uri());

    let response = send(&app, get("/login", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("default"));
    assert!(html.contains("name=\"password\""));
}

#[tokio::test]
async fn blank_credentials_are_rejected_without_calling_fineract() {
    let server = MockServer::start().await;
    let app = app(&server.uri());

    let response = send(&app, post_form("/login", "username=&password=", None)).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn metrics_are_exposed_as_text() {
    let server = MockServer::start().await;
    let app = app(&server.uri());
    fineract_console::services::metrics::init_metrics().unwrap();

    send(&app, get("/health", None)).await;
    let response = send(&app, get("/metrics", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("console_http_requests_total"));
}
