use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use fineract_console::config::ServerSettings;
use fineract_console::startup::build_router;
use fineract_console::AppState;
use service_core::fineract::{FineractClient, FineractSettings, RetryConfig};
use service_core::middleware::rate_limit::{create_ip_rate_limiter, RateLimitSettings};
use serde_json::json;
use tower::util::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const AUTH_KEY: &str = "bWlmb3M6cGFzc3dvcmQ=";

pub fn app(fineract_url: &str) -> Router {
    let settings = FineractSettings {
        retry: RetryConfig::quick(),
        ..FineractSettings::new(fineract_url)
    };
    let fineract = FineractClient::new(settings).expect("client builds");
    let limiter = create_ip_rate_limiter(RateLimitSettings {
        attempts: 100,
        window_seconds: 60,
        ..RateLimitSettings::default()
    });
    build_router(AppState::new(fineract, limiter), &ServerSettings::default())
}

pub async fn mock_authentication(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/authentication"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "username": "mifos",
            "userId": 1,
            "base64EncodedAuthenticationKey": AUTH_KEY,
            "authenticated": true,
            "officeId": 1,
            "officeName": "Head Office"
        })))
        .mount(server)
        .await;
}

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.expect("router responds")
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request builds")
}

pub fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).expect("request builds")
}

/// Sign in and return the session cookie pair.
pub async fn sign_in(app: &Router) -> String {
    let response = send(app, post_form("/login", "username=mifos&password=password", None)).await;
    assert!(response.status().is_redirection(), "login failed: {}", response.status());
    assert_eq!(response.headers()[header::LOCATION], "/dashboard");
    let cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .expect("ascii cookie");
    cookie.split(';').next().unwrap_or_default().to_string()
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}
