mod common;

use axum::http::{header, StatusCode};
use common::{app, body_text, get, mock_authentication, post_form, send, sign_in, AUTH_KEY};
use serde_json::json;
use wiremock::matchers::{header as header_is, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn wrong_password_stays_on_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/authentication"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "developerMessage": "Invalid authentication details were passed in api request."
        })))
        .mount(&server)
        .await;
    let app = app(&server.uri());

    let response = send(&app, post_form("/login", "username=mifos&password=nope", None)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_text(response).await.contains("Invalid username or password"));
}

#[tokio::test]
async fn fineract_outage_on_login_is_a_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/authentication"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "developerMessage": "Database connection failed",
            "defaultUserMessage": "An unexpected error occurred"
        })))
        .mount(&server)
        .await;
    let app = app(&server.uri());

    let response = send(&app, post_form("/login", "username=mifos&password=password", None)).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(body_text(response).await.contains("An unexpected error occurred"));
}

#[tokio::test]
async fn signed_in_operator_sees_clients() {
    let server = MockServer::start().await;
    mock_authentication(&server).await;
    Mock::given(method("GET"))
        .and(path("/clients"))
        .and(header_is("Authorization", format!("Basic {AUTH_KEY}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalFilteredRecords": 1,
            "pageItems": [
                {"id": 5, "accountNo": "000000005", "displayName": "Ada Obi", "officeId": 1,
                 "officeName": "Head Office",
                 "status": {"id": 300, "code": "clientStatusType.active", "value": "Active"},
                 "active": true}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let app = app(&server.uri());

    let cookie = sign_in(&app).await;
    let response = send(&app, get("/clients", Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Ada Obi"));
    assert!(html.contains("href=\"/clients/5\""));
    assert!(html.contains("mifos"));
}

#[tokio::test]
async fn expired_fineract_key_returns_to_login() {
    let server = MockServer::start().await;
    mock_authentication(&server).await;
    Mock::given(method("GET"))
        .and(path("/roles"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let app = app(&server.uri());

    let cookie = sign_in(&app).await;
    let response = send(&app, get("/roles", Some(&cookie))).await;

    assert!(response.status().is_redirection());
    assert_eq!(response.headers()[header::LOCATION], "/login?expired=true");
}

#[tokio::test]
async fn rejected_form_shows_fineract_field_errors() {
    let server = MockServer::start().await;
    mock_authentication(&server).await;
    Mock::given(method("POST"))
        .and(path("/roles"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "developerMessage": "The request caused a data integrity issue.",
            "httpStatusCode": "403",
            "defaultUserMessage": "Role with name `Teller` already exists",
            "errors": [{
                "defaultUserMessage": "Role with name `Teller` already exists",
                "parameterName": "name"
            }]
        })))
        .mount(&server)
        .await;
    let app = app(&server.uri());

    let cookie = sign_in(&app).await;
    let response = send(&app, post_form("/roles", "name=Teller&description=Cash+desk", Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_text(response).await;
    assert!(html.contains("already exists"));
    assert!(html.contains("value=\"Teller\""));
}

#[tokio::test]
async fn logout_clears_the_session() {
    let server = MockServer::start().await;
    mock_authentication(&server).await;
    let app = app(&server.uri());

    let cookie = sign_in(&app).await;
    let response = send(&app, post_form("/logout", "", Some(&cookie))).await;
    assert_eq!(response.headers()[header::LOCATION], "/login");

    let response = send(&app, get("/dashboard", Some(&cookie))).await;
    assert_eq!(response.headers()[header::LOCATION], "/login");
}
