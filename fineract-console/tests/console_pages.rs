mod common;

use axum::http::{header, StatusCode};
use common::{app, body_text, get, mock_authentication, post_form, send, sign_in};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn dashboard_shows_counts_and_failed_jobs() {
    let server = MockServer::start().await;
    mock_authentication(&server).await;
    Mock::given(method("GET"))
        .and(path("/clients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalFilteredRecords": 42,
            "pageItems": []
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/loans"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalFilteredRecords": 17,
            "pageItems": []
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"jobId": 1, "displayName": "Add Accrual Transactions", "active": true,
             "lastRunHistory": {"status": "success"}},
            {"jobId": 2, "displayName": "Apply Annual Fee", "active": true,
             "lastRunHistory": {"status": "failed", "jobRunErrorMessage": "No open period"}}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/scheduler"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"active": true})))
        .mount(&server)
        .await;
    let app = app(&server.uri());

    let cookie = sign_in(&app).await;
    let response = send(&app, get("/dashboard", Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("42"));
    assert!(html.contains("17"));
    assert!(html.contains("Running"));
    assert!(html.contains("Apply Annual Fee"));
    assert!(html.contains("No open period"));
    assert!(!html.contains("Add Accrual Transactions"));
}

#[tokio::test]
async fn dashboard_marks_unreachable_sources_unavailable() {
    let server = MockServer::start().await;
    mock_authentication(&server).await;
    for source in ["/clients", "/loans", "/jobs", "/scheduler"] {
        Mock::given(method("GET"))
            .and(path(source))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
    }
    let app = app(&server.uri());

    let cookie = sign_in(&app).await;
    let response = send(&app, get("/dashboard", Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Unavailable"));
}

#[tokio::test]
async fn successful_command_queues_one_toast_for_the_next_page() {
    let server = MockServer::start().await;
    mock_authentication(&server).await;
    Mock::given(method("POST"))
        .and(path("/roles/3"))
        .and(query_param("command", "enable"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resourceId": 3})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/roles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 3, "name": "Teller", "description": "Cash desk", "disabled": false}
        ])))
        .mount(&server)
        .await;
    let app = app(&server.uri());

    let cookie = sign_in(&app).await;
    let response = send(&app, post_form("/roles/3/enable", "", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/roles");

    let html = body_text(send(&app, get("/roles", Some(&cookie))).await).await;
    assert_eq!(html.matches("toast toast-success").count(), 1);
    assert!(html.contains("Role enabled"));

    let html = body_text(send(&app, get("/roles", Some(&cookie))).await).await;
    assert!(!html.contains("Role enabled"));
}

#[tokio::test]
async fn provisioning_rows_stay_aligned_and_blank_rows_are_dropped() {
    let server = MockServer::start().await;
    mock_authentication(&server).await;
    Mock::given(method("GET"))
        .and(path("/provisioningcriteria/template"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "definitions": [
                {"id": 1, "categoryName": "STANDARD"},
                {"id": 2, "categoryName": "SUB-STANDARD"},
                {"id": 3, "categoryName": "DOUBTFUL"}
            ],
            "loanProducts": [{"id": 1, "name": "Personal"}, {"id": 2, "name": "Group"}],
            "liabilityAccounts": [{"id": 10, "name": "Loan loss reserve", "glCode": "2100"}],
            "expenseAccounts": [
                {"id": 20, "name": "Provision expense", "glCode": "5100"},
                {"id": 21, "name": "Doubtful provision", "glCode": "5110"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/provisioningcriteria"))
        .and(body_json(json!({
            "criteriaName": "Standard book",
            "loanProducts": [{"id": 1, "name": "Personal"}],
            "definitions": [
                {"categoryId": 1, "minAge": 0, "maxAge": 30, "provisioningPercentage": "0",
                 "liabilityAccount": 10, "expenseAccount": 20},
                {"categoryId": 3, "minAge": 31, "maxAge": 90, "provisioningPercentage": "25",
                 "liabilityAccount": 10, "expenseAccount": 21}
            ],
            "locale": "en"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resourceId": 4})))
        .expect(1)
        .mount(&server)
        .await;
    let app = app(&server.uri());

    let body = [
        "criteriaName=Standard+book",
        "loanProducts=1",
        "categoryId=1&minAge=0&maxAge=30&provisioningPercentage=0&liabilityAccount=10&expenseAccount=20",
        "categoryId=2&minAge=&maxAge=&provisioningPercentage=&liabilityAccount=&expenseAccount=",
        "categoryId=3&minAge=31&maxAge=90&provisioningPercentage=25&liabilityAccount=10&expenseAccount=21",
    ]
    .join("&");
    let cookie = sign_in(&app).await;
    let response = send(&app, post_form("/provisioning", &body, Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/provisioning");
}

#[tokio::test]
async fn datatable_columns_stay_aligned() {
    let server = MockServer::start().await;
    mock_authentication(&server).await;
    Mock::given(method("POST"))
        .and(path("/datatables"))
        .and(body_json(json!({
            "datatableName": "client_extra",
            "apptableName": "m_client",
            "multiRow": true,
            "columns": [
                {"name": "nickname", "type": "String", "length": 40, "mandatory": true},
                {"name": "joined_on", "type": "Date", "mandatory": false}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resourceIdentifier": "client_extra"})))
        .expect(1)
        .mount(&server)
        .await;
    let app = app(&server.uri());

    let body = [
        "datatableName=client_extra&apptableName=m_client&multiRow=on",
        "columnName=nickname&columnType=String&columnLength=40&columnMandatory=true&columnCode=",
        "columnName=&columnType=String&columnLength=&columnMandatory=false&columnCode=",
        "columnName=joined_on&columnType=Date&columnLength=&columnMandatory=false&columnCode=",
    ]
    .join("&");
    let cookie = sign_in(&app).await;
    let response = send(&app, post_form("/datatables", &body, Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/datatables/client_extra");
}

#[tokio::test]
async fn datatable_entry_dates_are_sent_in_fineract_format() {
    let server = MockServer::start().await;
    mock_authentication(&server).await;
    Mock::given(method("GET"))
        .and(path("/datatables/client_extra"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "applicationTableName": "m_client",
            "registeredTableName": "client_extra",
            "columnHeaderData": [
                {"columnName": "client_id", "isColumnPrimaryKey": true},
                {"columnName": "nickname", "columnType": "VARCHAR", "columnDisplayType": "STRING",
                 "isColumnNullable": true},
                {"columnName": "joined_on", "columnType": "DATE", "columnDisplayType": "DATE",
                 "isColumnNullable": true}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/datatables/client_extra/5"))
        .and(body_json(json!({
            "joined_on": "03 June 2024",
            "nickname": "Ada",
            "dateFormat": "dd MMMM yyyy",
            "locale": "en"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"clientId": 5, "resourceId": 5})))
        .expect(1)
        .mount(&server)
        .await;
    let app = app(&server.uri());

    let cookie = sign_in(&app).await;
    let response = send(
        &app,
        post_form(
            "/datatables/client_extra/entries/5?apptable=m_client",
            "nickname=Ada&joined_on=2024-06-03",
            Some(&cookie),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()[header::LOCATION],
        "/datatables/entries?apptable=m_client&entityId=5"
    );
}

#[tokio::test]
async fn collection_sheet_save_sends_only_entered_amounts() {
    let server = MockServer::start().await;
    mock_authentication(&server).await;
    Mock::given(method("POST"))
        .and(path("/collectionsheet"))
        .and(query_param("command", "saveCollectionSheet"))
        .and(body_json(json!({
            "transactionDate": "03 June 2024",
            "paymentTypeId": 1,
            "bulkRepaymentTransactions": [{"loanId": 1, "transactionAmount": "25.50"}],
            "bulkSavingsDueTransactions": [
                {"savingsId": 9, "transactionAmount": "10", "depositAccountType": 100}
            ],
            "dateFormat": "dd MMMM yyyy",
            "locale": "en"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resourceId": 1})))
        .expect(1)
        .mount(&server)
        .await;
    let app = app(&server.uri());

    let cookie = sign_in(&app).await;
    let response = send(
        &app,
        post_form(
            "/collection-sheet/save",
            "transactionDate=2024-06-03&paymentTypeId=1&loan_1=25.50&loan_2=&savings_9_100=10",
            Some(&cookie),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/collection-sheet");
}
