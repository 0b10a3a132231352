use crate::auth::JwtVerifier;
use crate::schemas::{ErrorResponse, HealthResponse};
use crate::test_utils::test_utils::setup_test_app;
use axum::body::Bytes;
use axum::http::{
    HeaderValue, Method, StatusCode,
    header::{ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_METHOD, AUTHORIZATION, ORIGIN},
};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_health_check_is_public() {
    let app = setup_test_app().await;

    let response = app.server.get("/health").await;

    response.assert_status(StatusCode::OK);
    let body: HealthResponse = response.json();
    assert_eq!(body.status, "healthy");
    assert_eq!(body.database, "connected");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = setup_test_app().await;

    let response = app.server.get("/api/v1/houses").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "UNAUTHORIZED");
    assert!(!body.success);
}

#[tokio::test]
async fn test_non_bearer_scheme_is_unauthorized() {
    let app = setup_test_app().await;

    let response = app
        .server
        .get("/api/v1/houses")
        .add_header(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_unauthorized() {
    let app = setup_test_app().await;
    let forged = JwtVerifier::new("some-other-secret", 1)
        .issue(Uuid::new_v4())
        .unwrap();

    let response = app
        .server
        .get("/api/v1/houses")
        .add_header(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {forged}")).unwrap(),
        )
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: ErrorResponse = response.json();
    assert_eq!(body.error, "Invalid or expired token");
}

#[tokio::test]
async fn test_mutation_without_token_is_rejected_before_validation() {
    let app = setup_test_app().await;

    let response = app
        .server
        .post("/api/v1/houses")
        .json(&json!({ "name": "" }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_validation_errors_list_offending_fields() {
    let app = setup_test_app().await;
    let head = app.register_user("val").await;
    let (header, value) = app.auth(head);

    let response = app
        .server
        .post("/api/v1/houses")
        .add_header(header, value)
        .json(&json!({ "name": "", "invite_code": "ab" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "VALIDATION_ERROR");
    let fields: Vec<String> = body
        .violations
        .expect("violations present")
        .into_iter()
        .map(|v| v.field)
        .collect();
    assert_eq!(fields, vec!["invite_code", "name"]);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = setup_test_app().await;
    let user = app.register_user("json").await;
    let (header, value) = app.auth(user);

    let response = app
        .server
        .post("/api/v1/houses")
        .add_header(header, value)
        .bytes(Bytes::from_static(b"{ not json"))
        .content_type("application/json")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "BAD_REQUEST");
}

#[tokio::test]
async fn test_invalid_path_id_is_bad_request() {
    let app = setup_test_app().await;
    let user = app.register_user("path").await;
    let (header, value) = app.auth(user);

    let response = app
        .server
        .get("/api/v1/houses/not-a-uuid")
        .add_header(header, value)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_sort_column_is_bad_request() {
    let app = setup_test_app().await;
    let user = app.register_user("sorter").await;

    for path in [
        "/api/v1/users",
        "/api/v1/houses",
        "/api/v1/house-members",
        "/api/v1/expenses",
        "/api/v1/expense-splits",
        "/api/v1/recurring-expenses",
        "/api/v1/receipts",
    ] {
        let (header, value) = app.auth(user);
        let response = app
            .server
            .get(path)
            .add_header(header, value)
            .add_query_param("sort_by", "not_a_column")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert!(
            body.error.contains("not_a_column"),
            "{path} returned {}",
            body.error
        );
    }
}

#[tokio::test]
async fn test_limit_above_maximum_is_rejected() {
    let app = setup_test_app().await;
    let user = app.register_user("limits").await;
    let (header, value) = app.auth(user);

    let response = app
        .server
        .get("/api/v1/houses")
        .add_header(header, value)
        .add_query_param("limit", 26)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_cors_allows_localhost_origin() {
    let app = setup_test_app().await;

    let response = app
        .server
        .method(Method::OPTIONS, "/api/v1/houses")
        .add_header(ORIGIN, HeaderValue::from_static("http://localhost:5173"))
        .add_header(ACCESS_CONTROL_REQUEST_METHOD, HeaderValue::from_static("GET"))
        .await;

    assert_eq!(
        response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN),
        Some(&HeaderValue::from_static("http://localhost:5173"))
    );
}

#[tokio::test]
async fn test_cors_ignores_unknown_origin() {
    let app = setup_test_app().await;

    let response = app
        .server
        .method(Method::OPTIONS, "/api/v1/houses")
        .add_header(ORIGIN, HeaderValue::from_static("https://evil.example.com"))
        .add_header(ACCESS_CONTROL_REQUEST_METHOD, HeaderValue::from_static("GET"))
        .await;

    assert!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
