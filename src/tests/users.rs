use crate::schemas::{ApiResponse, ErrorResponse};
use crate::test_utils::test_utils::{parse_id, setup_test_app};
use axum::http::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

#[tokio::test]
async fn test_create_user_uses_token_subject() {
    let app = setup_test_app().await;
    let user_id = Uuid::new_v4();
    let (header, value) = app.auth(user_id);

    let response = app
        .server
        .post("/api/v1/users")
        .add_header(header, value)
        .json(&json!({
            "display_name": "Dana",
            "email": "dana@example.com",
            "payment_method": "venmo",
            "payment_link": "https://venmo.com/dana"
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.message, "User created successfully");
    assert_eq!(parse_id(&body.data["user_id"]), user_id);
    assert_eq!(body.data["display_name"], "Dana");
    assert_eq!(body.data["payment_method"], "venmo");

    let (header, value) = app.auth(user_id);
    let response = app
        .server
        .get(&format!("/api/v1/users/{user_id}"))
        .add_header(header, value)
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.data["email"], "dana@example.com");
}

#[tokio::test]
async fn test_second_profile_for_same_subject_conflicts() {
    let app = setup_test_app().await;
    let user_id = app.register_user("twice").await;
    let (header, value) = app.auth(user_id);

    let response = app
        .server
        .post("/api/v1/users")
        .add_header(header, value)
        .json(&json!({ "display_name": "Twice", "email": "twice-again@example.com" }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: ErrorResponse = response.json();
    assert_eq!(body.error, "User profile already exists");
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let app = setup_test_app().await;

    let (header, value) = app.auth(Uuid::new_v4());
    app.server
        .post("/api/v1/users")
        .add_header(header, value)
        .json(&json!({ "display_name": "First", "email": "same@example.com" }))
        .await
        .assert_status(StatusCode::CREATED);

    let (header, value) = app.auth(Uuid::new_v4());
    let response = app
        .server
        .post("/api/v1/users")
        .add_header(header, value)
        .json(&json!({ "display_name": "Second", "email": "same@example.com" }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: ErrorResponse = response.json();
    assert_eq!(body.error, "User with email: same@example.com already exists");
}

#[tokio::test]
async fn test_invalid_email_is_a_validation_error() {
    let app = setup_test_app().await;
    let (header, value) = app.auth(Uuid::new_v4());

    let response = app
        .server
        .post("/api/v1/users")
        .add_header(header, value)
        .json(&json!({ "display_name": "Bad", "email": "not-an-email" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "VALIDATION_ERROR");
    assert_eq!(body.violations.unwrap()[0].field, "email");
}

#[tokio::test]
async fn test_get_unknown_user_is_not_found() {
    let app = setup_test_app().await;
    let user_id = app.register_user("seeker").await;
    let (header, value) = app.auth(user_id);

    app.server
        .get(&format!("/api/v1/users/{}", Uuid::new_v4()))
        .add_header(header, value)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_users_update_only_their_own_profile() {
    let app = setup_test_app().await;
    let owner = app.register_user("owner").await;
    let intruder = app.register_user("intruder").await;

    let (header, value) = app.auth(intruder);
    app.server
        .patch(&format!("/api/v1/users/{owner}"))
        .add_header(header, value)
        .json(&json!({ "display_name": "Hacked" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let (header, value) = app.auth(owner);
    let response = app
        .server
        .patch(&format!("/api/v1/users/{owner}"))
        .add_header(header, value)
        .json(&json!({ "display_name": "Owner Renamed" }))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.data["display_name"], "Owner Renamed");

    let (header, value) = app.auth(owner);
    app.server
        .patch(&format!("/api/v1/users/{owner}"))
        .add_header(header, value)
        .json(&json!({}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_users_by_email() {
    let app = setup_test_app().await;
    let target = app.register_user("target").await;
    app.register_user("bystander").await;
    let (header, value) = app.auth(target);

    let me = app
        .server
        .get(&format!("/api/v1/users/{target}"))
        .add_header(header, value)
        .await
        .json::<ApiResponse<Value>>();
    let email = me.data["email"].as_str().unwrap().to_string();

    let (header, value) = app.auth(target);
    let response = app
        .server
        .get("/api/v1/users")
        .add_header(header, value)
        .add_query_param("email", &email)
        .await;

    response.assert_status_ok();
    let body: ApiResponse<Vec<Value>> = response.json();
    assert_eq!(body.data.len(), 1);
    assert_eq!(parse_id(&body.data[0]["user_id"]), target);
}

#[tokio::test]
async fn test_user_in_a_house_cannot_be_deleted() {
    let app = setup_test_app().await;
    let head = app.register_user("anchored").await;
    app.create_house(head, "Anchor House").await;
    let (header, value) = app.auth(head);

    let response = app
        .server
        .delete(&format!("/api/v1/users/{head}"))
        .add_header(header, value)
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "CONFLICT");

    let (header, value) = app.auth(head);
    app.server
        .get(&format!("/api/v1/users/{head}"))
        .add_header(header, value)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_plain_member_cannot_be_deleted() {
    let app = setup_test_app().await;
    let head = app.register_user("host").await;
    let lodger = app.register_user("lodger").await;
    let house_id = app.create_house(head, "Shared Flat").await;
    app.add_member(head, house_id, lodger).await;

    let (header, value) = app.auth(lodger);
    let response = app
        .server
        .delete(&format!("/api/v1/users/{lodger}"))
        .add_header(header, value)
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: ErrorResponse = response.json();
    assert!(body.error.contains("leave them first"));
}

#[tokio::test]
async fn test_user_deletes_own_profile() {
    let app = setup_test_app().await;
    let user_id = app.register_user("leaver").await;
    let other = app.register_user("other").await;

    let (header, value) = app.auth(other);
    app.server
        .delete(&format!("/api/v1/users/{user_id}"))
        .add_header(header, value)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let (header, value) = app.auth(user_id);
    let response = app
        .server
        .delete(&format!("/api/v1/users/{user_id}"))
        .add_header(header, value)
        .await;
    response.assert_status_ok();
    let body: ApiResponse<String> = response.json();
    assert_eq!(body.data, format!("User {user_id} deleted"));

    let (header, value) = app.auth(other);
    app.server
        .get(&format!("/api/v1/users/{user_id}"))
        .add_header(header, value)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
