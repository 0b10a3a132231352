use crate::schemas::{ApiResponse, ErrorResponse};
use crate::test_utils::test_utils::{TestApp, parse_id, setup_test_app};
use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::str::FromStr;
use uuid::Uuid;

fn decimal(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().expect("decimal as string")).expect("valid decimal")
}

/// A house with a head and one extra member: (head, member, house, head membership, member membership)
async fn household(app: &TestApp) -> (Uuid, Uuid, Uuid, Uuid, Uuid) {
    let head = app.register_user("payer").await;
    let member = app.register_user("sharer").await;
    let house_id = app.create_house(head, "Ledger House").await;
    let member_id = app.add_member(head, house_id, member).await;
    let head_member_id = app.membership_of(house_id, head).await;
    (head, member, house_id, head_member_id, member_id)
}

async fn create_expense(app: &TestApp, user: Uuid, body: Value) -> Value {
    let (header, value) = app.auth(user);
    let response = app
        .server
        .post("/api/v1/expenses")
        .add_header(header, value)
        .json(&body)
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<ApiResponse<Value>>().data
}

#[tokio::test]
async fn test_expense_with_splits_round_trips() {
    let app = setup_test_app().await;
    let (head, member, house_id, head_member_id, member_id) = household(&app).await;

    let created = create_expense(
        &app,
        head,
        json!({
            "house_id": house_id,
            "description": "Groceries",
            "category": "food",
            "total_amount": "60.00",
            "expense_date": "2025-06-01",
            "splits": [
                { "house_member_id": head_member_id, "amount_owed": "30.00" },
                { "house_member_id": member_id, "amount_owed": "30.00" }
            ]
        }),
    )
    .await;

    assert_eq!(parse_id(&created["paid_by"]), head_member_id);
    assert_eq!(decimal(&created["total_amount"]), Decimal::new(6000, 2));
    assert_eq!(created["is_settled"], false);
    assert_eq!(created["splits"].as_array().unwrap().len(), 2);

    let expense_id = parse_id(&created["expense_id"]);
    let (header, value) = app.auth(member);
    let response = app
        .server
        .get(&format!("/api/v1/expenses/{expense_id}"))
        .add_header(header, value)
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Value> = response.json();
    let splits = body.data["splits"].as_array().unwrap();
    let owed: Decimal = splits.iter().map(|s| decimal(&s["amount_owed"])).sum();
    assert_eq!(owed, Decimal::new(6000, 2));
    assert!(splits.iter().all(|s| s["is_paid"] == false));
}

#[tokio::test]
async fn test_split_sum_mismatch_is_accepted() {
    let app = setup_test_app().await;
    let (head, _member, house_id, head_member_id, member_id) = household(&app).await;

    let created = create_expense(
        &app,
        head,
        json!({
            "house_id": house_id,
            "paid_by": member_id,
            "description": "Internet",
            "category": "utilities",
            "total_amount": "50.00",
            "expense_date": "2025-06-02",
            "splits": [{ "house_member_id": head_member_id, "amount_owed": "20.00" }]
        }),
    )
    .await;

    assert_eq!(parse_id(&created["paid_by"]), member_id);
    assert_eq!(created["splits"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_non_member_cannot_record_expense() {
    let app = setup_test_app().await;
    let (_head, _member, house_id, _, _) = household(&app).await;
    let outsider = app.register_user("outsider").await;
    let (header, value) = app.auth(outsider);

    let response = app
        .server
        .post("/api/v1/expenses")
        .add_header(header, value)
        .json(&json!({
            "house_id": house_id,
            "description": "Sneaky",
            "category": "misc",
            "total_amount": "1.00",
            "expense_date": "2025-06-03"
        }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_split_for_member_of_other_house_is_rejected() {
    let app = setup_test_app().await;
    let (head, _member, house_id, _, _) = household(&app).await;
    let stranger_head = app.register_user("elsewhere").await;
    let other_house = app.create_house(stranger_head, "Other House").await;
    let foreign_member = app.membership_of(other_house, stranger_head).await;
    let (header, value) = app.auth(head);

    let response = app
        .server
        .post("/api/v1/expenses")
        .add_header(header, value)
        .json(&json!({
            "house_id": house_id,
            "description": "Pizza",
            "category": "food",
            "total_amount": "20.00",
            "expense_date": "2025-06-04",
            "splits": [{ "house_member_id": foreign_member, "amount_owed": "20.00" }]
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);

    let (header, value) = app.auth(head);
    let response = app
        .server
        .get("/api/v1/expenses")
        .add_header(header, value)
        .add_query_param("house_id", house_id)
        .await;
    let body: ApiResponse<Vec<Value>> = response.json();
    assert!(body.data.is_empty());
}

#[tokio::test]
async fn test_duplicate_split_member_is_rejected() {
    let app = setup_test_app().await;
    let (head, _member, house_id, _, member_id) = household(&app).await;
    let (header, value) = app.auth(head);

    let response = app
        .server
        .post("/api/v1/expenses")
        .add_header(header, value)
        .json(&json!({
            "house_id": house_id,
            "description": "Rent",
            "category": "housing",
            "total_amount": "100.00",
            "expense_date": "2025-06-05",
            "splits": [
                { "house_member_id": member_id, "amount_owed": "50.00" },
                { "house_member_id": member_id, "amount_owed": "50.00" }
            ]
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_amount_rules_are_validated() {
    let app = setup_test_app().await;
    let (head, _member, house_id, _, member_id) = household(&app).await;
    let (header, value) = app.auth(head);

    let response = app
        .server
        .post("/api/v1/expenses")
        .add_header(header, value)
        .json(&json!({
            "house_id": house_id,
            "description": "Refund",
            "category": "misc",
            "total_amount": "0",
            "expense_date": "2025-06-06",
            "splits": [{ "house_member_id": member_id, "amount_owed": "-1.00" }]
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    let fields: Vec<String> = body
        .violations
        .unwrap()
        .into_iter()
        .map(|v| v.field)
        .collect();
    assert_eq!(fields, vec!["splits[0].amount_owed", "total_amount"]);
}

#[tokio::test]
async fn test_settling_expense_stamps_time() {
    let app = setup_test_app().await;
    let (head, member, house_id, _, _) = household(&app).await;
    let created = create_expense(
        &app,
        head,
        json!({
            "house_id": house_id,
            "description": "Cleaning",
            "category": "household",
            "total_amount": "15.00",
            "expense_date": "2025-06-07"
        }),
    )
    .await;
    let expense_id = parse_id(&created["expense_id"]);

    let (header, value) = app.auth(member);
    let response = app
        .server
        .patch(&format!("/api/v1/expenses/{expense_id}"))
        .add_header(header, value)
        .json(&json!({ "is_settled": true }))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.data["is_settled"], true);
    assert!(body.data["settled_at"].is_string());

    let (header, value) = app.auth(member);
    let response = app
        .server
        .get("/api/v1/expenses")
        .add_header(header, value)
        .add_query_param("house_id", house_id)
        .add_query_param("is_settled", true)
        .await;
    let body: ApiResponse<Vec<Value>> = response.json();
    assert_eq!(body.data.len(), 1);
}

#[tokio::test]
async fn test_outsider_cannot_delete_expense() {
    let app = setup_test_app().await;
    let (head, _member, house_id, _, _) = household(&app).await;
    let outsider = app.register_user("outsider").await;
    let created = create_expense(
        &app,
        head,
        json!({
            "house_id": house_id,
            "description": "Lamp",
            "category": "furniture",
            "total_amount": "35.00",
            "expense_date": "2025-06-08"
        }),
    )
    .await;
    let expense_id = parse_id(&created["expense_id"]);

    let (header, value) = app.auth(outsider);
    app.server
        .delete(&format!("/api/v1/expenses/{expense_id}"))
        .add_header(header, value)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let (header, value) = app.auth(head);
    app.server
        .delete(&format!("/api/v1/expenses/{expense_id}"))
        .add_header(header, value)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_expense_split_lifecycle() {
    let app = setup_test_app().await;
    let (head, member, house_id, _, member_id) = household(&app).await;
    let created = create_expense(
        &app,
        head,
        json!({
            "house_id": house_id,
            "description": "Water",
            "category": "utilities",
            "total_amount": "40.00",
            "expense_date": "2025-06-09"
        }),
    )
    .await;
    let expense_id = parse_id(&created["expense_id"]);

    let (header, value) = app.auth(head);
    let response = app
        .server
        .post("/api/v1/expense-splits")
        .add_header(header, value)
        .json(&json!({
            "expense_id": expense_id,
            "house_member_id": member_id,
            "amount_owed": "20.00"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let split_id = parse_id(&response.json::<ApiResponse<Value>>().data["expense_split_id"]);

    let (header, value) = app.auth(head);
    let response = app
        .server
        .post("/api/v1/expense-splits")
        .add_header(header, value)
        .json(&json!({
            "expense_id": expense_id,
            "house_member_id": member_id,
            "amount_owed": "5.00"
        }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: ErrorResponse = response.json();
    assert_eq!(body.error, "House member already has a split on this expense");

    let (header, value) = app.auth(member);
    let response = app
        .server
        .patch(&format!("/api/v1/expense-splits/{split_id}"))
        .add_header(header, value)
        .json(&json!({ "is_paid": true }))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.data["is_paid"], true);
    assert!(body.data["paid_at"].is_string());

    let (header, value) = app.auth(member);
    let response = app
        .server
        .get("/api/v1/expense-splits")
        .add_header(header, value)
        .add_query_param("expense_id", expense_id)
        .add_query_param("is_paid", true)
        .await;
    let body: ApiResponse<Vec<Value>> = response.json();
    assert_eq!(body.data.len(), 1);
    assert_eq!(decimal(&body.data[0]["amount_owed"]), Decimal::new(2000, 2));

    let (header, value) = app.auth(member);
    app.server
        .delete(&format!("/api/v1/expense-splits/{split_id}"))
        .add_header(header, value)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_split_on_unknown_expense_is_bad_request() {
    let app = setup_test_app().await;
    let (head, _member, _house_id, _, member_id) = household(&app).await;
    let (header, value) = app.auth(head);

    app.server
        .post("/api/v1/expense-splits")
        .add_header(header, value)
        .json(&json!({
            "expense_id": Uuid::new_v4(),
            "house_member_id": member_id,
            "amount_owed": "1.00"
        }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recurring_expense_lifecycle() {
    let app = setup_test_app().await;
    let (head, member, house_id, head_member_id, _) = household(&app).await;
    let (header, value) = app.auth(head);

    let response = app
        .server
        .post("/api/v1/recurring-expenses")
        .add_header(header, value)
        .json(&json!({
            "house_id": house_id,
            "description": "Streaming",
            "category": "entertainment",
            "amount": "15.99",
            "frequency": "monthly",
            "next_due_date": "2025-07-01"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let created = response.json::<ApiResponse<Value>>().data;
    assert_eq!(created["frequency"], "monthly");
    assert_eq!(created["is_active"], true);
    assert_eq!(parse_id(&created["paid_by"]), head_member_id);
    let recurring_id = parse_id(&created["recurring_expense_id"]);

    let (header, value) = app.auth(member);
    let response = app
        .server
        .patch(&format!("/api/v1/recurring-expenses/{recurring_id}"))
        .add_header(header, value)
        .json(&json!({ "frequency": "yearly", "is_active": false }))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.data["frequency"], "yearly");
    assert_eq!(body.data["is_active"], false);

    let (header, value) = app.auth(member);
    let response = app
        .server
        .get("/api/v1/recurring-expenses")
        .add_header(header, value)
        .add_query_param("house_id", house_id)
        .add_query_param("is_active", false)
        .await;
    let body: ApiResponse<Vec<Value>> = response.json();
    assert_eq!(body.data.len(), 1);

    let (header, value) = app.auth(head);
    app.server
        .delete(&format!("/api/v1/recurring-expenses/{recurring_id}"))
        .add_header(header, value)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_unknown_frequency_is_bad_request() {
    let app = setup_test_app().await;
    let (head, _member, house_id, _, _) = household(&app).await;
    let (header, value) = app.auth(head);

    app.server
        .post("/api/v1/recurring-expenses")
        .add_header(header, value)
        .json(&json!({
            "house_id": house_id,
            "description": "Gym",
            "category": "health",
            "amount": "30.00",
            "frequency": "daily",
            "next_due_date": "2025-07-01"
        }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_receipt_lifecycle() {
    let app = setup_test_app().await;
    let (head, member, house_id, _, member_id) = household(&app).await;
    let outsider = app.register_user("outsider").await;
    let created = create_expense(
        &app,
        head,
        json!({
            "house_id": house_id,
            "description": "Hardware",
            "category": "repairs",
            "total_amount": "80.00",
            "expense_date": "2025-06-10"
        }),
    )
    .await;
    let expense_id = parse_id(&created["expense_id"]);

    let (header, value) = app.auth(member);
    let response = app
        .server
        .post("/api/v1/receipts")
        .add_header(header, value)
        .json(&json!({
            "expense_id": expense_id,
            "file_url": "https://files.example.com/r/1.jpg",
            "note": "till slip"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let receipt = response.json::<ApiResponse<Value>>().data;
    assert_eq!(parse_id(&receipt["uploaded_by"]), member_id);
    let receipt_id = parse_id(&receipt["receipt_id"]);

    let (header, value) = app.auth(outsider);
    app.server
        .patch(&format!("/api/v1/receipts/{receipt_id}"))
        .add_header(header, value)
        .json(&json!({ "note": "mine now" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let (header, value) = app.auth(head);
    let response = app
        .server
        .patch(&format!("/api/v1/receipts/{receipt_id}"))
        .add_header(header, value)
        .json(&json!({ "note": "hardware store" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<ApiResponse<Value>>().data["note"], "hardware store");

    let (header, value) = app.auth(head);
    app.server
        .post("/api/v1/receipts")
        .add_header(header, value)
        .json(&json!({ "expense_id": expense_id, "file_url": "not a url" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let (header, value) = app.auth(member);
    app.server
        .delete(&format!("/api/v1/receipts/{receipt_id}"))
        .add_header(header, value)
        .await
        .assert_status_ok();
}
