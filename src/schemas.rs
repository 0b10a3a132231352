use crate::auth::TokenVerifier;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{
    Modify, OpenApi, ToSchema,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Bearer-token verifier, constructed once at startup
    pub verifier: Arc<dyn TokenVerifier>,
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            success: true,
        }
    }
}

/// A single rejected field in a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldViolation {
    /// Field path, e.g. `splits[0].amount_owed`
    pub field: String,
    pub message: String,
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Per-field violations, present for validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<FieldViolation>>,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::users::create_user,
        crate::handlers::users::get_user,
        crate::handlers::users::get_users,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
        crate::handlers::houses::create_house,
        crate::handlers::houses::get_house,
        crate::handlers::houses::get_houses,
        crate::handlers::houses::update_house,
        crate::handlers::houses::delete_house,
        crate::handlers::house_members::create_house_member,
        crate::handlers::house_members::get_house_member,
        crate::handlers::house_members::get_house_members,
        crate::handlers::house_members::update_house_member,
        crate::handlers::house_members::delete_house_member,
        crate::handlers::house_members::get_house_members_user_info,
        crate::handlers::user_houses::get_user_houses,
        crate::handlers::expenses::create_expense,
        crate::handlers::expenses::get_expense,
        crate::handlers::expenses::get_expenses,
        crate::handlers::expenses::update_expense,
        crate::handlers::expenses::delete_expense,
        crate::handlers::expense_splits::create_expense_split,
        crate::handlers::expense_splits::get_expense_split,
        crate::handlers::expense_splits::get_expense_splits,
        crate::handlers::expense_splits::update_expense_split,
        crate::handlers::expense_splits::delete_expense_split,
        crate::handlers::recurring_expenses::create_recurring_expense,
        crate::handlers::recurring_expenses::get_recurring_expense,
        crate::handlers::recurring_expenses::get_recurring_expenses,
        crate::handlers::recurring_expenses::update_recurring_expense,
        crate::handlers::recurring_expenses::delete_recurring_expense,
        crate::handlers::receipts::create_receipt,
        crate::handlers::receipts::get_receipt,
        crate::handlers::receipts::get_receipts,
        crate::handlers::receipts::update_receipt,
        crate::handlers::receipts::delete_receipt,
    ),
    components(
        schemas(
            ErrorResponse,
            FieldViolation,
            HealthResponse,
            crate::listing::SortOrder,
            crate::handlers::users::CreateUserRequest,
            crate::handlers::users::UpdateUserRequest,
            crate::handlers::users::UserResponse,
            crate::handlers::houses::CreateHouseRequest,
            crate::handlers::houses::UpdateHouseRequest,
            crate::handlers::houses::HouseResponse,
            crate::handlers::house_members::CreateHouseMemberRequest,
            crate::handlers::house_members::UpdateHouseMemberRequest,
            crate::handlers::house_members::HouseMemberResponse,
            crate::handlers::house_members::HouseMemberUserInfo,
            crate::handlers::user_houses::UserHouseResponse,
            crate::handlers::expenses::CreateExpenseRequest,
            crate::handlers::expenses::SplitEntry,
            crate::handlers::expenses::UpdateExpenseRequest,
            crate::handlers::expenses::ExpenseResponse,
            crate::handlers::expense_splits::CreateExpenseSplitRequest,
            crate::handlers::expense_splits::UpdateExpenseSplitRequest,
            crate::handlers::expense_splits::ExpenseSplitResponse,
            crate::handlers::recurring_expenses::CreateRecurringExpenseRequest,
            crate::handlers::recurring_expenses::UpdateRecurringExpenseRequest,
            crate::handlers::recurring_expenses::RecurringExpenseResponse,
            crate::handlers::receipts::CreateReceiptRequest,
            crate::handlers::receipts::UpdateReceiptRequest,
            crate::handlers::receipts::ReceiptResponse,
            model::entities::recurring_expense::Frequency,
        )
    ),
    modifiers(&BearerAuth),
    security(("bearer_auth" = [])),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "User profiles"),
        (name = "houses", description = "Houses and head-of-house administration"),
        (name = "house-members", description = "House membership"),
        (name = "user-houses", description = "Houses a user belongs to"),
        (name = "expenses", description = "Shared expenses and their splits"),
        (name = "expense-splits", description = "Individual expense shares"),
        (name = "recurring-expenses", description = "Recurring household bills"),
        (name = "receipts", description = "Receipts attached to expenses"),
    ),
    info(
        title = "HouseSplit API",
        description = "Shared-household expense splitting backend",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
