use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{ApiPath, ValidJson, ValidQuery};
use crate::guard;
use crate::handlers::expense_splits::ExpenseSplitResponse;
use crate::listing::{SortOrder, resolve_sort_column, sorted_page};
use crate::schemas::{ApiResponse, AppState};
use crate::store::{Patch, update_row};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_extra::extract::WithRejection;
use axum_valid::Valid;
use chrono::{DateTime, NaiveDate, Utc};
use model::entities::{expense, expense_split};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, LoaderTrait, ModelTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

pub(crate) fn positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_positive() && !value.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("positive").with_message("must be greater than zero".into()))
    }
}

pub(crate) fn non_negative_amount(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        Err(ValidationError::new("non_negative").with_message("must not be negative".into()))
    } else {
        Ok(())
    }
}

/// One member's share of a new expense
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate)]
pub struct SplitEntry {
    pub house_member_id: Uuid,
    #[validate(custom(function = "non_negative_amount"))]
    #[schema(value_type = String, example = "12.50")]
    pub amount_owed: Decimal,
}

/// Request body for recording an expense and its splits
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateExpenseRequest {
    pub house_id: Uuid,
    /// Paying house member; defaults to the caller's membership
    pub paid_by: Option<Uuid>,
    #[validate(length(min = 1, max = 255))]
    pub description: String,
    #[validate(length(min = 1, max = 50))]
    pub category: String,
    #[validate(custom(function = "positive_amount"))]
    #[schema(value_type = String, example = "60.00")]
    pub total_amount: Decimal,
    pub expense_date: NaiveDate,
    #[serde(default)]
    #[validate(nested)]
    pub splits: Vec<SplitEntry>,
}

/// Request body for updating an expense
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateExpenseRequest {
    #[validate(length(min = 1, max = 255))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,
    #[validate(custom(function = "positive_amount"))]
    #[schema(value_type = Option<String>)]
    pub total_amount: Option<Decimal>,
    pub expense_date: Option<NaiveDate>,
    /// Settling without `settled_at` stamps the current time; un-settling clears it
    pub is_settled: Option<bool>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Patch for UpdateExpenseRequest {
    type Active = expense::ActiveModel;

    fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.category.is_none()
            && self.total_amount.is_none()
            && self.expense_date.is_none()
            && self.is_settled.is_none()
            && self.settled_at.is_none()
    }

    fn apply(self, active: &mut expense::ActiveModel) {
        let now = Utc::now();
        if let Some(description) = self.description {
            active.description = Set(description);
        }
        if let Some(category) = self.category {
            active.category = Set(category);
        }
        if let Some(total_amount) = self.total_amount {
            active.total_amount = Set(total_amount);
        }
        if let Some(expense_date) = self.expense_date {
            active.expense_date = Set(expense_date);
        }
        match (self.is_settled, self.settled_at) {
            (Some(true), at) => {
                active.is_settled = Set(true);
                active.settled_at = Set(Some(at.unwrap_or(now)));
            }
            (Some(false), _) => {
                active.is_settled = Set(false);
                active.settled_at = Set(None);
            }
            (None, Some(at)) => active.settled_at = Set(Some(at)),
            (None, None) => {}
        }
        active.updated_at = Set(now);
    }
}

/// Query parameters for listing expenses
#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct ExpenseQuery {
    pub house_id: Option<Uuid>,
    /// Filter by paying member
    pub house_member_id: Option<Uuid>,
    pub is_settled: Option<bool>,
    pub category: Option<String>,
    /// One of `total_amount`, `created_at`, `updated_at`, `settled_at`, `expense_date`
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    #[validate(range(min = 1, max = 25))]
    pub limit: Option<u64>,
}

/// Expense response model, with its splits embedded
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExpenseResponse {
    pub expense_id: Uuid,
    pub house_id: Uuid,
    pub paid_by: Option<Uuid>,
    pub description: String,
    pub category: String,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    pub expense_date: NaiveDate,
    pub is_settled: bool,
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub splits: Vec<ExpenseSplitResponse>,
}

impl ExpenseResponse {
    fn with_splits(model: expense::Model, splits: Vec<expense_split::Model>) -> Self {
        Self {
            expense_id: model.expense_id,
            house_id: model.house_id,
            paid_by: model.paid_by,
            description: model.description,
            category: model.category,
            total_amount: model.total_amount,
            expense_date: model.expense_date,
            is_settled: model.is_settled,
            settled_at: model.settled_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
            splits: splits.into_iter().map(ExpenseSplitResponse::from).collect(),
        }
    }
}

const SORT_COLUMNS: &[(&str, expense::Column)] = &[
    ("total_amount", expense::Column::TotalAmount),
    ("created_at", expense::Column::CreatedAt),
    ("updated_at", expense::Column::UpdatedAt),
    ("settled_at", expense::Column::SettledAt),
    ("expense_date", expense::Column::ExpenseDate),
];

pub(crate) async fn find_expense(state: &AppState, expense_id: Uuid) -> Result<expense::Model, ApiError> {
    expense::Entity::find_by_id(expense_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Expense not found"))
}

/// Record an expense and its splits in one transaction
#[utoipa::path(
    post,
    path = "/api/v1/expenses",
    tag = "expenses",
    request_body = CreateExpenseRequest,
    responses(
        (status = 201, description = "Expense created successfully", body = ApiResponse<ExpenseResponse>),
        (status = 400, description = "Invalid request or member outside the house", body = crate::schemas::ErrorResponse),
        (status = 403, description = "Caller is not a member of the house", body = crate::schemas::ErrorResponse),
        (status = 404, description = "House not found", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Valid(Json(request)), _): ValidJson<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ExpenseResponse>>), ApiError> {
    trace!("Entering create_expense function");
    debug!(
        "User {} recording expense of {} in house {}",
        auth.user_id, request.total_amount, request.house_id
    );

    let txn = state.db.begin().await?;
    let requester = guard::assert_house_member(&txn, request.house_id, auth.user_id).await?;

    let payer = match request.paid_by {
        Some(member_id) => guard::member_of_house(&txn, request.house_id, member_id).await?,
        None => requester,
    };

    let mut seen = HashSet::new();
    for split in &request.splits {
        if !seen.insert(split.house_member_id) {
            return Err(ApiError::bad_request(format!(
                "House member {} appears in more than one split",
                split.house_member_id
            )));
        }
        guard::member_of_house(&txn, request.house_id, split.house_member_id).await?;
    }

    if !request.splits.is_empty() {
        let owed: Decimal = request.splits.iter().map(|s| s.amount_owed).sum();
        if owed != request.total_amount {
            warn!(
                "Splits for new expense sum to {} but total is {}",
                owed, request.total_amount
            );
        }
    }

    let now = Utc::now();
    let expense_model = expense::ActiveModel {
        expense_id: Set(Uuid::new_v4()),
        house_id: Set(request.house_id),
        paid_by: Set(Some(payer.house_member_id)),
        description: Set(request.description),
        category: Set(request.category),
        total_amount: Set(request.total_amount),
        expense_date: Set(request.expense_date),
        is_settled: Set(false),
        settled_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    let mut splits = Vec::with_capacity(request.splits.len());
    for entry in request.splits {
        let split = expense_split::ActiveModel {
            expense_split_id: Set(Uuid::new_v4()),
            expense_id: Set(expense_model.expense_id),
            house_member_id: Set(entry.house_member_id),
            amount_owed: Set(entry.amount_owed),
            is_paid: Set(false),
            paid_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        splits.push(split);
    }

    txn.commit().await?;

    info!(
        "Expense created successfully with ID: {} ({} splits)",
        expense_model.expense_id,
        splits.len()
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            ExpenseResponse::with_splits(expense_model, splits),
            "Expense created successfully",
        )),
    ))
}

/// Get a specific expense by ID
#[utoipa::path(
    get,
    path = "/api/v1/expenses/{expense_id}",
    tag = "expenses",
    params(
        ("expense_id" = Uuid, Path, description = "Expense ID"),
    ),
    responses(
        (status = 200, description = "Expense retrieved successfully", body = ApiResponse<ExpenseResponse>),
        (status = 404, description = "Expense not found", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_expense(
    State(state): State<AppState>,
    _auth: AuthUser,
    WithRejection(Path(expense_id), _): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<ExpenseResponse>>, ApiError> {
    trace!("Entering get_expense function for expense_id: {}", expense_id);

    let expense_model = find_expense(&state, expense_id).await?;
    let splits = expense_model
        .find_related(expense_split::Entity)
        .all(&state.db)
        .await?;

    Ok(Json(ApiResponse::ok(
        ExpenseResponse::with_splits(expense_model, splits),
        "Expense retrieved successfully",
    )))
}

/// List expenses matching the given filters
#[utoipa::path(
    get,
    path = "/api/v1/expenses",
    tag = "expenses",
    params(ExpenseQuery),
    responses(
        (status = 200, description = "Expenses retrieved successfully", body = ApiResponse<Vec<ExpenseResponse>>),
        (status = 400, description = "Invalid filter or sort", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_expenses(
    State(state): State<AppState>,
    _auth: AuthUser,
    WithRejection(Valid(Query(query)), _): ValidQuery<ExpenseQuery>,
) -> Result<Json<ApiResponse<Vec<ExpenseResponse>>>, ApiError> {
    trace!("Entering get_expenses function");

    let sort_column =
        resolve_sort_column(query.sort_by.as_deref(), SORT_COLUMNS, expense::Column::CreatedAt)?;

    let mut select = expense::Entity::find();
    if let Some(house_id) = query.house_id {
        select = select.filter(expense::Column::HouseId.eq(house_id));
    }
    if let Some(member_id) = query.house_member_id {
        select = select.filter(expense::Column::PaidBy.eq(member_id));
    }
    if let Some(is_settled) = query.is_settled {
        select = select.filter(expense::Column::IsSettled.eq(is_settled));
    }
    if let Some(category) = &query.category {
        select = select.filter(expense::Column::Category.eq(category.as_str()));
    }

    let expenses = sorted_page(select, sort_column, query.sort_order, query.limit)
        .all(&state.db)
        .await?;
    let splits = expenses.load_many(expense_split::Entity, &state.db).await?;
    debug!("Retrieved {} expenses from database", expenses.len());

    let data = expenses
        .into_iter()
        .zip(splits)
        .map(|(model, splits)| ExpenseResponse::with_splits(model, splits))
        .collect();

    Ok(Json(ApiResponse::ok(data, "Expenses retrieved successfully")))
}

/// Update an expense; any member of its house may do so
#[utoipa::path(
    patch,
    path = "/api/v1/expenses/{expense_id}",
    tag = "expenses",
    params(
        ("expense_id" = Uuid, Path, description = "Expense ID"),
    ),
    request_body = UpdateExpenseRequest,
    responses(
        (status = 200, description = "Expense updated successfully", body = ApiResponse<ExpenseResponse>),
        (status = 400, description = "No recognised fields supplied", body = crate::schemas::ErrorResponse),
        (status = 403, description = "Caller is not a member of the house", body = crate::schemas::ErrorResponse),
        (status = 404, description = "Expense not found", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Path(expense_id), _): ApiPath<Uuid>,
    WithRejection(Valid(Json(request)), _): ValidJson<UpdateExpenseRequest>,
) -> Result<Json<ApiResponse<ExpenseResponse>>, ApiError> {
    trace!("Entering update_expense function for expense_id: {}", expense_id);

    let current = find_expense(&state, expense_id).await?;
    guard::assert_house_member(&state.db, current.house_id, auth.user_id).await?;

    let updated = update_row(&state.db, current, request).await?;
    let splits = updated
        .find_related(expense_split::Entity)
        .all(&state.db)
        .await?;

    info!("Expense {} updated successfully", expense_id);
    Ok(Json(ApiResponse::ok(
        ExpenseResponse::with_splits(updated, splits),
        "Expense updated successfully",
    )))
}

/// Delete an expense together with its splits and receipts
#[utoipa::path(
    delete,
    path = "/api/v1/expenses/{expense_id}",
    tag = "expenses",
    params(
        ("expense_id" = Uuid, Path, description = "Expense ID"),
    ),
    responses(
        (status = 200, description = "Expense deleted successfully", body = ApiResponse<String>),
        (status = 403, description = "Caller is not a member of the house", body = crate::schemas::ErrorResponse),
        (status = 404, description = "Expense not found", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Path(expense_id), _): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    trace!("Entering delete_expense function for expense_id: {}", expense_id);

    let current = find_expense(&state, expense_id).await?;
    guard::assert_house_member(&state.db, current.house_id, auth.user_id).await?;

    let result = expense::Entity::delete_by_id(expense_id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::not_found("Expense not found"));
    }

    info!("Expense {} deleted successfully", expense_id);
    Ok(Json(ApiResponse::ok(
        format!("Expense {expense_id} deleted"),
        "Expense deleted successfully",
    )))
}
