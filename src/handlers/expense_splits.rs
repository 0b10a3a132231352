use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{ApiPath, ValidJson, ValidQuery};
use crate::guard;
use crate::handlers::expenses::non_negative_amount;
use crate::listing::{SortOrder, resolve_sort_column, sorted_page};
use crate::schemas::{ApiResponse, AppState};
use crate::store::{Patch, StoreError, update_row};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_extra::extract::WithRejection;
use axum_valid::Valid;
use chrono::{DateTime, Utc};
use model::entities::{expense, expense_split};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateExpenseSplitRequest {
    pub expense_id: Uuid,
    pub house_member_id: Uuid,
    #[validate(custom(function = "non_negative_amount"))]
    #[schema(value_type = String, example = "15.00")]
    pub amount_owed: Decimal,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateExpenseSplitRequest {
    #[validate(custom(function = "non_negative_amount"))]
    #[schema(value_type = Option<String>)]
    pub amount_owed: Option<Decimal>,
    /// Marking paid without `paid_at` stamps the current time; un-paying clears it
    pub is_paid: Option<bool>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Patch for UpdateExpenseSplitRequest {
    type Active = expense_split::ActiveModel;

    fn is_empty(&self) -> bool {
        self.amount_owed.is_none() && self.is_paid.is_none() && self.paid_at.is_none()
    }

    fn apply(self, active: &mut expense_split::ActiveModel) {
        let now = Utc::now();
        if let Some(amount_owed) = self.amount_owed {
            active.amount_owed = Set(amount_owed);
        }
        match (self.is_paid, self.paid_at) {
            (Some(true), at) => {
                active.is_paid = Set(true);
                active.paid_at = Set(Some(at.unwrap_or(now)));
            }
            (Some(false), _) => {
                active.is_paid = Set(false);
                active.paid_at = Set(None);
            }
            (None, Some(at)) => active.paid_at = Set(Some(at)),
            (None, None) => {}
        }
        active.updated_at = Set(now);
    }
}

#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct ExpenseSplitQuery {
    pub expense_id: Option<Uuid>,
    pub house_member_id: Option<Uuid>,
    pub is_paid: Option<bool>,
    /// One of `amount_owed`, `created_at`, `updated_at`
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    #[validate(range(min = 1, max = 25))]
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExpenseSplitResponse {
    pub expense_split_id: Uuid,
    pub expense_id: Uuid,
    pub house_member_id: Uuid,
    #[schema(value_type = String)]
    pub amount_owed: Decimal,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<expense_split::Model> for ExpenseSplitResponse {
    fn from(model: expense_split::Model) -> Self {
        Self {
            expense_split_id: model.expense_split_id,
            expense_id: model.expense_id,
            house_member_id: model.house_member_id,
            amount_owed: model.amount_owed,
            is_paid: model.is_paid,
            paid_at: model.paid_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

const SORT_COLUMNS: &[(&str, expense_split::Column)] = &[
    ("amount_owed", expense_split::Column::AmountOwed),
    ("created_at", expense_split::Column::CreatedAt),
    ("updated_at", expense_split::Column::UpdatedAt),
];

/// Resolve a split and check the caller belongs to its expense's house.
async fn find_split_for_member(
    state: &AppState,
    expense_split_id: Uuid,
    user_id: Uuid,
) -> Result<expense_split::Model, ApiError> {
    let split = expense_split::Entity::find_by_id(expense_split_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Expense split not found"))?;
    let parent = expense::Entity::find_by_id(split.expense_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Expense not found"))?;
    guard::assert_house_member(&state.db, parent.house_id, user_id).await?;
    Ok(split)
}

/// Add a split to an existing expense
#[utoipa::path(
    post,
    path = "/api/v1/expense-splits",
    tag = "expense-splits",
    request_body = CreateExpenseSplitRequest,
    responses(
        (status = 201, description = "Expense split created successfully", body = ApiResponse<ExpenseSplitResponse>),
        (status = 400, description = "Unknown expense or member outside the house", body = crate::schemas::ErrorResponse),
        (status = 403, description = "Caller is not a member of the house", body = crate::schemas::ErrorResponse),
        (status = 409, description = "Member already has a split on this expense", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_expense_split(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Valid(Json(request)), _): ValidJson<CreateExpenseSplitRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ExpenseSplitResponse>>), ApiError> {
    trace!("Entering create_expense_split function");

    let parent = expense::Entity::find_by_id(request.expense_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            ApiError::bad_request(format!("Expense {} does not exist", request.expense_id))
        })?;
    guard::assert_house_member(&state.db, parent.house_id, auth.user_id).await?;
    guard::member_of_house(&state.db, parent.house_id, request.house_member_id).await?;

    let now = Utc::now();
    let split = expense_split::ActiveModel {
        expense_split_id: Set(Uuid::new_v4()),
        expense_id: Set(request.expense_id),
        house_member_id: Set(request.house_member_id),
        amount_owed: Set(request.amount_owed),
        is_paid: Set(false),
        paid_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await
    .map_err(|e| match StoreError::from(e) {
        StoreError::UniqueViolation(_) => {
            ApiError::conflict("House member already has a split on this expense")
        }
        other => other.into(),
    })?;

    info!("Expense split created successfully with ID: {}", split.expense_split_id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            ExpenseSplitResponse::from(split),
            "Expense split created successfully",
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/expense-splits/{expense_split_id}",
    tag = "expense-splits",
    params(
        ("expense_split_id" = Uuid, Path, description = "Expense split ID"),
    ),
    responses(
        (status = 200, description = "Expense split retrieved successfully", body = ApiResponse<ExpenseSplitResponse>),
        (status = 404, description = "Expense split not found", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_expense_split(
    State(state): State<AppState>,
    _auth: AuthUser,
    WithRejection(Path(expense_split_id), _): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<ExpenseSplitResponse>>, ApiError> {
    trace!("Entering get_expense_split function for id: {}", expense_split_id);

    let split = expense_split::Entity::find_by_id(expense_split_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Expense split not found"))?;

    Ok(Json(ApiResponse::ok(
        ExpenseSplitResponse::from(split),
        "Expense split retrieved successfully",
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/expense-splits",
    tag = "expense-splits",
    params(ExpenseSplitQuery),
    responses(
        (status = 200, description = "Expense splits retrieved successfully", body = ApiResponse<Vec<ExpenseSplitResponse>>),
        (status = 400, description = "Invalid filter or sort", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_expense_splits(
    State(state): State<AppState>,
    _auth: AuthUser,
    WithRejection(Valid(Query(query)), _): ValidQuery<ExpenseSplitQuery>,
) -> Result<Json<ApiResponse<Vec<ExpenseSplitResponse>>>, ApiError> {
    trace!("Entering get_expense_splits function");

    let sort_column = resolve_sort_column(
        query.sort_by.as_deref(),
        SORT_COLUMNS,
        expense_split::Column::CreatedAt,
    )?;

    let mut select = expense_split::Entity::find();
    if let Some(expense_id) = query.expense_id {
        select = select.filter(expense_split::Column::ExpenseId.eq(expense_id));
    }
    if let Some(member_id) = query.house_member_id {
        select = select.filter(expense_split::Column::HouseMemberId.eq(member_id));
    }
    if let Some(is_paid) = query.is_paid {
        select = select.filter(expense_split::Column::IsPaid.eq(is_paid));
    }

    let splits = sorted_page(select, sort_column, query.sort_order, query.limit)
        .all(&state.db)
        .await?;
    debug!("Retrieved {} expense splits from database", splits.len());

    Ok(Json(ApiResponse::ok(
        splits.into_iter().map(ExpenseSplitResponse::from).collect(),
        "Expense splits retrieved successfully",
    )))
}

#[utoipa::path(
    patch,
    path = "/api/v1/expense-splits/{expense_split_id}",
    tag = "expense-splits",
    params(
        ("expense_split_id" = Uuid, Path, description = "Expense split ID"),
    ),
    request_body = UpdateExpenseSplitRequest,
    responses(
        (status = 200, description = "Expense split updated successfully", body = ApiResponse<ExpenseSplitResponse>),
        (status = 400, description = "No recognised fields supplied", body = crate::schemas::ErrorResponse),
        (status = 403, description = "Caller is not a member of the house", body = crate::schemas::ErrorResponse),
        (status = 404, description = "Expense split not found", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_expense_split(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Path(expense_split_id), _): ApiPath<Uuid>,
    WithRejection(Valid(Json(request)), _): ValidJson<UpdateExpenseSplitRequest>,
) -> Result<Json<ApiResponse<ExpenseSplitResponse>>, ApiError> {
    trace!("Entering update_expense_split function for id: {}", expense_split_id);

    let current = find_split_for_member(&state, expense_split_id, auth.user_id).await?;
    let updated = update_row(&state.db, current, request).await?;

    info!("Expense split {} updated successfully", expense_split_id);
    Ok(Json(ApiResponse::ok(
        ExpenseSplitResponse::from(updated),
        "Expense split updated successfully",
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v1/expense-splits/{expense_split_id}",
    tag = "expense-splits",
    params(
        ("expense_split_id" = Uuid, Path, description = "Expense split ID"),
    ),
    responses(
        (status = 200, description = "Expense split deleted successfully", body = ApiResponse<String>),
        (status = 403, description = "Caller is not a member of the house", body = crate::schemas::ErrorResponse),
        (status = 404, description = "Expense split not found", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_expense_split(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Path(expense_split_id), _): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    trace!("Entering delete_expense_split function for id: {}", expense_split_id);

    find_split_for_member(&state, expense_split_id, auth.user_id).await?;

    let result = expense_split::Entity::delete_by_id(expense_split_id)
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(ApiError::not_found("Expense split not found"));
    }

    info!("Expense split {} deleted successfully", expense_split_id);
    Ok(Json(ApiResponse::ok(
        format!("Expense split {expense_split_id} deleted"),
        "Expense split deleted successfully",
    )))
}
