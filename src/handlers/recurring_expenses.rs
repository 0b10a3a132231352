use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{ApiPath, ValidJson, ValidQuery};
use crate::guard;
use crate::handlers::expenses::positive_amount;
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
use model::entities::recurring_expense::{self, Frequency};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Request body for scheduling a recurring household bill
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateRecurringExpenseRequest {
    pub house_id: Uuid,
    /// Paying house member; defaults to the caller's membership
    pub paid_by: Option<Uuid>,
    #[validate(length(min = 1, max = 255))]
    pub description: String,
    #[validate(length(min = 1, max = 50))]
    pub category: String,
    #[validate(custom(function = "positive_amount"))]
    #[schema(value_type = String, example = "49.99")]
    pub amount: Decimal,
    pub frequency: Frequency,
    pub next_due_date: NaiveDate,
    /// Defaults to true
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateRecurringExpenseRequest {
    pub paid_by: Option<Uuid>,
    #[validate(length(min = 1, max = 255))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,
    #[validate(custom(function = "positive_amount"))]
    #[schema(value_type = Option<String>)]
    pub amount: Option<Decimal>,
    pub frequency: Option<Frequency>,
    pub next_due_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

impl Patch for UpdateRecurringExpenseRequest {
    type Active = recurring_expense::ActiveModel;

    fn is_empty(&self) -> bool {
        self.paid_by.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.amount.is_none()
            && self.frequency.is_none()
            && self.next_due_date.is_none()
            && self.is_active.is_none()
    }

    fn apply(self, active: &mut recurring_expense::ActiveModel) {
        if let Some(paid_by) = self.paid_by {
            active.paid_by = Set(Some(paid_by));
        }
        if let Some(description) = self.description {
            active.description = Set(description);
        }
        if let Some(category) = self.category {
            active.category = Set(category);
        }
        if let Some(amount) = self.amount {
            active.amount = Set(amount);
        }
        if let Some(frequency) = self.frequency {
            active.frequency = Set(frequency);
        }
        if let Some(next_due_date) = self.next_due_date {
            active.next_due_date = Set(next_due_date);
        }
        if let Some(is_active) = self.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());
    }
}

#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct RecurringExpenseQuery {
    pub house_id: Option<Uuid>,
    pub is_active: Option<bool>,
    pub frequency: Option<Frequency>,
    /// One of `next_due_date`, `amount`, `created_at`, `updated_at`
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    #[validate(range(min = 1, max = 25))]
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecurringExpenseResponse {
    pub recurring_expense_id: Uuid,
    pub house_id: Uuid,
    pub paid_by: Option<Uuid>,
    pub description: String,
    pub category: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub frequency: Frequency,
    pub next_due_date: NaiveDate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<recurring_expense::Model> for RecurringExpenseResponse {
    fn from(model: recurring_expense::Model) -> Self {
        Self {
            recurring_expense_id: model.recurring_expense_id,
            house_id: model.house_id,
            paid_by: model.paid_by,
            description: model.description,
            category: model.category,
            amount: model.amount,
            frequency: model.frequency,
            next_due_date: model.next_due_date,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

const SORT_COLUMNS: &[(&str, recurring_expense::Column)] = &[
    ("next_due_date", recurring_expense::Column::NextDueDate),
    ("amount", recurring_expense::Column::Amount),
    ("created_at", recurring_expense::Column::CreatedAt),
    ("updated_at", recurring_expense::Column::UpdatedAt),
];

async fn find_recurring_expense(
    state: &AppState,
    recurring_expense_id: Uuid,
) -> Result<recurring_expense::Model, ApiError> {
    recurring_expense::Entity::find_by_id(recurring_expense_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Recurring expense not found"))
}

#[utoipa::path(
    post,
    path = "/api/v1/recurring-expenses",
    tag = "recurring-expenses",
    request_body = CreateRecurringExpenseRequest,
    responses(
        (status = 201, description = "Recurring expense created successfully", body = ApiResponse<RecurringExpenseResponse>),
        (status = 400, description = "Invalid request or payer outside the house", body = crate::schemas::ErrorResponse),
        (status = 403, description = "Caller is not a member of the house", body = crate::schemas::ErrorResponse),
        (status = 404, description = "House not found", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_recurring_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Valid(Json(request)), _): ValidJson<CreateRecurringExpenseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RecurringExpenseResponse>>), ApiError> {
    trace!("Entering create_recurring_expense function");

    let requester = guard::assert_house_member(&state.db, request.house_id, auth.user_id).await?;
    let payer = match request.paid_by {
        Some(member_id) => guard::member_of_house(&state.db, request.house_id, member_id).await?,
        None => requester,
    };

    let now = Utc::now();
    let model = recurring_expense::ActiveModel {
        recurring_expense_id: Set(Uuid::new_v4()),
        house_id: Set(request.house_id),
        paid_by: Set(Some(payer.house_member_id)),
        description: Set(request.description),
        category: Set(request.category),
        amount: Set(request.amount),
        frequency: Set(request.frequency),
        next_due_date: Set(request.next_due_date),
        is_active: Set(request.is_active.unwrap_or(true)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await?;

    info!(
        "Recurring expense created successfully with ID: {}",
        model.recurring_expense_id
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            RecurringExpenseResponse::from(model),
            "Recurring expense created successfully",
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/recurring-expenses/{recurring_expense_id}",
    tag = "recurring-expenses",
    params(
        ("recurring_expense_id" = Uuid, Path, description = "Recurring expense ID"),
    ),
    responses(
        (status = 200, description = "Recurring expense retrieved successfully", body = ApiResponse<RecurringExpenseResponse>),
        (status = 404, description = "Recurring expense not found", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_recurring_expense(
    State(state): State<AppState>,
    _auth: AuthUser,
    WithRejection(Path(recurring_expense_id), _): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<RecurringExpenseResponse>>, ApiError> {
    trace!("Entering get_recurring_expense function for id: {}", recurring_expense_id);

    let model = find_recurring_expense(&state, recurring_expense_id).await?;
    Ok(Json(ApiResponse::ok(
        RecurringExpenseResponse::from(model),
        "Recurring expense retrieved successfully",
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/recurring-expenses",
    tag = "recurring-expenses",
    params(RecurringExpenseQuery),
    responses(
        (status = 200, description = "Recurring expenses retrieved successfully", body = ApiResponse<Vec<RecurringExpenseResponse>>),
        (status = 400, description = "Invalid filter or sort", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_recurring_expenses(
    State(state): State<AppState>,
    _auth: AuthUser,
    WithRejection(Valid(Query(query)), _): ValidQuery<RecurringExpenseQuery>,
) -> Result<Json<ApiResponse<Vec<RecurringExpenseResponse>>>, ApiError> {
    trace!("Entering get_recurring_expenses function");

    let sort_column = resolve_sort_column(
        query.sort_by.as_deref(),
        SORT_COLUMNS,
        recurring_expense::Column::CreatedAt,
    )?;

    let mut select = recurring_expense::Entity::find();
    if let Some(house_id) = query.house_id {
        select = select.filter(recurring_expense::Column::HouseId.eq(house_id));
    }
    if let Some(is_active) = query.is_active {
        select = select.filter(recurring_expense::Column::IsActive.eq(is_active));
    }
    if let Some(frequency) = query.frequency {
        select = select.filter(recurring_expense::Column::Frequency.eq(frequency));
    }

    let models = sorted_page(select, sort_column, query.sort_order, query.limit)
        .all(&state.db)
        .await?;
    debug!("Retrieved {} recurring expenses from database", models.len());

    Ok(Json(ApiResponse::ok(
        models.into_iter().map(RecurringExpenseResponse::from).collect(),
        "Recurring expenses retrieved successfully",
    )))
}

#[utoipa::path(
    patch,
    path = "/api/v1/recurring-expenses/{recurring_expense_id}",
    tag = "recurring-expenses",
    params(
        ("recurring_expense_id" = Uuid, Path, description = "Recurring expense ID"),
    ),
    request_body = UpdateRecurringExpenseRequest,
    responses(
        (status = 200, description = "Recurring expense updated successfully", body = ApiResponse<RecurringExpenseResponse>),
        (status = 400, description = "No recognised fields supplied", body = crate::schemas::ErrorResponse),
        (status = 403, description = "Caller is not a member of the house", body = crate::schemas::ErrorResponse),
        (status = 404, description = "Recurring expense not found", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_recurring_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Path(recurring_expense_id), _): ApiPath<Uuid>,
    WithRejection(Valid(Json(request)), _): ValidJson<UpdateRecurringExpenseRequest>,
) -> Result<Json<ApiResponse<RecurringExpenseResponse>>, ApiError> {
    trace!("Entering update_recurring_expense function for id: {}", recurring_expense_id);

    let current = find_recurring_expense(&state, recurring_expense_id).await?;
    guard::assert_house_member(&state.db, current.house_id, auth.user_id).await?;
    if let Some(member_id) = request.paid_by {
        guard::member_of_house(&state.db, current.house_id, member_id).await?;
    }

    let updated = update_row(&state.db, current, request).await?;

    info!("Recurring expense {} updated successfully", recurring_expense_id);
    Ok(Json(ApiResponse::ok(
        RecurringExpenseResponse::from(updated),
        "Recurring expense updated successfully",
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v1/recurring-expenses/{recurring_expense_id}",
    tag = "recurring-expenses",
    params(
        ("recurring_expense_id" = Uuid, Path, description = "Recurring expense ID"),
    ),
    responses(
        (status = 200, description = "Recurring expense deleted successfully", body = ApiResponse<String>),
        (status = 403, description = "Caller is not a member of the house", body = crate::schemas::ErrorResponse),
        (status = 404, description = "Recurring expense not found", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_recurring_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Path(recurring_expense_id), _): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    trace!("Entering delete_recurring_expense function for id: {}", recurring_expense_id);

    let current = find_recurring_expense(&state, recurring_expense_id).await?;
    guard::assert_house_member(&state.db, current.house_id, auth.user_id).await?;

    let result = recurring_expense::Entity::delete_by_id(recurring_expense_id)
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(ApiError::not_found("Recurring expense not found"));
    }

    info!("Recurring expense {} deleted successfully", recurring_expense_id);
    Ok(Json(ApiResponse::ok(
        format!("Recurring expense {recurring_expense_id} deleted"),
        "Recurring expense deleted successfully",
    )))
}
