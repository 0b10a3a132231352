use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{ApiPath, ValidJson, ValidQuery};
use crate::guard;
use crate::handlers::expenses::find_expense;
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
use chrono::{DateTime, Utc};
use model::entities::receipt;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Request body for attaching a receipt to an expense
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateReceiptRequest {
    pub expense_id: Uuid,
    /// Location of the uploaded file
    #[validate(url)]
    pub file_url: String,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateReceiptRequest {
    #[validate(url)]
    pub file_url: Option<String>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

impl Patch for UpdateReceiptRequest {
    type Active = receipt::ActiveModel;

    fn is_empty(&self) -> bool {
        self.file_url.is_none() && self.note.is_none()
    }

    fn apply(self, active: &mut receipt::ActiveModel) {
        if let Some(file_url) = self.file_url {
            active.file_url = Set(file_url);
        }
        if let Some(note) = self.note {
            active.note = Set(Some(note));
        }
        active.updated_at = Set(Utc::now());
    }
}

#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct ReceiptQuery {
    pub expense_id: Option<Uuid>,
    /// Filter by uploading house member
    pub uploaded_by: Option<Uuid>,
    /// One of `created_at`, `updated_at`
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    #[validate(range(min = 1, max = 25))]
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReceiptResponse {
    pub receipt_id: Uuid,
    pub expense_id: Uuid,
    pub uploaded_by: Option<Uuid>,
    pub file_url: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<receipt::Model> for ReceiptResponse {
    fn from(model: receipt::Model) -> Self {
        Self {
            receipt_id: model.receipt_id,
            expense_id: model.expense_id,
            uploaded_by: model.uploaded_by,
            file_url: model.file_url,
            note: model.note,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

const SORT_COLUMNS: &[(&str, receipt::Column)] = &[
    ("created_at", receipt::Column::CreatedAt),
    ("updated_at", receipt::Column::UpdatedAt),
];

/// Resolve a receipt and check the caller belongs to its expense's house.
async fn find_receipt_for_member(
    state: &AppState,
    receipt_id: Uuid,
    user_id: Uuid,
) -> Result<receipt::Model, ApiError> {
    let model = receipt::Entity::find_by_id(receipt_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Receipt not found"))?;
    let parent = find_expense(state, model.expense_id).await?;
    guard::assert_house_member(&state.db, parent.house_id, user_id).await?;
    Ok(model)
}

#[utoipa::path(
    post,
    path = "/api/v1/receipts",
    tag = "receipts",
    request_body = CreateReceiptRequest,
    responses(
        (status = 201, description = "Receipt created successfully", body = ApiResponse<ReceiptResponse>),
        (status = 400, description = "Invalid request", body = crate::schemas::ErrorResponse),
        (status = 403, description = "Caller is not a member of the house", body = crate::schemas::ErrorResponse),
        (status = 404, description = "Expense not found", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_receipt(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Valid(Json(request)), _): ValidJson<CreateReceiptRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReceiptResponse>>), ApiError> {
    trace!("Entering create_receipt function");

    let parent = find_expense(&state, request.expense_id).await?;
    let uploader = guard::assert_house_member(&state.db, parent.house_id, auth.user_id).await?;

    let now = Utc::now();
    let model = receipt::ActiveModel {
        receipt_id: Set(Uuid::new_v4()),
        expense_id: Set(request.expense_id),
        uploaded_by: Set(Some(uploader.house_member_id)),
        file_url: Set(request.file_url),
        note: Set(request.note),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await?;

    info!("Receipt created successfully with ID: {}", model.receipt_id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(ReceiptResponse::from(model), "Receipt created successfully")),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/receipts/{receipt_id}",
    tag = "receipts",
    params(
        ("receipt_id" = Uuid, Path, description = "Receipt ID"),
    ),
    responses(
        (status = 200, description = "Receipt retrieved successfully", body = ApiResponse<ReceiptResponse>),
        (status = 404, description = "Receipt not found", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_receipt(
    State(state): State<AppState>,
    _auth: AuthUser,
    WithRejection(Path(receipt_id), _): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<ReceiptResponse>>, ApiError> {
    trace!("Entering get_receipt function for id: {}", receipt_id);

    let model = receipt::Entity::find_by_id(receipt_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Receipt not found"))?;

    Ok(Json(ApiResponse::ok(
        ReceiptResponse::from(model),
        "Receipt retrieved successfully",
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/receipts",
    tag = "receipts",
    params(ReceiptQuery),
    responses(
        (status = 200, description = "Receipts retrieved successfully", body = ApiResponse<Vec<ReceiptResponse>>),
        (status = 400, description = "Invalid filter or sort", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_receipts(
    State(state): State<AppState>,
    _auth: AuthUser,
    WithRejection(Valid(Query(query)), _): ValidQuery<ReceiptQuery>,
) -> Result<Json<ApiResponse<Vec<ReceiptResponse>>>, ApiError> {
    trace!("Entering get_receipts function");

    let sort_column =
        resolve_sort_column(query.sort_by.as_deref(), SORT_COLUMNS, receipt::Column::CreatedAt)?;

    let mut select = receipt::Entity::find();
    if let Some(expense_id) = query.expense_id {
        select = select.filter(receipt::Column::ExpenseId.eq(expense_id));
    }
    if let Some(uploaded_by) = query.uploaded_by {
        select = select.filter(receipt::Column::UploadedBy.eq(uploaded_by));
    }

    let models = sorted_page(select, sort_column, query.sort_order, query.limit)
        .all(&state.db)
        .await?;
    debug!("Retrieved {} receipts from database", models.len());

    Ok(Json(ApiResponse::ok(
        models.into_iter().map(ReceiptResponse::from).collect(),
        "Receipts retrieved successfully",
    )))
}

#[utoipa::path(
    patch,
    path = "/api/v1/receipts/{receipt_id}",
    tag = "receipts",
    params(
        ("receipt_id" = Uuid, Path, description = "Receipt ID"),
    ),
    request_body = UpdateReceiptRequest,
    responses(
        (status = 200, description = "Receipt updated successfully", body = ApiResponse<ReceiptResponse>),
        (status = 400, description = "No recognised fields supplied", body = crate::schemas::ErrorResponse),
        (status = 403, description = "Caller is not a member of the house", body = crate::schemas::ErrorResponse),
        (status = 404, description = "Receipt not found", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_receipt(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Path(receipt_id), _): ApiPath<Uuid>,
    WithRejection(Valid(Json(request)), _): ValidJson<UpdateReceiptRequest>,
) -> Result<Json<ApiResponse<ReceiptResponse>>, ApiError> {
    trace!("Entering update_receipt function for id: {}", receipt_id);

    let current = find_receipt_for_member(&state, receipt_id, auth.user_id).await?;
    let updated = update_row(&state.db, current, request).await?;

    info!("Receipt {} updated successfully", receipt_id);
    Ok(Json(ApiResponse::ok(
        ReceiptResponse::from(updated),
        "Receipt updated successfully",
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v1/receipts/{receipt_id}",
    tag = "receipts",
    params(
        ("receipt_id" = Uuid, Path, description = "Receipt ID"),
    ),
    responses(
        (status = 200, description = "Receipt deleted successfully", body = ApiResponse<String>),
        (status = 403, description = "Caller is not a member of the house", body = crate::schemas::ErrorResponse),
        (status = 404, description = "Receipt not found", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_receipt(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Path(receipt_id), _): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    trace!("Entering delete_receipt function for id: {}", receipt_id);

    find_receipt_for_member(&state, receipt_id, auth.user_id).await?;

    let result = receipt::Entity::delete_by_id(receipt_id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::not_found("Receipt not found"));
    }

    info!("Receipt {} deleted successfully", receipt_id);
    Ok(Json(ApiResponse::ok(
        format!("Receipt {receipt_id} deleted"),
        "Receipt deleted successfully",
    )))
}
