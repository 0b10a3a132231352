use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{ApiPath, ValidJson, ValidQuery};
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
use model::entities::{house, house_member, user};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Request body for creating the caller's user profile
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 255))]
    pub display_name: String,
    /// Must be unique across users
    #[validate(email)]
    pub email: String,
    #[validate(url)]
    pub photo_url: Option<String>,
    /// Free-form payment method, e.g. "venmo"
    #[validate(length(max = 50))]
    pub payment_method: Option<String>,
    #[validate(url)]
    pub payment_link: Option<String>,
}

/// Request body for updating a user
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 255))]
    pub display_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(url)]
    pub photo_url: Option<String>,
    #[validate(length(max = 50))]
    pub payment_method: Option<String>,
    #[validate(url)]
    pub payment_link: Option<String>,
}

impl Patch for UpdateUserRequest {
    type Active = user::ActiveModel;

    fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.email.is_none()
            && self.photo_url.is_none()
            && self.payment_method.is_none()
            && self.payment_link.is_none()
    }

    fn apply(self, active: &mut user::ActiveModel) {
        if let Some(display_name) = self.display_name {
            active.display_name = Set(display_name);
        }
        if let Some(email) = self.email {
            active.email = Set(email);
        }
        if let Some(photo_url) = self.photo_url {
            active.photo_url = Set(Some(photo_url));
        }
        if let Some(payment_method) = self.payment_method {
            active.payment_method = Set(Some(payment_method));
        }
        if let Some(payment_link) = self.payment_link {
            active.payment_link = Set(Some(payment_link));
        }
        active.updated_at = Set(Utc::now());
    }
}

/// Query parameters for listing users
#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct UserQuery {
    /// Exact e-mail match
    pub email: Option<String>,
    /// Substring match on display name
    pub display_name: Option<String>,
    /// One of `display_name`, `email`, `created_at`, `updated_at`
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    /// Page size (default: 25)
    #[validate(range(min = 1, max = 25))]
    pub limit: Option<u64>,
}

/// User response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub display_name: String,
    pub email: String,
    pub photo_url: Option<String>,
    pub payment_method: Option<String>,
    pub payment_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            user_id: model.user_id,
            display_name: model.display_name,
            email: model.email,
            photo_url: model.photo_url,
            payment_method: model.payment_method,
            payment_link: model.payment_link,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

const SORT_COLUMNS: &[(&str, user::Column)] = &[
    ("display_name", user::Column::DisplayName),
    ("email", user::Column::Email),
    ("created_at", user::Column::CreatedAt),
    ("updated_at", user::Column::UpdatedAt),
];

fn duplicate_email(email: &str) -> ApiError {
    ApiError::conflict(format!("User with email: {email} already exists"))
}

/// Create the profile of the authenticated user
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = crate::schemas::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::schemas::ErrorResponse),
        (status = 409, description = "Profile or e-mail already exists", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Valid(Json(request)), _): ValidJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    trace!("Entering create_user function");
    debug!("Creating profile for user {} with email {}", auth.user_id, request.email);

    if user::Entity::find_by_id(auth.user_id).one(&state.db).await?.is_some() {
        warn!("User {} already has a profile", auth.user_id);
        return Err(ApiError::conflict("User profile already exists"));
    }

    let now = Utc::now();
    let new_user = user::ActiveModel {
        user_id: Set(auth.user_id),
        display_name: Set(request.display_name),
        email: Set(request.email.clone()),
        photo_url: Set(request.photo_url),
        payment_method: Set(request.payment_method),
        payment_link: Set(request.payment_link),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let user_model = new_user.insert(&state.db).await.map_err(|e| match StoreError::from(e) {
        StoreError::UniqueViolation(_) => duplicate_email(&request.email),
        other => other.into(),
    })?;

    info!("User created successfully with ID: {}", user_model.user_id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(UserResponse::from(user_model), "User created successfully")),
    ))
}

/// Get a specific user by ID
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(
        ("user_id" = Uuid, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "User retrieved successfully", body = ApiResponse<UserResponse>),
        (status = 404, description = "User not found", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    WithRejection(Path(user_id), _): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    trace!("Entering get_user function for user_id: {}", user_id);

    let user_model = user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::ok(
        UserResponse::from(user_model),
        "User retrieved successfully",
    )))
}

/// List users matching the given filters
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    params(UserQuery),
    responses(
        (status = 200, description = "Users retrieved successfully", body = ApiResponse<Vec<UserResponse>>),
        (status = 400, description = "Invalid filter or sort", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_users(
    State(state): State<AppState>,
    _auth: AuthUser,
    WithRejection(Valid(Query(query)), _): ValidQuery<UserQuery>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, ApiError> {
    trace!("Entering get_users function");

    let sort_column =
        resolve_sort_column(query.sort_by.as_deref(), SORT_COLUMNS, user::Column::CreatedAt)?;

    let mut select = user::Entity::find();
    if let Some(email) = &query.email {
        select = select.filter(user::Column::Email.eq(email.as_str()));
    }
    if let Some(display_name) = &query.display_name {
        select = select.filter(user::Column::DisplayName.contains(display_name.as_str()));
    }

    let users = sorted_page(select, sort_column, query.sort_order, query.limit)
        .all(&state.db)
        .await?;
    debug!("Retrieved {} users from database", users.len());

    Ok(Json(ApiResponse::ok(
        users.into_iter().map(UserResponse::from).collect(),
        "Users retrieved successfully",
    )))
}

/// Update the caller's own profile
#[utoipa::path(
    patch,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(
        ("user_id" = Uuid, Path, description = "User ID"),
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "No recognised fields supplied", body = crate::schemas::ErrorResponse),
        (status = 403, description = "Not the caller's profile", body = crate::schemas::ErrorResponse),
        (status = 404, description = "User not found", body = crate::schemas::ErrorResponse),
        (status = 409, description = "E-mail already in use", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Path(user_id), _): ApiPath<Uuid>,
    WithRejection(Valid(Json(request)), _): ValidJson<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    trace!("Entering update_user function for user_id: {}", user_id);

    if auth.user_id != user_id {
        warn!("User {} attempted to update profile {}", auth.user_id, user_id);
        return Err(ApiError::forbidden("Forbidden: users may only update their own profile"));
    }

    let current = user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let new_email = request.email.clone();
    let updated = update_row(&state.db, current, request)
        .await
        .map_err(|e| match (e, new_email) {
            (StoreError::UniqueViolation(_), Some(email)) => duplicate_email(&email),
            (other, _) => other.into(),
        })?;

    info!("User {} updated successfully", user_id);
    Ok(Json(ApiResponse::ok(
        UserResponse::from(updated),
        "User updated successfully",
    )))
}

/// Delete the caller's own profile
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(
        ("user_id" = Uuid, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "User deleted successfully", body = ApiResponse<String>),
        (status = 403, description = "Not the caller's profile", body = crate::schemas::ErrorResponse),
        (status = 404, description = "User not found", body = crate::schemas::ErrorResponse),
        (status = 409, description = "User still heads or belongs to a house", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Path(user_id), _): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    trace!("Entering delete_user function for user_id: {}", user_id);

    if auth.user_id != user_id {
        warn!("User {} attempted to delete profile {}", auth.user_id, user_id);
        return Err(ApiError::forbidden("Forbidden: users may only delete their own profile"));
    }

    let headed = house::Entity::find()
        .filter(house::Column::UserId.eq(user_id))
        .count(&state.db)
        .await?;
    let memberships = house_member::Entity::find()
        .filter(house_member::Column::UserId.eq(user_id))
        .count(&state.db)
        .await?;
    if headed > 0 || memberships > 0 {
        warn!(
            "User {} still heads {} and belongs to {} houses; refusing deletion",
            user_id, headed, memberships
        );
        return Err(ApiError::conflict(
            "User still belongs to one or more houses; leave them first",
        ));
    }

    // A membership inserted after the check still trips the restrict constraint.
    let result = user::Entity::delete_by_id(user_id)
        .exec(&state.db)
        .await
        .map_err(|e| match StoreError::from(e) {
            StoreError::ReferenceViolation(_) => ApiError::conflict(
                "User still belongs to one or more houses; leave them first",
            ),
            other => other.into(),
        })?;

    if result.rows_affected == 0 {
        warn!("User with ID {} not found for deletion", user_id);
        return Err(ApiError::not_found("User not found"));
    }

    info!("User with ID {} deleted successfully", user_id);
    Ok(Json(ApiResponse::ok(
        format!("User {user_id} deleted"),
        "User deleted successfully",
    )))
}
