use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{ApiPath, ValidJson, ValidQuery};
use crate::guard;
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
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Request body for creating a house. The caller becomes its head.
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateHouseRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Optional join code, unique across houses
    #[validate(length(min = 4, max = 32))]
    pub invite_code: Option<String>,
}

/// Request body for updating a house
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateHouseRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 4, max = 32))]
    pub invite_code: Option<String>,
    /// Transfer headship to this user; must be an active member
    pub new_head_user_id: Option<Uuid>,
}

impl Patch for UpdateHouseRequest {
    type Active = house::ActiveModel;

    fn is_empty(&self) -> bool {
        self.name.is_none() && self.invite_code.is_none() && self.new_head_user_id.is_none()
    }

    fn apply(self, active: &mut house::ActiveModel) {
        if let Some(name) = self.name {
            active.name = Set(name);
        }
        if let Some(invite_code) = self.invite_code {
            active.invite_code = Set(Some(invite_code));
        }
        if let Some(new_head) = self.new_head_user_id {
            active.user_id = Set(new_head);
        }
        active.updated_at = Set(Utc::now());
    }
}

/// Query parameters for listing houses
#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct HouseQuery {
    /// Substring match on the house name
    pub name: Option<String>,
    /// Filter by head of house
    pub user_id: Option<Uuid>,
    pub invite_code: Option<String>,
    /// One of `created_at`, `updated_at`, `name`
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    #[validate(range(min = 1, max = 25))]
    pub limit: Option<u64>,
}

/// House response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HouseResponse {
    pub house_id: Uuid,
    pub name: String,
    pub invite_code: Option<String>,
    /// Head of house
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<house::Model> for HouseResponse {
    fn from(model: house::Model) -> Self {
        Self {
            house_id: model.house_id,
            name: model.name,
            invite_code: model.invite_code,
            user_id: model.user_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

const SORT_COLUMNS: &[(&str, house::Column)] = &[
    ("created_at", house::Column::CreatedAt),
    ("updated_at", house::Column::UpdatedAt),
    ("name", house::Column::Name),
];

fn duplicate_invite_code(code: Option<&str>) -> ApiError {
    ApiError::conflict(format!(
        "House with invite_code: {} already exists",
        code.unwrap_or_default()
    ))
}

/// Move headship of `house` to `new_head`, keeping the admin flags in step.
async fn transfer_headship<C: ConnectionTrait>(
    conn: &C,
    house: &house::Model,
    new_head: Uuid,
) -> Result<(), ApiError> {
    let incoming = guard::find_membership(conn, house.house_id, new_head)
        .await?
        .filter(|member| member.is_active)
        .ok_or_else(|| {
            ApiError::bad_request("New head of house must be an active member of the house")
        })?;

    let now = Utc::now();
    if let Some(outgoing) = guard::find_membership(conn, house.house_id, house.user_id).await? {
        let mut outgoing = outgoing.into_active_model();
        outgoing.is_admin = Set(false);
        outgoing.updated_at = Set(now);
        outgoing.update(conn).await?;
    }

    let mut incoming = incoming.into_active_model();
    incoming.is_admin = Set(true);
    incoming.updated_at = Set(now);
    incoming.update(conn).await?;

    info!(
        "Headship of house {} moving from {} to {}",
        house.house_id, house.user_id, new_head
    );
    Ok(())
}

/// Create a new house headed by the caller
#[utoipa::path(
    post,
    path = "/api/v1/houses",
    tag = "houses",
    request_body = CreateHouseRequest,
    responses(
        (status = 201, description = "House created successfully", body = ApiResponse<HouseResponse>),
        (status = 400, description = "Invalid request or caller has no profile", body = crate::schemas::ErrorResponse),
        (status = 409, description = "Invite code already in use", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_house(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Valid(Json(request)), _): ValidJson<CreateHouseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<HouseResponse>>), ApiError> {
    trace!("Entering create_house function");
    debug!("User {} creating house '{}'", auth.user_id, request.name);

    let txn = state.db.begin().await?;

    let profile = user::Entity::find_by_id(auth.user_id)
        .one(&txn)
        .await?
        .ok_or_else(|| ApiError::bad_request("Create a user profile before creating a house"))?;

    let now = Utc::now();
    let invite_code = request.invite_code.clone();
    let new_house = house::ActiveModel {
        house_id: Set(Uuid::new_v4()),
        name: Set(request.name),
        invite_code: Set(request.invite_code),
        user_id: Set(auth.user_id),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let house_model = new_house.insert(&txn).await.map_err(|e| match StoreError::from(e) {
        StoreError::UniqueViolation(_) => duplicate_invite_code(invite_code.as_deref()),
        other => other.into(),
    })?;

    // The head is always a member of their own house
    house_member::ActiveModel {
        house_member_id: Set(Uuid::new_v4()),
        house_id: Set(house_model.house_id),
        user_id: Set(auth.user_id),
        nickname: Set(Some(profile.display_name)),
        is_admin: Set(true),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!("House created successfully with ID: {}", house_model.house_id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(HouseResponse::from(house_model), "House created successfully")),
    ))
}

/// Get a specific house by ID
#[utoipa::path(
    get,
    path = "/api/v1/houses/{house_id}",
    tag = "houses",
    params(
        ("house_id" = Uuid, Path, description = "House ID"),
    ),
    responses(
        (status = 200, description = "House retrieved successfully", body = ApiResponse<HouseResponse>),
        (status = 404, description = "House not found", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_house(
    State(state): State<AppState>,
    _auth: AuthUser,
    WithRejection(Path(house_id), _): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<HouseResponse>>, ApiError> {
    trace!("Entering get_house function for house_id: {}", house_id);

    let house_model = guard::find_house(&state.db, house_id).await?;
    Ok(Json(ApiResponse::ok(
        HouseResponse::from(house_model),
        "House retrieved successfully",
    )))
}

/// List houses matching the given filters
#[utoipa::path(
    get,
    path = "/api/v1/houses",
    tag = "houses",
    params(HouseQuery),
    responses(
        (status = 200, description = "Houses retrieved successfully", body = ApiResponse<Vec<HouseResponse>>),
        (status = 400, description = "Invalid filter or sort", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_houses(
    State(state): State<AppState>,
    _auth: AuthUser,
    WithRejection(Valid(Query(query)), _): ValidQuery<HouseQuery>,
) -> Result<Json<ApiResponse<Vec<HouseResponse>>>, ApiError> {
    trace!("Entering get_houses function");

    let sort_column =
        resolve_sort_column(query.sort_by.as_deref(), SORT_COLUMNS, house::Column::CreatedAt)?;

    let mut select = house::Entity::find();
    if let Some(name) = &query.name {
        select = select.filter(house::Column::Name.contains(name.as_str()));
    }
    if let Some(user_id) = query.user_id {
        select = select.filter(house::Column::UserId.eq(user_id));
    }
    if let Some(invite_code) = &query.invite_code {
        select = select.filter(house::Column::InviteCode.eq(invite_code.as_str()));
    }

    let houses = sorted_page(select, sort_column, query.sort_order, query.limit)
        .all(&state.db)
        .await?;
    debug!("Retrieved {} houses from database", houses.len());

    Ok(Json(ApiResponse::ok(
        houses.into_iter().map(HouseResponse::from).collect(),
        "Houses retrieved successfully",
    )))
}

/// Update a house; only its head may do so
#[utoipa::path(
    patch,
    path = "/api/v1/houses/{house_id}",
    tag = "houses",
    params(
        ("house_id" = Uuid, Path, description = "House ID"),
    ),
    request_body = UpdateHouseRequest,
    responses(
        (status = 200, description = "House updated successfully", body = ApiResponse<HouseResponse>),
        (status = 400, description = "No recognised fields, or new head is not a member", body = crate::schemas::ErrorResponse),
        (status = 403, description = "Caller is not head of house", body = crate::schemas::ErrorResponse),
        (status = 404, description = "House not found", body = crate::schemas::ErrorResponse),
        (status = 409, description = "Invite code already in use", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_house(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Path(house_id), _): ApiPath<Uuid>,
    WithRejection(Valid(Json(request)), _): ValidJson<UpdateHouseRequest>,
) -> Result<Json<ApiResponse<HouseResponse>>, ApiError> {
    trace!("Entering update_house function for house_id: {}", house_id);

    let txn = state.db.begin().await?;
    let current = guard::assert_user_is_house_head(&txn, house_id, auth.user_id).await?;

    if let Some(new_head) = request.new_head_user_id.filter(|id| *id != current.user_id) {
        transfer_headship(&txn, &current, new_head).await?;
    }

    let invite_code = request.invite_code.clone();
    let updated = update_row(&txn, current, request)
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation(_) => duplicate_invite_code(invite_code.as_deref()),
            other => other.into(),
        })?;

    txn.commit().await?;

    info!("House {} updated successfully", house_id);
    Ok(Json(ApiResponse::ok(
        HouseResponse::from(updated),
        "House updated successfully",
    )))
}

/// Delete a house; only its head may do so
#[utoipa::path(
    delete,
    path = "/api/v1/houses/{house_id}",
    tag = "houses",
    params(
        ("house_id" = Uuid, Path, description = "House ID"),
    ),
    responses(
        (status = 200, description = "House deleted successfully", body = ApiResponse<String>),
        (status = 403, description = "Caller is not head of house", body = crate::schemas::ErrorResponse),
        (status = 404, description = "House not found", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_house(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Path(house_id), _): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    trace!("Entering delete_house function for house_id: {}", house_id);

    guard::assert_user_is_house_head(&state.db, house_id, auth.user_id).await?;

    let result = house::Entity::delete_by_id(house_id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        warn!("House with ID {} not found for deletion", house_id);
        return Err(ApiError::not_found("House not found"));
    }

    info!("House with ID {} deleted successfully", house_id);
    Ok(Json(ApiResponse::ok(
        format!("House {house_id} deleted"),
        "House deleted successfully",
    )))
}
