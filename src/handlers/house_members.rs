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
use model::entities::{house_member, user};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Request body for adding a user to a house. Only the head may do this.
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateHouseMemberRequest {
    pub house_id: Uuid,
    pub user_id: Uuid,
    /// Defaults to false
    pub is_admin: Option<bool>,
    /// Defaults to the added user's display name
    #[validate(length(min = 1, max = 100))]
    pub nickname: Option<String>,
}

/// Request body for updating a membership
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateHouseMemberRequest {
    /// Head only
    pub is_admin: Option<bool>,
    /// Head only
    pub is_active: Option<bool>,
    /// Head, or the member themselves
    #[validate(length(min = 1, max = 100))]
    pub nickname: Option<String>,
}

impl UpdateHouseMemberRequest {
    fn touches_role(&self) -> bool {
        self.is_admin.is_some() || self.is_active.is_some()
    }
}

impl Patch for UpdateHouseMemberRequest {
    type Active = house_member::ActiveModel;

    fn is_empty(&self) -> bool {
        !self.touches_role() && self.nickname.is_none()
    }

    fn apply(self, active: &mut house_member::ActiveModel) {
        if let Some(is_admin) = self.is_admin {
            active.is_admin = Set(is_admin);
        }
        if let Some(is_active) = self.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(nickname) = self.nickname {
            active.nickname = Set(Some(nickname));
        }
        active.updated_at = Set(Utc::now());
    }
}

/// Query parameters for listing memberships
#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct HouseMemberQuery {
    pub house_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub is_admin: Option<bool>,
    pub is_active: Option<bool>,
    /// Substring match on nickname
    pub nickname: Option<String>,
    /// One of `created_at`, `updated_at`, `nickname`
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    #[validate(range(min = 1, max = 25))]
    pub limit: Option<u64>,
}

/// House member response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HouseMemberResponse {
    pub house_member_id: Uuid,
    pub house_id: Uuid,
    pub user_id: Uuid,
    pub nickname: Option<String>,
    pub is_admin: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<house_member::Model> for HouseMemberResponse {
    fn from(model: house_member::Model) -> Self {
        Self {
            house_member_id: model.house_member_id,
            house_id: model.house_id,
            user_id: model.user_id,
            nickname: model.nickname,
            is_admin: model.is_admin,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// A member of a house together with their user profile
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HouseMemberUserInfo {
    pub house_member_id: Uuid,
    pub house_id: Uuid,
    pub user_id: Uuid,
    pub nickname: Option<String>,
    pub is_admin: bool,
    pub is_active: bool,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
    pub payment_method: Option<String>,
    pub payment_link: Option<String>,
    pub joined_at: DateTime<Utc>,
}

impl From<(house_member::Model, Option<user::Model>)> for HouseMemberUserInfo {
    fn from((member, profile): (house_member::Model, Option<user::Model>)) -> Self {
        let (display_name, email, photo_url, payment_method, payment_link) = match profile {
            Some(u) => (
                Some(u.display_name),
                Some(u.email),
                u.photo_url,
                u.payment_method,
                u.payment_link,
            ),
            None => (None, None, None, None, None),
        };

        Self {
            house_member_id: member.house_member_id,
            house_id: member.house_id,
            user_id: member.user_id,
            nickname: member.nickname,
            is_admin: member.is_admin,
            is_active: member.is_active,
            display_name,
            email,
            photo_url,
            payment_method,
            payment_link,
            joined_at: member.created_at,
        }
    }
}

const SORT_COLUMNS: &[(&str, house_member::Column)] = &[
    ("created_at", house_member::Column::CreatedAt),
    ("updated_at", house_member::Column::UpdatedAt),
    ("nickname", house_member::Column::Nickname),
];

const ALREADY_MEMBER: &str = "User is already a member of this house";

async fn find_member(state: &AppState, house_member_id: Uuid) -> Result<house_member::Model, ApiError> {
    house_member::Entity::find_by_id(house_member_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("House member not found"))
}

/// Add a user to a house
#[utoipa::path(
    post,
    path = "/api/v1/house-members",
    tag = "house-members",
    request_body = CreateHouseMemberRequest,
    responses(
        (status = 201, description = "House member created successfully", body = ApiResponse<HouseMemberResponse>),
        (status = 400, description = "Unknown user or invalid request", body = crate::schemas::ErrorResponse),
        (status = 403, description = "Caller is not head of house", body = crate::schemas::ErrorResponse),
        (status = 404, description = "House not found", body = crate::schemas::ErrorResponse),
        (status = 409, description = "User is already a member", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_house_member(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Valid(Json(request)), _): ValidJson<CreateHouseMemberRequest>,
) -> Result<(StatusCode, Json<ApiResponse<HouseMemberResponse>>), ApiError> {
    trace!("Entering create_house_member function");
    debug!(
        "User {} adding user {} to house {}",
        auth.user_id, request.user_id, request.house_id
    );

    guard::assert_user_is_house_head(&state.db, request.house_id, auth.user_id).await?;

    if guard::find_membership(&state.db, request.house_id, request.user_id)
        .await?
        .is_some()
    {
        warn!("User {} already belongs to house {}", request.user_id, request.house_id);
        return Err(ApiError::conflict(ALREADY_MEMBER));
    }

    let joining = user::Entity::find_by_id(request.user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::bad_request(format!("User {} does not exist", request.user_id)))?;

    let now = Utc::now();
    let new_member = house_member::ActiveModel {
        house_member_id: Set(Uuid::new_v4()),
        house_id: Set(request.house_id),
        user_id: Set(request.user_id),
        nickname: Set(request.nickname.or(Some(joining.display_name))),
        is_admin: Set(request.is_admin.unwrap_or(false)),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };

    // Constraints still guard against a concurrent insert slipping past the checks
    let member = new_member.insert(&state.db).await.map_err(|e| match StoreError::from(e) {
        StoreError::UniqueViolation(_) => ApiError::conflict(ALREADY_MEMBER),
        StoreError::ReferenceViolation(_) => {
            ApiError::bad_request("House or user reference is invalid")
        }
        other => other.into(),
    })?;

    info!("House member created successfully with ID: {}", member.house_member_id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            HouseMemberResponse::from(member),
            "House member created successfully",
        )),
    ))
}

/// Get a specific membership by ID
#[utoipa::path(
    get,
    path = "/api/v1/house-members/{house_member_id}",
    tag = "house-members",
    params(
        ("house_member_id" = Uuid, Path, description = "House member ID"),
    ),
    responses(
        (status = 200, description = "House member retrieved successfully", body = ApiResponse<HouseMemberResponse>),
        (status = 404, description = "House member not found", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_house_member(
    State(state): State<AppState>,
    _auth: AuthUser,
    WithRejection(Path(house_member_id), _): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<HouseMemberResponse>>, ApiError> {
    trace!("Entering get_house_member function for id: {}", house_member_id);

    let member = find_member(&state, house_member_id).await?;
    Ok(Json(ApiResponse::ok(
        HouseMemberResponse::from(member),
        "House member retrieved successfully",
    )))
}

/// List memberships matching the given filters
#[utoipa::path(
    get,
    path = "/api/v1/house-members",
    tag = "house-members",
    params(HouseMemberQuery),
    responses(
        (status = 200, description = "House members retrieved successfully", body = ApiResponse<Vec<HouseMemberResponse>>),
        (status = 400, description = "Invalid filter or sort", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_house_members(
    State(state): State<AppState>,
    _auth: AuthUser,
    WithRejection(Valid(Query(query)), _): ValidQuery<HouseMemberQuery>,
) -> Result<Json<ApiResponse<Vec<HouseMemberResponse>>>, ApiError> {
    trace!("Entering get_house_members function");

    let sort_column = resolve_sort_column(
        query.sort_by.as_deref(),
        SORT_COLUMNS,
        house_member::Column::CreatedAt,
    )?;

    let mut select = house_member::Entity::find();
    if let Some(house_id) = query.house_id {
        select = select.filter(house_member::Column::HouseId.eq(house_id));
    }
    if let Some(user_id) = query.user_id {
        select = select.filter(house_member::Column::UserId.eq(user_id));
    }
    if let Some(is_admin) = query.is_admin {
        select = select.filter(house_member::Column::IsAdmin.eq(is_admin));
    }
    if let Some(is_active) = query.is_active {
        select = select.filter(house_member::Column::IsActive.eq(is_active));
    }
    if let Some(nickname) = &query.nickname {
        select = select.filter(house_member::Column::Nickname.contains(nickname.as_str()));
    }

    let members = sorted_page(select, sort_column, query.sort_order, query.limit)
        .all(&state.db)
        .await?;
    debug!("Retrieved {} house members from database", members.len());

    Ok(Json(ApiResponse::ok(
        members.into_iter().map(HouseMemberResponse::from).collect(),
        "House members retrieved successfully",
    )))
}

/// Update a membership.
///
/// The head may change any field. A member may change only their own nickname.
#[utoipa::path(
    patch,
    path = "/api/v1/house-members/{house_member_id}",
    tag = "house-members",
    params(
        ("house_member_id" = Uuid, Path, description = "House member ID"),
    ),
    request_body = UpdateHouseMemberRequest,
    responses(
        (status = 200, description = "House member updated successfully", body = ApiResponse<HouseMemberResponse>),
        (status = 400, description = "No recognised fields supplied", body = crate::schemas::ErrorResponse),
        (status = 403, description = "Caller may not change these fields", body = crate::schemas::ErrorResponse),
        (status = 404, description = "House member not found", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_house_member(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Path(house_member_id), _): ApiPath<Uuid>,
    WithRejection(Valid(Json(request)), _): ValidJson<UpdateHouseMemberRequest>,
) -> Result<Json<ApiResponse<HouseMemberResponse>>, ApiError> {
    trace!("Entering update_house_member function for id: {}", house_member_id);

    let member = find_member(&state, house_member_id).await?;
    let is_head = guard::is_user_head_of_house(&state.db, member.house_id, auth.user_id).await?;

    if !is_head {
        if member.user_id != auth.user_id || request.touches_role() {
            warn!(
                "User {} may not update membership {}",
                auth.user_id, house_member_id
            );
            return Err(ApiError::forbidden(guard::HEAD_ONLY_MESSAGE));
        }
    } else if member.user_id == auth.user_id
        && (request.is_admin == Some(false) || request.is_active == Some(false))
    {
        return Err(ApiError::bad_request(
            "Head of house must stay an active admin; transfer ownership first",
        ));
    }

    let updated = update_row(&state.db, member, request).await?;

    info!("House member {} updated successfully", house_member_id);
    Ok(Json(ApiResponse::ok(
        HouseMemberResponse::from(updated),
        "House member updated successfully",
    )))
}

/// Remove a membership.
///
/// Allowed for the head of house, or for the member removing themselves. The
/// head may only leave once they are the last member.
#[utoipa::path(
    delete,
    path = "/api/v1/house-members/{house_member_id}",
    tag = "house-members",
    params(
        ("house_member_id" = Uuid, Path, description = "House member ID"),
    ),
    responses(
        (status = 200, description = "House member deleted successfully", body = ApiResponse<String>),
        (status = 400, description = "Head cannot leave while other members remain", body = crate::schemas::ErrorResponse),
        (status = 403, description = "Caller is neither head nor the member", body = crate::schemas::ErrorResponse),
        (status = 404, description = "House member not found", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_house_member(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Path(house_member_id), _): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    trace!("Entering delete_house_member function for id: {}", house_member_id);

    let member = find_member(&state, house_member_id).await?;
    let house = guard::find_house(&state.db, member.house_id).await?;

    let requester_is_head = house.user_id == auth.user_id;
    let removing_self = member.user_id == auth.user_id;
    if !requester_is_head && !removing_self {
        warn!(
            "User {} may not remove membership {}",
            auth.user_id, house_member_id
        );
        return Err(ApiError::forbidden(
            "Forbidden: only head of house or the member themselves can remove a membership",
        ));
    }

    if member.user_id == house.user_id {
        let remaining = house_member::Entity::find()
            .filter(house_member::Column::HouseId.eq(house.house_id))
            .count(&state.db)
            .await?;
        debug!("House {} has {} members", house.house_id, remaining);
        if remaining > 1 {
            return Err(ApiError::bad_request(
                "Head of house cannot leave while other members remain; transfer ownership first",
            ));
        }
    }

    let result = house_member::Entity::delete_by_id(house_member_id)
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(ApiError::not_found("House member not found"));
    }

    info!("House member {} deleted successfully", house_member_id);
    Ok(Json(ApiResponse::ok(
        format!("House member {house_member_id} deleted"),
        "House member deleted successfully",
    )))
}

/// Members of a house with their user profiles; callers must belong to the house
#[utoipa::path(
    get,
    path = "/api/v1/house-members/{house_id}/user-info",
    tag = "house-members",
    params(
        ("house_id" = Uuid, Path, description = "House ID"),
    ),
    responses(
        (status = 200, description = "House members retrieved successfully", body = ApiResponse<Vec<HouseMemberUserInfo>>),
        (status = 403, description = "Caller is not a member of the house", body = crate::schemas::ErrorResponse),
        (status = 404, description = "House not found", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_house_members_user_info(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Path(house_id), _): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<Vec<HouseMemberUserInfo>>>, ApiError> {
    trace!("Entering get_house_members_user_info function for house_id: {}", house_id);

    guard::assert_house_member(&state.db, house_id, auth.user_id).await?;

    let rows = house_member::Entity::find()
        .find_also_related(user::Entity)
        .filter(house_member::Column::HouseId.eq(house_id))
        .order_by_asc(house_member::Column::CreatedAt)
        .all(&state.db)
        .await?;
    debug!("Retrieved {} members of house {}", rows.len(), house_id);

    Ok(Json(ApiResponse::ok(
        rows.into_iter().map(HouseMemberUserInfo::from).collect(),
        "House members retrieved successfully",
    )))
}
