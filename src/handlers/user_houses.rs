use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{ApiPath, ValidQuery};
use crate::listing::{SortOrder, resolve_sort_column, sorted_page};
use crate::schemas::{ApiResponse, AppState};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use axum_extra::extract::WithRejection;
use axum_valid::Valid;
use chrono::{DateTime, Utc};
use model::entities::{house, house_member};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct UserHouseQuery {
    /// One of `created_at`, `updated_at` (membership) or `name` (house)
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    #[validate(range(min = 1, max = 25))]
    pub limit: Option<u64>,
}

/// A house the user actively belongs to, seen through their membership
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserHouseResponse {
    pub house_id: Uuid,
    pub house_name: String,
    pub house_member_id: Uuid,
    pub is_admin: bool,
    pub member_nickname: Option<String>,
    pub house_created_at: DateTime<Utc>,
    pub house_updated_at: DateTime<Utc>,
    pub member_created_at: DateTime<Utc>,
    pub member_updated_at: DateTime<Utc>,
}

impl UserHouseResponse {
    fn new(member: house_member::Model, house: house::Model) -> Self {
        Self {
            house_id: house.house_id,
            house_name: house.name,
            house_member_id: member.house_member_id,
            is_admin: member.is_admin,
            member_nickname: member.nickname,
            house_created_at: house.created_at,
            house_updated_at: house.updated_at,
            member_created_at: member.created_at,
            member_updated_at: member.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum UserHouseSort {
    Membership(house_member::Column),
    HouseName,
}

const SORT_COLUMNS: &[(&str, UserHouseSort)] = &[
    ("created_at", UserHouseSort::Membership(house_member::Column::CreatedAt)),
    ("updated_at", UserHouseSort::Membership(house_member::Column::UpdatedAt)),
    ("name", UserHouseSort::HouseName),
];

/// Houses in which the given user holds an active membership
#[utoipa::path(
    get,
    path = "/api/v1/user-houses/{user_id}",
    tag = "user-houses",
    params(
        ("user_id" = Uuid, Path, description = "User ID"),
        UserHouseQuery,
    ),
    responses(
        (status = 200, description = "User houses retrieved successfully", body = ApiResponse<Vec<UserHouseResponse>>),
        (status = 400, description = "Invalid sort", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_user_houses(
    State(state): State<AppState>,
    _auth: AuthUser,
    WithRejection(Path(user_id), _): ApiPath<Uuid>,
    WithRejection(Valid(Query(query)), _): ValidQuery<UserHouseQuery>,
) -> Result<Json<ApiResponse<Vec<UserHouseResponse>>>, ApiError> {
    trace!("Entering get_user_houses function for user_id: {}", user_id);

    let sort = resolve_sort_column(
        query.sort_by.as_deref(),
        SORT_COLUMNS,
        UserHouseSort::Membership(house_member::Column::CreatedAt),
    )?;

    let select = house_member::Entity::find()
        .find_also_related(house::Entity)
        .filter(house_member::Column::UserId.eq(user_id))
        .filter(house_member::Column::IsActive.eq(true));

    let select = match sort {
        UserHouseSort::Membership(column) => {
            sorted_page(select, column, query.sort_order, query.limit)
        }
        UserHouseSort::HouseName => {
            sorted_page(select, house::Column::Name, query.sort_order, query.limit)
        }
    };

    let rows = select.all(&state.db).await?;
    debug!("User {} belongs to {} houses", user_id, rows.len());

    let data = rows
        .into_iter()
        .filter_map(|(member, house)| house.map(|h| UserHouseResponse::new(member, h)))
        .collect();

    Ok(Json(ApiResponse::ok(data, "User houses retrieved successfully")))
}
