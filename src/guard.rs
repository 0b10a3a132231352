//! Ownership and membership checks for house-scoped mutations.
//!
//! All checks are read-only and generic over the connection so they can run
//! inside the caller's transaction.

use crate::error::ApiError;
use model::entities::{house, house_member};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use tracing::{debug, warn};
use uuid::Uuid;

pub const HEAD_ONLY_MESSAGE: &str = "Forbidden: only head of house can perform this action";

/// Load a house or fail with `NotFound`.
pub async fn find_house<C: ConnectionTrait>(conn: &C, house_id: Uuid) -> Result<house::Model, ApiError> {
    house::Entity::find_by_id(house_id)
        .one(conn)
        .await?
        .ok_or_else(|| ApiError::not_found("House not found"))
}

/// Whether `user_id` is the current head of `house_id`.
pub async fn is_user_head_of_house<C: ConnectionTrait>(
    conn: &C,
    house_id: Uuid,
    user_id: Uuid,
) -> Result<bool, ApiError> {
    let house = find_house(conn, house_id).await?;
    Ok(house.user_id == user_id)
}

/// Require `user_id` to head `house_id`; returns the house on success.
pub async fn assert_user_is_house_head<C: ConnectionTrait>(
    conn: &C,
    house_id: Uuid,
    user_id: Uuid,
) -> Result<house::Model, ApiError> {
    let house = find_house(conn, house_id).await?;
    if house.user_id != user_id {
        warn!("User {} is not head of house {}", user_id, house_id);
        return Err(ApiError::forbidden(HEAD_ONLY_MESSAGE));
    }
    debug!("User {} confirmed as head of house {}", user_id, house_id);
    Ok(house)
}

pub async fn find_membership<C: ConnectionTrait>(
    conn: &C,
    house_id: Uuid,
    user_id: Uuid,
) -> Result<Option<house_member::Model>, ApiError> {
    Ok(house_member::Entity::find()
        .filter(house_member::Column::HouseId.eq(house_id))
        .filter(house_member::Column::UserId.eq(user_id))
        .one(conn)
        .await?)
}

/// Require `user_id` to hold an active membership of `house_id`.
pub async fn assert_house_member<C: ConnectionTrait>(
    conn: &C,
    house_id: Uuid,
    user_id: Uuid,
) -> Result<house_member::Model, ApiError> {
    find_house(conn, house_id).await?;
    match find_membership(conn, house_id, user_id).await? {
        Some(member) if member.is_active => Ok(member),
        _ => {
            warn!("User {} is not an active member of house {}", user_id, house_id);
            Err(ApiError::forbidden(
                "Forbidden: only members of this house can perform this action",
            ))
        }
    }
}

/// Resolve a membership id and require it to belong to `house_id`.
pub async fn member_of_house<C: ConnectionTrait>(
    conn: &C,
    house_id: Uuid,
    house_member_id: Uuid,
) -> Result<house_member::Model, ApiError> {
    match house_member::Entity::find_by_id(house_member_id).one(conn).await? {
        Some(member) if member.house_id == house_id => Ok(member),
        _ => Err(ApiError::bad_request(format!(
            "House member {house_member_id} does not belong to house {house_id}"
        ))),
    }
}
