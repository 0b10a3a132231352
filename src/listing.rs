//! Shared pieces of the read pipelines: sort allow-lists, sort direction and
//! the bounded page size.

use crate::error::ApiError;
use sea_orm::{IntoSimpleExpr, Order, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_PAGE_LIMIT: u64 = 25;
pub const MAX_PAGE_LIMIT: u64 = 25;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl From<SortOrder> for Order {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

/// Map a requested sort key onto its column, or fall back to `default`.
///
/// Keys outside `allowed` are rejected so that only whitelisted columns ever
/// reach the `ORDER BY` clause.
pub fn resolve_sort_column<T: Copy>(
    requested: Option<&str>,
    allowed: &[(&str, T)],
    default: T,
) -> Result<T, ApiError> {
    let Some(key) = requested else {
        return Ok(default);
    };

    allowed
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, column)| *column)
        .ok_or_else(|| {
            let names: Vec<&str> = allowed.iter().map(|(name, _)| *name).collect();
            ApiError::bad_request(format!(
                "Invalid sort_by '{}'; expected one of: {}",
                key,
                names.join(", ")
            ))
        })
}

/// Apply ordering and the page limit to a select.
pub fn sorted_page<S, C>(select: S, column: C, order: Option<SortOrder>, limit: Option<u64>) -> S
where
    S: QueryOrder + QuerySelect,
    C: IntoSimpleExpr,
{
    select
        .order_by(column, order.unwrap_or_default().into())
        .limit(limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Col {
        Name,
        CreatedAt,
    }

    const ALLOWED: &[(&str, Col)] = &[("name", Col::Name), ("created_at", Col::CreatedAt)];

    #[test]
    fn test_default_column_when_unspecified() {
        assert_eq!(resolve_sort_column(None, ALLOWED, Col::CreatedAt).unwrap(), Col::CreatedAt);
    }

    #[test]
    fn test_allowed_column_is_resolved() {
        assert_eq!(resolve_sort_column(Some("name"), ALLOWED, Col::CreatedAt).unwrap(), Col::Name);
    }

    #[test]
    fn test_unknown_column_is_bad_request() {
        let err = resolve_sort_column(Some("not_a_column"), ALLOWED, Col::CreatedAt).unwrap_err();
        match err {
            ApiError::BadRequest(msg) => assert!(msg.contains("name, created_at")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_sort_order_defaults_to_desc() {
        assert_eq!(SortOrder::default(), SortOrder::Desc);
        assert_eq!(Order::from(SortOrder::Asc), Order::Asc);
    }
}
