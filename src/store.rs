//! Persistence helpers shared by the mutation handlers.
//!
//! Storage failures are classified once, here, into [`StoreError`] so the
//! handlers never inspect driver-specific error codes.

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel,
    SqlErr,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("foreign key constraint violated: {0}")]
    ReferenceViolation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("no recognised fields supplied")]
    EmptyPatch,
    #[error(transparent)]
    Other(DbErr),
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => StoreError::UniqueViolation(detail),
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                StoreError::ReferenceViolation(detail)
            }
            _ => match err {
                // SQLite reports ON DELETE RESTRICT failures with an extended code
                // that `sql_err` does not classify.
                ref e if e.to_string().contains("FOREIGN KEY constraint failed") => {
                    StoreError::ReferenceViolation(e.to_string())
                }
                DbErr::RecordNotFound(what) => StoreError::NotFound(what),
                DbErr::RecordNotUpdated => {
                    StoreError::NotFound("Record no longer exists".to_string())
                }
                other => StoreError::Other(other),
            },
        }
    }
}

/// A partial update: only the fields that were supplied are written.
pub trait Patch {
    type Active: ActiveModelTrait;

    /// True when no recognised field was supplied.
    fn is_empty(&self) -> bool;

    /// Copy the supplied fields onto `active` and stamp its update marker.
    fn apply(self, active: &mut Self::Active);
}

type ModelOf<A> = <<A as ActiveModelTrait>::Entity as EntityTrait>::Model;

/// Apply `patch` to `current` and return the canonical row after the write.
pub async fn update_row<C, P>(
    conn: &C,
    current: ModelOf<P::Active>,
    patch: P,
) -> Result<ModelOf<P::Active>, StoreError>
where
    C: ConnectionTrait,
    P: Patch,
    P::Active: ActiveModelBehavior + Send,
    ModelOf<P::Active>: IntoActiveModel<P::Active>,
{
    if patch.is_empty() {
        return Err(StoreError::EmptyPatch);
    }

    let mut active = current.into_active_model();
    patch.apply(&mut active);
    Ok(active.update(conn).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_updated_is_not_found() {
        assert!(matches!(
            StoreError::from(DbErr::RecordNotUpdated),
            StoreError::NotFound(_)
        ));
    }

    #[test]
    fn test_restrict_failure_is_a_reference_violation() {
        let err = DbErr::Custom("FOREIGN KEY constraint failed".into());
        assert!(matches!(
            StoreError::from(err),
            StoreError::ReferenceViolation(_)
        ));
    }

    #[test]
    fn test_unclassified_errors_are_kept() {
        assert!(matches!(
            StoreError::from(DbErr::Custom("disk full".into())),
            StoreError::Other(_)
        ));
    }
}
