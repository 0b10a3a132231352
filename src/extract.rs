//! Extractor aliases that run `validator` rules through `axum-valid` and
//! reject with [`ApiError`] instead of axum's plain-text rejections.
//!
//! Handlers destructure them as
//! `WithRejection(Valid(Json(body)), _): ValidJson<Body>`.

use crate::error::ApiError;
use axum::{
    Json,
    extract::{Path, Query},
};
use axum_extra::extract::WithRejection;
use axum_valid::Valid;

/// JSON body, deserialized and validated.
pub type ValidJson<T> = WithRejection<Valid<Json<T>>, ApiError>;

/// Query string, deserialized and validated.
pub type ValidQuery<T> = WithRejection<Valid<Query<T>>, ApiError>;

/// Path parameters; a malformed id is a `400` in the error envelope.
pub type ApiPath<T> = WithRejection<Path<T>, ApiError>;
