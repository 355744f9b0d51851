use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::engine::assignment::AssignmentError;
use crate::engine::checkout::{CancelRejection, CheckoutError};
use crate::engine::lifecycle::TransitionError;
use crate::engine::pricing::BasketError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<BasketError> for AppError {
    fn from(err: BasketError) -> Self {
        match err {
            BasketError::UnknownCustomer(_) => AppError::NotFound(err.to_string()),
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}

impl From<CancelRejection> for AppError {
    fn from(err: CancelRejection) -> Self {
        match err {
            CancelRejection::OrderNotFound(_) => AppError::NotFound(err.to_string()),
            CancelRejection::NotOwner => AppError::Forbidden(err.to_string()),
            CancelRejection::WindowElapsed | CancelRejection::NotCancellable(_) => {
                AppError::Conflict(err.to_string())
            }
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Basket(inner) => inner.into(),
            CheckoutError::Store(inner) => inner.into(),
            CheckoutError::Assignment(AssignmentError::Store(inner)) => inner.into(),
            CheckoutError::Assignment(inner) => AppError::Internal(inner.to_string()),
        }
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        AppError::Conflict(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => AppError::NotFound(err.to_string()),
            StoreError::Duplicate { .. } => AppError::Conflict(err.to_string()),
            StoreError::Invalid(_) => AppError::BadRequest(err.to_string()),
            StoreError::Transition(inner) => inner.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
