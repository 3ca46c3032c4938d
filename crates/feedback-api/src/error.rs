use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use feedback_db::DbError;
use thiserror::Error;
use tracing::error;

use crate::views;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Username is already taken")]
    DuplicateUsername,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::DuplicateUsername => AppError::DuplicateUsername,
            other => AppError::Internal(other.into()),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::Internal(anyhow::anyhow!("spawn_blocking join error: {}", e))
    }
}

impl From<argon2::password_hash::Error> for AppError {
    fn from(e: argon2::password_hash::Error) -> Self {
        AppError::Internal(anyhow::anyhow!("password hashing failed: {}", e))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "That page does not exist."),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "You are not allowed to see or change that.",
            ),
            AppError::DuplicateUsername => (StatusCode::CONFLICT, "That username is taken."),
            AppError::Internal(e) => {
                error!("{:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong.")
            }
        };

        (status, views::error_page(status, message)).into_response()
    }
}
