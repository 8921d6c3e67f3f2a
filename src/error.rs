//! Error types for the application

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::governance::GovernanceError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Governance(#[from] GovernanceError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable wire code for governance failures; transport and internal
    /// errors carry none.
    pub fn code(&self) -> Option<u32> {
        match self {
            AppError::Governance(e) => Some(e.code()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            AppError::Governance(e) => {
                let status = match e {
                    GovernanceError::OwnerOnly
                    | GovernanceError::Unauthorized
                    | GovernanceError::NotAssignee => StatusCode::FORBIDDEN,
                    GovernanceError::MemberNotFound
                    | GovernanceError::ProposalNotFound
                    | GovernanceError::TaskNotFound => StatusCode::NOT_FOUND,
                    GovernanceError::InvalidAmount | GovernanceError::InvalidInput => {
                        StatusCode::BAD_REQUEST
                    }
                    _ => StatusCode::CONFLICT,
                };
                (status, e.to_string())
            }
            AppError::BadRequest(e) => (StatusCode::BAD_REQUEST, e.clone()),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.clone())
            }
        };

        (status, message).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
