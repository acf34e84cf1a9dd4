use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::core::strong_types::{CommentId, RequestId};

/// Coarse error category reported to clients alongside the specific code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Unauthenticated,
    Authorization,
    Conflict,
    Storage,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Authorization => "authorization",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Storage => "storage",
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    // Validation errors
    Validation(String),
    SelfFollow,
    EmptyComment,
    // Missing resources
    NotFound(String),
    RequestNotFound(RequestId),
    CommentNotFound(CommentId),
    // Identity and ownership
    Unauthenticated(String),
    NotAuthorized(String),
    // Graph and engagement state conflicts
    AlreadyFollowing,
    RequestAlreadyPending,
    RequestAlreadyResolved(RequestId),
    NotFollowing,
    AlreadyLiked,
    NotLiked,
    Conflict(String),
    // Storage layer
    DatabaseError(String),
    SerializationError(String),
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) | AppError::SelfFollow | AppError::EmptyComment => {
                ErrorKind::Validation
            }
            AppError::NotFound(_) | AppError::RequestNotFound(_) | AppError::CommentNotFound(_) => {
                ErrorKind::NotFound
            }
            AppError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            AppError::NotAuthorized(_) => ErrorKind::Authorization,
            AppError::AlreadyFollowing
            | AppError::RequestAlreadyPending
            | AppError::RequestAlreadyResolved(_)
            | AppError::NotFollowing
            | AppError::AlreadyLiked
            | AppError::NotLiked
            | AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::DatabaseError(_) | AppError::SerializationError(_) | AppError::Internal(_) => {
                ErrorKind::Storage
            }
        }
    }

    /// Stable machine-readable code for the specific failure.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::SelfFollow => "self_follow",
            AppError::EmptyComment => "empty_comment",
            AppError::NotFound(_) => "not_found",
            AppError::RequestNotFound(_) => "request_not_found",
            AppError::CommentNotFound(_) => "comment_not_found",
            AppError::Unauthenticated(_) => "unauthenticated",
            AppError::NotAuthorized(_) => "not_authorized",
            AppError::AlreadyFollowing => "already_following",
            AppError::RequestAlreadyPending => "request_already_pending",
            AppError::RequestAlreadyResolved(_) => "request_already_resolved",
            AppError::NotFollowing => "not_following",
            AppError::AlreadyLiked => "already_liked",
            AppError::NotLiked => "not_liked",
            AppError::Conflict(_) => "conflict",
            AppError::DatabaseError(_) => "database_error",
            AppError::SerializationError(_) => "serialization_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::Authorization => StatusCode::FORBIDDEN,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::SelfFollow => write!(f, "Users cannot follow themselves"),
            AppError::EmptyComment => write!(f, "Comment text cannot be empty"),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::RequestNotFound(id) => write!(f, "Follow request {} not found", id),
            AppError::CommentNotFound(id) => write!(f, "Comment {} not found", id),
            AppError::Unauthenticated(msg) => write!(f, "Unauthenticated: {}", msg),
            AppError::NotAuthorized(msg) => write!(f, "Not authorized: {}", msg),
            AppError::AlreadyFollowing => write!(f, "Already following this user"),
            AppError::RequestAlreadyPending => write!(f, "A follow request is already pending"),
            AppError::RequestAlreadyResolved(id) => {
                write!(f, "Follow request {} has already been resolved", id)
            }
            AppError::NotFollowing => write!(f, "Not following this user"),
            AppError::AlreadyLiked => write!(f, "Item already liked"),
            AppError::NotLiked => write!(f, "Item is not liked"),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self.kind() {
            ErrorKind::Storage => {
                tracing::error!("{}", self);
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
            "kind": self.kind().as_str(),
            "code": self.code(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
