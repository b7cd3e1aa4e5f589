//! エラー型定義
//!
//! 統一エラー型（thiserror使用）
//!
//! ドメイン失敗（NotFound / Conflict）と認証・認可失敗
//! （InvalidCredentials / Forbidden）は別系統として扱う。
//! 認証・認可失敗はエンティティ変更の前に短絡し、監査ログを書かない。

use axum::http::StatusCode;
use thiserror::Error;

/// admin backend error type
#[derive(Debug, Error)]
pub enum AdminError {
    /// Entity not found (lookup短絡、監査ログは書かれない)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness violation (e.g., duplicate username)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Password hash error
    #[error("Password hash error: {0}")]
    PasswordHash(String),

    /// JWT error
    #[error("JWT error: {0}")]
    Jwt(String),

    /// Authentication failure (missing/invalid/expired token, unknown or inactive user)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Authorization failure (role outside the configured admin set)
    #[error("Not permitted: {0}")]
    Forbidden(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AdminError {
    /// HTTPステータスコードへのマッピング
    pub fn status_code(&self) -> StatusCode {
        match self {
            AdminError::NotFound(_) => StatusCode::NOT_FOUND,
            AdminError::Conflict(_) => StatusCode::CONFLICT,
            AdminError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AdminError::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AdminError::Jwt(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AdminError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AdminError::Forbidden(_) => StatusCode::FORBIDDEN,
            AdminError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AdminError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable reason code for response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AdminError::NotFound(_) => "not_found",
            AdminError::Conflict(_) => "conflict",
            AdminError::Database(_) => "database_error",
            AdminError::PasswordHash(_) => "password_hash_error",
            AdminError::Jwt(_) => "jwt_error",
            AdminError::InvalidCredentials => "invalid_credentials",
            AdminError::Forbidden(_) => "not_permitted_operation",
            AdminError::Validation(_) => "validation_error",
            AdminError::Internal(_) => "internal_error",
        }
    }
}
