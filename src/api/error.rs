//! APIエラーレスポンス型
//!
//! axum用の共通エラーハンドリング

use crate::common::error::AdminError;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Axum用のエラーレスポンス型
#[derive(Debug)]
pub struct AppError(pub AdminError);

impl From<AdminError> for AppError {
    fn from(err: AdminError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();

        // 5xxは内部詳細をログにのみ残し、レスポンスには定型文を返す
        let message = if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        };

        let payload = json!({
            "error": self.0.code(),
            "message": message,
        });

        (status, Json(payload)).into_response()
    }
}
