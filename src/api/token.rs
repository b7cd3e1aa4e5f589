//! 認証トークンAPI
//!
//! ログイン・リフレッシュ・ログアウト

use crate::common::error::AdminError;
use crate::common::types::{TokenKind, User, UserAction};
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::error::AppError;

/// ログインリクエスト
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// ユーザー名
    pub username: String,
    /// パスワード
    pub password: String,
}

/// リフレッシュリクエスト
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// リフレッシュトークン
    pub refresh_token: String,
}

/// トークンレスポンス
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// アクセストークン
    pub access_token: String,
    /// リフレッシュトークン
    pub refresh_token: String,
    /// トークン種別（常に "bearer"）
    pub token_type: String,
    /// ユーザー名
    pub username: String,
    /// 表示名
    pub fullname: String,
    /// ロール
    pub role: String,
}

fn token_response(user: &User, state: &AppState) -> Result<TokenResponse, AdminError> {
    let access_token = crate::auth::jwt::issue_access_token(&user.username, &state.auth)?;
    let refresh_token = crate::auth::jwt::issue_refresh_token(&user.username, &state.auth)?;

    Ok(TokenResponse {
        access_token,
        refresh_token,
        token_type: "bearer".to_string(),
        username: user.username.clone(),
        fullname: user.fullname.clone(),
        role: user.role.as_str().to_string(),
    })
}

/// POST /api/token - ログイン
///
/// ユーザー名・パスワードを検証し、アクセス・リフレッシュトークンを発行する。
/// 成功時は行動ログ（user.login）を記録する。
///
/// # Returns
/// * `200 OK` - トークンペア
/// * `401 Unauthorized` - 認証失敗（ユーザー不在・無効状態・パスワード不一致を区別しない）
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, Response> {
    let user = crate::auth::gate::authenticate(&state.db_pool, &request.username, &request.password)
        .await
        .map_err(|e| AppError(e).into_response())?
        .ok_or_else(|| {
            tracing::warn!("Login failed for username={}", request.username);
            AppError(AdminError::InvalidCredentials).into_response()
        })?;

    let response = token_response(&user, &state).map_err(|e| AppError(e).into_response())?;

    crate::db::audit::record_user_action(&state.db_pool, &user.username, UserAction::LogIn, None)
        .await
        .map_err(|e| AppError(e).into_response())?;

    tracing::info!("User logged in: username={}", user.username);
    Ok(Json(response))
}

/// POST /api/token/refresh - トークン再発行
///
/// リフレッシュトークンを検証し、新しいトークンペアを発行する。
/// 発行後に無効化されたユーザーのリフレッシュトークンは拒否する。
///
/// # Returns
/// * `200 OK` - 新しいトークンペア
/// * `401 Unauthorized` - トークン無効・種別違い・ユーザー無効
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, Response> {
    let claims = crate::auth::jwt::verify_token(&request.refresh_token, &state.auth).map_err(|e| {
        tracing::warn!("Refresh token verification failed: {}", e);
        AppError(AdminError::InvalidCredentials).into_response()
    })?;

    if claims.kind != TokenKind::Refresh {
        return Err(AppError(AdminError::InvalidCredentials).into_response());
    }

    let user = crate::db::users::get_active_by_username(&state.db_pool, &claims.sub)
        .await
        .map_err(|e| AppError(e).into_response())?
        .ok_or_else(|| AppError(AdminError::InvalidCredentials).into_response())?;

    let response = token_response(&user, &state).map_err(|e| AppError(e).into_response())?;

    Ok(Json(response))
}

/// POST /api/logout - ログアウト
///
/// 認証ゲートの内側。行動ログ（user.logout）を記録する。
/// トークン自体は失効させない（有効期限まで有効）。
pub async fn logout(
    Extension(user): Extension<User>,
    State(state): State<AppState>,
) -> Result<StatusCode, Response> {
    crate::db::audit::record_user_action(&state.db_pool, &user.username, UserAction::LogOut, None)
        .await
        .map_err(|e| AppError(e).into_response())?;

    tracing::info!("User logged out: username={}", user.username);
    Ok(StatusCode::NO_CONTENT)
}
