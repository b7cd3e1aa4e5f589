// 認証ゲートミドルウェア

use crate::common::error::AdminError;
use crate::common::types::{TokenKind, User};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// ユーザー名とパスワードで認証し、有効なユーザーを返す
///
/// # Arguments
/// * `pool` - データベース接続プール
/// * `username` - ユーザー名
/// * `password` - 平文パスワード
///
/// # Returns
/// * `Ok(Some(User))` - 認証成功
/// * `Ok(None)` - ユーザー不在・無効状態・パスワード不一致（理由は区別しない）
/// * `Err(AdminError)` - 照合処理自体の失敗
pub async fn authenticate(
    pool: &sqlx::SqlitePool,
    username: &str,
    password: &str,
) -> Result<Option<User>, AdminError> {
    let user = match crate::db::users::get_active_by_username(pool, username).await? {
        Some(user) => user,
        None => return Ok(None),
    };

    if crate::auth::password::verify_password(password, &user.password_hash)? {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

fn extract_bearer_token(request: &Request) -> Result<String, Response> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                "Missing Authorization header".to_string(),
            )
                .into_response()
        })?;

    auth_header
        .strip_prefix("Bearer ")
        .map(|t| t.to_string())
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                "Invalid Authorization header format. Expected 'Bearer <token>'".to_string(),
            )
                .into_response()
        })
}

/// アクセストークン認証ミドルウェア
///
/// Authorizationヘッダーから "Bearer {token}" を抽出してJWT検証を行い、
/// 対象ユーザーが有効（enabled）であることを確認する。
/// リフレッシュトークンはここでは受け付けない。
///
/// # Arguments
/// * `State(state)` - アプリケーション状態（DB・認証設定）
/// * `request` - HTTPリクエスト
/// * `next` - 次のミドルウェア/ハンドラー
///
/// # Returns
/// * `Ok(Response)` - 認証成功、requestにUserを追加
/// * `Err(Response)` - 認証失敗、401 Unauthorized
pub async fn auth_gate_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer_token(&request)?;

    let claims = crate::auth::jwt::verify_token(&token, &state.auth).map_err(|e| {
        tracing::warn!("Token verification failed: {}", e);
        (StatusCode::UNAUTHORIZED, "Invalid token".to_string()).into_response()
    })?;

    if claims.kind != TokenKind::Access {
        return Err((
            StatusCode::UNAUTHORIZED,
            "Access token required".to_string(),
        )
            .into_response());
    }

    // トークン発行後に無効化されたユーザーを弾く
    let user = crate::db::users::get_active_by_username(&state.db_pool, &claims.sub)
        .await
        .map_err(|e| {
            tracing::error!("Failed to look up user for token subject: {}", e);
            (StatusCode::UNAUTHORIZED, "Invalid token".to_string()).into_response()
        })?
        .ok_or_else(|| {
            (StatusCode::UNAUTHORIZED, "User is not active".to_string()).into_response()
        })?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// 管理者ロールを要求するミドルウェア
///
/// auth_gate_middlewareの内側で使う。requestのUser拡張を参照し、
/// 設定された管理ロール（既定: admin, system）以外は403を返す。
pub async fn require_admin_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let user = request.extensions().get::<User>().ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            "Missing authentication".to_string(),
        )
            .into_response()
    })?;

    if !state.auth.admin_roles.contains(&user.role) {
        return Err((
            StatusCode::FORBIDDEN,
            "Admin access required".to_string(),
        )
            .into_response());
    }

    Ok(next.run(request).await)
}
