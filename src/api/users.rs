//! ユーザー管理API
//!
//! Admin専用のユーザーCRUD操作

use crate::common::error::AdminError;
use crate::common::types::{User, UserRole, UserState};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::error::AppError;

/// ユーザー作成リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// ユーザー名
    pub username: String,
    /// 表示名
    pub fullname: String,
    /// 平文パスワード（保存前にハッシュ化される）
    pub password: String,
    /// ロール
    pub role: UserRole,
}

/// ユーザー編集リクエスト（ロール・表示名）
#[derive(Debug, Deserialize)]
pub struct EditUserRequest {
    /// 表示名
    pub fullname: String,
    /// ロール
    pub role: UserRole,
}

/// パスワード変更リクエスト
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    /// 新しい平文パスワード
    pub password: String,
}

/// ロール変更リクエスト
#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    /// 新しいロール
    pub role: UserRole,
}

/// 状態変更リクエスト
#[derive(Debug, Deserialize)]
pub struct ChangeStateRequest {
    /// 新しい状態
    pub state: UserState,
}

/// 検索クエリ
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// 検索文字列（部分一致、大文字小文字を区別しない）
    #[serde(default)]
    pub q: String,
}

/// ユーザーレスポンス（password_hash除外）
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// ユーザー名
    pub username: String,
    /// 表示名
    pub fullname: String,
    /// ロール
    pub role: String,
    /// 状態
    pub state: String,
    /// 作成日時
    pub create_ts: String,
    /// 更新日時
    pub update_ts: String,
}

/// ユーザー一覧レスポンス
#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    /// ユーザー一覧
    pub users: Vec<UserResponse>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            username: user.username,
            fullname: user.fullname,
            role: user.role.as_str().to_string(),
            state: user.state.as_str().to_string(),
            create_ts: user.create_ts.to_rfc3339(),
            update_ts: user.update_ts.to_rfc3339(),
        }
    }
}

// systemロールはブートストラップ専用（APIからは付与不可）
fn reject_reserved_role(role: UserRole) -> Result<(), AdminError> {
    if role == UserRole::System {
        return Err(AdminError::Validation(
            "Role 'system' is reserved".to_string(),
        ));
    }
    Ok(())
}

fn validate_new_user(request: &CreateUserRequest) -> Result<(), AdminError> {
    if request.username.trim().is_empty() {
        return Err(AdminError::Validation("Username must not be empty".to_string()));
    }
    if request.password.is_empty() {
        return Err(AdminError::Validation("Password must not be empty".to_string()));
    }
    reject_reserved_role(request.role)
}

/// GET /api/users - ユーザー一覧取得
///
/// systemロールは含まない。
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<ListUsersResponse>, AppError> {
    let users = crate::db::users::list(&state.db_pool).await?;
    Ok(Json(ListUsersResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
    }))
}

/// GET /api/users/active - 有効ユーザー一覧取得
pub async fn list_active_users(
    State(state): State<AppState>,
) -> Result<Json<ListUsersResponse>, AppError> {
    let users = crate::db::users::list_active(&state.db_pool).await?;
    Ok(Json(ListUsersResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
    }))
}

/// GET /api/users/search?q= - ユーザー名の部分一致検索
pub async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ListUsersResponse>, AppError> {
    let users = crate::db::users::search(&state.db_pool, &query.q).await?;
    Ok(Json(ListUsersResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
    }))
}

/// GET /api/users/search/active?q= - 削除済みを除いた部分一致検索
///
/// ユーザー名と表示名の連結に対して照合する。
pub async fn search_active_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ListUsersResponse>, AppError> {
    let users = crate::db::users::search_active(&state.db_pool, &query.q).await?;
    Ok(Json(ListUsersResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
    }))
}

/// GET /api/users/:username - ユーザー取得
pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let user = crate::db::users::get_by_username(&state.db_pool, &username)
        .await?
        .ok_or_else(|| AdminError::NotFound(format!("User not found: {}", username)))?;
    Ok(Json(UserResponse::from(user)))
}

/// POST /api/users - ユーザー作成
///
/// パスワードはここでハッシュ化され、平文は保存もログもされない。
///
/// # Returns
/// * `201 Created` - 作成されたユーザー
/// * `409 Conflict` - ユーザー名重複
/// * `422 Unprocessable Entity` - 入力不正
pub async fn create_user(
    Extension(actor): Extension<User>,
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    validate_new_user(&request)?;

    let password_hash = crate::auth::password::hash_password(&request.password)?;

    crate::db::users::add(
        &state.db_pool,
        &request.username,
        &password_hash,
        request.role,
        &request.fullname,
        Some(&actor.username),
    )
    .await?;

    let user = crate::db::users::get_by_username(&state.db_pool, &request.username)
        .await?
        .ok_or_else(|| AdminError::Internal("Created user vanished".to_string()))?;

    tracing::info!(
        "User created: username={} by={}",
        user.username,
        actor.username
    );
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// PUT /api/users/:username - ユーザー編集（ロール・表示名）
pub async fn edit_user(
    Extension(actor): Extension<User>,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(request): Json<EditUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    reject_reserved_role(request.role)?;

    crate::db::users::edit(
        &state.db_pool,
        &username,
        request.role,
        &request.fullname,
        &actor.username,
    )
    .await?;

    let user = crate::db::users::get_by_username(&state.db_pool, &username)
        .await?
        .ok_or_else(|| AdminError::NotFound(format!("User not found: {}", username)))?;
    Ok(Json(UserResponse::from(user)))
}

/// PUT /api/users/:username/password - パスワード変更
pub async fn change_password(
    Extension(actor): Extension<User>,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    if request.password.is_empty() {
        return Err(AppError(AdminError::Validation(
            "Password must not be empty".to_string(),
        )));
    }

    let password_hash = crate::auth::password::hash_password(&request.password)?;
    crate::db::users::change_password(
        &state.db_pool,
        &username,
        &password_hash,
        Some(&actor.username),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/users/:username/role - ロール変更
pub async fn change_role(
    Extension(actor): Extension<User>,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(request): Json<ChangeRoleRequest>,
) -> Result<StatusCode, AppError> {
    reject_reserved_role(request.role)?;

    crate::db::users::change_role(&state.db_pool, &username, request.role, &actor.username)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/users/:username/state - 状態変更（有効・無効・削除）
pub async fn change_state(
    Extension(actor): Extension<User>,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(request): Json<ChangeStateRequest>,
) -> Result<StatusCode, AppError> {
    crate::db::users::change_state(
        &state.db_pool,
        &username,
        request.state,
        Some(&actor.username),
    )
    .await?;

    tracing::info!(
        "User state changed: username={} state={} by={}",
        username,
        request.state.as_str(),
        actor.username
    );
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/users/:username/logs - 変更ログ一覧（時系列昇順）
pub async fn list_user_logs(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let logs = crate::db::audit::list_user_logs(&state.db_pool, &username).await?;
    Ok(Json(serde_json::json!({ "logs": logs })))
}

/// GET /api/users/:username/actions - 行動ログ一覧（時系列昇順）
pub async fn list_user_actions(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let actions = crate::db::audit::list_user_actions(&state.db_pool, &username).await?;
    Ok(Json(serde_json::json!({ "actions": actions })))
}
