// ユーザーCRUD操作
//
// すべての変更操作は「必要ならlookup → フィールド更新 → 監査ログ →
// commit」という同じ手順を踏む。change_* 系は対象をre-fetchし、
// 存在しなければ監査ログを書かずにNotFoundで短絡する。
// acting_user が None のときはブートストラップ呼び出しとみなし、
// 監査ログを抑止する。

use crate::common::error::AdminError;
use crate::common::types::{User, UserAction, UserRole, UserState};
use crate::db::audit;
use chrono::Utc;
use sqlx::SqlitePool;

/// ユーザーを作成
///
/// # Arguments
/// * `pool` - データベース接続プール
/// * `username` - ユーザー名（作成後は不変）
/// * `password_hash` - bcryptハッシュ化されたパスワード
/// * `role` - ユーザーロール
/// * `fullname` - 氏名
/// * `action_user` - 操作ユーザー（Noneならブートストラップ、監査ログなし）
///
/// # Returns
/// * `Ok(String)` - 作成されたユーザー名
/// * `Err(AdminError)` - 作成失敗（ユーザー名重複はConflict）
pub async fn add(
    pool: &SqlitePool,
    username: &str,
    password_hash: &str,
    role: UserRole,
    fullname: &str,
    action_user: Option<&str>,
) -> Result<String, AdminError> {
    let now = Utc::now().to_rfc3339();

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AdminError::Database(format!("Failed to begin transaction: {}", e)))?;

    sqlx::query(
        "INSERT INTO users (username, fullname, password_hash, role, state, create_ts, update_ts)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(username)
    .bind(fullname)
    .bind(password_hash)
    .bind(role.as_str())
    .bind(UserState::Enabled.as_str())
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            AdminError::Conflict(format!("Username '{}' already exists", username))
        } else {
            AdminError::Database(format!("Failed to create user: {}", e))
        }
    })?;

    if let Some(actor) = action_user {
        audit::record_user_log(
            &mut tx,
            username,
            UserAction::Create,
            actor,
            &[
                ("username", username.to_string()),
                ("role", role.as_str().to_string()),
                ("fullname", fullname.to_string()),
            ],
        )
        .await?;
    }

    tx.commit()
        .await
        .map_err(|e| AdminError::Database(format!("Failed to commit: {}", e)))?;

    Ok(username.to_string())
}

/// ユーザーを編集（ロール・氏名のみ、usernameは不変）
///
/// # Returns
/// * `Ok(String)` - 更新されたユーザー名
/// * `Err(AdminError)` - 対象不在はNotFound（監査ログなし）
pub async fn edit(
    pool: &SqlitePool,
    username: &str,
    role: UserRole,
    fullname: &str,
    action_user: &str,
) -> Result<String, AdminError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AdminError::Database(format!("Failed to begin transaction: {}", e)))?;

    let result = sqlx::query(
        "UPDATE users SET role = ?, fullname = ?, update_ts = ? WHERE username = ?",
    )
    .bind(role.as_str())
    .bind(fullname)
    .bind(Utc::now().to_rfc3339())
    .bind(username)
    .execute(&mut *tx)
    .await
    .map_err(|e| AdminError::Database(format!("Failed to update user: {}", e)))?;

    if result.rows_affected() == 0 {
        // 監査ログを積む前なのでdropによるrollbackで何も残らない
        return Err(AdminError::NotFound(format!("User not found: {}", username)));
    }

    audit::record_user_log(
        &mut tx,
        username,
        UserAction::Edit,
        action_user,
        &[
            ("username", username.to_string()),
            ("role", role.as_str().to_string()),
            ("fullname", fullname.to_string()),
        ],
    )
    .await?;

    tx.commit()
        .await
        .map_err(|e| AdminError::Database(format!("Failed to commit: {}", e)))?;

    Ok(username.to_string())
}

/// パスワードを変更
///
/// 対象をre-fetchし、存在しなければ監査ログを書かずNotFoundで短絡する。
pub async fn change_password(
    pool: &SqlitePool,
    username: &str,
    password_hash: &str,
    action_user: Option<&str>,
) -> Result<String, AdminError> {
    fetch_required(pool, username).await?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AdminError::Database(format!("Failed to begin transaction: {}", e)))?;

    sqlx::query("UPDATE users SET password_hash = ?, update_ts = ? WHERE username = ?")
        .bind(password_hash)
        .bind(Utc::now().to_rfc3339())
        .bind(username)
        .execute(&mut *tx)
        .await
        .map_err(|e| AdminError::Database(format!("Failed to change password: {}", e)))?;

    if let Some(actor) = action_user {
        audit::record_user_log(
            &mut tx,
            username,
            UserAction::ChangePassword,
            actor,
            &[("username", username.to_string())],
        )
        .await?;
    }

    tx.commit()
        .await
        .map_err(|e| AdminError::Database(format!("Failed to commit: {}", e)))?;

    Ok(username.to_string())
}

/// ロールを変更
pub async fn change_role(
    pool: &SqlitePool,
    username: &str,
    role: UserRole,
    action_user: &str,
) -> Result<String, AdminError> {
    fetch_required(pool, username).await?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AdminError::Database(format!("Failed to begin transaction: {}", e)))?;

    sqlx::query("UPDATE users SET role = ?, update_ts = ? WHERE username = ?")
        .bind(role.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(username)
        .execute(&mut *tx)
        .await
        .map_err(|e| AdminError::Database(format!("Failed to change role: {}", e)))?;

    audit::record_user_log(
        &mut tx,
        username,
        UserAction::ChangeRole,
        action_user,
        &[
            ("username", username.to_string()),
            ("role", role.as_str().to_string()),
        ],
    )
    .await?;

    tx.commit()
        .await
        .map_err(|e| AdminError::Database(format!("Failed to commit: {}", e)))?;

    Ok(username.to_string())
}

/// 状態を変更（有効化・無効化・削除）
pub async fn change_state(
    pool: &SqlitePool,
    username: &str,
    state: UserState,
    action_user: Option<&str>,
) -> Result<String, AdminError> {
    fetch_required(pool, username).await?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AdminError::Database(format!("Failed to begin transaction: {}", e)))?;

    sqlx::query("UPDATE users SET state = ?, update_ts = ? WHERE username = ?")
        .bind(state.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(username)
        .execute(&mut *tx)
        .await
        .map_err(|e| AdminError::Database(format!("Failed to change state: {}", e)))?;

    if let Some(actor) = action_user {
        audit::record_user_log(
            &mut tx,
            username,
            UserAction::ChangeState,
            actor,
            &[
                ("username", username.to_string()),
                ("state", state.as_str().to_string()),
            ],
        )
        .await?;
    }

    tx.commit()
        .await
        .map_err(|e| AdminError::Database(format!("Failed to commit: {}", e)))?;

    Ok(username.to_string())
}

/// ユーザー名でユーザーを検索
///
/// # Returns
/// * `Ok(Some(User))` - ユーザーが見つかった
/// * `Ok(None)` - ユーザーが見つからなかった
/// * `Err(AdminError)` - 検索失敗
pub async fn get_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, AdminError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT username, fullname, password_hash, role, state, create_ts, update_ts
         FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await
    .map_err(|e| AdminError::Database(format!("Failed to find user: {}", e)))?;

    Ok(row.map(|r| r.into_user()))
}

/// 有効（enabled）なユーザーのみを解決する
///
/// 無効・削除済みアカウントはトークンが有効でも解決されない。
pub async fn get_active_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, AdminError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT username, fullname, password_hash, role, state, create_ts, update_ts
         FROM users WHERE username = ? AND state = 'enabled'",
    )
    .bind(username)
    .fetch_optional(pool)
    .await
    .map_err(|e| AdminError::Database(format!("Failed to find active user: {}", e)))?;

    Ok(row.map(|r| r.into_user()))
}

/// ユーザー一覧（systemロールを除く、ユーザー名順）
pub async fn list(pool: &SqlitePool) -> Result<Vec<User>, AdminError> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT username, fullname, password_hash, role, state, create_ts, update_ts
         FROM users WHERE role != 'system' ORDER BY username",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| AdminError::Database(format!("Failed to list users: {}", e)))?;

    Ok(rows.into_iter().map(|r| r.into_user()).collect())
}

/// 有効ユーザー一覧（systemロールを除く、ユーザー名順）
pub async fn list_active(pool: &SqlitePool) -> Result<Vec<User>, AdminError> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT username, fullname, password_hash, role, state, create_ts, update_ts
         FROM users WHERE role != 'system' AND state = 'enabled' ORDER BY username",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| AdminError::Database(format!("Failed to list active users: {}", e)))?;

    Ok(rows.into_iter().map(|r| r.into_user()).collect())
}

/// ユーザー名の部分一致検索（大文字小文字を区別しない、systemを除く）
///
/// ロールフィルタと並び順はSQL側、テキスト照合はRust側で行う
/// （SQLiteのlower()はASCIIのみのため、非ASCII名も一様に照合する）。
pub async fn search(pool: &SqlitePool, search_text: &str) -> Result<Vec<User>, AdminError> {
    let users = list(pool).await?;
    Ok(filter_by_text(users, search_text, false))
}

/// username+fullname連結に対する部分一致検索（deleted状態を除く）
pub async fn search_active(pool: &SqlitePool, search_text: &str) -> Result<Vec<User>, AdminError> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT username, fullname, password_hash, role, state, create_ts, update_ts
         FROM users
         WHERE role != 'system' AND state != 'deleted'
         ORDER BY username",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| AdminError::Database(format!("Failed to search active users: {}", e)))?;

    let users = rows.into_iter().map(|r| r.into_user()).collect();
    Ok(filter_by_text(users, search_text, true))
}

fn filter_by_text(users: Vec<User>, search_text: &str, match_fullname: bool) -> Vec<User> {
    if search_text.is_empty() {
        return users;
    }
    let needle = search_text.to_lowercase();
    users
        .into_iter()
        .filter(|user| {
            let haystack = if match_fullname {
                format!("{} {}", user.username, user.fullname)
            } else {
                user.username.clone()
            }
            .to_lowercase();
            haystack.contains(&needle)
        })
        .collect()
}

/// 初回起動チェック（ユーザーが0人かどうか）
pub async fn is_first_boot(pool: &SqlitePool) -> Result<bool, AdminError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .map_err(|e| AdminError::Database(format!("Failed to check first boot: {}", e)))?;

    Ok(count == 0)
}

/// change_* 系共通のlookup（不在ならNotFoundで短絡、監査ログなし）
async fn fetch_required(pool: &SqlitePool, username: &str) -> Result<User, AdminError> {
    get_by_username(pool, username)
        .await?
        .ok_or_else(|| AdminError::NotFound(format!("User not found: {}", username)))
}

// SQLiteからの行取得用の内部型
#[derive(sqlx::FromRow)]
struct UserRow {
    username: String,
    fullname: String,
    password_hash: String,
    role: String,
    state: String,
    create_ts: String,
    update_ts: String,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            username: self.username,
            fullname: self.fullname,
            password_hash: self.password_hash,
            role: UserRole::from_db(&self.role),
            state: UserState::from_db(&self.state),
            create_ts: crate::db::audit::parse_ts(&self.create_ts),
            update_ts: crate::db::audit::parse_ts(&self.update_ts),
        }
    }
}
