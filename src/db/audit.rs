// 監査ログ書き込み・参照
//
// record_user_log / record_note_log は呼び出し元のトランザクション接続を
// 受け取り、エンティティ変更と同一トランザクションでログ行を積む。
// 変更がロールバックされればログ行も残らない（原子性）。
// ログ行は追記専用で、UPDATE/DELETEする操作はこの層に存在しない。

use crate::common::error::AdminError;
use crate::common::types::{
    NoteAction, NoteLogEntry, UserAction, UserActionLogEntry, UserLogEntry,
};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

/// フラットなキー・バリュー詳細をJSON文字列にシリアライズ
pub(crate) fn detail_json(fields: &[(&str, String)]) -> String {
    let map: serde_json::Map<String, serde_json::Value> = fields
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.clone())))
        .collect();
    serde_json::Value::Object(map).to_string()
}

/// ユーザー変更ログを現在のトランザクションに積む
///
/// # Arguments
/// * `conn` - 進行中トランザクションの接続
/// * `username` - 対象ユーザー名
/// * `action` - アクションコード
/// * `action_user` - 操作を行ったユーザー
/// * `detail` - 変更内容（文字列キー・文字列値のフラットなマップ）
///
/// # Returns
/// * `Ok(())` - ログ行を積んだ（コミットは呼び出し元の責務）
/// * `Err(AdminError)` - 書き込み失敗
pub async fn record_user_log(
    conn: &mut SqliteConnection,
    username: &str,
    action: UserAction,
    action_user: &str,
    detail: &[(&str, String)],
) -> Result<(), AdminError> {
    sqlx::query(
        "INSERT INTO user_logs (id, username, action, action_user, sup_info, action_ts)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(username)
    .bind(action.code())
    .bind(action_user)
    .bind(detail_json(detail))
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *conn)
    .await
    .map_err(|e| AdminError::Database(format!("Failed to record user log: {}", e)))?;

    Ok(())
}

/// ノート変更ログを現在のトランザクションに積む
pub async fn record_note_log(
    conn: &mut SqliteConnection,
    note_id: Uuid,
    action: NoteAction,
    action_user: &str,
    detail: &[(&str, String)],
) -> Result<(), AdminError> {
    sqlx::query(
        "INSERT INTO note_logs (id, note_id, action, action_user, sup_info, action_ts)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(note_id.to_string())
    .bind(action.code())
    .bind(action_user)
    .bind(detail_json(detail))
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *conn)
    .await
    .map_err(|e| AdminError::Database(format!("Failed to record note log: {}", e)))?;

    Ok(())
}

/// 行動ログ（ログイン・ログアウト等）を記録
///
/// エンティティ変更と結合しないため、独立した短いトランザクションで書く。
///
/// # Arguments
/// * `pool` - データベース接続プール
/// * `username` - 対象ユーザー名
/// * `action` - アクションコード
/// * `detail` - 付加情報（省略可）
pub async fn record_user_action(
    pool: &SqlitePool,
    username: &str,
    action: UserAction,
    detail: Option<&[(&str, String)]>,
) -> Result<(), AdminError> {
    sqlx::query(
        "INSERT INTO user_action_logs (id, username, action, sup_info, action_ts)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(username)
    .bind(action.code())
    .bind(detail.map(detail_json))
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await
    .map_err(|e| AdminError::Database(format!("Failed to record user action: {}", e)))?;

    Ok(())
}

/// ユーザー変更ログの一覧（action_ts昇順）
///
/// # Arguments
/// * `pool` - データベース接続プール
/// * `username` - 対象ユーザー名
pub async fn list_user_logs(
    pool: &SqlitePool,
    username: &str,
) -> Result<Vec<UserLogEntry>, AdminError> {
    let rows = sqlx::query_as::<_, UserLogRow>(
        "SELECT id, username, action, action_user, sup_info, action_ts FROM user_logs
         WHERE username = ? ORDER BY action_ts ASC",
    )
    .bind(username)
    .fetch_all(pool)
    .await
    .map_err(|e| AdminError::Database(format!("Failed to list user logs: {}", e)))?;

    Ok(rows.into_iter().map(|r| r.into_entry()).collect())
}

/// 行動ログの一覧（action_ts昇順）
pub async fn list_user_actions(
    pool: &SqlitePool,
    username: &str,
) -> Result<Vec<UserActionLogEntry>, AdminError> {
    let rows = sqlx::query_as::<_, UserActionLogRow>(
        "SELECT id, username, action, sup_info, action_ts FROM user_action_logs
         WHERE username = ? ORDER BY action_ts ASC",
    )
    .bind(username)
    .fetch_all(pool)
    .await
    .map_err(|e| AdminError::Database(format!("Failed to list user actions: {}", e)))?;

    Ok(rows.into_iter().map(|r| r.into_entry()).collect())
}

/// ノート変更ログの一覧（action_ts昇順）
pub async fn list_note_logs(
    pool: &SqlitePool,
    note_id: Uuid,
) -> Result<Vec<NoteLogEntry>, AdminError> {
    let rows = sqlx::query_as::<_, NoteLogRow>(
        "SELECT id, note_id, action, action_user, sup_info, action_ts FROM note_logs
         WHERE note_id = ? ORDER BY action_ts ASC",
    )
    .bind(note_id.to_string())
    .fetch_all(pool)
    .await
    .map_err(|e| AdminError::Database(format!("Failed to list note logs: {}", e)))?;

    Ok(rows.into_iter().map(|r| r.into_entry()).collect())
}

pub(crate) fn parse_ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .unwrap()
        .with_timezone(&Utc)
}

// SQLiteからの行取得用の内部型
#[derive(sqlx::FromRow)]
struct UserLogRow {
    id: String,
    username: String,
    action: String,
    action_user: String,
    sup_info: String,
    action_ts: String,
}

impl UserLogRow {
    fn into_entry(self) -> UserLogEntry {
        UserLogEntry {
            id: Uuid::parse_str(&self.id).unwrap(),
            username: self.username,
            action: self.action,
            action_user: self.action_user,
            sup_info: self.sup_info,
            action_ts: parse_ts(&self.action_ts),
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserActionLogRow {
    id: String,
    username: String,
    action: String,
    sup_info: Option<String>,
    action_ts: String,
}

impl UserActionLogRow {
    fn into_entry(self) -> UserActionLogEntry {
        UserActionLogEntry {
            id: Uuid::parse_str(&self.id).unwrap(),
            username: self.username,
            action: self.action,
            sup_info: self.sup_info,
            action_ts: parse_ts(&self.action_ts),
        }
    }
}

#[derive(sqlx::FromRow)]
struct NoteLogRow {
    id: String,
    note_id: String,
    action: String,
    action_user: String,
    sup_info: String,
    action_ts: String,
}

impl NoteLogRow {
    fn into_entry(self) -> NoteLogEntry {
        NoteLogEntry {
            id: Uuid::parse_str(&self.id).unwrap(),
            note_id: Uuid::parse_str(&self.note_id).unwrap(),
            action: self.action,
            action_user: self.action_user,
            sup_info: self.sup_info,
            action_ts: parse_ts(&self.action_ts),
        }
    }
}
