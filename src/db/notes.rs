// ノートCRUD操作
//
// 変更操作はユーザー側と同じ手順（lookup → 更新 → 監査ログ → commit）。
// タグはJSON配列のテキストとして格納する。

use crate::common::error::AdminError;
use crate::common::types::{Note, NoteAction, NoteState};
use crate::db::audit;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

/// ノートを追加
///
/// # Arguments
/// * `pool` - データベース接続プール
/// * `title` - タイトル
/// * `body` - 本文
/// * `tags` - タグ一覧
/// * `create_user` - 作成ユーザー（操作ユーザーを兼ねる）
///
/// # Returns
/// * `Ok(Uuid)` - 採番されたノートID
/// * `Err(AdminError)` - 作成失敗
pub async fn add(
    pool: &SqlitePool,
    title: &str,
    body: &str,
    tags: &[String],
    create_user: &str,
) -> Result<Uuid, AdminError> {
    let id = Uuid::new_v4();
    let now = Utc::now().to_rfc3339();
    let tags_json = serde_json::to_string(tags)
        .map_err(|e| AdminError::Internal(format!("Failed to serialize tags: {}", e)))?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AdminError::Database(format!("Failed to begin transaction: {}", e)))?;

    sqlx::query(
        "INSERT INTO notes (id, title, body, tags, create_user, state, create_ts, update_ts)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(title)
    .bind(body)
    .bind(&tags_json)
    .bind(create_user)
    .bind(NoteState::Active.as_str())
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await
    .map_err(|e| AdminError::Database(format!("Failed to create note: {}", e)))?;

    audit::record_note_log(
        &mut tx,
        id,
        NoteAction::Add,
        create_user,
        &[
            ("title", title.to_string()),
            ("body", body.to_string()),
            ("tags", tags.join(",")),
            ("create_user", create_user.to_string()),
        ],
    )
    .await?;

    tx.commit()
        .await
        .map_err(|e| AdminError::Database(format!("Failed to commit: {}", e)))?;

    Ok(id)
}

/// ノートを編集（タイトル・本文・タグ）
///
/// # Returns
/// * `Ok(Uuid)` - 更新されたノートID
/// * `Err(AdminError)` - 対象不在はNotFound（監査ログなし）
pub async fn edit(
    pool: &SqlitePool,
    id: Uuid,
    title: &str,
    body: &str,
    tags: &[String],
    action_user: &str,
) -> Result<Uuid, AdminError> {
    let tags_json = serde_json::to_string(tags)
        .map_err(|e| AdminError::Internal(format!("Failed to serialize tags: {}", e)))?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AdminError::Database(format!("Failed to begin transaction: {}", e)))?;

    let result = sqlx::query(
        "UPDATE notes SET title = ?, body = ?, tags = ?, update_ts = ? WHERE id = ?",
    )
    .bind(title)
    .bind(body)
    .bind(&tags_json)
    .bind(Utc::now().to_rfc3339())
    .bind(id.to_string())
    .execute(&mut *tx)
    .await
    .map_err(|e| AdminError::Database(format!("Failed to update note: {}", e)))?;

    if result.rows_affected() == 0 {
        return Err(AdminError::NotFound(format!("Note not found: {}", id)));
    }

    audit::record_note_log(
        &mut tx,
        id,
        NoteAction::Edit,
        action_user,
        &[
            ("title", title.to_string()),
            ("body", body.to_string()),
            ("tags", tags.join(",")),
        ],
    )
    .await?;

    tx.commit()
        .await
        .map_err(|e| AdminError::Database(format!("Failed to commit: {}", e)))?;

    Ok(id)
}

/// タグのみを変更
pub async fn change_tags(
    pool: &SqlitePool,
    id: Uuid,
    tags: &[String],
    action_user: &str,
) -> Result<Uuid, AdminError> {
    fetch_required(pool, id).await?;

    let tags_json = serde_json::to_string(tags)
        .map_err(|e| AdminError::Internal(format!("Failed to serialize tags: {}", e)))?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AdminError::Database(format!("Failed to begin transaction: {}", e)))?;

    sqlx::query("UPDATE notes SET tags = ?, update_ts = ? WHERE id = ?")
        .bind(&tags_json)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| AdminError::Database(format!("Failed to change tags: {}", e)))?;

    audit::record_note_log(
        &mut tx,
        id,
        NoteAction::ChangeTags,
        action_user,
        &[("tags", tags.join(","))],
    )
    .await?;

    tx.commit()
        .await
        .map_err(|e| AdminError::Database(format!("Failed to commit: {}", e)))?;

    Ok(id)
}

/// 状態を変更（アクティブ・削除）
///
/// 対象をre-fetchし、存在しなければ監査ログを書かずNotFoundで短絡する。
pub async fn change_state(
    pool: &SqlitePool,
    id: Uuid,
    state: NoteState,
    action_user: &str,
) -> Result<Uuid, AdminError> {
    fetch_required(pool, id).await?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AdminError::Database(format!("Failed to begin transaction: {}", e)))?;

    sqlx::query("UPDATE notes SET state = ?, update_ts = ? WHERE id = ?")
        .bind(state.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| AdminError::Database(format!("Failed to change note state: {}", e)))?;

    audit::record_note_log(
        &mut tx,
        id,
        NoteAction::ChangeState,
        action_user,
        &[("state", state.as_str().to_string())],
    )
    .await?;

    tx.commit()
        .await
        .map_err(|e| AdminError::Database(format!("Failed to commit: {}", e)))?;

    Ok(id)
}

/// IDでノートを検索
pub async fn get_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Note>, AdminError> {
    let row = sqlx::query_as::<_, NoteRow>(
        "SELECT id, title, body, tags, create_user, state, create_ts, update_ts
         FROM notes WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await
    .map_err(|e| AdminError::Database(format!("Failed to find note: {}", e)))?;

    Ok(row.map(|r| r.into_note()))
}

/// アクティブなノートの部分一致検索（作成日時の新しい順）
///
/// 照合対象は「タイトル + タグ(カンマ結合) + 作成日(DD.MM.YYYY)」の連結。
/// 状態フィルタと並び順はSQL側、テキスト照合はRust側で行う
/// （SQLiteのRFC3339日付パースに依存しないため）。
pub async fn search_active(pool: &SqlitePool, search_text: &str) -> Result<Vec<Note>, AdminError> {
    let rows = fetch_active_ordered(pool, None).await?;
    Ok(filter_by_text(rows, search_text))
}

/// 特定ユーザーのアクティブなノートの部分一致検索
pub async fn search_active_by_user(
    pool: &SqlitePool,
    username: &str,
    search_text: &str,
) -> Result<Vec<Note>, AdminError> {
    let rows = fetch_active_ordered(pool, Some(username)).await?;
    Ok(filter_by_text(rows, search_text))
}

async fn fetch_active_ordered(
    pool: &SqlitePool,
    create_user: Option<&str>,
) -> Result<Vec<Note>, AdminError> {
    let rows = match create_user {
        Some(username) => {
            sqlx::query_as::<_, NoteRow>(
                "SELECT id, title, body, tags, create_user, state, create_ts, update_ts
                 FROM notes WHERE state = 'active' AND create_user = ?
                 ORDER BY create_ts DESC",
            )
            .bind(username)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, NoteRow>(
                "SELECT id, title, body, tags, create_user, state, create_ts, update_ts
                 FROM notes WHERE state = 'active'
                 ORDER BY create_ts DESC",
            )
            .fetch_all(pool)
            .await
        }
    }
    .map_err(|e| AdminError::Database(format!("Failed to search notes: {}", e)))?;

    Ok(rows.into_iter().map(|r| r.into_note()).collect())
}

fn filter_by_text(notes: Vec<Note>, search_text: &str) -> Vec<Note> {
    if search_text.is_empty() {
        return notes;
    }
    let needle = search_text.to_lowercase();
    notes
        .into_iter()
        .filter(|note| {
            let haystack = format!(
                "{} {} {}",
                note.title,
                note.tags.join(","),
                note.create_ts.format("%d.%m.%Y")
            )
            .to_lowercase();
            haystack.contains(&needle)
        })
        .collect()
}

/// change_* 系共通のlookup（不在ならNotFoundで短絡、監査ログなし）
async fn fetch_required(pool: &SqlitePool, id: Uuid) -> Result<Note, AdminError> {
    get_by_id(pool, id)
        .await?
        .ok_or_else(|| AdminError::NotFound(format!("Note not found: {}", id)))
}

// SQLiteからの行取得用の内部型
#[derive(sqlx::FromRow)]
struct NoteRow {
    id: String,
    title: String,
    body: String,
    tags: String,
    create_user: String,
    state: String,
    create_ts: String,
    update_ts: String,
}

impl NoteRow {
    fn into_note(self) -> Note {
        Note {
            id: Uuid::parse_str(&self.id).unwrap(),
            title: self.title,
            body: self.body,
            tags: serde_json::from_str(&self.tags).unwrap_or_default(),
            create_user: self.create_user,
            state: NoteState::from_db(&self.state),
            create_ts: crate::db::audit::parse_ts(&self.create_ts),
            update_ts: crate::db::audit::parse_ts(&self.update_ts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::UserRole;
    use crate::db::audit::list_note_logs;
    use crate::db::test_utils::{seed_user, test_db_pool};

    async fn pool_with_alice() -> SqlitePool {
        let pool = test_db_pool().await;
        seed_user(&pool, "alice", UserRole::User).await;
        pool
    }

    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn add_and_get_note() {
        let pool = pool_with_alice().await;

        let id = add(&pool, "T", "body text", &tags(&["x", "y"]), "alice")
            .await
            .unwrap();

        let note = get_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(note.title, "T");
        assert_eq!(note.body, "body text");
        assert_eq!(note.tags, vec!["x", "y"]);
        assert_eq!(note.create_user, "alice");
        assert_eq!(note.state, NoteState::Active);

        let logs = list_note_logs(&pool, id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, "note.add");
    }

    #[tokio::test]
    async fn edit_updates_all_fields() {
        let pool = pool_with_alice().await;
        let id = add(&pool, "T", "b", &tags(&["x"]), "alice").await.unwrap();

        edit(&pool, id, "T2", "b2", &tags(&["y", "z"]), "alice")
            .await
            .unwrap();

        let note = get_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(note.title, "T2");
        assert_eq!(note.body, "b2");
        assert_eq!(note.tags, vec!["y", "z"]);

        let logs = list_note_logs(&pool, id).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[1].action, "note.edit");
    }

    #[tokio::test]
    async fn change_on_missing_note_is_not_found_without_log() {
        let pool = pool_with_alice().await;
        let ghost = Uuid::new_v4();

        assert!(matches!(
            change_state(&pool, ghost, NoteState::Deleted, "alice").await,
            Err(AdminError::NotFound(_))
        ));
        assert!(matches!(
            change_tags(&pool, ghost, &tags(&["x"]), "alice").await,
            Err(AdminError::NotFound(_))
        ));
        assert!(matches!(
            edit(&pool, ghost, "T", "b", &[], "alice").await,
            Err(AdminError::NotFound(_))
        ));

        let logs = list_note_logs(&pool, ghost).await.unwrap();
        assert!(logs.is_empty());
    }

    #[tokio::test]
    async fn search_active_matches_title_and_excludes_deleted() {
        let pool = pool_with_alice().await;

        let id = add(&pool, "T", "b", &tags(&["x", "y"]), "alice").await.unwrap();

        let found = search_active(&pool, "T").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);

        change_state(&pool, id, NoteState::Deleted, "alice").await.unwrap();

        let found = search_active(&pool, "T").await.unwrap();
        assert!(found.is_empty());

        let logs = list_note_logs(&pool, id).await.unwrap();
        let state_changes: Vec<_> = logs
            .iter()
            .filter(|l| l.action == "note.state-change")
            .collect();
        assert_eq!(state_changes.len(), 1);
    }

    #[tokio::test]
    async fn search_matches_tags_and_date_case_insensitive() {
        let pool = pool_with_alice().await;

        add(&pool, "Shopping", "b", &tags(&["Groceries", "weekend"]), "alice")
            .await
            .unwrap();
        add(&pool, "Work", "b", &tags(&["office"]), "alice").await.unwrap();

        let found = search_active(&pool, "groceries").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Shopping");

        // 作成日 DD.MM.YYYY でもヒットする
        let today = Utc::now().format("%d.%m.%Y").to_string();
        let found = search_active(&pool, &today).await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn search_active_orders_newest_first() {
        let pool = pool_with_alice().await;

        let first = add(&pool, "old note", "b", &[], "alice").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = add(&pool, "new note", "b", &[], "alice").await.unwrap();

        let found = search_active(&pool, "note").await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, second);
        assert_eq!(found[1].id, first);
    }

    #[tokio::test]
    async fn search_active_by_user_filters_owner() {
        let pool = pool_with_alice().await;
        seed_user(&pool, "bob", UserRole::User).await;

        add(&pool, "alice note", "b", &[], "alice").await.unwrap();
        add(&pool, "bob note", "b", &[], "bob").await.unwrap();

        let found = search_active_by_user(&pool, "alice", "note").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].create_user, "alice");

        let all = search_active(&pool, "note").await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn empty_search_text_returns_all_active() {
        let pool = pool_with_alice().await;
        add(&pool, "A", "b", &[], "alice").await.unwrap();
        add(&pool, "B", "b", &[], "alice").await.unwrap();

        let found = search_active(&pool, "").await.unwrap();
        assert_eq!(found.len(), 2);
    }
}
