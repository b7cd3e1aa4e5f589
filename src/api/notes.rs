//! ノート管理API
//!
//! 認証ゲートの内側。ノートのCRUDと監査ログ参照。

use crate::common::error::AdminError;
use crate::common::types::{Note, NoteState, User};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::AppError;

/// ノート作成リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    /// タイトル
    pub title: String,
    /// 本文
    #[serde(default)]
    pub body: String,
    /// タグ一覧
    #[serde(default)]
    pub tags: Vec<String>,
}

/// ノート編集リクエスト（タイトル・本文・タグ）
#[derive(Debug, Deserialize)]
pub struct EditNoteRequest {
    /// タイトル
    pub title: String,
    /// 本文
    #[serde(default)]
    pub body: String,
    /// タグ一覧
    #[serde(default)]
    pub tags: Vec<String>,
}

/// タグ変更リクエスト
#[derive(Debug, Deserialize)]
pub struct ChangeTagsRequest {
    /// 新しいタグ一覧（全置換）
    pub tags: Vec<String>,
}

/// 状態変更リクエスト
#[derive(Debug, Deserialize)]
pub struct ChangeNoteStateRequest {
    /// 新しい状態
    pub state: NoteState,
}

/// 検索クエリ
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// 検索文字列（タイトル・タグ・作成日 DD.MM.YYYY への部分一致）
    #[serde(default)]
    pub q: String,
}

/// ノートレスポンス
#[derive(Debug, Serialize)]
pub struct NoteResponse {
    /// ノートID
    pub id: Uuid,
    /// タイトル
    pub title: String,
    /// 本文
    pub body: String,
    /// タグ一覧
    pub tags: Vec<String>,
    /// 作成ユーザー
    pub create_user: String,
    /// 状態
    pub state: String,
    /// 作成日時
    pub create_ts: String,
    /// 更新日時
    pub update_ts: String,
}

/// ノート一覧レスポンス
#[derive(Debug, Serialize)]
pub struct ListNotesResponse {
    /// ノート一覧
    pub notes: Vec<NoteResponse>,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        NoteResponse {
            id: note.id,
            title: note.title,
            body: note.body,
            tags: note.tags,
            create_user: note.create_user,
            state: note.state.as_str().to_string(),
            create_ts: note.create_ts.to_rfc3339(),
            update_ts: note.update_ts.to_rfc3339(),
        }
    }
}

/// POST /api/notes - ノート作成
///
/// 作成ユーザーは認証済みユーザー。
///
/// # Returns
/// * `201 Created` - 作成されたノート
/// * `422 Unprocessable Entity` - タイトルが空
pub async fn create_note(
    Extension(actor): Extension<User>,
    State(state): State<AppState>,
    Json(request): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<NoteResponse>), AppError> {
    if request.title.trim().is_empty() {
        return Err(AppError(AdminError::Validation(
            "Title must not be empty".to_string(),
        )));
    }

    let id = crate::db::notes::add(
        &state.db_pool,
        &request.title,
        &request.body,
        &request.tags,
        &actor.username,
    )
    .await?;

    let note = fetch_note(&state, id).await?;
    tracing::info!("Note created: id={} by={}", id, actor.username);
    Ok((StatusCode::CREATED, Json(NoteResponse::from(note))))
}

/// PUT /api/notes/:id - ノート編集（タイトル・本文・タグ）
pub async fn edit_note(
    Extension(actor): Extension<User>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<EditNoteRequest>,
) -> Result<Json<NoteResponse>, AppError> {
    crate::db::notes::edit(
        &state.db_pool,
        id,
        &request.title,
        &request.body,
        &request.tags,
        &actor.username,
    )
    .await?;

    let note = fetch_note(&state, id).await?;
    Ok(Json(NoteResponse::from(note)))
}

/// PUT /api/notes/:id/tags - タグ変更（全置換）
pub async fn change_tags(
    Extension(actor): Extension<User>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChangeTagsRequest>,
) -> Result<Json<NoteResponse>, AppError> {
    crate::db::notes::change_tags(&state.db_pool, id, &request.tags, &actor.username).await?;

    let note = fetch_note(&state, id).await?;
    Ok(Json(NoteResponse::from(note)))
}

/// PUT /api/notes/:id/state - 状態変更（アクティブ・削除）
pub async fn change_state(
    Extension(actor): Extension<User>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChangeNoteStateRequest>,
) -> Result<StatusCode, AppError> {
    crate::db::notes::change_state(&state.db_pool, id, request.state, &actor.username).await?;

    tracing::info!(
        "Note state changed: id={} state={} by={}",
        id,
        request.state.as_str(),
        actor.username
    );
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/notes/:id - ノート取得
pub async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<NoteResponse>, AppError> {
    let note = fetch_note(&state, id).await?;
    Ok(Json(NoteResponse::from(note)))
}

/// GET /api/notes?q= - アクティブなノートの部分一致検索
pub async fn search_active_notes(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ListNotesResponse>, AppError> {
    let notes = crate::db::notes::search_active(&state.db_pool, &query.q).await?;
    Ok(Json(ListNotesResponse {
        notes: notes.into_iter().map(NoteResponse::from).collect(),
    }))
}

/// GET /api/notes/mine?q= - 自分が作成したアクティブなノートの検索
pub async fn search_own_notes(
    Extension(actor): Extension<User>,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ListNotesResponse>, AppError> {
    let notes =
        crate::db::notes::search_active_by_user(&state.db_pool, &actor.username, &query.q).await?;
    Ok(Json(ListNotesResponse {
        notes: notes.into_iter().map(NoteResponse::from).collect(),
    }))
}

/// GET /api/notes/:id/logs - ノートの変更ログ一覧（時系列昇順）
pub async fn list_note_logs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let logs = crate::db::audit::list_note_logs(&state.db_pool, id).await?;
    Ok(Json(serde_json::json!({ "logs": logs })))
}

async fn fetch_note(state: &AppState, id: Uuid) -> Result<Note, AdminError> {
    crate::db::notes::get_by_id(&state.db_pool, id)
        .await?
        .ok_or_else(|| AdminError::NotFound(format!("Note not found: {}", id)))
}
