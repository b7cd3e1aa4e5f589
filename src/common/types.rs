// ユーザー・ノート関連のドメイン型定義

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// ユーザーロール
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// ブートストラップ用予約ロール（一覧・検索から除外）
    System,
    /// 管理者
    Admin,
    /// 一般ユーザー
    User,
}

impl UserRole {
    /// DB格納用の文字列表現
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::System => "system",
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }

    /// DB文字列からの復元（未知の値は最小権限のUserにフォールバック）
    pub fn from_db(s: &str) -> UserRole {
        match s {
            "system" => UserRole::System,
            "admin" => UserRole::Admin,
            _ => UserRole::User,
        }
    }

    /// リクエスト文字列のパース
    pub fn parse(s: &str) -> Option<UserRole> {
        match s {
            "system" => Some(UserRole::System),
            "admin" => Some(UserRole::Admin),
            "user" => Some(UserRole::User),
            _ => None,
        }
    }
}

/// ユーザーのライフサイクル状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserState {
    /// 有効（ログイン可能）
    Enabled,
    /// 無効（トークンが有効でも解決されない）
    Disabled,
    /// 削除済み
    Deleted,
}

impl UserState {
    /// DB格納用の文字列表現
    pub fn as_str(&self) -> &'static str {
        match self {
            UserState::Enabled => "enabled",
            UserState::Disabled => "disabled",
            UserState::Deleted => "deleted",
        }
    }

    /// DB文字列からの復元（未知の値はDisabledにフォールバック）
    pub fn from_db(s: &str) -> UserState {
        match s {
            "enabled" => UserState::Enabled,
            "deleted" => UserState::Deleted,
            _ => UserState::Disabled,
        }
    }

    /// リクエスト文字列のパース
    pub fn parse(s: &str) -> Option<UserState> {
        match s {
            "enabled" => Some(UserState::Enabled),
            "disabled" => Some(UserState::Disabled),
            "deleted" => Some(UserState::Deleted),
            _ => None,
        }
    }
}

/// ノートのライフサイクル状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteState {
    /// アクティブ
    Active,
    /// 削除済み（search_activeから除外）
    Deleted,
}

impl NoteState {
    /// DB格納用の文字列表現
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteState::Active => "active",
            NoteState::Deleted => "deleted",
        }
    }

    /// DB文字列からの復元（未知の値はDeletedにフォールバック）
    pub fn from_db(s: &str) -> NoteState {
        match s {
            "active" => NoteState::Active,
            _ => NoteState::Deleted,
        }
    }

    /// リクエスト文字列のパース
    pub fn parse(s: &str) -> Option<NoteState> {
        match s {
            "active" => Some(NoteState::Active),
            "deleted" => Some(NoteState::Deleted),
            _ => None,
        }
    }
}

/// ユーザー操作の監査アクションコード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    /// ログイン（行動ログ）
    LogIn,
    /// ログアウト（行動ログ）
    LogOut,
    /// ユーザー作成
    Create,
    /// ユーザー編集（ロール・氏名）
    Edit,
    /// パスワード変更
    ChangePassword,
    /// ロール変更
    ChangeRole,
    /// 状態変更
    ChangeState,
}

impl UserAction {
    /// ログ行に格納するアクションコード
    pub fn code(&self) -> &'static str {
        match self {
            UserAction::LogIn => "user.login",
            UserAction::LogOut => "user.logout",
            UserAction::Create => "user.create",
            UserAction::Edit => "user.edit",
            UserAction::ChangePassword => "user.pwd-change",
            UserAction::ChangeRole => "user.role-change",
            UserAction::ChangeState => "user.state-change",
        }
    }
}

/// ノート操作の監査アクションコード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteAction {
    /// ノート追加
    Add,
    /// ノート編集
    Edit,
    /// タグ変更
    ChangeTags,
    /// 状態変更
    ChangeState,
}

impl NoteAction {
    /// ログ行に格納するアクションコード
    pub fn code(&self) -> &'static str {
        match self {
            NoteAction::Add => "note.add",
            NoteAction::Edit => "note.edit",
            NoteAction::ChangeTags => "note.tags-change",
            NoteAction::ChangeState => "note.state-change",
        }
    }
}

/// ユーザー
///
/// usernameが自然キーで、作成後は不変。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// ユーザー名（主キー）
    pub username: String,
    /// 氏名
    pub fullname: String,
    /// パスワードハッシュ（bcrypt）
    pub password_hash: String,
    /// ロール
    pub role: UserRole,
    /// 状態
    pub state: UserState,
    /// 作成日時
    pub create_ts: DateTime<Utc>,
    /// 更新日時
    pub update_ts: DateTime<Utc>,
}

/// ノート
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    /// ノートID
    pub id: Uuid,
    /// タイトル
    pub title: String,
    /// 本文
    pub body: String,
    /// タグ一覧
    pub tags: Vec<String>,
    /// 作成ユーザー（usersへの外部キー）
    pub create_user: String,
    /// 状態
    pub state: NoteState,
    /// 作成日時
    pub create_ts: DateTime<Utc>,
    /// 更新日時
    pub update_ts: DateTime<Utc>,
}

/// ユーザー変更履歴の1行（追記専用）
#[derive(Debug, Clone, Serialize)]
pub struct UserLogEntry {
    /// ログID
    pub id: Uuid,
    /// 対象ユーザー名
    pub username: String,
    /// アクションコード
    pub action: String,
    /// 操作を行ったユーザー
    pub action_user: String,
    /// 変更内容のJSON
    pub sup_info: String,
    /// 記録日時
    pub action_ts: DateTime<Utc>,
}

/// ユーザー行動履歴の1行（ログイン・ログアウト等、追記専用）
#[derive(Debug, Clone, Serialize)]
pub struct UserActionLogEntry {
    /// ログID
    pub id: Uuid,
    /// 対象ユーザー名
    pub username: String,
    /// アクションコード
    pub action: String,
    /// 付加情報のJSON
    pub sup_info: Option<String>,
    /// 記録日時
    pub action_ts: DateTime<Utc>,
}

/// ノート変更履歴の1行（追記専用）
#[derive(Debug, Clone, Serialize)]
pub struct NoteLogEntry {
    /// ログID
    pub id: Uuid,
    /// 対象ノートID
    pub note_id: Uuid,
    /// アクションコード
    pub action: String,
    /// 操作を行ったユーザー
    pub action_user: String,
    /// 変更内容のJSON
    pub sup_info: String,
    /// 記録日時
    pub action_ts: DateTime<Utc>,
}

/// トークン種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// アクセストークン（短命）
    Access,
    /// リフレッシュトークン（長命、subjectのみを運ぶ）
    Refresh,
}

/// JWTクレーム
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// サブジェクト（ユーザー名、JWT sub claim）
    pub sub: String,
    /// トークン種別
    pub kind: TokenKind,
    /// 有効期限（Unix timestamp、JWT exp claim）
    pub exp: usize,
}
