//! Note administration backend
//!
//! ユーザー管理・ノート管理・監査ログを提供する管理サーバー

#![warn(missing_docs)]

/// 共通型定義
pub mod common;

/// REST APIハンドラー
pub mod api;

/// データベースアクセス
pub mod db;

/// 設定管理（環境変数ヘルパー）
pub mod config;

/// 認証・認可機能
pub mod auth;

/// サーバー起動・シャットダウン
pub mod server;

/// アプリケーション状態
#[derive(Clone)]
pub struct AppState {
    /// データベース接続プール
    pub db_pool: sqlx::SqlitePool,
    /// 認証設定（起動後は不変）
    pub auth: config::AuthConfig,
}
