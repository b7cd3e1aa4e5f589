//! データベースアクセス層
//!
//! SQLiteベースのデータ永続化。エンティティはこの層を通してのみ
//! 変更される（直接UPDATE禁止）。

/// データベースマイグレーション
pub mod migrations;

/// 監査ログ（エンティティ変更と同一トランザクションの追記）
pub mod audit;

/// ユーザー管理
pub mod users;

/// ノート管理
pub mod notes;
