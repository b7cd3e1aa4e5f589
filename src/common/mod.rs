// 共通レイヤー

/// 統一エラー型
pub mod error;

/// ドメイン型定義（ユーザー、ノート、監査ログ）
pub mod types;
