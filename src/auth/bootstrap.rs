//! 初回起動時のアカウント作成
//!
//! 環境変数からsystemユーザーと管理者を作成

use crate::auth::password::hash_password;
use crate::common::error::AdminError;
use crate::common::types::UserRole;
use crate::config::get_env;
use crate::db;

/// 環境変数から管理者を作成
///
/// # Arguments
/// * `pool` - データベース接続プール
///
/// # Environment Variables
/// * `NOTEADM_ADMIN_USERNAME` - 管理者ユーザー名（省略時: "admin"）
/// * `NOTEADM_ADMIN_PASSWORD` - 管理者パスワード（必須）
///
/// # Returns
/// * `Ok(Some(username))` - 管理者作成成功（ユーザー名を返す）
/// * `Ok(None)` - NOTEADM_ADMIN_PASSWORDが未設定（作成しない）
/// * `Err(AdminError)` - 作成失敗
pub async fn create_admin_from_env(pool: &sqlx::SqlitePool) -> Result<Option<String>, AdminError> {
    // NOTEADM_ADMIN_PASSWORDが設定されていなければスキップ
    let password = match get_env("NOTEADM_ADMIN_PASSWORD") {
        Some(p) if !p.is_empty() => p,
        _ => {
            tracing::warn!("NOTEADM_ADMIN_PASSWORD not set, skipping admin creation from env");
            return Ok(None);
        }
    };

    let username = get_env("NOTEADM_ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string());

    let password_hash = hash_password(&password)?;

    // ブートストラップ経路なので操作ユーザーはなし（監査ログを書かない）
    match db::users::add(pool, &username, &password_hash, UserRole::Admin, &username, None).await {
        Ok(username) => {
            tracing::info!("Created admin user from env: username={}", username);
            Ok(Some(username))
        }
        Err(AdminError::Conflict(_)) => {
            tracing::warn!("Admin user {} already exists, skipping creation", username);
            Ok(Some(username))
        }
        Err(e) => {
            tracing::error!("Failed to create admin user from env: {}", e);
            Err(e)
        }
    }
}

/// systemユーザーを作成
///
/// systemユーザーはログイン不可能なパスワード（ランダム値のハッシュ）を持ち、
/// 一覧・検索には現れない。内部処理の操作主体として使う。
async fn create_system_user(pool: &sqlx::SqlitePool) -> Result<(), AdminError> {
    let password_hash = hash_password(&crate::auth::generate_random_token(32))?;

    match db::users::add(pool, "system", &password_hash, UserRole::System, "SYSTEM", None).await {
        Ok(_) => {
            tracing::info!("Created system user");
            Ok(())
        }
        Err(AdminError::Conflict(_)) => {
            tracing::debug!("System user already exists");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// 初回起動時のアカウント作成処理
///
/// 1. データベースにユーザーが存在するかチェック
/// 2. ユーザーが存在しない場合:
///    a. systemユーザーを作成
///    b. 環境変数（NOTEADM_ADMIN_PASSWORD）が設定されていれば管理者を作成
/// 3. ユーザーが既に存在する場合はスキップ
///
/// # Arguments
/// * `pool` - データベース接続プール
///
/// # Returns
/// * `Ok(())` - 処理成功
/// * `Err(AdminError)` - 処理失敗
pub async fn ensure_bootstrap_accounts(pool: &sqlx::SqlitePool) -> Result<(), AdminError> {
    let is_first_boot = db::users::is_first_boot(pool).await?;
    if !is_first_boot {
        tracing::debug!("Users already exist, skipping bootstrap account creation");
        return Ok(());
    }

    tracing::info!("First boot detected, creating bootstrap accounts");

    create_system_user(pool).await?;

    match create_admin_from_env(pool).await? {
        Some(username) => {
            tracing::info!("Admin user created from environment: {}", username);
        }
        None => {
            tracing::warn!(
                "No admin user created; set NOTEADM_ADMIN_PASSWORD and restart to create one"
            );
        }
    }

    Ok(())
}
