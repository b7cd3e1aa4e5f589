// JWT生成と検証（jsonwebtoken実装）
//
// アクセストークン（短命、既定15分）とリフレッシュトークン（長命、
// subjectのみを運ぶ）の2種類を`kind`クレームで区別する。

use crate::common::error::AdminError;
use crate::common::types::{Claims, TokenKind};
use crate::config::AuthConfig;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

/// アクセストークンを発行
///
/// 有効期限は `config.access_ttl_minutes`（now + ttl）。
///
/// # Arguments
/// * `subject` - サブジェクト（ユーザー名）
/// * `config` - 認証設定（シークレット・アルゴリズム・TTL）
///
/// # Returns
/// * `Ok(String)` - 署名済みJWT
/// * `Err(AdminError)` - 生成失敗
pub fn issue_access_token(subject: &str, config: &AuthConfig) -> Result<String, AdminError> {
    issue_token(
        subject,
        TokenKind::Access,
        Duration::minutes(config.access_ttl_minutes),
        config,
    )
}

/// リフレッシュトークンを発行
///
/// # Arguments
/// * `subject` - サブジェクト（ユーザー名）
/// * `config` - 認証設定
///
/// # Returns
/// * `Ok(String)` - 署名済みJWT
/// * `Err(AdminError)` - 生成失敗
pub fn issue_refresh_token(subject: &str, config: &AuthConfig) -> Result<String, AdminError> {
    issue_token(
        subject,
        TokenKind::Refresh,
        Duration::days(config.refresh_ttl_days),
        config,
    )
}

fn issue_token(
    subject: &str,
    kind: TokenKind,
    ttl: Duration,
    config: &AuthConfig,
) -> Result<String, AdminError> {
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| AdminError::Jwt("Failed to calculate expiration time".to_string()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: subject.to_string(),
        kind,
        exp: expiration,
    };

    encode(
        &Header::new(config.algorithm),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AdminError::Jwt(format!("Failed to create JWT: {}", e)))
}

/// JWTトークンを検証
///
/// 署名不正・ペイロード不正・期限切れはすべて検証失敗。
///
/// # Arguments
/// * `token` - 検証するJWT
/// * `config` - 認証設定
///
/// # Returns
/// * `Ok(Claims)` - 検証済みクレーム
/// * `Err(AdminError)` - 検証失敗
pub fn verify_token(token: &str, config: &AuthConfig) -> Result<Claims, AdminError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::new(config.algorithm),
    )
    .map(|data| data.claims)
    .map_err(|e| AdminError::Jwt(format!("Failed to verify JWT: {}", e)))
}
