//! Configuration management via environment variables
//!
//! All configuration is read once at process start and immutable afterwards.

use crate::common::types::UserRole;
use jsonwebtoken::Algorithm;
use std::str::FromStr;

/// Get an environment variable
///
/// # Arguments
/// * `name` - The environment variable name
///
/// # Returns
/// * `Some(value)` - The environment variable value
/// * `None` - The variable is not set
pub fn get_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value
pub fn get_env_or(name: &str, default: &str) -> String {
    get_env(name).unwrap_or_else(|| default.to_string())
}

/// Get an environment variable, parsing to a specific type
///
/// Returns the default if the variable is not set or parsing fails.
pub fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    get_env(name).and_then(|s| s.parse().ok()).unwrap_or(default)
}

/// Authentication configuration (token signing + role gate)
///
/// Loaded once at startup and shared read-only through `AppState`.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWT signing secret
    pub jwt_secret: String,
    /// JWT signing algorithm
    pub algorithm: Algorithm,
    /// Access token lifetime in minutes
    pub access_ttl_minutes: i64,
    /// Refresh token lifetime in days
    pub refresh_ttl_days: i64,
    /// Roles allowed through the admin gate
    pub admin_roles: Vec<UserRole>,
}

impl AuthConfig {
    /// Load authentication configuration from environment variables.
    ///
    /// # Environment Variables
    /// * `NOTEADM_JWT_SECRET` - token signing secret (random per-process value
    ///   is generated with a warning when unset; sessions then do not survive
    ///   a restart)
    /// * `NOTEADM_JWT_ALGORITHM` - signing algorithm (default: HS256)
    /// * `NOTEADM_ACCESS_TTL_MINUTES` - access token lifetime (default: 15)
    /// * `NOTEADM_REFRESH_TTL_DAYS` - refresh token lifetime (default: 30)
    /// * `NOTEADM_ADMIN_ROLES` - comma-separated admin role set
    ///   (default: "admin,system")
    pub fn from_env() -> Self {
        let jwt_secret = get_env("NOTEADM_JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!(
                "NOTEADM_JWT_SECRET not set, generating a random secret (tokens will not survive a restart)"
            );
            crate::auth::generate_random_token(48)
        });

        let algorithm = match get_env("NOTEADM_JWT_ALGORITHM") {
            Some(raw) => Algorithm::from_str(&raw).unwrap_or_else(|_| {
                tracing::warn!("Unknown JWT algorithm '{}', falling back to HS256", raw);
                Algorithm::HS256
            }),
            None => Algorithm::HS256,
        };

        let access_ttl_minutes = get_env_parse("NOTEADM_ACCESS_TTL_MINUTES", 15i64);
        let refresh_ttl_days = get_env_parse("NOTEADM_REFRESH_TTL_DAYS", 30i64);

        let admin_roles = parse_admin_roles(&get_env_or("NOTEADM_ADMIN_ROLES", "admin,system"));

        Self {
            jwt_secret,
            algorithm,
            access_ttl_minutes,
            refresh_ttl_days,
            admin_roles,
        }
    }

    /// Fixed configuration for tests (no environment access).
    #[cfg(test)]
    pub fn for_tests(secret: &str) -> Self {
        Self {
            jwt_secret: secret.to_string(),
            algorithm: Algorithm::HS256,
            access_ttl_minutes: 15,
            refresh_ttl_days: 30,
            admin_roles: vec![UserRole::Admin, UserRole::System],
        }
    }
}

/// Parse a comma-separated role list, skipping unknown names with a warning.
fn parse_admin_roles(raw: &str) -> Vec<UserRole> {
    let mut roles: Vec<UserRole> = Vec::new();
    for part in raw.split(',') {
        let name = part.trim();
        if name.is_empty() {
            continue;
        }
        match UserRole::parse(name) {
            Some(role) if !roles.contains(&role) => roles.push(role),
            Some(_) => {}
            None => tracing::warn!("Unknown role '{}' in NOTEADM_ADMIN_ROLES, ignoring", name),
        }
    }
    if roles.is_empty() {
        // 空の管理者セットは全管理操作を閉塞するため既定値に戻す
        tracing::warn!("Empty admin role set, falling back to admin,system");
        roles = vec![UserRole::Admin, UserRole::System];
    }
    roles
}
