// 認証モジュール

/// パスワードハッシュ化・検証（bcrypt）
pub mod password;

/// JWT生成・検証（jsonwebtoken）
pub mod jwt;

/// アクセスゲート（bearerトークン解決・ロール認可）
pub mod gate;

/// 初回起動時のsystem/adminアカウント作成
pub mod bootstrap;

/// ランダムトークン生成
pub fn generate_random_token(length: usize) -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_token_has_requested_length() {
        assert_eq!(generate_random_token(32).len(), 32);
        assert_eq!(generate_random_token(0).len(), 0);
    }

    #[test]
    fn random_tokens_differ() {
        assert_ne!(generate_random_token(32), generate_random_token(32));
    }
}
