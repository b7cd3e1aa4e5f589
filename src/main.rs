//! Note admin server entry point

use clap::Parser;
use noteadm::config::AuthConfig;
use noteadm::{auth, db, server, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// ノート管理バックエンドサーバー
#[derive(Parser)]
#[command(name = "noteadm", version, about)]
struct Cli {
    /// バインドするホスト
    #[arg(long, env = "NOTEADM_HOST", default_value = "0.0.0.0")]
    host: String,

    /// バインドするポート
    #[arg(long, env = "NOTEADM_PORT", default_value_t = 8080)]
    port: u16,

    /// データベースURL
    #[arg(long, env = "NOTEADM_DATABASE_URL", default_value = "sqlite:noteadm.db")]
    database_url: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Note admin server v{}", env!("CARGO_PKG_VERSION"));

    let db_pool = db::migrations::initialize_database(&cli.database_url)
        .await
        .expect("Failed to initialize database");

    // 初回起動時はsystemユーザーと管理者を作成
    auth::bootstrap::ensure_bootstrap_accounts(&db_pool)
        .await
        .expect("Failed to create bootstrap accounts");

    let auth_config = AuthConfig::from_env();

    let state = AppState {
        db_pool,
        auth: auth_config,
    };

    let bind_addr = format!("{}:{}", cli.host, cli.port);
    server::run(state, &bind_addr).await;
}
