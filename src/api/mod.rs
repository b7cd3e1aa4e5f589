//! REST APIハンドラー
//!
//! 認証トークン・ユーザー管理・ノート管理

pub mod error;
pub mod notes;
pub mod token;
pub mod users;

use crate::auth::gate::{auth_gate_middleware, require_admin_middleware};
use crate::AppState;
use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// APIルーターを作成
///
/// 3層構成:
/// - 公開: ログイン・リフレッシュ
/// - 認証ゲート内: ログアウト・ノート
/// - 認証ゲート + 管理者: ユーザー管理
pub fn create_app(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/token", post(token::login))
        .route("/api/token/refresh", post(token::refresh));

    let gated_routes = Router::new()
        .route("/api/logout", post(token::logout))
        .route(
            "/api/notes",
            post(notes::create_note).get(notes::search_active_notes),
        )
        .route("/api/notes/mine", get(notes::search_own_notes))
        .route(
            "/api/notes/:id",
            get(notes::get_note).put(notes::edit_note),
        )
        .route("/api/notes/:id/tags", put(notes::change_tags))
        .route("/api/notes/:id/state", put(notes::change_state))
        .route("/api/notes/:id/logs", get(notes::list_note_logs))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_gate_middleware,
        ));

    let admin_routes = Router::new()
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route("/api/users/active", get(users::list_active_users))
        .route("/api/users/search", get(users::search_users))
        .route("/api/users/search/active", get(users::search_active_users))
        .route(
            "/api/users/:username",
            get(users::get_user).put(users::edit_user),
        )
        .route("/api/users/:username/password", put(users::change_password))
        .route("/api/users/:username/role", put(users::change_role))
        .route("/api/users/:username/state", put(users::change_state))
        .route("/api/users/:username/logs", get(users::list_user_logs))
        .route("/api/users/:username/actions", get(users::list_user_actions))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_admin_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_gate_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(gated_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
