//! エンドツーエンドシナリオテスト
//!
//! アカウントのライフサイクルとノートのライフサイクルを
//! 公開APIを通して検証する。

use axum::body::Body;
use axum::http::{Request, StatusCode};
use jsonwebtoken::Algorithm;
use noteadm::common::types::{NoteState, UserRole, UserState};
use noteadm::config::AuthConfig;
use noteadm::{api, auth, db, AppState};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower::ServiceExt;

// インメモリDBは接続ごとに独立するため1接続に固定
async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database");
    db::migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "scenario-test-secret".to_string(),
        algorithm: Algorithm::HS256,
        access_ttl_minutes: 15,
        refresh_ttl_days: 30,
        admin_roles: vec![UserRole::Admin, UserRole::System],
    }
}

async fn add_user(pool: &SqlitePool, username: &str, password: &str, role: UserRole) {
    let hash = auth::password::hash_password(password).unwrap();
    db::users::add(pool, username, &hash, role, username, None)
        .await
        .unwrap();
}

/// ユーザーアカウントのライフサイクル:
/// 作成 → ログイン可能 → 無効化 → ログイン不可、状態変更ログはちょうど1行
#[tokio::test]
async fn user_disable_revokes_access_and_logs_once() {
    let pool = test_pool().await;
    add_user(&pool, "admin", "admin-pw", UserRole::Admin).await;

    let hash = auth::password::hash_password("alice-pw").unwrap();
    db::users::add(&pool, "alice", &hash, UserRole::User, "Alice A.", Some("admin"))
        .await
        .unwrap();

    // 有効な間は認証が通る
    let user = auth::gate::authenticate(&pool, "alice", "alice-pw")
        .await
        .unwrap();
    assert!(user.is_some());

    db::users::change_state(&pool, "alice", UserState::Disabled, Some("admin"))
        .await
        .unwrap();

    // 無効化後は同じ資格情報でも認証されない
    let user = auth::gate::authenticate(&pool, "alice", "alice-pw")
        .await
        .unwrap();
    assert!(user.is_none());

    let logs = db::audit::list_user_logs(&pool, "alice").await.unwrap();
    let state_changes: Vec<_> = logs
        .iter()
        .filter(|l| l.action == "user.state-change")
        .collect();
    assert_eq!(state_changes.len(), 1);
    assert_eq!(state_changes[0].action_user, "admin");

    // 作成ログも1行だけ
    let creates: Vec<_> = logs.iter().filter(|l| l.action == "user.create").collect();
    assert_eq!(creates.len(), 1);
}

/// ノートのライフサイクル:
/// 追加 → 検索でヒット → 削除 → 検索から除外、状態変更ログはちょうど1行
#[tokio::test]
async fn note_delete_hides_from_search_and_logs_once() {
    let pool = test_pool().await;
    add_user(&pool, "alice", "alice-pw", UserRole::User).await;

    let tags = vec!["groceries".to_string()];
    let id = db::notes::add(&pool, "Shopping list", "milk, eggs", &tags, "alice")
        .await
        .unwrap();

    let found = db::notes::search_active(&pool, "shopping").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, id);

    db::notes::change_state(&pool, id, NoteState::Deleted, "alice")
        .await
        .unwrap();

    let found = db::notes::search_active(&pool, "shopping").await.unwrap();
    assert!(found.is_empty());

    // 削除されてもIDでは取得できる（データは残る）
    let note = db::notes::get_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(note.state, NoteState::Deleted);

    let logs = db::audit::list_note_logs(&pool, id).await.unwrap();
    let codes: Vec<_> = logs.iter().map(|l| l.action.as_str()).collect();
    assert_eq!(codes, vec!["note.add", "note.state-change"]);
}

/// HTTP経由のフルサイクル:
/// ログイン → ノート作成 → 検索 → 削除 → ログ参照
#[tokio::test]
async fn http_note_lifecycle() {
    let pool = test_pool().await;
    add_user(&pool, "admin", "admin-pw", UserRole::Admin).await;
    let state = AppState {
        db_pool: pool.clone(),
        auth: test_auth_config(),
    };
    let app = api::create_app(state);

    // ログイン
    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/token")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({"username": "admin", "password": "admin-pw"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let login: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let token = login["access_token"].as_str().unwrap().to_string();

    // ノート作成
    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/notes")
                .header("authorization", format!("Bearer {}", token))
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "title": "Weekly report",
                        "body": "Everything on track",
                        "tags": ["work"]
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let note: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let note_id = note["id"].as_str().unwrap().to_string();
    assert_eq!(note["create_user"], "admin");

    // 検索でヒット
    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/notes?q=weekly")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let list: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(list["notes"].as_array().unwrap().len(), 1);

    // 削除（状態変更）
    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/notes/{}/state", note_id))
                .header("authorization", format!("Bearer {}", token))
                .header("content-type", "application/json")
                .body(Body::from(serde_json::json!({"state": "deleted"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    // 検索から消える
    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/notes?q=weekly")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let list: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(list["notes"].as_array().unwrap().is_empty());

    // 監査ログにはaddとstate-changeが時系列順で残る
    let res = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/notes/{}/logs", note_id))
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let logs: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let codes: Vec<_> = logs["logs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["action"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["note.add", "note.state-change"]);
}

/// 管理API経由のユーザー管理:
/// 作成(201) → 重複(409) → 状態変更(204) → 変更ログ参照
#[tokio::test]
async fn http_user_administration() {
    let pool = test_pool().await;
    add_user(&pool, "admin", "admin-pw", UserRole::Admin).await;
    let state = AppState {
        db_pool: pool.clone(),
        auth: test_auth_config(),
    };
    let app = api::create_app(state);

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/token")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({"username": "admin", "password": "admin-pw"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let login: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let token = login["access_token"].as_str().unwrap().to_string();

    let create_body = serde_json::json!({
        "username": "bob",
        "fullname": "Bob B.",
        "password": "bob-pw",
        "role": "user"
    })
    .to_string();

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/users")
                .header("authorization", format!("Bearer {}", token))
                .header("content-type", "application/json")
                .body(Body::from(create_body.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    // systemロールは編集・ロール変更のどちらからも付与できない
    for (method, uri, body) in [
        (
            "PUT",
            "/api/users/bob",
            serde_json::json!({"fullname": "Bob B.", "role": "system"}),
        ),
        (
            "PUT",
            "/api/users/bob/role",
            serde_json::json!({"role": "system"}),
        ),
    ] {
        let res = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("authorization", format!("Bearer {}", token))
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
    let bob = db::users::get_by_username(&pool, "bob").await.unwrap().unwrap();
    assert_eq!(bob.role, UserRole::User);

    // 同じユーザー名はConflict
    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/users")
                .header("authorization", format!("Bearer {}", token))
                .header("content-type", "application/json")
                .body(Body::from(create_body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/users/bob/state")
                .header("authorization", format!("Bearer {}", token))
                .header("content-type", "application/json")
                .body(Body::from(serde_json::json!({"state": "disabled"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = app
        .oneshot(
            Request::builder()
                .uri("/api/users/bob/logs")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let logs: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let codes: Vec<_> = logs["logs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["action"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["user.create", "user.state-change"]);
}
