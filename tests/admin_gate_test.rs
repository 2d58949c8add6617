use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tempfile::TempDir;
use tower::ServiceExt;

use palengke::config::Config;
use palengke::state::AppState;
use palengke::{app, db};

fn test_state() -> (AppState, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let pool = db::create_pool(&temp_dir.path().join("test.db")).unwrap();
    db::run_migrations(&pool).unwrap();
    (
        AppState {
            db: pool,
            config: Config::default(),
        },
        temp_dir,
    )
}

async fn register(router: &axum::Router, username: &str) -> String {
    let body = json!({
        "name": "Maria Santos",
        "username": username,
        "email": format!("{}@example.com", username),
        "password": "correct horse battery",
    });
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    cookie.split(';').next().unwrap().to_string()
}

async fn get_with_cookie(router: &axum::Router, uri: &str, cookie: Option<&str>) -> StatusCode {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    router
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn moderation_queue_requires_the_admin_role() {
    let (state, _temp) = test_state();
    let router = app(state.clone());

    // Anonymous: 401
    assert_eq!(
        get_with_cookie(&router, "/admin/moderation", None).await,
        StatusCode::UNAUTHORIZED
    );

    // Fresh accounts are plain users: 403
    let cookie = register(&router, "maria").await;
    assert_eq!(
        get_with_cookie(&router, "/admin/moderation", Some(&cookie)).await,
        StatusCode::FORBIDDEN
    );

    // Promotion to admin opens the gate on the very same session
    let conn = state.db.get().unwrap();
    conn.execute("UPDATE users SET role = 'admin' WHERE username = 'maria'", [])
        .unwrap();
    drop(conn);

    assert_eq!(
        get_with_cookie(&router, "/admin/moderation", Some(&cookie)).await,
        StatusCode::OK
    );
}

#[tokio::test]
async fn logout_ends_the_session_for_later_requests() {
    let (state, _temp) = test_state();
    let router = app(state.clone());

    let cookie = register(&router, "maria").await;
    assert_eq!(
        get_with_cookie(&router, "/auth/me", Some(&cookie)).await,
        StatusCode::OK
    );

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .header(header::COOKIE, cookie.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // The old token is dead server-side, not just cleared client-side
    assert_eq!(
        get_with_cookie(&router, "/auth/me", Some(&cookie)).await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn vendor_role_alone_does_not_open_the_admin_panel() {
    let (state, _temp) = test_state();
    let router = app(state.clone());

    let cookie = register(&router, "vendor").await;
    let conn = state.db.get().unwrap();
    conn.execute(
        "UPDATE users SET role = 'vendor', is_kyc_verified = 1 WHERE username = 'vendor'",
        [],
    )
    .unwrap();
    drop(conn);

    assert_eq!(
        get_with_cookie(&router, "/admin/moderation", Some(&cookie)).await,
        StatusCode::FORBIDDEN
    );
}
