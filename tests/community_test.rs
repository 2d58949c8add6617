use axum::extract::{Path, State};
use axum::Json;
use rusqlite::params;
use tempfile::TempDir;

use palengke::auth::Role;
use palengke::community::handlers::{self, CreateCommentRequest};
use palengke::config::Config;
use palengke::db;
use palengke::error::AppError;
use palengke::extractors::{CurrentUser, MaybeUser};
use palengke::state::AppState;

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

fn seed_user(state: &AppState, id: &str) -> CurrentUser {
    let conn = state.db.get().unwrap();
    conn.execute(
        "INSERT INTO users (id, name, username, email, password_hash)
         VALUES (?1, ?1, ?1, ?1 || '@example.com', 'h')",
        params![id],
    )
    .unwrap();
    CurrentUser {
        id: id.to_string(),
        name: id.to_string(),
        username: id.to_string(),
        email: format!("{}@example.com", id),
        avatar: None,
        role: Role::User,
        bio: None,
        is_kyc_verified: false,
    }
}

fn seed_approved_post(state: &AppState, id: &str, author_id: &str) {
    let conn = state.db.get().unwrap();
    conn.execute(
        "INSERT INTO posts (id, author_id, caption, status)
         VALUES (?1, ?2, 'Market day haul', 'approved')",
        params![id, author_id],
    )
    .unwrap();
}

#[tokio::test]
async fn like_toggles_and_never_double_counts() {
    let (state, _temp) = test_state();
    let author = seed_user(&state, "author-1");
    let fan = seed_user(&state, "fan-1");
    seed_approved_post(&state, "p1", &author.id);

    let liked = handlers::toggle_post_like(
        State(state.clone()),
        fan.clone(),
        Path("p1".to_string()),
    )
    .await
    .unwrap();
    assert!(liked.0.liked);
    assert_eq!(liked.0.likes, 1);

    // Same user again: toggles off, count returns to zero
    let unliked = handlers::toggle_post_like(
        State(state.clone()),
        fan.clone(),
        Path("p1".to_string()),
    )
    .await
    .unwrap();
    assert!(!unliked.0.liked);
    assert_eq!(unliked.0.likes, 0);

    // Two different users count separately
    handlers::toggle_post_like(State(state.clone()), fan.clone(), Path("p1".to_string()))
        .await
        .unwrap();
    let both = handlers::toggle_post_like(
        State(state.clone()),
        author.clone(),
        Path("p1".to_string()),
    )
    .await
    .unwrap();
    assert_eq!(both.0.likes, 2);
}

#[tokio::test]
async fn feed_marks_is_liked_per_viewer() {
    let (state, _temp) = test_state();
    let author = seed_user(&state, "author-1");
    let fan = seed_user(&state, "fan-1");
    seed_approved_post(&state, "p1", &author.id);

    handlers::toggle_post_like(State(state.clone()), fan.clone(), Path("p1".to_string()))
        .await
        .unwrap();

    let fan_feed = handlers::feed(State(state.clone()), MaybeUser(Some(fan.clone())))
        .await
        .unwrap();
    assert!(fan_feed.0[0].is_liked);
    assert_eq!(fan_feed.0[0].likes, 1);

    let author_feed = handlers::feed(State(state.clone()), MaybeUser(Some(author.clone())))
        .await
        .unwrap();
    assert!(!author_feed.0[0].is_liked);

    // Anonymous viewers still see the count
    let anon_feed = handlers::feed(State(state.clone()), MaybeUser(None))
        .await
        .unwrap();
    assert!(!anon_feed.0[0].is_liked);
    assert_eq!(anon_feed.0[0].likes, 1);
}

#[tokio::test]
async fn comments_thread_under_their_post() {
    let (state, _temp) = test_state();
    let author = seed_user(&state, "author-1");
    let fan = seed_user(&state, "fan-1");
    seed_approved_post(&state, "p1", &author.id);

    handlers::create_comment(
        State(state.clone()),
        fan.clone(),
        Path("p1".to_string()),
        Json(CreateCommentRequest {
            content: "Those mangoes look perfect.".to_string(),
        }),
    )
    .await
    .unwrap();

    let post = handlers::post_details(
        State(state.clone()),
        MaybeUser(None),
        Path("p1".to_string()),
    )
    .await
    .unwrap();
    assert_eq!(post.0.comments.len(), 1);
    assert_eq!(post.0.comments[0].content, "Those mangoes look perfect.");

    // Comment likes toggle the same way
    let comment_id = post.0.comments[0].id.clone();
    let liked = handlers::toggle_comment_like(
        State(state.clone()),
        author.clone(),
        Path(comment_id.clone()),
    )
    .await
    .unwrap();
    assert!(liked.0.liked);
    assert_eq!(liked.0.likes, 1);
}

#[tokio::test]
async fn pending_posts_reject_comments_and_likes() {
    let (state, _temp) = test_state();
    let author = seed_user(&state, "author-1");
    let fan = seed_user(&state, "fan-1");

    let conn = state.db.get().unwrap();
    conn.execute(
        "INSERT INTO posts (id, author_id, caption) VALUES ('p1', ?1, 'Not yet approved')",
        params![author.id],
    )
    .unwrap();
    drop(conn);

    let err = handlers::create_comment(
        State(state.clone()),
        fan.clone(),
        Path("p1".to_string()),
        Json(CreateCommentRequest {
            content: "First!".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let err = handlers::toggle_post_like(State(state.clone()), fan.clone(), Path("p1".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    // The author can still see their own pending post
    let own = handlers::post_details(
        State(state.clone()),
        MaybeUser(Some(author.clone())),
        Path("p1".to_string()),
    )
    .await
    .unwrap();
    assert_eq!(own.0.status, "pending");

    // Everyone else cannot
    let err = handlers::post_details(
        State(state.clone()),
        MaybeUser(Some(fan)),
        Path("p1".to_string()),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}
