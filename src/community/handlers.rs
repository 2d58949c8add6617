use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::db::models::{Comment, Post};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::moderation::{self, SubmissionKind};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(feed).post(create_post))
        .route("/posts/{id}", get(post_details))
        .route("/posts/{id}/like", post(toggle_post_like))
        .route("/posts/{id}/comments", post(create_comment))
        .route("/comments/{id}/like", post(toggle_comment_like))
}

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub caption: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub likes: i64,
}

fn map_post_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        author_id: row.get(1)?,
        caption: row.get(2)?,
        image_url: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
        likes: row.get(6)?,
        is_liked: row.get::<_, i64>(7)? != 0,
        comments: Vec::new(),
    })
}

fn map_comment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        likes: row.get(5)?,
        is_liked: row.get::<_, i64>(6)? != 0,
    })
}

const POST_SELECT: &str = "SELECT p.id, p.author_id, p.caption, p.image_url, p.status, p.created_at,
         (SELECT COUNT(*) FROM post_likes WHERE post_id = p.id),
         (SELECT COUNT(*) FROM post_likes WHERE post_id = p.id AND user_id = ?1)
     FROM posts p";

const COMMENT_SELECT: &str = "SELECT c.id, c.post_id, c.author_id, c.content, c.created_at,
         (SELECT COUNT(*) FROM comment_likes WHERE comment_id = c.id),
         (SELECT COUNT(*) FROM comment_likes WHERE comment_id = c.id AND user_id = ?1)
     FROM comments c";

fn load_comments(
    conn: &rusqlite::Connection,
    post_id: &str,
    viewer_id: &str,
) -> rusqlite::Result<Vec<Comment>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE c.post_id = ?2 ORDER BY c.created_at ASC, c.id ASC",
        COMMENT_SELECT
    ))?;
    let comments = stmt
        .query_map(params![viewer_id, post_id], map_comment_row)?
        .collect();
    comments
}

/// GET /posts - the approved feed, newest first. Anonymous viewers get
/// `is_liked: false` everywhere.
pub async fn feed(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
) -> AppResult<Json<Vec<Post>>> {
    let viewer_id = viewer.map(|u| u.id).unwrap_or_default();

    let conn = state.db.get()?;
    let mut stmt = conn.prepare(&format!(
        "{} WHERE p.status = 'approved' ORDER BY p.created_at DESC",
        POST_SELECT
    ))?;

    let mut posts = stmt
        .query_map(params![viewer_id], map_post_row)?
        .collect::<Result<Vec<_>, _>>()?;

    for post in &mut posts {
        post.comments = load_comments(&conn, &post.id, &viewer_id)?;
    }

    Ok(Json(posts))
}

/// GET /posts/{id} - an approved post with its comment thread. Authors
/// can also see their own not-yet-approved posts.
pub async fn post_details(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<Post>> {
    let viewer_id = viewer.map(|u| u.id).unwrap_or_default();

    let conn = state.db.get()?;
    let mut post = conn
        .query_row(
            &format!("{} WHERE p.id = ?2", POST_SELECT),
            params![viewer_id, id],
            map_post_row,
        )
        .map_err(|_| AppError::NotFound)?;

    if post.status != "approved" && post.author_id != viewer_id {
        return Err(AppError::NotFound);
    }

    post.comments = load_comments(&conn, &post.id, &viewer_id)?;
    Ok(Json(post))
}

/// POST /posts - new posts wait in the moderation queue before they
/// appear in the feed.
pub async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<Response> {
    let caption = req.caption.trim();
    if caption.is_empty() {
        return Err(AppError::Validation("Caption is required".into()));
    }

    let id = uuid::Uuid::now_v7().to_string();
    let conn = state.db.get()?;
    conn.execute(
        "INSERT INTO posts (id, author_id, caption, image_url) VALUES (?1, ?2, ?3, ?4)",
        params![id, user.id, caption, req.image_url],
    )?;

    moderation::enqueue(&conn, SubmissionKind::Post, &id, &user.id)?;

    let post = conn.query_row(
        &format!("{} WHERE p.id = ?2", POST_SELECT),
        params![user.id, id],
        map_post_row,
    )?;

    Ok((StatusCode::CREATED, Json(post)).into_response())
}

/// POST /posts/{id}/comments
pub async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<Response> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(AppError::Validation("Comment cannot be empty".into()));
    }

    let conn = state.db.get()?;
    let approved: bool = conn
        .query_row(
            "SELECT status = 'approved' FROM posts WHERE id = ?1",
            params![post_id],
            |row| row.get(0),
        )
        .map_err(|_| AppError::NotFound)?;
    if !approved {
        return Err(AppError::NotFound);
    }

    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO comments (id, post_id, author_id, content) VALUES (?1, ?2, ?3, ?4)",
        params![id, post_id, user.id, content],
    )?;

    let comment = conn.query_row(
        &format!("{} WHERE c.id = ?2", COMMENT_SELECT),
        params![user.id, id],
        map_comment_row,
    )?;

    Ok((StatusCode::CREATED, Json(comment)).into_response())
}

/// POST /posts/{id}/like - toggle. Liking twice lands back on unliked;
/// the like count never double-counts a user.
pub async fn toggle_post_like(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
) -> AppResult<Json<LikeResponse>> {
    let conn = state.db.get()?;

    let exists: bool = conn
        .query_row(
            "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1 AND status = 'approved'",
            params![post_id],
            |row| row.get(0),
        )?;
    if !exists {
        return Err(AppError::NotFound);
    }

    let removed = conn.execute(
        "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
        params![post_id, user.id],
    )?;
    let liked = if removed == 0 {
        conn.execute(
            "INSERT INTO post_likes (post_id, user_id) VALUES (?1, ?2)",
            params![post_id, user.id],
        )?;
        true
    } else {
        false
    };

    let likes: i64 = conn.query_row(
        "SELECT COUNT(*) FROM post_likes WHERE post_id = ?1",
        params![post_id],
        |row| row.get(0),
    )?;

    Ok(Json(LikeResponse { liked, likes }))
}

/// POST /comments/{id}/like - same toggle for comments.
pub async fn toggle_comment_like(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(comment_id): Path<String>,
) -> AppResult<Json<LikeResponse>> {
    let conn = state.db.get()?;

    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM comments WHERE id = ?1",
        params![comment_id],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(AppError::NotFound);
    }

    let removed = conn.execute(
        "DELETE FROM comment_likes WHERE comment_id = ?1 AND user_id = ?2",
        params![comment_id, user.id],
    )?;
    let liked = if removed == 0 {
        conn.execute(
            "INSERT INTO comment_likes (comment_id, user_id) VALUES (?1, ?2)",
            params![comment_id, user.id],
        )?;
        true
    } else {
        false
    };

    let likes: i64 = conn.query_row(
        "SELECT COUNT(*) FROM comment_likes WHERE comment_id = ?1",
        params![comment_id],
        |row| row.get(0),
    )?;

    Ok(Json(LikeResponse { liked, likes }))
}
