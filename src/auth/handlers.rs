use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use rusqlite::params;
use serde::Deserialize;

use crate::auth::{password, session, Role};
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::moderation;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/profile", patch(update_profile))
        .route("/kyc", post(submit_kyc))
}

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Default)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

// -- Cookie helpers --

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0", name)
}

fn get_cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name {
                Some(val)
            } else {
                None
            }
        })
}

// -- Row mapping --

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let role_str: String = row.get(6)?;
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        username: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        avatar: row.get(5)?,
        // Unknown role text cannot round-trip; treat as plain user rather
        // than failing the whole row.
        role: Role::parse(&role_str).unwrap_or(Role::User),
        bio: row.get(7)?,
        is_kyc_verified: row.get(8)?,
        created_at: row.get(9)?,
    })
}

const USER_COLUMNS: &str =
    "id, name, username, email, password_hash, avatar, role, bio, is_kyc_verified, created_at";

// -- Handlers --

/// POST /auth/register - create a new identity with the default role.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Response> {
    let name = req.name.trim();
    let username = req.username.trim();
    let email = req.email.trim();

    if name.is_empty() || username.is_empty() || email.is_empty() {
        return Err(AppError::Validation(
            "Name, username and email are required".into(),
        ));
    }
    if !email.contains('@') {
        return Err(AppError::Validation("Invalid email address".into()));
    }
    if req.password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }

    let conn = state.db.get()?;

    let taken: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE username = ?1 OR email = ?2",
        params![username, email],
        |row| row.get(0),
    )?;
    if taken {
        return Err(AppError::Validation(
            "Username or email is already registered".into(),
        ));
    }

    let hash = password::hash(&req.password)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;
    let user_id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO users (id, name, username, email, password_hash, role)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![user_id, name, username, email, hash, Role::User.as_str()],
    )?;

    let user = conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        params![user_id],
        map_user_row,
    )?;

    drop(conn);
    let token = session::create_session(&state.db, &user.id, state.config.auth.session_hours)?;

    tracing::info!("Registered new user {}", user.username);

    Ok((
        StatusCode::CREATED,
        AppendHeaders([(
            header::SET_COOKIE,
            session_cookie(
                &state.config.auth.cookie_name,
                &token,
                state.config.auth.session_hours,
            ),
        )]),
        Json(user),
    )
        .into_response())
}

/// POST /auth/login - verify credentials, start a session.
/// Bad credentials get a generic 401 with no hint which field was wrong.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Response> {
    let conn = state.db.get()?;

    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
            params![req.email.trim()],
            map_user_row,
        )
        .map_err(|_| AppError::Unauthorized)?;

    if !password::verify(&req.password, &user.password_hash) {
        return Err(AppError::Unauthorized);
    }

    drop(conn);
    let token = session::create_session(&state.db, &user.id, state.config.auth.session_hours)?;

    Ok((
        AppendHeaders([(
            header::SET_COOKIE,
            session_cookie(
                &state.config.auth.cookie_name,
                &token,
                state.config.auth.session_hours,
            ),
        )]),
        Json(user),
    )
        .into_response())
}

/// POST /auth/logout - clear the current session.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    if let Some(token) = get_cookie_value(&headers, &state.config.auth.cookie_name) {
        session::delete_session(&state.db, token)?;
    }

    Ok((
        AppendHeaders([(
            header::SET_COOKIE,
            clear_session_cookie(&state.config.auth.cookie_name),
        )]),
        StatusCode::NO_CONTENT,
    )
        .into_response())
}

/// GET /auth/me - the current identity.
pub async fn me(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<User>> {
    let conn = state.db.get()?;
    let user = conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        params![user.id],
        map_user_row,
    )?;
    Ok(Json(user))
}

/// PATCH /auth/profile - merge provided fields into the current identity.
/// Omitted fields are left unchanged. The KYC flag is not settable here;
/// it only flips through moderation approval of a KYC submission.
pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<Json<User>> {
    if let Some(ref username) = req.username {
        if username.trim().is_empty() {
            return Err(AppError::Validation("Username cannot be empty".into()));
        }
    }
    if let Some(ref email) = req.email {
        if !email.contains('@') {
            return Err(AppError::Validation("Invalid email address".into()));
        }
    }

    let conn = state.db.get()?;

    // Check against the trimmed values, since that is what gets stored.
    let username = req.username.as_deref().map(str::trim);
    let email = req.email.as_deref().map(str::trim);

    let taken: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE (username = ?1 OR email = ?2) AND id != ?3",
        params![username, email, user.id],
        |row| row.get(0),
    )?;
    if taken {
        return Err(AppError::Validation(
            "Username or email is already registered".into(),
        ));
    }

    conn.execute(
        "UPDATE users SET
            name = COALESCE(?1, name),
            username = COALESCE(?2, username),
            email = COALESCE(?3, email),
            bio = COALESCE(?4, bio),
            avatar = COALESCE(?5, avatar)
         WHERE id = ?6",
        params![
            req.name.as_deref().map(str::trim),
            username,
            email,
            req.bio,
            req.avatar,
            user.id
        ],
    )?;

    let updated = conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        params![user.id],
        map_user_row,
    )?;

    Ok(Json(updated))
}

/// POST /kyc - submit identity verification for admin review.
/// Approval through the moderation queue sets `is_kyc_verified`.
pub async fn submit_kyc(State(state): State<AppState>, user: CurrentUser) -> AppResult<Response> {
    if user.is_kyc_verified {
        return Err(AppError::Validation("Identity is already verified".into()));
    }

    let conn = state.db.get()?;
    moderation::enqueue(&conn, moderation::SubmissionKind::Kyc, &user.id, &user.id)?;

    tracing::info!("KYC submission queued for user {}", user.username);

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "status": "pending" })),
    )
        .into_response())
}
