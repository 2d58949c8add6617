use std::fmt::Write as _;

use rand::RngCore;
use rusqlite::params;

use crate::error::AppError;
use crate::state::DbPool;

/// Session tokens are 32 random bytes rendered as lowercase hex.
pub const TOKEN_LEN: usize = 64;

/// Open a session for a user, expiring `hours` from now. Returns the
/// token that goes into the cookie.
pub fn create_session(pool: &DbPool, user_id: &str, hours: u64) -> Result<String, AppError> {
    let conn = pool.get()?;
    let token = generate_token();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at)
         VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![
            uuid::Uuid::now_v7().to_string(),
            user_id,
            token,
            format!("+{} hours", hours)
        ],
    )?;

    Ok(token)
}

/// End the session behind a token. Unknown tokens are a no-op so that
/// logout with a stale cookie still succeeds.
pub fn delete_session(pool: &DbPool, token: &str) -> Result<(), AppError> {
    let conn = pool.get()?;
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_LEN / 2];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
        .iter()
        .fold(String::with_capacity(TOKEN_LEN), |mut hex, b| {
            let _ = write!(hex, "{:02x}", b);
            hex
        })
}
