use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use rusqlite::params;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::extractors::AdminUser;
use crate::moderation::{QueueEntry, SubmissionKind, Verdict};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/moderation", get(pending_queue))
        .route("/admin/moderation/{kind}/{id}/approve", post(approve))
        .route("/admin/moderation/{kind}/{id}/reject", post(reject))
}

fn map_entry_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueEntry> {
    let kind_str: String = row.get(0)?;
    let kind = SubmissionKind::parse(&kind_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown submission kind: {}", kind_str).into(),
        )
    })?;

    Ok(QueueEntry {
        kind,
        resource_id: row.get(1)?,
        submitted_by: row.get(2)?,
        status: row.get(3)?,
        resolved_by: row.get(4)?,
        resolved_at: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const ENTRY_COLUMNS: &str =
    "kind, resource_id, submitted_by, status, resolved_by, resolved_at, created_at";

#[derive(Deserialize)]
pub struct PendingQuery {
    pub kind: Option<String>,
}

/// GET /admin/moderation?kind= - everything still awaiting a verdict.
pub async fn pending_queue(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<PendingQuery>,
) -> AppResult<Json<Vec<QueueEntry>>> {
    let kind = match query.kind.as_deref() {
        Some(s) => Some(
            SubmissionKind::parse(s)
                .ok_or_else(|| AppError::Validation(format!("Unknown submission kind: {}", s)))?,
        ),
        None => None,
    };

    let conn = state.db.get()?;

    let entries = match kind {
        Some(kind) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM moderation_queue
                 WHERE status = 'pending' AND kind = ?1
                 ORDER BY created_at ASC",
                ENTRY_COLUMNS
            ))?;
            let rows = stmt.query_map(params![kind.as_str()], map_entry_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM moderation_queue WHERE status = 'pending' ORDER BY created_at ASC",
                ENTRY_COLUMNS
            ))?;
            let rows = stmt.query_map([], map_entry_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok(Json(entries))
}

pub async fn approve(
    State(state): State<AppState>,
    admin: AdminUser,
    Path((kind, id)): Path<(String, String)>,
) -> AppResult<Json<QueueEntry>> {
    decide(state, admin, kind, id, Verdict::Approved).await
}

pub async fn reject(
    State(state): State<AppState>,
    admin: AdminUser,
    Path((kind, id)): Path<(String, String)>,
) -> AppResult<Json<QueueEntry>> {
    decide(state, admin, kind, id, Verdict::Rejected).await
}

/// Record a verdict and apply its side effect in one transaction. A
/// repeat of the same verdict is a no-op; flipping an already-settled
/// verdict is a conflict.
async fn decide(
    state: AppState,
    AdminUser(admin): AdminUser,
    kind: String,
    id: String,
    verdict: Verdict,
) -> AppResult<Json<QueueEntry>> {
    let kind = SubmissionKind::parse(&kind)
        .ok_or_else(|| AppError::Validation(format!("Unknown submission kind: {}", kind)))?;

    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;

    let entry = tx
        .query_row(
            &format!(
                "SELECT {} FROM moderation_queue WHERE kind = ?1 AND resource_id = ?2",
                ENTRY_COLUMNS
            ),
            params![kind.as_str(), id],
            map_entry_row,
        )
        .map_err(|_| AppError::NotFound)?;

    if entry.status != "pending" {
        if entry.status == verdict.as_str() {
            // Already settled the same way; nothing to redo.
            return Ok(Json(entry));
        }
        return Err(AppError::Conflict(format!(
            "Submission was already {}",
            entry.status
        )));
    }

    tx.execute(
        "UPDATE moderation_queue
         SET status = ?1, resolved_by = ?2, resolved_at = datetime('now')
         WHERE kind = ?3 AND resource_id = ?4",
        params![verdict.as_str(), admin.id, kind.as_str(), id],
    )?;

    match (kind, verdict) {
        (SubmissionKind::Listing, Verdict::Approved) => {
            tx.execute(
                "UPDATE listings SET status = 'active' WHERE id = ?1",
                params![id],
            )?;
        }
        (SubmissionKind::Listing, Verdict::Rejected) => {
            // Stays inactive; the queue entry records the verdict.
        }
        (SubmissionKind::Item, Verdict::Approved) => {
            tx.execute(
                "UPDATE items SET status = 'active' WHERE id = ?1",
                params![id],
            )?;
        }
        (SubmissionKind::Item, Verdict::Rejected) => {
            // Stays inactive; the queue entry records the verdict.
        }
        (SubmissionKind::Post, Verdict::Approved) => {
            tx.execute(
                "UPDATE posts SET status = 'approved' WHERE id = ?1",
                params![id],
            )?;
        }
        (SubmissionKind::Post, Verdict::Rejected) => {
            // Rejected posts are removed outright, thread and all.
            tx.execute(
                "DELETE FROM comment_likes WHERE comment_id IN
                     (SELECT id FROM comments WHERE post_id = ?1)",
                params![id],
            )?;
            tx.execute("DELETE FROM comments WHERE post_id = ?1", params![id])?;
            tx.execute("DELETE FROM post_likes WHERE post_id = ?1", params![id])?;
            tx.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
        }
        (SubmissionKind::Kyc, Verdict::Approved) => {
            tx.execute(
                "UPDATE users SET is_kyc_verified = 1 WHERE id = ?1",
                params![id],
            )?;
        }
        (SubmissionKind::Kyc, Verdict::Rejected) => {
            // The flag simply stays unset.
        }
    }

    let settled = tx.query_row(
        &format!(
            "SELECT {} FROM moderation_queue WHERE kind = ?1 AND resource_id = ?2",
            ENTRY_COLUMNS
        ),
        params![kind.as_str(), id],
        map_entry_row,
    )?;

    tx.commit()?;

    tracing::info!("{} {} {}", kind.as_str(), id, verdict.as_str());
    Ok(Json(settled))
}
