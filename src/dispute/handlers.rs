use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::booking::repository::{BookingRepository, SqliteBookingRepository};
use crate::booking::BookingStatus;
use crate::dispute::domain::{Dispute, DisputeError, DisputeStatus, DisputeType};
use crate::dispute::repository::{DisputeRepository, SqliteDisputeRepository};
use crate::error::{AppError, AppResult};
use crate::extractors::{AdminUser, CurrentUser};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/disputes", get(list_disputes).post(file_dispute))
        .route("/disputes/{id}", get(dispute_details))
        .route("/disputes/{id}/investigate", post(investigate_dispute))
        .route("/disputes/{id}/resolve", post(resolve_dispute))
        .route("/disputes/{id}/close", post(close_dispute))
}

#[derive(Deserialize)]
pub struct FileDisputeRequest {
    pub booking_id: String,
    pub dispute_type: String,
    pub description: String,
    #[serde(default)]
    pub evidence: Vec<String>,
}

#[derive(Deserialize)]
pub struct ListDisputesQuery {
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct ResolveDisputeRequest {
    pub decision: String,
    pub amount: Option<i64>,
}

impl From<DisputeError> for AppError {
    fn from(err: DisputeError) -> Self {
        match err {
            DisputeError::InvalidTransition { .. } => AppError::Conflict(err.to_string()),
            DisputeError::WindowClosed => AppError::Validation(err.to_string()),
            DisputeError::DescriptionRequired => AppError::Validation(err.to_string()),
            DisputeError::NotAParty => AppError::Forbidden,
        }
    }
}

/// Reject filings that arrive more than `window_days` after the booking
/// reached its terminal state. Open-ended while the booking is live.
fn check_filing_window(terminal_at: Option<&str>, window_days: i64) -> Result<(), DisputeError> {
    let Some(stamp) = terminal_at else {
        return Ok(());
    };
    let terminal = match chrono::NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S") {
        Ok(terminal) => terminal,
        Err(err) => {
            // The column is always written by datetime('now'), so this
            // only fires on corrupt data. Treat it as in-window.
            tracing::warn!("Unreadable terminal timestamp {:?}: {}", stamp, err);
            return Ok(());
        }
    };
    let age = chrono::Utc::now().naive_utc() - terminal;
    if age > chrono::Duration::days(window_days) {
        return Err(DisputeError::WindowClosed);
    }
    Ok(())
}

/// POST /disputes - either party files against any booking they are a
/// party to. A payment dispute can target a booking that was never
/// confirmed; the only time limit is the window after a terminal state.
pub async fn file_dispute(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<FileDisputeRequest>,
) -> AppResult<Response> {
    let description = req.description.trim();
    if description.is_empty() {
        return Err(DisputeError::DescriptionRequired.into());
    }
    let dispute_type = DisputeType::parse(&req.dispute_type)
        .ok_or_else(|| AppError::Validation(format!("Unknown dispute type: {}", req.dispute_type)))?;

    let bookings = SqliteBookingRepository::new(state.db.clone());
    let booking = bookings
        .load(&req.booking_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if booking.party_of(&user.id).is_none() {
        return Err(DisputeError::NotAParty.into());
    }

    let window = state.config.marketplace.dispute_window_days;
    let terminal_at = match booking.status {
        BookingStatus::Completed => booking.completed_at.as_deref(),
        BookingStatus::Cancelled => booking.cancelled_at.as_deref(),
        _ => None,
    };
    check_filing_window(terminal_at, window)?;

    let dispute = Dispute {
        id: uuid::Uuid::now_v7().to_string(),
        booking_id: booking.id,
        filed_by: user.id,
        dispute_type,
        status: DisputeStatus::Open,
        description: description.to_string(),
        evidence: req.evidence,
        resolution: None,
        created_at: String::new(),
        updated_at: String::new(),
    };

    let repo = SqliteDisputeRepository::new(state.db.clone());
    repo.create(&dispute).await?;

    let created = repo
        .load(&dispute.id)
        .await?
        .ok_or_else(|| AppError::Internal("Dispute vanished after insert".into()))?;

    tracing::info!(
        "Dispute {} filed against booking {}",
        created.id,
        created.booking_id
    );

    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// GET /disputes - admins see the whole queue (optionally filtered),
/// everyone else sees disputes touching their own bookings.
pub async fn list_disputes(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListDisputesQuery>,
) -> AppResult<Json<Vec<Dispute>>> {
    let repo = SqliteDisputeRepository::new(state.db.clone());

    if user.role.is_admin() {
        let status = match query.status.as_deref() {
            Some(s) => Some(
                DisputeStatus::parse(s)
                    .ok_or_else(|| AppError::Validation(format!("Unknown status filter: {}", s)))?,
            ),
            None => None,
        };
        return Ok(Json(repo.list_all(status).await?));
    }

    Ok(Json(repo.list_for_user(&user.id).await?))
}

/// GET /disputes/{id}
pub async fn dispute_details(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Dispute>> {
    let repo = SqliteDisputeRepository::new(state.db.clone());
    let dispute = repo.load(&id).await?.ok_or(AppError::NotFound)?;

    if !user.role.is_admin() {
        let bookings = SqliteBookingRepository::new(state.db.clone());
        let booking = bookings
            .load(&dispute.booking_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if booking.party_of(&user.id).is_none() {
            return Err(AppError::Forbidden);
        }
    }

    Ok(Json(dispute))
}

/// POST /disputes/{id}/investigate - admin takes the case.
pub async fn investigate_dispute(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Json<Dispute>> {
    let repo = SqliteDisputeRepository::new(state.db.clone());
    let dispute = repo.load(&id).await?.ok_or(AppError::NotFound)?;

    let next = dispute.status.investigate()?;
    repo.update_status(&id, next).await?;

    let updated = repo.load(&id).await?.ok_or(AppError::NotFound)?;
    tracing::info!("Dispute {} under investigation", id);
    Ok(Json(updated))
}

/// POST /disputes/{id}/resolve - admin records the verdict. Status and
/// resolution land in the same write.
pub async fn resolve_dispute(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(req): Json<ResolveDisputeRequest>,
) -> AppResult<Json<Dispute>> {
    let decision = req.decision.trim();
    if decision.is_empty() {
        return Err(AppError::Validation("A resolution decision is required".into()));
    }
    if req.amount.is_some_and(|amount| amount < 0) {
        return Err(AppError::Validation("Resolution amount cannot be negative".into()));
    }

    let repo = SqliteDisputeRepository::new(state.db.clone());
    let dispute = repo.load(&id).await?.ok_or(AppError::NotFound)?;

    dispute.status.resolve()?;
    repo.record_resolution(&id, decision, req.amount, &admin.id)
        .await?;

    let updated = repo.load(&id).await?.ok_or(AppError::NotFound)?;
    tracing::info!("Dispute {} resolved: {}", id, decision);
    Ok(Json(updated))
}

/// POST /disputes/{id}/close - admin archives a resolved dispute.
pub async fn close_dispute(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Json<Dispute>> {
    let repo = SqliteDisputeRepository::new(state.db.clone());
    let dispute = repo.load(&id).await?.ok_or(AppError::NotFound)?;

    let next = dispute.status.close()?;
    repo.update_status(&id, next).await?;

    let updated = repo.load(&id).await?.ok_or(AppError::NotFound)?;
    tracing::info!("Dispute {} closed", id);
    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_open_without_terminal_stamp() {
        assert!(check_filing_window(None, 7).is_ok());
    }

    #[test]
    fn window_accepts_recent_completion() {
        let recent = (chrono::Utc::now() - chrono::Duration::days(3))
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        assert!(check_filing_window(Some(&recent), 7).is_ok());
    }

    #[test]
    fn window_stays_open_on_unreadable_stamps() {
        assert!(check_filing_window(Some("not a timestamp"), 7).is_ok());
    }

    #[test]
    fn window_rejects_stale_completion() {
        let stale = (chrono::Utc::now() - chrono::Duration::days(10))
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        assert_eq!(
            check_filing_window(Some(&stale), 7),
            Err(DisputeError::WindowClosed)
        );
    }
}
