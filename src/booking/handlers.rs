use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::booking::domain::{
    Booking, BookingError, BookingMessage, BookingStatus, Party, Pricing, StatusCounts,
};
use crate::booking::repository::{BookingRepository, SqliteBookingRepository};
use crate::db::models::Review;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(list_bookings).post(create_booking))
        .route("/bookings/{id}", get(booking_details))
        .route("/bookings/{id}/confirm", post(confirm_booking))
        .route("/bookings/{id}/cancel", post(cancel_booking))
        .route("/bookings/{id}/complete", post(complete_booking))
        .route("/bookings/{id}/messages", post(send_message))
        .route("/bookings/{id}/reviews", post(create_review))
        .route("/reviews", get(list_reviews))
        .route("/reviews/{id}/response", post(respond_to_review))
        .route("/reviews/{id}/helpful", post(mark_review_helpful))
}

// -- Request/Response types --

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub listing_id: String,
    pub date: String,
    pub time: String,
    pub duration_hours: i64,
    pub location: String,
    pub guests: i64,
    #[serde(default)]
    pub add_ons: i64,
    pub payment_method: String,
}

#[derive(Deserialize)]
pub struct ListBookingsQuery {
    pub status: Option<String>,
}

#[derive(Serialize)]
pub struct BookingListResponse {
    pub bookings: Vec<Booking>,
    pub counts: StatusCounts,
}

#[derive(Debug, Serialize)]
pub struct BookingDetailResponse {
    pub booking: Booking,
    pub can_review: bool,
    pub messages: Vec<BookingMessage>,
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub body: String,
}

#[derive(Deserialize)]
pub struct CreateReviewRequest {
    pub rating: i64,
    pub comment: String,
}

#[derive(Deserialize)]
pub struct ListReviewsQuery {
    pub vendor_id: Option<String>,
}

#[derive(Deserialize)]
pub struct ReviewResponseRequest {
    pub body: String,
}

// -- Error conversion --

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::InvalidTransition { .. } => AppError::Conflict(err.to_string()),
            BookingError::ReviewNotAvailable => AppError::Validation(err.to_string()),
            BookingError::MessagingClosed => AppError::Validation(err.to_string()),
            BookingError::NotAParty => AppError::Forbidden,
        }
    }
}

// -- Helpers --

async fn load_booking_for(
    repo: &SqliteBookingRepository,
    id: &str,
    user: &CurrentUser,
) -> AppResult<(Booking, Option<Party>)> {
    let booking = repo.load(id).await?.ok_or(AppError::NotFound)?;
    let party = booking.party_of(&user.id);

    // Admins may inspect any booking; everyone else must be a party.
    if party.is_none() && !user.role.is_admin() {
        return Err(AppError::Forbidden);
    }

    Ok((booking, party))
}

fn map_review_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Review> {
    Ok(Review {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        reviewer_id: row.get(2)?,
        rating: row.get(3)?,
        comment: row.get(4)?,
        helpful_count: row.get(5)?,
        response: row.get(6)?,
        created_at: row.get(7)?,
    })
}

const REVIEW_COLUMNS: &str =
    "id, booking_id, reviewer_id, rating, comment, helpful_count, response, created_at";

// -- Booking handlers --

/// POST /bookings - customer requests a listing. Pricing is computed
/// here, once, and never recomputed.
pub async fn create_booking(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateBookingRequest>,
) -> AppResult<Response> {
    if req.duration_hours < 1 {
        return Err(AppError::Validation("Duration must be at least 1 hour".into()));
    }
    if req.guests < 1 {
        return Err(AppError::Validation("Guest count must be at least 1".into()));
    }
    if req.add_ons < 0 {
        return Err(AppError::Validation("Add-on total cannot be negative".into()));
    }
    if req.date.trim().is_empty() || req.time.trim().is_empty() {
        return Err(AppError::Validation("Date and time are required".into()));
    }
    if req.payment_method.trim().is_empty() {
        return Err(AppError::Validation("Payment method is required".into()));
    }

    let conn = state.db.get()?;
    let (vendor_id, base_price, currency): (String, i64, String) = conn
        .query_row(
            "SELECT vendor_id, price, currency FROM listings WHERE id = ?1 AND status = 'active'",
            params![req.listing_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .map_err(|_| AppError::NotFound)?;
    drop(conn);

    if vendor_id == user.id {
        return Err(AppError::Validation("You cannot book your own listing".into()));
    }

    let pricing = Pricing::quote(
        base_price,
        req.duration_hours,
        req.add_ons,
        state.config.marketplace.platform_fee,
    );

    let booking = Booking {
        id: uuid::Uuid::now_v7().to_string(),
        listing_id: req.listing_id,
        vendor_id,
        customer_id: user.id,
        status: BookingStatus::Pending,
        date: req.date.trim().to_string(),
        time: req.time.trim().to_string(),
        duration_hours: req.duration_hours,
        location: req.location.trim().to_string(),
        guests: req.guests,
        pricing,
        currency,
        payment_method: req.payment_method.trim().to_string(),
        payment_status: "confirmed".to_string(),
        transaction_id: format!("TXN-{}", uuid::Uuid::now_v7().simple()),
        created_at: String::new(), // set by the database default
        confirmed_at: None,
        completed_at: None,
        cancelled_at: None,
    };

    let repo = SqliteBookingRepository::new(state.db.clone());
    repo.create(&booking).await?;

    let created = repo
        .load(&booking.id)
        .await?
        .ok_or_else(|| AppError::Internal("Booking vanished after insert".into()))?;

    tracing::info!("Booking {} created for listing {}", created.id, created.listing_id);

    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// GET /bookings - the caller's bookings (either side), with counts.
pub async fn list_bookings(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListBookingsQuery>,
) -> AppResult<Json<BookingListResponse>> {
    let status = match query.status.as_deref() {
        Some(s) => Some(
            BookingStatus::parse(s)
                .ok_or_else(|| AppError::Validation(format!("Unknown status filter: {}", s)))?,
        ),
        None => None,
    };

    let repo = SqliteBookingRepository::new(state.db.clone());
    let bookings = repo.list_for_user(&user.id, status).await?;
    let counts = repo.status_counts(&user.id).await?;

    Ok(Json(BookingListResponse { bookings, counts }))
}

/// GET /bookings/{id} - full booking view with message thread.
pub async fn booking_details(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<BookingDetailResponse>> {
    let repo = SqliteBookingRepository::new(state.db.clone());
    let (booking, _party) = load_booking_for(&repo, &id, &user).await?;
    let messages = repo.messages(&id).await?;

    let can_review = booking.can_review();
    Ok(Json(BookingDetailResponse {
        booking,
        can_review,
        messages,
    }))
}

/// POST /bookings/{id}/confirm - vendor (or admin) approval.
pub async fn confirm_booking(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Booking>> {
    let repo = SqliteBookingRepository::new(state.db.clone());
    let (booking, party) = load_booking_for(&repo, &id, &user).await?;

    if party != Some(Party::Vendor) && !user.role.is_admin() {
        return Err(AppError::Forbidden);
    }

    let next = booking.status.confirm()?;
    repo.update_status(&id, next).await?;

    let updated = repo.load(&id).await?.ok_or(AppError::NotFound)?;
    tracing::info!("Booking {} confirmed", id);
    Ok(Json(updated))
}

/// POST /bookings/{id}/cancel - either party, while not terminal.
pub async fn cancel_booking(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Booking>> {
    let repo = SqliteBookingRepository::new(state.db.clone());
    let (booking, _party) = load_booking_for(&repo, &id, &user).await?;

    let next = booking.status.cancel()?;
    repo.update_status(&id, next).await?;

    let updated = repo.load(&id).await?.ok_or(AppError::NotFound)?;
    tracing::info!("Booking {} cancelled", id);
    Ok(Json(updated))
}

/// POST /bookings/{id}/complete - the vendor marks the service done.
/// Completion is an explicit action, never inferred from the clock.
pub async fn complete_booking(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Booking>> {
    let repo = SqliteBookingRepository::new(state.db.clone());
    let (booking, party) = load_booking_for(&repo, &id, &user).await?;

    if party != Some(Party::Vendor) && !user.role.is_admin() {
        return Err(AppError::Forbidden);
    }

    let next = booking.status.complete()?;
    repo.update_status(&id, next).await?;

    let updated = repo.load(&id).await?.ok_or(AppError::NotFound)?;
    tracing::info!("Booking {} completed", id);
    Ok(Json(updated))
}

/// POST /bookings/{id}/messages - append to the booking thread.
pub async fn send_message(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<Response> {
    let body = req.body.trim();
    if body.is_empty() {
        return Err(AppError::Validation("Message cannot be empty".into()));
    }

    let repo = SqliteBookingRepository::new(state.db.clone());
    let (booking, party) = load_booking_for(&repo, &id, &user).await?;
    let sender = party.ok_or(BookingError::NotAParty)?;

    if !booking.status.can_message() {
        return Err(BookingError::MessagingClosed.into());
    }

    let message = repo.append_message(&id, sender, body).await?;
    Ok((StatusCode::CREATED, Json(message)).into_response())
}

// -- Review handlers --

/// POST /bookings/{id}/reviews - one review per booking per reviewer,
/// only once the booking is completed.
pub async fn create_review(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<CreateReviewRequest>,
) -> AppResult<Response> {
    if !(1..=5).contains(&req.rating) {
        return Err(AppError::Validation("Rating must be between 1 and 5".into()));
    }
    let comment = req.comment.trim();
    if comment.is_empty() {
        return Err(AppError::Validation("Review comment is required".into()));
    }

    let repo = SqliteBookingRepository::new(state.db.clone());
    let (booking, party) = load_booking_for(&repo, &id, &user).await?;
    if party.is_none() {
        return Err(BookingError::NotAParty.into());
    }

    if !booking.can_review() {
        return Err(BookingError::ReviewNotAvailable.into());
    }

    let conn = state.db.get()?;

    let already: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM reviews WHERE booking_id = ?1 AND reviewer_id = ?2",
        params![id, user.id],
        |row| row.get(0),
    )?;
    if already {
        return Err(AppError::Conflict(
            "You have already reviewed this booking".into(),
        ));
    }

    let review_id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO reviews (id, booking_id, reviewer_id, rating, comment)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![review_id, id, user.id, req.rating, comment],
    )?;

    let review = conn.query_row(
        &format!("SELECT {} FROM reviews WHERE id = ?1", REVIEW_COLUMNS),
        params![review_id],
        map_review_row,
    )?;

    Ok((StatusCode::CREATED, Json(review)).into_response())
}

/// GET /reviews?vendor_id= - reviews on a vendor's bookings.
/// Defaults to the caller's own received reviews.
pub async fn list_reviews(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListReviewsQuery>,
) -> AppResult<Json<Vec<Review>>> {
    let vendor_id = query.vendor_id.unwrap_or(user.id);

    let conn = state.db.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT r.{} FROM reviews r
         JOIN bookings b ON b.id = r.booking_id
         WHERE b.vendor_id = ?1
         ORDER BY r.created_at DESC",
        REVIEW_COLUMNS.replace(", ", ", r.")
    ))?;

    let reviews = stmt
        .query_map(params![vendor_id], map_review_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(reviews))
}

/// POST /reviews/{id}/response - the vendor's reply, settable exactly once.
pub async fn respond_to_review(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<ReviewResponseRequest>,
) -> AppResult<Json<Review>> {
    let body = req.body.trim();
    if body.is_empty() {
        return Err(AppError::Validation("Response cannot be empty".into()));
    }

    let conn = state.db.get()?;

    let (vendor_id, existing): (String, Option<String>) = conn
        .query_row(
            "SELECT b.vendor_id, r.response FROM reviews r
             JOIN bookings b ON b.id = r.booking_id
             WHERE r.id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .map_err(|_| AppError::NotFound)?;

    if vendor_id != user.id && !user.role.is_admin() {
        return Err(AppError::Forbidden);
    }
    if existing.is_some() {
        return Err(AppError::Conflict(
            "This review already has a response".into(),
        ));
    }

    conn.execute(
        "UPDATE reviews SET response = ?1 WHERE id = ?2",
        params![body, id],
    )?;

    let review = conn.query_row(
        &format!("SELECT {} FROM reviews WHERE id = ?1", REVIEW_COLUMNS),
        params![id],
        map_review_row,
    )?;

    Ok(Json(review))
}

/// POST /reviews/{id}/helpful - bump the helpful counter.
pub async fn mark_review_helpful(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Review>> {
    let conn = state.db.get()?;

    let rows = conn.execute(
        "UPDATE reviews SET helpful_count = helpful_count + 1 WHERE id = ?1",
        params![id],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }

    let review = conn.query_row(
        &format!("SELECT {} FROM reviews WHERE id = ?1", REVIEW_COLUMNS),
        params![id],
        map_review_row,
    )?;

    Ok(Json(review))
}
