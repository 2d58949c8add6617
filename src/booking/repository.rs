// Repository pattern - isolates all database side effects
use async_trait::async_trait;
use rusqlite::params;

use crate::booking::domain::{Booking, BookingMessage, BookingStatus, Party, Pricing, StatusCounts};
use crate::repository::RepositoryError;
use crate::state::DbPool;

/// Repository trait - all booking persistence operations
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Persist a freshly created booking.
    async fn create(&self, booking: &Booking) -> Result<(), RepositoryError>;

    /// Load a booking by id.
    async fn load(&self, id: &str) -> Result<Option<Booking>, RepositoryError>;

    /// All bookings where the user is customer or vendor, newest first.
    async fn list_for_user(
        &self,
        user_id: &str,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>, RepositoryError>;

    /// Per-status counts for the user's bookings overview.
    async fn status_counts(&self, user_id: &str) -> Result<StatusCounts, RepositoryError>;

    /// Persist a status transition, stamping the matching timestamp column.
    async fn update_status(
        &self,
        id: &str,
        status: BookingStatus,
    ) -> Result<(), RepositoryError>;

    /// Append a message to the booking's thread.
    async fn append_message(
        &self,
        booking_id: &str,
        sender: Party,
        body: &str,
    ) -> Result<BookingMessage, RepositoryError>;

    /// The booking's message thread, oldest first.
    async fn messages(&self, booking_id: &str) -> Result<Vec<BookingMessage>, RepositoryError>;
}

/// SQLite implementation
pub struct SqliteBookingRepository {
    pool: DbPool,
}

impl SqliteBookingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const BOOKING_COLUMNS: &str = "id, listing_id, vendor_id, customer_id, status, date, time, \
     duration_hours, location, guests, base_price, subtotal, add_ons, platform_fee, total, \
     currency, payment_method, payment_status, transaction_id, created_at, confirmed_at, \
     completed_at, cancelled_at";

fn map_booking_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Booking> {
    let status_str: String = row.get(4)?;
    let status = BookingStatus::parse(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown booking status: {}", status_str).into(),
        )
    })?;

    Ok(Booking {
        id: row.get(0)?,
        listing_id: row.get(1)?,
        vendor_id: row.get(2)?,
        customer_id: row.get(3)?,
        status,
        date: row.get(5)?,
        time: row.get(6)?,
        duration_hours: row.get(7)?,
        location: row.get(8)?,
        guests: row.get(9)?,
        pricing: Pricing {
            base_price: row.get(10)?,
            hours: row.get(7)?,
            subtotal: row.get(11)?,
            add_ons: row.get(12)?,
            platform_fee: row.get(13)?,
            total: row.get(14)?,
        },
        currency: row.get(15)?,
        payment_method: row.get(16)?,
        payment_status: row.get(17)?,
        transaction_id: row.get(18)?,
        created_at: row.get(19)?,
        confirmed_at: row.get(20)?,
        completed_at: row.get(21)?,
        cancelled_at: row.get(22)?,
    })
}

fn map_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BookingMessage> {
    let sender_str: String = row.get(2)?;
    let sender = Party::parse(&sender_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown message sender: {}", sender_str).into(),
        )
    })?;

    Ok(BookingMessage {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        sender,
        body: row.get(3)?,
        created_at: row.get(4)?,
    })
}

#[async_trait]
impl BookingRepository for SqliteBookingRepository {
    async fn create(&self, booking: &Booking) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO bookings (id, listing_id, vendor_id, customer_id, status, date, time,
                 duration_hours, location, guests, base_price, subtotal, add_ons, platform_fee,
                 total, currency, payment_method, payment_status, transaction_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
            params![
                booking.id,
                booking.listing_id,
                booking.vendor_id,
                booking.customer_id,
                booking.status.as_str(),
                booking.date,
                booking.time,
                booking.duration_hours,
                booking.location,
                booking.guests,
                booking.pricing.base_price,
                booking.pricing.subtotal,
                booking.pricing.add_ons,
                booking.pricing.platform_fee,
                booking.pricing.total,
                booking.currency,
                booking.payment_method,
                booking.payment_status,
                booking.transaction_id,
            ],
        )?;

        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<Booking>, RepositoryError> {
        let conn = self.pool.get()?;

        let result = conn.query_row(
            &format!("SELECT {} FROM bookings WHERE id = ?1", BOOKING_COLUMNS),
            params![id],
            map_booking_row,
        );

        match result {
            Ok(booking) => Ok(Some(booking)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>, RepositoryError> {
        let conn = self.pool.get()?;

        let bookings = match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM bookings
                     WHERE (customer_id = ?1 OR vendor_id = ?1) AND status = ?2
                     ORDER BY created_at DESC",
                    BOOKING_COLUMNS
                ))?;
                let rows = stmt.query_map(params![user_id, status.as_str()], map_booking_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM bookings
                     WHERE customer_id = ?1 OR vendor_id = ?1
                     ORDER BY created_at DESC",
                    BOOKING_COLUMNS
                ))?;
                let rows = stmt.query_map(params![user_id], map_booking_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(bookings)
    }

    async fn status_counts(&self, user_id: &str) -> Result<StatusCounts, RepositoryError> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM bookings
             WHERE customer_id = ?1 OR vendor_id = ?1
             GROUP BY status",
        )?;

        let mut counts = StatusCounts::default();
        let rows = stmt.query_map(params![user_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (status_str, count) = row?;
            counts.all += count;
            match BookingStatus::parse(&status_str) {
                Some(BookingStatus::Pending) => counts.pending = count,
                Some(BookingStatus::Confirmed) => counts.confirmed = count,
                Some(BookingStatus::Completed) => counts.completed = count,
                Some(BookingStatus::Cancelled) => counts.cancelled = count,
                None => {}
            }
        }

        Ok(counts)
    }

    async fn update_status(
        &self,
        id: &str,
        status: BookingStatus,
    ) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;

        let stamp_column = match status {
            BookingStatus::Confirmed => Some("confirmed_at"),
            BookingStatus::Completed => Some("completed_at"),
            BookingStatus::Cancelled => Some("cancelled_at"),
            BookingStatus::Pending => None,
        };

        let rows = match stamp_column {
            Some(column) => conn.execute(
                &format!(
                    "UPDATE bookings SET status = ?1, {} = datetime('now') WHERE id = ?2",
                    column
                ),
                params![status.as_str(), id],
            )?,
            None => conn.execute(
                "UPDATE bookings SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id],
            )?,
        };

        if rows == 0 {
            return Err(RepositoryError::NotFound(format!("booking {}", id)));
        }

        Ok(())
    }

    async fn append_message(
        &self,
        booking_id: &str,
        sender: Party,
        body: &str,
    ) -> Result<BookingMessage, RepositoryError> {
        let conn = self.pool.get()?;

        let id = uuid::Uuid::now_v7().to_string();
        conn.execute(
            "INSERT INTO booking_messages (id, booking_id, sender, body)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, booking_id, sender.as_str(), body],
        )?;

        let message = conn.query_row(
            "SELECT id, booking_id, sender, body, created_at
             FROM booking_messages WHERE id = ?1",
            params![id],
            map_message_row,
        )?;

        Ok(message)
    }

    async fn messages(&self, booking_id: &str) -> Result<Vec<BookingMessage>, RepositoryError> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT id, booking_id, sender, body, created_at
             FROM booking_messages WHERE booking_id = ?1
             ORDER BY created_at ASC, id ASC",
        )?;

        let messages = stmt
            .query_map(params![booking_id], map_message_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(messages)
    }
}
