// Domain types - Pure, immutable, no side effects
use serde::{Deserialize, Serialize};
use std::fmt;

/// Booking lifecycle states. The only legal edges are
/// pending → confirmed → completed, with cancellation possible from
/// pending or confirmed. Completed and cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<BookingStatus> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        match self {
            BookingStatus::Pending | BookingStatus::Confirmed => false,
            BookingStatus::Completed | BookingStatus::Cancelled => true,
        }
    }

    /// Transition: pending → confirmed (vendor/admin approval).
    pub fn confirm(self) -> Result<BookingStatus, BookingError> {
        match self {
            BookingStatus::Pending => Ok(BookingStatus::Confirmed),
            other => Err(BookingError::InvalidTransition {
                from: other,
                action: "confirm",
            }),
        }
    }

    /// Transition: pending|confirmed → cancelled. Irreversible.
    pub fn cancel(self) -> Result<BookingStatus, BookingError> {
        match self {
            BookingStatus::Pending | BookingStatus::Confirmed => Ok(BookingStatus::Cancelled),
            other => Err(BookingError::InvalidTransition {
                from: other,
                action: "cancel",
            }),
        }
    }

    /// Transition: confirmed → completed. Triggered by an explicit
    /// "mark complete" action from the vendor, not a scheduled job.
    pub fn complete(self) -> Result<BookingStatus, BookingError> {
        match self {
            BookingStatus::Confirmed => Ok(BookingStatus::Completed),
            other => Err(BookingError::InvalidTransition {
                from: other,
                action: "complete",
            }),
        }
    }

    /// Review submission is unlocked by completion, nothing else.
    pub fn can_review(&self) -> bool {
        matches!(self, BookingStatus::Completed)
    }

    /// Messaging is open while the booking is confirmed.
    pub fn can_message(&self) -> bool {
        matches!(self, BookingStatus::Confirmed)
    }

    /// Cancellation is available before the booking reaches a terminal state.
    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    #[error("Cannot {action} a {from} booking")]
    InvalidTransition {
        from: BookingStatus,
        action: &'static str,
    },

    #[error("Reviews are only available for completed bookings")]
    ReviewNotAvailable,

    #[error("Messaging is only available for confirmed bookings")]
    MessagingClosed,

    #[error("Only a party to the booking may do this")]
    NotAParty,
}

/// Which side of the booking an identity is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Vendor,
    Customer,
}

impl Party {
    pub fn as_str(&self) -> &'static str {
        match self {
            Party::Vendor => "vendor",
            Party::Customer => "customer",
        }
    }

    pub fn parse(s: &str) -> Option<Party> {
        match s {
            "vendor" => Some(Party::Vendor),
            "customer" => Some(Party::Customer),
            _ => None,
        }
    }
}

/// Pricing snapshot, computed once at creation and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub base_price: i64,
    pub hours: i64,
    pub subtotal: i64,
    pub add_ons: i64,
    pub platform_fee: i64,
    pub total: i64,
}

impl Pricing {
    /// subtotal = base_price × hours; total = subtotal + add_ons + platform_fee.
    pub fn quote(base_price: i64, hours: i64, add_ons: i64, platform_fee: i64) -> Pricing {
        let subtotal = base_price * hours;
        let total = subtotal + add_ons + platform_fee;
        Pricing {
            base_price,
            hours,
            subtotal,
            add_ons,
            platform_fee,
            total,
        }
    }
}

/// A booking row. Pricing and schedule are frozen at creation; only
/// `status` and its companion timestamps move afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub listing_id: String,
    pub vendor_id: String,
    pub customer_id: String,
    pub status: BookingStatus,
    pub date: String,
    pub time: String,
    pub duration_hours: i64,
    pub location: String,
    pub guests: i64,
    pub pricing: Pricing,
    pub currency: String,
    pub payment_method: String,
    pub payment_status: String,
    pub transaction_id: String,
    pub created_at: String,
    pub confirmed_at: Option<String>,
    pub completed_at: Option<String>,
    pub cancelled_at: Option<String>,
}

impl Booking {
    /// Which side of this booking the given identity is on, if any.
    pub fn party_of(&self, user_id: &str) -> Option<Party> {
        if self.vendor_id == user_id {
            Some(Party::Vendor)
        } else if self.customer_id == user_id {
            Some(Party::Customer)
        } else {
            None
        }
    }

    pub fn can_review(&self) -> bool {
        self.status.can_review()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingMessage {
    pub id: String,
    pub booking_id: String,
    pub sender: Party,
    pub body: String,
    pub created_at: String,
}

/// Per-status booking counts for the caller's overview.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusCounts {
    pub all: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub completed: i64,
    pub cancelled: i64,
}
