pub mod domain;
pub mod handlers;
pub mod repository;

pub use domain::{Booking, BookingError, BookingStatus, Party, Pricing};
pub use handlers::router;
