pub mod domain;
pub mod handlers;
pub mod repository;

pub use domain::{Dispute, DisputeError, DisputeStatus, DisputeType, Resolution};
pub use handlers::router;
