pub mod handlers;
pub mod password;
pub mod role;
pub mod session;

pub use role::Role;
