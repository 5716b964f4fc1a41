pub mod auth;
pub mod common;
pub mod global_error;
pub mod lookup;
pub mod ticket;

pub use global_error::{AppError, ErrorCode, ValidationFieldError};
