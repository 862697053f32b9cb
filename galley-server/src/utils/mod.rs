//! Utility modules

pub mod ids;
pub mod logger;

pub use ids::{IdSource, UuidSource};

// Re-export unified error types from shared
pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
