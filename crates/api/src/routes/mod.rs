//! Route handlers.

pub mod checkout;
pub mod health;
pub mod metrics;

use axum::http::StatusCode;

/// Fallback for unknown paths.
pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "not found")
}
