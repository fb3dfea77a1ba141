//! HTTP route handlers.

pub mod bookings;
pub mod group_bookings;
pub mod health;
pub mod invitations;

use axum::{http::StatusCode, Json};
use serde::Serialize;

/// Success envelope. Errors use the matching `{success: false, ...}` body
/// rendered by [`crate::error::ApiError`].
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// 200 with the success envelope.
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::new(data))
}

/// 201 with the success envelope.
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::new(data)))
}
