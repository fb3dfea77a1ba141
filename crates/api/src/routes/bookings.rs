//! Booking routes: listing, creation, availability and status changes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::{
    AvailabilityQuery, Booking, CreateBookingRequest, ListBookingsQuery, TimeRange,
    UpdateBookingStatusRequest,
};
use domain::services::AvailabilityResult;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{created, ok, ApiResponse};
use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::metrics::record_booking_created;

/// List bookings.
///
/// GET /api/bookings?org_id=&resource_id=&status=&from=&to=&limit=
pub async fn list_bookings(
    State(state): State<AppState>,
    _user_auth: UserAuth,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<ApiResponse<Vec<Booking>>>, ApiError> {
    let bookings = state.bookings.list_bookings(query.into()).await?;
    Ok(ok(bookings))
}

/// Book a slot.
///
/// POST /api/bookings
///
/// The booking is confirmed immediately; an overlapping confirmed booking on
/// the same resource yields 409 with the conflicting ids.
pub async fn create_booking(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Booking>>), ApiError> {
    request.validate()?;

    let booking = state
        .bookings
        .create_booking(request, Some(user_auth.user_id.clone()))
        .await?;
    record_booking_created(false);

    info!(
        booking_id = %booking.id,
        user_id = %user_auth.user_id,
        "Booking created via API"
    );
    Ok(created(booking))
}

/// Check whether a resource is free.
///
/// GET /api/bookings/availability?resource_id=&start_time=&end_time=&exclude_booking_id=
pub async fn check_availability(
    State(state): State<AppState>,
    _user_auth: UserAuth,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<ApiResponse<AvailabilityResult>>, ApiError> {
    if query.resource_id.trim().is_empty() {
        return Err(ApiError::Validation("resource_id is required".to_string()));
    }
    let range = TimeRange::new(query.start_time, query.end_time)?;

    let result = state
        .bookings
        .is_available(&query.resource_id, range, query.exclude_booking_id)
        .await?;
    Ok(ok(result))
}

/// GET /api/bookings/:booking_id
pub async fn get_booking(
    State(state): State<AppState>,
    _user_auth: UserAuth,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Booking>>, ApiError> {
    let booking = state.bookings.get_booking(booking_id).await?;
    Ok(ok(booking))
}

/// Move a booking to another status.
///
/// PATCH /api/bookings/:booking_id/status
///
/// Only the booking's creator or group organizer may change its status.
pub async fn update_booking_status(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<UpdateBookingStatusRequest>,
) -> Result<Json<ApiResponse<Booking>>, ApiError> {
    let booking = state.bookings.get_booking(booking_id).await?;
    if !may_manage(&booking, &user_auth.user_id) {
        return Err(ApiError::Forbidden(
            "Only the booking owner can change its status".to_string(),
        ));
    }

    let updated = state
        .bookings
        .update_status(booking_id, request.status)
        .await?;
    Ok(ok(updated))
}

fn may_manage(booking: &Booking, user_id: &str) -> bool {
    booking.created_by.as_deref() == Some(user_id) || booking.is_organized_by(user_id)
}
