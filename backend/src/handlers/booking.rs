//! Booking HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::middleware::{require_role, CurrentUser, Role};
use crate::services::booking::{BookingFilter, BookingService, CreateBookingInput};
use crate::AppState;

/// List bookings filtered by date, farmer, and status
pub async fn list_bookings(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<BookingFilter>,
) -> impl IntoResponse {
    let service = BookingService::new(state.db.clone(), state.config.pickup.clone());

    match service.list_bookings(filter).await {
        Ok(bookings) => (
            StatusCode::OK,
            Json(serde_json::json!({ "bookings": bookings })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a specific booking
pub async fn get_booking(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(booking_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = BookingService::new(state.db.clone(), state.config.pickup.clone());

    match service.get_booking(booking_id).await {
        Ok(booking) => (StatusCode::OK, Json(booking)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Create a pickup booking
pub async fn create_booking(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateBookingInput>,
) -> impl IntoResponse {
    if let Err(response) = require_role(&current_user.0, &[Role::Farmer, Role::Admin]) {
        return response;
    }

    let service = BookingService::new(state.db.clone(), state.config.pickup.clone());

    match service.create_booking(&current_user.0, input).await {
        Ok(booking) => (StatusCode::CREATED, Json(booking)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Cancel a booking
pub async fn cancel_booking(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(booking_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(response) = require_role(&current_user.0, &[Role::Farmer, Role::Admin]) {
        return response;
    }

    let service = BookingService::new(state.db.clone(), state.config.pickup.clone());

    match service.cancel_booking(&current_user.0, booking_id).await {
        Ok(booking) => (StatusCode::OK, Json(booking)).into_response(),
        Err(e) => e.into_response(),
    }
}
