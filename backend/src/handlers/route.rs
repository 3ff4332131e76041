//! Route HTTP handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::external::TripOptimizerClient;
use crate::middleware::{require_role, AuthUser, CurrentUser, Role};
use crate::services::route::{AssembleRouteInput, RouteService};
use crate::AppState;
use shared::GpsCoordinates;

/// Query parameters for fetching a route
#[derive(Debug, Deserialize)]
pub struct RouteQuery {
    pub date: NaiveDate,
    /// Required for admins; buyers see their own route
    pub buyer_id: Option<Uuid>,
}

/// Assemble the buyer's route for a date
pub async fn assemble_route(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<AssembleRouteInput>,
) -> impl IntoResponse {
    if let Err(response) = require_role(&current_user.0, &[Role::Buyer]) {
        return response;
    }

    let service = route_service(&state);

    match service.assemble_route(&current_user.0, input).await {
        Ok(route) => (StatusCode::CREATED, Json(route)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a route with its ordered stops
pub async fn get_route(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<RouteQuery>,
) -> impl IntoResponse {
    let buyer_id = match resolve_buyer(&current_user.0, query.buyer_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let service = route_service(&state);

    match service.get_route(buyer_id, query.date).await {
        Ok(route) => (StatusCode::OK, Json(route)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Build the route service with the configured optimizer and hub location
fn route_service(state: &AppState) -> RouteService {
    let optimizer = TripOptimizerClient::new(
        state.config.optimizer.base_url.clone(),
        state.config.optimizer.timeout_seconds,
    );
    let hub = GpsCoordinates::new(
        Decimal::from_f64_retain(state.config.optimizer.hub_latitude).unwrap_or_default(),
        Decimal::from_f64_retain(state.config.optimizer.hub_longitude).unwrap_or_default(),
    );
    RouteService::new(state.db.clone(), optimizer, hub)
}

/// Buyers act as themselves; admins must name the buyer
pub(crate) fn resolve_buyer(
    user: &AuthUser,
    buyer_id: Option<Uuid>,
) -> Result<Uuid, axum::response::Response> {
    match user.role {
        Role::Buyer => Ok(user.user_id),
        _ => buyer_id.ok_or_else(|| {
            crate::error::AppError::Validation {
                field: "buyer_id".to_string(),
                message: "buyer_id is required".to_string(),
            }
            .into_response()
        }),
    }
}
