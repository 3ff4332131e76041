//! Collection HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::middleware::{require_role, CurrentUser, Role};
use crate::services::collection::{ChitFilter, CollectionService, RecordCollectionInput};
use crate::AppState;

/// Record a collection chit at a route stop
pub async fn record_collection(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecordCollectionInput>,
) -> impl IntoResponse {
    if let Err(response) = require_role(&current_user.0, &[Role::Buyer, Role::Admin]) {
        return response;
    }

    let service = CollectionService::new(state.db.clone());

    match service.record_collection(&current_user.0, input).await {
        Ok(chit) => (StatusCode::CREATED, Json(chit)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a chit with its items
pub async fn get_chit(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(chit_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = CollectionService::new(state.db.clone());

    match service.get_chit(chit_id).await {
        Ok(chit) => (StatusCode::OK, Json(chit)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// List chits filtered by date, buyer, farmer, and pricing state
pub async fn list_chits(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<ChitFilter>,
) -> impl IntoResponse {
    let service = CollectionService::new(state.db.clone());

    match service.list_chits(filter).await {
        Ok(chits) => (
            StatusCode::OK,
            Json(serde_json::json!({ "chits": chits })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
