//! Ledger HTTP handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::handlers::route::resolve_buyer;
use crate::middleware::{require_role, CurrentUser, Role};
use crate::services::ledger::{LedgerService, RecordPaymentInput};
use crate::AppState;

/// Query parameters for balance and statement lookups
#[derive(Debug, Deserialize)]
pub struct PairQuery {
    /// Required for admins; buyers query their own ledger
    pub buyer_id: Option<Uuid>,
    pub farmer_id: Uuid,
}

/// Query parameters for listing payments
#[derive(Debug, Default, Deserialize)]
pub struct PaymentQuery {
    pub buyer_id: Option<Uuid>,
    pub farmer_id: Option<Uuid>,
}

/// Record a payment against a pair's outstanding balance
pub async fn record_payment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecordPaymentInput>,
) -> impl IntoResponse {
    if let Err(response) = require_role(&current_user.0, &[Role::Buyer, Role::Admin]) {
        return response;
    }

    let service = LedgerService::new(state.db.clone());

    match service.record_payment(&current_user.0, input).await {
        Ok(payment) => (StatusCode::CREATED, Json(payment)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Outstanding balance for a (buyer, farmer) pair
pub async fn get_outstanding_balance(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<PairQuery>,
) -> impl IntoResponse {
    let buyer_id = match resolve_buyer(&current_user.0, query.buyer_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let service = LedgerService::new(state.db.clone());

    match service.get_outstanding_balance(buyer_id, query.farmer_id).await {
        Ok(balance) => (StatusCode::OK, Json(balance)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Full statement for a (buyer, farmer) pair
pub async fn get_statement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<PairQuery>,
) -> impl IntoResponse {
    let buyer_id = match resolve_buyer(&current_user.0, query.buyer_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let service = LedgerService::new(state.db.clone());

    match service.get_statement(buyer_id, query.farmer_id).await {
        Ok(statement) => (StatusCode::OK, Json(statement)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// List payments, optionally filtered by buyer and farmer
pub async fn list_payments(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<PaymentQuery>,
) -> impl IntoResponse {
    let service = LedgerService::new(state.db.clone());

    match service.list_payments(query.buyer_id, query.farmer_id).await {
        Ok(payments) => (
            StatusCode::OK,
            Json(serde_json::json!({ "payments": payments })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
