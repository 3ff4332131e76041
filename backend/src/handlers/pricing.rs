//! Pricing and invoice HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::{require_role, CurrentUser, Role};
use crate::services::pricing::{InvoiceFilter, PricingService, SetDailyPricesInput};
use crate::AppState;

/// Query parameters for the daily price list
#[derive(Debug, Deserialize)]
pub struct PriceQuery {
    pub date: NaiveDate,
}

/// Set the day's prices and generate invoices from unpriced chits
pub async fn set_daily_prices(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<SetDailyPricesInput>,
) -> impl IntoResponse {
    if let Err(response) = require_role(&current_user.0, &[Role::Admin]) {
        return response;
    }

    let service = PricingService::new(state.db.clone());

    match service
        .set_daily_prices_and_generate_invoices(&current_user.0, input)
        .await
    {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// List the price set for a date
pub async fn list_daily_prices(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<PriceQuery>,
) -> impl IntoResponse {
    let service = PricingService::new(state.db.clone());

    match service.list_daily_prices(query.date).await {
        Ok(prices) => (
            StatusCode::OK,
            Json(serde_json::json!({ "prices": prices })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get an invoice with its line items
pub async fn get_invoice(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(invoice_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = PricingService::new(state.db.clone());

    match service.get_invoice(invoice_id).await {
        Ok(invoice) => (StatusCode::OK, Json(invoice)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// List invoices filtered by date, buyer, farmer, and status
pub async fn list_invoices(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<InvoiceFilter>,
) -> impl IntoResponse {
    let service = PricingService::new(state.db.clone());

    match service.list_invoices(filter).await {
        Ok(invoices) => (
            StatusCode::OK,
            Json(serde_json::json!({ "invoices": invoices })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
