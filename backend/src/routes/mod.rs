//! Route definitions for the FarmGate API

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - booking registry
        .nest("/bookings", booking_routes())
        // Protected routes - route assembly
        .nest("/routes", route_routes())
        // Protected routes - collection recording
        .nest("/collections", collection_routes())
        // Protected routes - daily pricing
        .nest("/prices", pricing_routes())
        // Protected routes - invoices
        .nest("/invoices", invoice_routes())
        // Protected routes - ledger
        .nest("/ledger", ledger_routes())
}

/// Booking registry routes (protected)
fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_bookings).post(handlers::create_booking))
        .route("/:booking_id", get(handlers::get_booking))
        .route("/:booking_id/cancel", post(handlers::cancel_booking))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Route assembly routes (protected)
fn route_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_route).post(handlers::assemble_route))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Collection recording routes (protected)
fn collection_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_chits).post(handlers::record_collection))
        .route("/:chit_id", get(handlers::get_chit))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Daily pricing routes (protected)
fn pricing_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_daily_prices).post(handlers::set_daily_prices))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Invoice routes (protected)
fn invoice_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_invoices))
        .route("/:invoice_id", get(handlers::get_invoice))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Ledger routes (protected)
fn ledger_routes() -> Router<AppState> {
    Router::new()
        .route("/payments", get(handlers::list_payments).post(handlers::record_payment))
        .route("/balance", get(handlers::get_outstanding_balance))
        .route("/statement", get(handlers::get_statement))
        .route_layer(middleware::from_fn(auth_middleware))
}
