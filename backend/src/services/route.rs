//! Route assembly service
//!
//! Groups a buyer's open bookings for a date into an ordered visit sequence.
//! The visit order and aggregate distance come from the external trip
//! optimizer; this service only persists what comes back. The optimizer is
//! called before any row is written, so a timeout leaves no partial route.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::trip_optimizer::{OptimizeStop, TripOptimizerClient};
use crate::middleware::AuthUser;
use crate::services::{AuditService, BookingService};
use shared::{BookingStatus, GpsCoordinates};

/// Route service for assembling and reading daily pickup routes
#[derive(Clone)]
pub struct RouteService {
    db: PgPool,
    optimizer: TripOptimizerClient,
    hub: GpsCoordinates,
}

/// Route information
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Route {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub route_date: NaiveDate,
    pub status: String,
    pub total_distance_km: Decimal,
    pub total_duration_minutes: i32,
    pub created_at: DateTime<Utc>,
}

/// One stop of a route joined with its booking and farmer
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RouteStopDetail {
    pub id: Uuid,
    pub sequence_order: i32,
    pub booking_id: Uuid,
    pub farmer_id: Uuid,
    pub farmer_name: String,
    pub commodity_name: String,
    pub estimated_weight_kg: Decimal,
    pub latitude: Decimal,
    pub longitude: Decimal,
}

/// Route with its ordered stops
#[derive(Debug, Clone, Serialize)]
pub struct RouteWithStops {
    #[serde(flatten)]
    pub route: Route,
    pub stops: Vec<RouteStopDetail>,
}

/// Input for assembling a route
#[derive(Debug, Deserialize)]
pub struct AssembleRouteInput {
    pub route_date: NaiveDate,
    pub booking_ids: Vec<Uuid>,
}

/// Booking row joined with farmer coordinates, used for optimizer input
#[derive(Debug, sqlx::FromRow)]
struct RoutableBooking {
    id: Uuid,
    booking_date: NaiveDate,
    status: String,
    latitude: Decimal,
    longitude: Decimal,
}

impl RouteService {
    /// Create a new RouteService instance
    pub fn new(db: PgPool, optimizer: TripOptimizerClient, hub: GpsCoordinates) -> Self {
        Self { db, optimizer, hub }
    }

    /// Assemble the buyer's route for a date from a set of open bookings.
    pub async fn assemble_route(
        &self,
        actor: &AuthUser,
        input: AssembleRouteInput,
    ) -> AppResult<RouteWithStops> {
        let buyer_id = actor.user_id;

        if input.booking_ids.is_empty() {
            return Err(AppError::Validation {
                field: "booking_ids".to_string(),
                message: "At least one booking is required".to_string(),
            });
        }

        let unique: HashSet<Uuid> = input.booking_ids.iter().copied().collect();
        if unique.len() != input.booking_ids.len() {
            return Err(AppError::Validation {
                field: "booking_ids".to_string(),
                message: "Duplicate booking ids".to_string(),
            });
        }

        // One route per (buyer, date); the insert below re-checks under the
        // unique constraint
        let existing = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM routes WHERE buyer_id = $1 AND route_date = $2",
        )
        .bind(buyer_id)
        .bind(input.route_date)
        .fetch_optional(&self.db)
        .await?;

        if let Some(route_id) = existing {
            return Err(AppError::Conflict {
                resource: "route".to_string(),
                message: format!(
                    "A route already exists for this buyer and date (route {})",
                    route_id
                ),
            });
        }

        let bookings = sqlx::query_as::<_, RoutableBooking>(
            r#"
            SELECT b.id, b.booking_date, b.status, f.latitude, f.longitude
            FROM bookings b
            JOIN farmers f ON f.id = b.farmer_id
            WHERE b.id = ANY($1)
            "#,
        )
        .bind(&input.booking_ids)
        .fetch_all(&self.db)
        .await?;

        if bookings.len() != input.booking_ids.len() {
            let found: HashSet<Uuid> = bookings.iter().map(|b| b.id).collect();
            let missing = input
                .booking_ids
                .iter()
                .find(|id| !found.contains(id))
                .copied()
                .unwrap_or_default();
            return Err(AppError::NotFound(format!("Booking {}", missing)));
        }

        for booking in &bookings {
            if booking.booking_date != input.route_date {
                return Err(AppError::Validation {
                    field: "booking_ids".to_string(),
                    message: format!(
                        "Booking {} is dated {}, not {}",
                        booking.id, booking.booking_date, input.route_date
                    ),
                });
            }
            if BookingStatus::from_str(&booking.status) != Some(BookingStatus::Open) {
                return Err(AppError::InvalidState {
                    entity: "booking".to_string(),
                    current: booking.status.clone(),
                    message: format!("Booking {} is not open", booking.id),
                });
            }
        }

        // External call happens before any write; a timeout leaves nothing
        // to roll back
        let stops: Vec<OptimizeStop> = bookings
            .iter()
            .map(|b| OptimizeStop {
                reference: b.id,
                location: GpsCoordinates::new(b.latitude, b.longitude),
            })
            .collect();

        let optimized = self.optimizer.optimize(self.hub, &stops).await?;

        let mut tx = self.db.begin().await?;

        let route_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO routes (buyer_id, route_date, status, total_distance_km, total_duration_minutes)
            VALUES ($1, $2, 'planned', $3, $4)
            RETURNING id
            "#,
        )
        .bind(buyer_id)
        .bind(input.route_date)
        .bind(optimized.total_distance_km)
        .bind(optimized.total_duration_minutes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::conflict_on_unique(e, "route", "A route already exists for this buyer and date")
        })?;

        for (index, booking_id) in optimized.ordered_stops.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO route_stops (route_id, booking_id, sequence_order)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(route_id)
            .bind(booking_id)
            .bind((index + 1) as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::conflict_on_unique(e, "route_stop", "Booking is already on a route")
            })?;
        }

        BookingService::mark_routed(&mut tx, &input.booking_ids).await?;

        tx.commit().await?;

        AuditService::new(self.db.clone()).emit(actor.user_id, "route.assembled", "route", route_id);

        self.get_route(buyer_id, input.route_date).await
    }

    /// Get the buyer's route for a date with its ordered stops
    pub async fn get_route(&self, buyer_id: Uuid, date: NaiveDate) -> AppResult<RouteWithStops> {
        let route = sqlx::query_as::<_, Route>(
            r#"
            SELECT id, buyer_id, route_date, status, total_distance_km,
                   total_duration_minutes, created_at
            FROM routes
            WHERE buyer_id = $1 AND route_date = $2
            "#,
        )
        .bind(buyer_id)
        .bind(date)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Route".to_string()))?;

        let stops = sqlx::query_as::<_, RouteStopDetail>(
            r#"
            SELECT rs.id, rs.sequence_order, rs.booking_id, b.farmer_id, f.name AS farmer_name,
                   b.commodity_name, b.estimated_weight_kg, f.latitude, f.longitude
            FROM route_stops rs
            JOIN bookings b ON b.id = rs.booking_id
            JOIN farmers f ON f.id = b.farmer_id
            WHERE rs.route_id = $1
            ORDER BY rs.sequence_order
            "#,
        )
        .bind(route.id)
        .fetch_all(&self.db)
        .await?;

        Ok(RouteWithStops { route, stops })
    }
}
