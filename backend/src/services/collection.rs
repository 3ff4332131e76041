//! Collection recorder service
//!
//! Captures the geotagged chit a buyer produces at each visited stop. The
//! chit, its line items, and the booking's completed transition land in one
//! transaction; the unique constraint on route_stop_id is the guard against
//! a duplicate or racing second collection at the same stop.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{AuthUser, Role};
use crate::services::{AuditService, BookingService};
use shared::{chit_total_weight, validate_commodity_name, validate_weight, ChitLine, GpsCoordinates};

/// Collection service for recording chits at route stops
#[derive(Clone)]
pub struct CollectionService {
    db: PgPool,
}

/// Collection chit information
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CollectionChit {
    pub id: Uuid,
    pub route_stop_id: Uuid,
    pub buyer_id: Uuid,
    pub farmer_id: Uuid,
    pub collection_date: NaiveDate,
    pub latitude: Decimal,
    pub longitude: Decimal,
    pub total_weight_kg: Decimal,
    pub is_priced: bool,
    pub collected_at: DateTime<Utc>,
}

/// Collection item line
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CollectionItem {
    pub id: Uuid,
    pub chit_id: Uuid,
    pub commodity_name: String,
    pub weight_kg: Decimal,
}

/// Chit with its line items
#[derive(Debug, Clone, Serialize)]
pub struct ChitWithItems {
    #[serde(flatten)]
    pub chit: CollectionChit,
    pub items: Vec<CollectionItem>,
}

/// Input for recording a collection
#[derive(Debug, Deserialize)]
pub struct RecordCollectionInput {
    pub route_stop_id: Uuid,
    pub items: Vec<ChitLine>,
    pub location: Option<GpsCoordinates>,
}

/// Query filter for listing chits
#[derive(Debug, Default, Deserialize)]
pub struct ChitFilter {
    pub date: Option<NaiveDate>,
    pub buyer_id: Option<Uuid>,
    pub farmer_id: Option<Uuid>,
    pub is_priced: Option<bool>,
}

/// Stop context needed to attach a chit
#[derive(Debug, sqlx::FromRow)]
struct StopContext {
    booking_id: Uuid,
    buyer_id: Uuid,
    route_date: NaiveDate,
    farmer_id: Uuid,
}

impl CollectionService {
    /// Create a new CollectionService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a collection chit for a visited route stop.
    pub async fn record_collection(
        &self,
        actor: &AuthUser,
        input: RecordCollectionInput,
    ) -> AppResult<ChitWithItems> {
        if input.items.is_empty() {
            return Err(AppError::Validation {
                field: "items".to_string(),
                message: "At least one collected item is required".to_string(),
            });
        }

        for item in &input.items {
            validate_commodity_name(&item.commodity_name).map_err(|msg| AppError::Validation {
                field: "items".to_string(),
                message: msg.to_string(),
            })?;
            validate_weight(item.weight_kg).map_err(|msg| AppError::Validation {
                field: "items".to_string(),
                message: format!("{} ({})", msg, item.commodity_name),
            })?;
        }

        let location = input.location.ok_or_else(|| AppError::Validation {
            field: "location".to_string(),
            message: "Collection location is required".to_string(),
        })?;

        let stop = sqlx::query_as::<_, StopContext>(
            r#"
            SELECT rs.booking_id, r.buyer_id, r.route_date, b.farmer_id
            FROM route_stops rs
            JOIN routes r ON r.id = rs.route_id
            JOIN bookings b ON b.id = rs.booking_id
            WHERE rs.id = $1
            "#,
        )
        .bind(input.route_stop_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Route stop".to_string()))?;

        if actor.role == Role::Buyer && stop.buyer_id != actor.user_id {
            return Err(AppError::Forbidden(
                "Route stop belongs to another buyer".to_string(),
            ));
        }

        let total_weight = chit_total_weight(&input.items);

        let mut tx = self.db.begin().await?;

        let chit_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO collection_chits
                (route_stop_id, buyer_id, farmer_id, collection_date, latitude, longitude,
                 total_weight_kg, is_priced)
            VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE)
            RETURNING id
            "#,
        )
        .bind(input.route_stop_id)
        .bind(stop.buyer_id)
        .bind(stop.farmer_id)
        .bind(stop.route_date)
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(total_weight)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::conflict_on_unique(
                e,
                "collection_chit",
                "A collection is already recorded for this stop",
            )
        })?;

        for item in &input.items {
            sqlx::query(
                r#"
                INSERT INTO collection_items (chit_id, commodity_name, weight_kg)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(chit_id)
            .bind(item.commodity_name.trim())
            .bind(item.weight_kg)
            .execute(&mut *tx)
            .await?;
        }

        BookingService::mark_completed(&mut tx, stop.booking_id).await?;

        tx.commit().await?;

        AuditService::new(self.db.clone()).emit(
            actor.user_id,
            "collection.recorded",
            "collection_chit",
            chit_id,
        );

        self.get_chit(chit_id).await
    }

    /// Get a chit with its items
    pub async fn get_chit(&self, chit_id: Uuid) -> AppResult<ChitWithItems> {
        let chit = sqlx::query_as::<_, CollectionChit>(
            r#"
            SELECT id, route_stop_id, buyer_id, farmer_id, collection_date,
                   latitude, longitude, total_weight_kg, is_priced, collected_at
            FROM collection_chits
            WHERE id = $1
            "#,
        )
        .bind(chit_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Collection chit".to_string()))?;

        let items = sqlx::query_as::<_, CollectionItem>(
            r#"
            SELECT id, chit_id, commodity_name, weight_kg
            FROM collection_items
            WHERE chit_id = $1
            ORDER BY commodity_name
            "#,
        )
        .bind(chit_id)
        .fetch_all(&self.db)
        .await?;

        Ok(ChitWithItems { chit, items })
    }

    /// List chits filtered by date, buyer, farmer, and pricing state
    pub async fn list_chits(&self, filter: ChitFilter) -> AppResult<Vec<CollectionChit>> {
        let chits = sqlx::query_as::<_, CollectionChit>(
            r#"
            SELECT id, route_stop_id, buyer_id, farmer_id, collection_date,
                   latitude, longitude, total_weight_kg, is_priced, collected_at
            FROM collection_chits
            WHERE ($1::date IS NULL OR collection_date = $1)
              AND ($2::uuid IS NULL OR buyer_id = $2)
              AND ($3::uuid IS NULL OR farmer_id = $3)
              AND ($4::boolean IS NULL OR is_priced = $4)
            ORDER BY collected_at DESC
            "#,
        )
        .bind(filter.date)
        .bind(filter.buyer_id)
        .bind(filter.farmer_id)
        .bind(filter.is_priced)
        .fetch_all(&self.db)
        .await?;

        Ok(chits)
    }
}
