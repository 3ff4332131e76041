//! Booking registry service for farmer pickup requests
//!
//! Bookings follow the explicit lifecycle table in `shared::models::booking`.
//! The route assembler and collection recorder drive the routed/completed
//! transitions through the conditional helpers at the bottom; any update
//! whose row count disagrees with the request is an illegal transition.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::config::PickupConfig;
use crate::error::{AppError, AppResult};
use crate::middleware::{AuthUser, Role};
use crate::services::AuditService;
use shared::{validate_commodity_name, validate_weight, BookingStatus};

/// Booking service for managing pickup requests
#[derive(Clone)]
pub struct BookingService {
    db: PgPool,
    pickup: PickupConfig,
}

/// Booking information
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub booking_date: NaiveDate,
    pub commodity_name: String,
    pub estimated_weight_kg: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a booking
#[derive(Debug, Deserialize)]
pub struct CreateBookingInput {
    /// Required when an admin books on a farmer's behalf; farmers book for
    /// themselves
    pub farmer_id: Option<Uuid>,
    pub booking_date: NaiveDate,
    pub commodity_name: String,
    pub estimated_weight_kg: Decimal,
}

/// Query filter for listing bookings
#[derive(Debug, Default, Deserialize)]
pub struct BookingFilter {
    pub date: Option<NaiveDate>,
    pub farmer_id: Option<Uuid>,
    pub status: Option<String>,
}

impl BookingService {
    /// Create a new BookingService instance
    pub fn new(db: PgPool, pickup: PickupConfig) -> Self {
        Self { db, pickup }
    }

    /// Create a booking in OPEN status
    pub async fn create_booking(
        &self,
        actor: &AuthUser,
        input: CreateBookingInput,
    ) -> AppResult<Booking> {
        let farmer_id = match actor.role {
            Role::Farmer => actor.user_id,
            _ => input.farmer_id.ok_or_else(|| AppError::Validation {
                field: "farmer_id".to_string(),
                message: "farmer_id is required when booking on a farmer's behalf".to_string(),
            })?,
        };

        if input.booking_date < Utc::now().date_naive() {
            return Err(AppError::Validation {
                field: "booking_date".to_string(),
                message: "Booking date cannot be in the past".to_string(),
            });
        }

        validate_commodity_name(&input.commodity_name).map_err(|msg| AppError::Validation {
            field: "commodity_name".to_string(),
            message: msg.to_string(),
        })?;

        validate_weight(input.estimated_weight_kg).map_err(|msg| AppError::Validation {
            field: "estimated_weight_kg".to_string(),
            message: msg.to_string(),
        })?;

        // The farmer must exist; the route assembler later reads its coordinates
        let farmer_exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM farmers WHERE id = $1",
        )
        .bind(farmer_id)
        .fetch_one(&self.db)
        .await?;

        if farmer_exists == 0 {
            return Err(AppError::NotFound("Farmer".to_string()));
        }

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (farmer_id, booking_date, commodity_name, estimated_weight_kg, status)
            VALUES ($1, $2, $3, $4, 'open')
            RETURNING id, farmer_id, booking_date, commodity_name, estimated_weight_kg,
                      status, created_at, updated_at
            "#,
        )
        .bind(farmer_id)
        .bind(input.booking_date)
        .bind(input.commodity_name.trim())
        .bind(input.estimated_weight_kg)
        .fetch_one(&self.db)
        .await?;

        AuditService::new(self.db.clone()).emit(actor.user_id, "booking.created", "booking", booking.id);

        Ok(booking)
    }

    /// Cancel a booking.
    ///
    /// Only OPEN and ROUTED bookings may be cancelled, and only before the
    /// configured cutoff ahead of the day's departure time.
    pub async fn cancel_booking(&self, actor: &AuthUser, booking_id: Uuid) -> AppResult<Booking> {
        let booking = self.get_booking(booking_id).await?;

        if actor.role == Role::Farmer && booking.farmer_id != actor.user_id {
            return Err(AppError::Forbidden(
                "Booking belongs to another farmer".to_string(),
            ));
        }

        let status = BookingStatus::from_str(&booking.status).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("Unknown booking status: {}", booking.status))
        })?;

        if !status.can_transition_to(BookingStatus::Cancelled) {
            return Err(AppError::InvalidState {
                entity: "booking".to_string(),
                current: booking.status.clone(),
                message: "Only open or routed bookings can be cancelled".to_string(),
            });
        }

        let deadline = cancellation_deadline(
            booking.booking_date,
            &self.pickup.departure_time,
            self.pickup.cancellation_cutoff_hours,
        )?;

        if Utc::now().naive_utc() >= deadline {
            return Err(AppError::InvalidState {
                entity: "booking".to_string(),
                current: booking.status.clone(),
                message: format!("Cancellation window closed at {}", deadline),
            });
        }

        // Conditional update: a racing route assembly or collection loses here
        let cancelled = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = 'cancelled', updated_at = NOW()
            WHERE id = $1 AND status IN ('open', 'routed')
            RETURNING id, farmer_id, booking_date, commodity_name, estimated_weight_kg,
                      status, created_at, updated_at
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::InvalidState {
            entity: "booking".to_string(),
            current: booking.status,
            message: "Booking changed state while cancelling".to_string(),
        })?;

        AuditService::new(self.db.clone()).emit(actor.user_id, "booking.cancelled", "booking", booking_id);

        Ok(cancelled)
    }

    /// Get a booking by ID
    pub async fn get_booking(&self, booking_id: Uuid) -> AppResult<Booking> {
        sqlx::query_as::<_, Booking>(
            r#"
            SELECT id, farmer_id, booking_date, commodity_name, estimated_weight_kg,
                   status, created_at, updated_at
            FROM bookings
            WHERE id = $1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking".to_string()))
    }

    /// List bookings filtered by date, farmer, and status
    pub async fn list_bookings(&self, filter: BookingFilter) -> AppResult<Vec<Booking>> {
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT id, farmer_id, booking_date, commodity_name, estimated_weight_kg,
                   status, created_at, updated_at
            FROM bookings
            WHERE ($1::date IS NULL OR booking_date = $1)
              AND ($2::uuid IS NULL OR farmer_id = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY booking_date DESC, created_at DESC
            "#,
        )
        .bind(filter.date)
        .bind(filter.farmer_id)
        .bind(filter.status)
        .fetch_all(&self.db)
        .await?;

        Ok(bookings)
    }

    /// Transition a set of OPEN bookings to ROUTED inside the caller's
    /// transaction. Fails if any booking is not OPEN.
    pub async fn mark_routed(
        tx: &mut Transaction<'_, Postgres>,
        booking_ids: &[Uuid],
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE bookings SET status = 'routed', updated_at = NOW() WHERE id = ANY($1) AND status = 'open'",
        )
        .bind(booking_ids)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() != booking_ids.len() as u64 {
            return Err(AppError::InvalidState {
                entity: "booking".to_string(),
                current: "mixed".to_string(),
                message: "One or more bookings are no longer open".to_string(),
            });
        }
        Ok(())
    }

    /// Transition a ROUTED booking to COMPLETED inside the caller's
    /// transaction.
    pub async fn mark_completed(
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE bookings SET status = 'completed', updated_at = NOW() WHERE id = $1 AND status = 'routed'",
        )
        .bind(booking_id)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() != 1 {
            return Err(AppError::InvalidState {
                entity: "booking".to_string(),
                current: "unknown".to_string(),
                message: "Booking is not in routed status".to_string(),
            });
        }
        Ok(())
    }
}

/// Latest moment at which a booking for `booking_date` may still be
/// cancelled: the day's departure time minus the configured cutoff.
pub fn cancellation_deadline(
    booking_date: NaiveDate,
    departure_time: &str,
    cutoff_hours: i64,
) -> AppResult<NaiveDateTime> {
    let departure = NaiveTime::parse_from_str(departure_time, "%H:%M").map_err(|e| {
        AppError::Internal(anyhow::anyhow!(
            "Invalid pickup.departure_time {:?}: {}",
            departure_time,
            e
        ))
    })?;

    Ok(NaiveDateTime::new(booking_date, departure) - Duration::hours(cutoff_hours))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_is_cutoff_hours_before_departure() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 14).unwrap();
        let deadline = cancellation_deadline(date, "06:00", 12).unwrap();
        assert_eq!(
            deadline,
            NaiveDate::from_ymd_opt(2025, 7, 13)
                .unwrap()
                .and_hms_opt(18, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn zero_cutoff_means_departure_itself() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 14).unwrap();
        let deadline = cancellation_deadline(date, "05:30", 0).unwrap();
        assert_eq!(deadline, date.and_hms_opt(5, 30, 0).unwrap());
    }

    #[test]
    fn malformed_departure_time_is_rejected() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 14).unwrap();
        assert!(cancellation_deadline(date, "6 am", 12).is_err());
    }
}
