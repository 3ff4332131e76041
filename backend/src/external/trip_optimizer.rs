//! Trip optimizer client for route sequencing
//!
//! The backend never computes road distances or visit order itself. It sends
//! the hub location and the day's stop coordinates to an external
//! trip-optimization service and persists whatever ordering comes back.

use std::collections::HashSet;
use std::time::Duration;

use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::GpsCoordinates;

/// Trip optimizer API client
#[derive(Clone)]
pub struct TripOptimizerClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

/// One stop submitted for sequencing
#[derive(Debug, Clone)]
pub struct OptimizeStop {
    pub reference: Uuid,
    pub location: GpsCoordinates,
}

/// Optimizer result: the visit order plus aggregate distance and duration.
/// Treated as opaque beyond this shape.
#[derive(Debug, Clone)]
pub struct OptimizedRoute {
    pub ordered_stops: Vec<Uuid>,
    pub total_distance_km: Decimal,
    pub total_duration_minutes: i32,
}

/// Optimizer API request body
#[derive(Debug, Serialize)]
struct OptimizeRequest {
    hub: WirePoint,
    stops: Vec<WireStop>,
}

#[derive(Debug, Serialize)]
struct WirePoint {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Serialize)]
struct WireStop {
    id: Uuid,
    latitude: f64,
    longitude: f64,
}

/// Optimizer API response body
#[derive(Debug, Deserialize)]
struct OptimizeResponse {
    order: Vec<Uuid>,
    total_distance_km: f64,
    total_duration_minutes: i32,
}

impl TripOptimizerClient {
    /// Create a new TripOptimizerClient
    pub fn new(base_url: String, timeout_seconds: u64) -> Self {
        Self {
            client: Client::new(),
            base_url,
            timeout: Duration::from_secs(timeout_seconds),
        }
    }

    /// Request an optimized visit sequence for the given stops.
    ///
    /// Any transport failure, timeout, non-success status, or malformed body
    /// surfaces as `UpstreamUnavailable` so the caller can retry later; no
    /// partial route state exists at that point.
    pub async fn optimize(
        &self,
        hub: GpsCoordinates,
        stops: &[OptimizeStop],
    ) -> AppResult<OptimizedRoute> {
        let url = format!("{}/v1/optimize", self.base_url);

        let request = OptimizeRequest {
            hub: WirePoint {
                latitude: decimal_to_f64(hub.latitude),
                longitude: decimal_to_f64(hub.longitude),
            },
            stops: stops
                .iter()
                .map(|s| WireStop {
                    id: s.reference,
                    latitude: decimal_to_f64(s.location.latitude),
                    longitude: decimal_to_f64(s.location.longitude),
                })
                .collect(),
        };

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                AppError::UpstreamUnavailable(format!("Trip optimizer request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamUnavailable(format!(
                "Trip optimizer error: {} - {}",
                status, body
            )));
        }

        let data: OptimizeResponse = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("Failed to parse optimizer response: {}", e))
        })?;

        let submitted: HashSet<Uuid> = stops.iter().map(|s| s.reference).collect();
        validate_ordering(&data.order, &submitted)?;

        Ok(OptimizedRoute {
            ordered_stops: data.order,
            total_distance_km: Decimal::from_f64_retain(data.total_distance_km)
                .unwrap_or_default(),
            total_duration_minutes: data.total_duration_minutes,
        })
    }
}

/// The returned order must be a permutation of the submitted stops; anything
/// else would silently drop or invent a visit.
fn validate_ordering(order: &[Uuid], submitted: &HashSet<Uuid>) -> AppResult<()> {
    let returned: HashSet<Uuid> = order.iter().copied().collect();
    if returned.len() != order.len() || returned != *submitted {
        return Err(AppError::UpstreamUnavailable(
            "Trip optimizer returned an ordering that does not match the submitted stops"
                .to_string(),
        ));
    }
    Ok(())
}

fn decimal_to_f64(value: Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;
    value.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_must_match_submitted_stops() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let submitted: HashSet<Uuid> = [a, b].into_iter().collect();

        assert!(validate_ordering(&[b, a], &submitted).is_ok());
        assert!(validate_ordering(&[a], &submitted).is_err());
        assert!(validate_ordering(&[a, a], &submitted).is_err());
        assert!(validate_ordering(&[a, b, Uuid::new_v4()], &submitted).is_err());
    }
}
