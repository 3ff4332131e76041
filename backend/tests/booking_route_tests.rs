//! Booking and route lifecycle tests
//!
//! Covers the booking/route transition tables, the cancellation cutoff
//! arithmetic, and the route assembler's handling of optimizer orderings.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use proptest::prelude::*;
use uuid::Uuid;

use shared::{BookingStatus, RouteStatus};

// ============================================================================
// Helper Functions (mirroring service implementations)
// ============================================================================

/// Cancellation deadline: departure time on the booking date minus the cutoff
fn cancellation_deadline(
    booking_date: NaiveDate,
    departure_time: &str,
    cutoff_hours: i64,
) -> Option<NaiveDateTime> {
    let departure = NaiveTime::parse_from_str(departure_time, "%H:%M").ok()?;
    Some(NaiveDateTime::new(booking_date, departure) - Duration::hours(cutoff_hours))
}

/// The optimizer's ordering must be a permutation of the submitted stops
fn is_valid_ordering(order: &[Uuid], submitted: &HashSet<Uuid>) -> bool {
    let returned: HashSet<Uuid> = order.iter().copied().collect();
    returned.len() == order.len() && returned == *submitted
}

const ALL_BOOKING_STATUSES: [BookingStatus; 4] = [
    BookingStatus::Open,
    BookingStatus::Routed,
    BookingStatus::Completed,
    BookingStatus::Cancelled,
];

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// Once cancelled or completed, a booking accepts no further transition.
    #[test]
    fn terminal_booking_statuses_stay_terminal(target in 0..4usize) {
        let next = ALL_BOOKING_STATUSES[target];
        prop_assert!(!BookingStatus::Completed.can_transition_to(next));
        prop_assert!(!BookingStatus::Cancelled.can_transition_to(next));
    }

    /// No transition sequence ever returns a booking to open.
    #[test]
    fn no_path_leads_back_to_open(from in 0..4usize) {
        let status = ALL_BOOKING_STATUSES[from];
        prop_assert!(!status.can_transition_to(BookingStatus::Open));
    }

    /// Earlier cutoffs always move the deadline earlier.
    #[test]
    fn deadline_is_monotonic_in_the_cutoff(
        days in 0..365i64,
        cutoff_a in 0..48i64,
        cutoff_b in 0..48i64,
    ) {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + Duration::days(days);
        let a = cancellation_deadline(date, "06:00", cutoff_a).unwrap();
        let b = cancellation_deadline(date, "06:00", cutoff_b).unwrap();

        prop_assert_eq!(a < b, cutoff_a > cutoff_b);
        prop_assert_eq!(a == b, cutoff_a == cutoff_b);
    }

    /// Shuffled orderings of the submitted stops are accepted; orderings with
    /// foreign, missing, or duplicated stops are not.
    #[test]
    fn ordering_validation_accepts_exactly_permutations(count in 1..12usize) {
        let stops: Vec<Uuid> = (0..count).map(|_| Uuid::new_v4()).collect();
        let submitted: HashSet<Uuid> = stops.iter().copied().collect();

        let mut reversed = stops.clone();
        reversed.reverse();
        prop_assert!(is_valid_ordering(&reversed, &submitted));

        let missing = &stops[1..];
        prop_assert!(count == 1 || !is_valid_ordering(missing, &submitted));

        let mut duplicated = stops.clone();
        duplicated.push(stops[0]);
        prop_assert!(!is_valid_ordering(&duplicated, &submitted));

        let mut foreign = stops.clone();
        foreign[0] = Uuid::new_v4();
        prop_assert!(!is_valid_ordering(&foreign, &submitted));
    }
}

// ============================================================================
// Unit Tests: Booking Lifecycle
// ============================================================================

#[cfg(test)]
mod lifecycle_tests {
    use super::*;

    #[test]
    fn the_happy_path_is_open_routed_completed() {
        assert!(BookingStatus::Open.can_transition_to(BookingStatus::Routed));
        assert!(BookingStatus::Routed.can_transition_to(BookingStatus::Completed));
    }

    #[test]
    fn cancellation_is_allowed_from_open_and_routed_only() {
        assert!(BookingStatus::Open.can_transition_to(BookingStatus::Cancelled));
        assert!(BookingStatus::Routed.can_transition_to(BookingStatus::Cancelled));
        assert!(!BookingStatus::Completed.can_transition_to(BookingStatus::Cancelled));
    }

    #[test]
    fn open_cannot_skip_straight_to_completed() {
        assert!(!BookingStatus::Open.can_transition_to(BookingStatus::Completed));
    }

    #[test]
    fn route_lifecycle_is_strictly_forward() {
        assert!(RouteStatus::Planned.can_transition_to(RouteStatus::InProgress));
        assert!(RouteStatus::InProgress.can_transition_to(RouteStatus::Completed));
        assert!(!RouteStatus::Planned.can_transition_to(RouteStatus::Completed));
        assert!(!RouteStatus::Completed.can_transition_to(RouteStatus::InProgress));
    }
}

// ============================================================================
// Unit Tests: Cancellation Cutoff
// ============================================================================

#[cfg(test)]
mod cutoff_tests {
    use super::*;

    #[test]
    fn twelve_hour_cutoff_before_six_am_departure() {
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
    fn malformed_departure_time_yields_no_deadline() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 14).unwrap();
        assert!(cancellation_deadline(date, "six", 12).is_none());
    }
}
