//! Booking lifecycle model
//!
//! A booking is a farmer-initiated pickup request. Status moves through an
//! explicit transition table; anything not in the table is rejected by the
//! backend with an invalid-state error.

use serde::{Deserialize, Serialize};

/// Booking lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Open,
    Routed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Open => "open",
            BookingStatus::Routed => "routed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(BookingStatus::Open),
            "routed" => Some(BookingStatus::Routed),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    /// Transition table for the booking lifecycle.
    ///
    /// open → routed → completed, with cancellation allowed from open and
    /// routed only. completed and cancelled are terminal.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Open, Routed) | (Routed, Completed) | (Open, Cancelled) | (Routed, Cancelled)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_can_be_routed_or_cancelled() {
        assert!(BookingStatus::Open.can_transition_to(BookingStatus::Routed));
        assert!(BookingStatus::Open.can_transition_to(BookingStatus::Cancelled));
        assert!(!BookingStatus::Open.can_transition_to(BookingStatus::Completed));
    }

    #[test]
    fn routed_can_complete_or_cancel() {
        assert!(BookingStatus::Routed.can_transition_to(BookingStatus::Completed));
        assert!(BookingStatus::Routed.can_transition_to(BookingStatus::Cancelled));
        assert!(!BookingStatus::Routed.can_transition_to(BookingStatus::Open));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for next in [
            BookingStatus::Open,
            BookingStatus::Routed,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
        ] {
            assert!(!BookingStatus::Completed.can_transition_to(next));
            assert!(!BookingStatus::Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            BookingStatus::Open,
            BookingStatus::Routed,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(BookingStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::from_str("pending"), None);
    }
}
