//! Route lifecycle model

use serde::{Deserialize, Serialize};

/// Route lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Planned,
    InProgress,
    Completed,
}

impl RouteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStatus::Planned => "planned",
            RouteStatus::InProgress => "in_progress",
            RouteStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "planned" => Some(RouteStatus::Planned),
            "in_progress" => Some(RouteStatus::InProgress),
            "completed" => Some(RouteStatus::Completed),
            _ => None,
        }
    }

    /// planned → in_progress → completed, strictly forward.
    pub fn can_transition_to(&self, next: RouteStatus) -> bool {
        use RouteStatus::*;
        matches!(
            (self, next),
            (Planned, InProgress) | (InProgress, Completed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_moves_strictly_forward() {
        assert!(RouteStatus::Planned.can_transition_to(RouteStatus::InProgress));
        assert!(RouteStatus::InProgress.can_transition_to(RouteStatus::Completed));
        assert!(!RouteStatus::Completed.can_transition_to(RouteStatus::Planned));
        assert!(!RouteStatus::Planned.can_transition_to(RouteStatus::Completed));
    }
}
