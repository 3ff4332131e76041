//! Invoice model
//!
//! Invoices are generated by the pricing engine, one per (buyer, farmer,
//! date). Line items are immutable once written; only the status moves.

use serde::{Deserialize, Serialize};

/// Invoice lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(InvoiceStatus::Pending),
            "paid" => Some(InvoiceStatus::Paid),
            "cancelled" => Some(InvoiceStatus::Cancelled),
            _ => None,
        }
    }

    /// pending → paid and pending → cancelled; paid and cancelled are terminal.
    pub fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        matches!((self, next), (Pending, Paid) | (Pending, Cancelled))
    }
}

/// Format an invoice number from a year and a globally monotonic sequence
/// value: `INV-{year}-{sequence:06}`.
pub fn format_invoice_number(year: i32, sequence: i64) -> String {
    format!("INV-{}-{:06}", year, sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_number_format() {
        assert_eq!(format_invoice_number(2025, 1), "INV-2025-000001");
        assert_eq!(format_invoice_number(2025, 123456), "INV-2025-123456");
    }

    #[test]
    fn pending_is_the_only_mobile_status() {
        assert!(InvoiceStatus::Pending.can_transition_to(InvoiceStatus::Paid));
        assert!(InvoiceStatus::Pending.can_transition_to(InvoiceStatus::Cancelled));
        assert!(!InvoiceStatus::Paid.can_transition_to(InvoiceStatus::Pending));
        assert!(!InvoiceStatus::Cancelled.can_transition_to(InvoiceStatus::Pending));
        assert!(!InvoiceStatus::Paid.can_transition_to(InvoiceStatus::Cancelled));
    }
}
