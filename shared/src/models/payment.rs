//! Payment model
//!
//! Payments are manually recorded ledger entries against a (buyer, farmer)
//! pair's aggregate balance, never against a single invoice.

use serde::{Deserialize, Serialize};

/// How a payment was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    Cash,
    BankTransfer,
    Upi,
}

impl PaymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMode::Cash => "cash",
            PaymentMode::BankTransfer => "bank_transfer",
            PaymentMode::Upi => "upi",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(PaymentMode::Cash),
            "bank_transfer" => Some(PaymentMode::BankTransfer),
            "upi" => Some(PaymentMode::Upi),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_round_trips_through_str() {
        for mode in [PaymentMode::Cash, PaymentMode::BankTransfer, PaymentMode::Upi] {
            assert_eq!(PaymentMode::from_str(mode.as_str()), Some(mode));
        }
        assert_eq!(PaymentMode::from_str("cheque"), None);
    }
}
