//! Collection chit model helpers
//!
//! A chit is the geotagged record created when a buyer physically receives
//! produce at a route stop. Its total weight is derived from its line items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One commodity/weight line captured at a stop
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChitLine {
    pub commodity_name: String,
    pub weight_kg: Decimal,
}

/// Derived chit total: the sum of its line weights.
pub fn chit_total_weight(lines: &[ChitLine]) -> Decimal {
    lines.iter().map(|l| l.weight_kg).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_weight_sums_lines() {
        let lines = vec![
            ChitLine {
                commodity_name: "Tomato".to_string(),
                weight_kg: Decimal::new(450, 1),
            },
            ChitLine {
                commodity_name: "Tomato".to_string(),
                weight_kg: Decimal::new(400, 1),
            },
        ];
        assert_eq!(chit_total_weight(&lines), Decimal::from(85));
    }

    #[test]
    fn total_weight_of_empty_is_zero() {
        assert_eq!(chit_total_weight(&[]), Decimal::ZERO);
    }
}
