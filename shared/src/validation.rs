//! Validation utilities and pure settlement arithmetic
//!
//! Everything here is side-effect free. The backend services wrap these
//! checks in typed errors and database transactions; keeping the arithmetic
//! pure lets the invariants be tested without a database.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

// ============================================================================
// Collection Validations
// ============================================================================

/// Validate a single collected weight
pub fn validate_weight(weight_kg: Decimal) -> Result<(), &'static str> {
    if weight_kg <= Decimal::ZERO {
        return Err("Weight must be greater than 0");
    }
    Ok(())
}

/// Validate a commodity name
pub fn validate_commodity_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("Commodity name cannot be blank");
    }
    Ok(())
}

// ============================================================================
// Pricing Validations
// ============================================================================

/// Validate a daily price map: non-empty, no blank commodity, every price > 0.
///
/// The pricing run aborts on the first offending entry, before any write.
pub fn validate_price_map(prices: &BTreeMap<String, Decimal>) -> Result<(), String> {
    if prices.is_empty() {
        return Err("Price map cannot be empty".to_string());
    }
    for (commodity, price) in prices {
        if commodity.trim().is_empty() {
            return Err("Commodity name cannot be blank".to_string());
        }
        if *price <= Decimal::ZERO {
            return Err(format!(
                "Price for {} must be greater than 0, got {}",
                commodity, price
            ));
        }
    }
    Ok(())
}

/// A chit may only be billed when every commodity it contains has a price for
/// the day. A chit with any unpriced commodity is skipped whole.
pub fn chit_is_fully_priced(
    commodities: &[String],
    prices: &BTreeMap<String, Decimal>,
) -> bool {
    commodities.iter().all(|c| prices.contains_key(c))
}

/// Line total for one collected item: weight × price-per-kg.
pub fn line_total(weight_kg: Decimal, price_per_kg: Decimal) -> Decimal {
    weight_kg * price_per_kg
}

// ============================================================================
// Ledger Arithmetic
// ============================================================================

/// Outstanding balance for a (buyer, farmer) pair: pending invoice totals
/// minus recorded payments.
pub fn outstanding_balance(
    pending_invoice_totals: &[Decimal],
    payment_amounts: &[Decimal],
) -> Decimal {
    let invoiced: Decimal = pending_invoice_totals.iter().copied().sum();
    let paid: Decimal = payment_amounts.iter().copied().sum();
    invoiced - paid
}

/// Validate a payment amount against the current outstanding balance.
pub fn validate_payment_amount(amount: Decimal, balance: Decimal) -> Result<(), String> {
    if amount <= Decimal::ZERO {
        return Err("Payment amount must be greater than 0".to_string());
    }
    if amount > balance {
        return Err(format!(
            "Payment of {} exceeds outstanding balance of {}",
            amount, balance
        ));
    }
    Ok(())
}

/// Oldest-first payment allocation, used for invoice status display only.
///
/// Given the pair's pending invoice totals ordered oldest first and the total
/// amount paid so far, returns how many leading invoices are fully covered
/// and may be marked paid. The balance number itself never depends on this.
pub fn covered_invoice_count(
    invoice_totals_oldest_first: &[Decimal],
    total_paid: Decimal,
) -> usize {
    let mut covered = 0;
    let mut cumulative = Decimal::ZERO;
    for total in invoice_totals_oldest_first {
        cumulative += *total;
        if cumulative > total_paid {
            break;
        }
        covered += 1;
    }
    covered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices(entries: &[(&str, i64)]) -> BTreeMap<String, Decimal> {
        entries
            .iter()
            .map(|(c, p)| (c.to_string(), Decimal::from(*p)))
            .collect()
    }

    #[test]
    fn rejects_non_positive_weight() {
        assert!(validate_weight(Decimal::ZERO).is_err());
        assert!(validate_weight(Decimal::from(-3)).is_err());
        assert!(validate_weight(Decimal::new(1, 2)).is_ok());
    }

    #[test]
    fn price_map_rejects_non_positive_prices() {
        let map = prices(&[("Tomato", 25), ("Okra", 0)]);
        assert!(validate_price_map(&map).is_err());
        let map = prices(&[("Tomato", 25)]);
        assert!(validate_price_map(&map).is_ok());
        assert!(validate_price_map(&BTreeMap::new()).is_err());
    }

    #[test]
    fn chit_with_unpriced_commodity_is_not_fully_priced() {
        let map = prices(&[("Tomato", 25)]);
        let fully = vec!["Tomato".to_string()];
        let partial = vec!["Tomato".to_string(), "Okra".to_string()];
        assert!(chit_is_fully_priced(&fully, &map));
        assert!(!chit_is_fully_priced(&partial, &map));
    }

    #[test]
    fn line_total_is_weight_times_price() {
        assert_eq!(
            line_total(Decimal::from(85), Decimal::from(25)),
            Decimal::from(2125)
        );
    }

    #[test]
    fn balance_is_invoices_minus_payments() {
        let invoices = [Decimal::from(2125), Decimal::from(875)];
        let payments = [Decimal::from(1000)];
        assert_eq!(outstanding_balance(&invoices, &payments), Decimal::from(2000));
        assert_eq!(outstanding_balance(&[], &[]), Decimal::ZERO);
    }

    #[test]
    fn payment_cannot_overdraw() {
        assert!(validate_payment_amount(Decimal::from(100), Decimal::from(99)).is_err());
        assert!(validate_payment_amount(Decimal::from(100), Decimal::from(100)).is_ok());
        assert!(validate_payment_amount(Decimal::ZERO, Decimal::from(100)).is_err());
    }

    #[test]
    fn allocation_covers_a_prefix_of_oldest_invoices() {
        let totals = [Decimal::from(500), Decimal::from(300), Decimal::from(200)];
        assert_eq!(covered_invoice_count(&totals, Decimal::from(499)), 0);
        assert_eq!(covered_invoice_count(&totals, Decimal::from(500)), 1);
        assert_eq!(covered_invoice_count(&totals, Decimal::from(799)), 1);
        assert_eq!(covered_invoice_count(&totals, Decimal::from(800)), 2);
        assert_eq!(covered_invoice_count(&totals, Decimal::from(1000)), 3);
    }
}
