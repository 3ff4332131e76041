//! Ledger property-based and unit tests
//!
//! Covers balance conservation, overdraw rejection, and the oldest-first
//! display allocation of payments onto pending invoices.

use proptest::prelude::*;
use rust_decimal::Decimal;

use shared::{covered_invoice_count, outstanding_balance, validate_payment_amount, PaymentMode};

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Generate invoice totals (1.00 to 5000.00)
fn invoice_totals_strategy() -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec((100..=500_000i64).prop_map(|n| Decimal::new(n, 2)), 0..8)
}

/// Generate a payment fraction in hundredths (0 to 100%)
fn fraction_strategy() -> impl Strategy<Value = Decimal> {
    (0..=100i64).prop_map(|n| Decimal::new(n, 2))
}

// ============================================================================
// Payment Simulation (mirroring the service's check-then-insert unit)
// ============================================================================

/// Apply a payment only if it passes the balance check, as the service does
/// inside its transaction. Returns whether the payment was accepted.
fn try_pay(invoices: &[Decimal], payments: &mut Vec<Decimal>, amount: Decimal) -> bool {
    let balance = outstanding_balance(invoices, payments);
    if validate_payment_amount(amount, balance).is_ok() {
        payments.push(amount);
        true
    } else {
        false
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// Balance conservation: after any accepted payment sequence the balance
    /// equals invoiced minus paid and never goes negative.
    #[test]
    fn accepted_payments_never_overdraw(
        invoices in invoice_totals_strategy(),
        fractions in prop::collection::vec(fraction_strategy(), 1..6),
    ) {
        let invoiced: Decimal = invoices.iter().copied().sum();
        let mut payments: Vec<Decimal> = Vec::new();

        for fraction in fractions {
            let amount = invoiced * fraction;
            try_pay(&invoices, &mut payments, amount);

            let paid: Decimal = payments.iter().copied().sum();
            let balance = outstanding_balance(&invoices, &payments);

            prop_assert_eq!(balance, invoiced - paid);
            prop_assert!(balance >= Decimal::ZERO, "balance went negative");
        }
    }

    /// A payment exceeding the balance is rejected outright.
    #[test]
    fn overdraw_is_rejected(
        invoices in invoice_totals_strategy(),
        excess in (1..=100_000i64).prop_map(|n| Decimal::new(n, 2)),
    ) {
        let balance: Decimal = invoices.iter().copied().sum();
        let mut payments = Vec::new();

        prop_assert!(!try_pay(&invoices, &mut payments, balance + excess));
        prop_assert!(payments.is_empty());
    }

    /// Oldest-first allocation covers a prefix: every covered invoice fits in
    /// the amount paid, and the next one would not.
    #[test]
    fn allocation_covers_the_longest_affordable_prefix(
        invoices in invoice_totals_strategy(),
        fraction in fraction_strategy(),
    ) {
        let invoiced: Decimal = invoices.iter().copied().sum();
        let paid = invoiced * fraction;
        let covered = covered_invoice_count(&invoices, paid);

        let prefix: Decimal = invoices[..covered].iter().copied().sum();
        prop_assert!(prefix <= paid, "covered prefix exceeds the amount paid");

        if covered < invoices.len() {
            let next = prefix + invoices[covered];
            prop_assert!(next > paid, "allocation stopped early");
        }
    }

    /// Paying the full balance settles every pending invoice.
    #[test]
    fn full_payment_settles_all_invoices(invoices in invoice_totals_strategy()) {
        let invoiced: Decimal = invoices.iter().copied().sum();
        let covered = covered_invoice_count(&invoices, invoiced);
        prop_assert_eq!(covered, invoices.len());
    }
}

// ============================================================================
// Unit Tests: Balance Arithmetic
// ============================================================================

#[cfg(test)]
mod balance_tests {
    use super::*;

    #[test]
    fn balance_reflects_invoices_minus_payments() {
        let invoices = [Decimal::from(2125), Decimal::from(875)];
        let payments = [Decimal::from(1000), Decimal::from(500)];
        assert_eq!(
            outstanding_balance(&invoices, &payments),
            Decimal::from(1500)
        );
    }

    #[test]
    fn exact_balance_payment_is_accepted() {
        let invoices = [Decimal::from(300)];
        let mut payments = Vec::new();
        assert!(try_pay(&invoices, &mut payments, Decimal::from(300)));
        assert_eq!(
            outstanding_balance(&invoices, &payments),
            Decimal::ZERO
        );
    }

    #[test]
    fn second_payment_sees_the_first() {
        let invoices = [Decimal::from(300)];
        let mut payments = Vec::new();

        assert!(try_pay(&invoices, &mut payments, Decimal::from(200)));
        // 200 remains outstanding; another 200 would overdraw
        assert!(!try_pay(&invoices, &mut payments, Decimal::from(200)));
        assert!(try_pay(&invoices, &mut payments, Decimal::from(100)));
    }

    #[test]
    fn zero_and_negative_amounts_are_invalid() {
        assert!(validate_payment_amount(Decimal::ZERO, Decimal::from(100)).is_err());
        assert!(validate_payment_amount(Decimal::from(-5), Decimal::from(100)).is_err());
    }
}

// ============================================================================
// Unit Tests: Allocation Display
// ============================================================================

#[cfg(test)]
mod allocation_tests {
    use super::*;

    #[test]
    fn partial_payment_covers_only_whole_oldest_invoices() {
        let totals = [Decimal::from(500), Decimal::from(300)];
        assert_eq!(covered_invoice_count(&totals, Decimal::from(499)), 0);
        assert_eq!(covered_invoice_count(&totals, Decimal::from(700)), 1);
        assert_eq!(covered_invoice_count(&totals, Decimal::from(800)), 2);
    }

    #[test]
    fn no_pending_invoices_means_nothing_to_cover() {
        assert_eq!(covered_invoice_count(&[], Decimal::from(100)), 0);
    }
}

// ============================================================================
// Unit Tests: Payment Modes
// ============================================================================

#[cfg(test)]
mod mode_tests {
    use super::*;

    #[test]
    fn known_modes_parse() {
        assert_eq!(PaymentMode::from_str("cash"), Some(PaymentMode::Cash));
        assert_eq!(
            PaymentMode::from_str("bank_transfer"),
            Some(PaymentMode::BankTransfer)
        );
        assert_eq!(PaymentMode::from_str("upi"), Some(PaymentMode::Upi));
        assert_eq!(PaymentMode::from_str("barter"), None);
    }
}
