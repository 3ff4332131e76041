//! Pricing and settlement property-based and unit tests
//!
//! Covers the invariants of the daily pricing run:
//! - every chit is billed at most once, under any number of re-runs
//! - a chit with an unpriced commodity is never partially billed
//! - invoice totals equal the sum of their line totals
//! - invoice numbers are unique and well-formed

use std::collections::{BTreeMap, HashSet};

use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use shared::{
    chit_is_fully_priced, chit_total_weight, format_invoice_number, line_total,
    validate_price_map, ChitLine,
};

// ============================================================================
// Property Test Strategies
// ============================================================================

const COMMODITIES: &[&str] = &["Tomato", "Okra", "Brinjal", "Chilli", "Onion"];

/// Generate a positive weight in kg (0.1 to 500.0)
fn weight_strategy() -> impl Strategy<Value = Decimal> {
    (1..=5000i64).prop_map(|n| Decimal::new(n, 1))
}

/// Generate a positive price per kg (0.5 to 200.0)
fn price_strategy() -> impl Strategy<Value = Decimal> {
    (5..=2000i64).prop_map(|n| Decimal::new(n, 1))
}

/// Generate chit lines over the known commodity set
fn chit_lines_strategy() -> impl Strategy<Value = Vec<ChitLine>> {
    prop::collection::vec(
        (0..COMMODITIES.len(), weight_strategy()).prop_map(|(i, w)| ChitLine {
            commodity_name: COMMODITIES[i].to_string(),
            weight_kg: w,
        }),
        1..=6,
    )
}

/// Generate a price map covering a subset of the commodity set
fn partial_price_map_strategy() -> impl Strategy<Value = BTreeMap<String, Decimal>> {
    prop::collection::btree_map(
        (0..COMMODITIES.len()).prop_map(|i| COMMODITIES[i].to_string()),
        price_strategy(),
        1..=COMMODITIES.len(),
    )
}

// ============================================================================
// Claim Simulation (mirroring the service's conditional is_priced flip)
// ============================================================================

/// Simulate the conditional false→true claim: only chits still unpriced are
/// claimed, and claiming removes them from the unpriced set.
fn claim_chits(unpriced: &mut HashSet<Uuid>, candidates: &[Uuid]) -> Vec<Uuid> {
    candidates
        .iter()
        .filter(|id| unpriced.remove(*id))
        .copied()
        .collect()
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// No double billing: two runs over overlapping candidate sets never
    /// claim the same chit.
    #[test]
    fn concurrent_runs_claim_disjoint_chits(
        chit_count in 1..40usize,
        split in 0..40usize,
    ) {
        let chits: Vec<Uuid> = (0..chit_count).map(|_| Uuid::new_v4()).collect();
        let mut unpriced: HashSet<Uuid> = chits.iter().copied().collect();

        // Both runs see an overlapping window of the same unpriced set
        let pivot = split % chit_count;
        let run_a: Vec<Uuid> = chits[..=pivot.min(chit_count - 1)].to_vec();
        let run_b: Vec<Uuid> = chits.to_vec();

        let claimed_a = claim_chits(&mut unpriced, &run_a);
        let claimed_b = claim_chits(&mut unpriced, &run_b);

        let a: HashSet<Uuid> = claimed_a.iter().copied().collect();
        let b: HashSet<Uuid> = claimed_b.iter().copied().collect();

        prop_assert!(a.is_disjoint(&b), "a chit was billed by both runs");
        prop_assert_eq!(a.len() + b.len(), chit_count, "a chit escaped billing");
    }

    /// Idempotent re-run: once every chit is claimed, a second identical run
    /// claims nothing.
    #[test]
    fn rerun_after_full_success_claims_nothing(chit_count in 1..40usize) {
        let chits: Vec<Uuid> = (0..chit_count).map(|_| Uuid::new_v4()).collect();
        let mut unpriced: HashSet<Uuid> = chits.iter().copied().collect();

        let first = claim_chits(&mut unpriced, &chits);
        let second = claim_chits(&mut unpriced, &chits);

        prop_assert_eq!(first.len(), chit_count);
        prop_assert!(second.is_empty(), "re-run billed already-priced chits");
    }

    /// Partial coverage: a chit is eligible only when every commodity it
    /// contains is priced.
    #[test]
    fn chit_with_any_unpriced_commodity_is_skipped_whole(
        lines in chit_lines_strategy(),
        prices in partial_price_map_strategy(),
    ) {
        let commodities: Vec<String> =
            lines.iter().map(|l| l.commodity_name.clone()).collect();
        let eligible = chit_is_fully_priced(&commodities, &prices);
        let any_unpriced = commodities.iter().any(|c| !prices.contains_key(c));

        prop_assert_eq!(eligible, !any_unpriced);
    }

    /// Invoice total equals the sum of its line totals.
    #[test]
    fn group_total_is_sum_of_line_totals(
        lines in chit_lines_strategy(),
        price in price_strategy(),
    ) {
        let total: Decimal = lines
            .iter()
            .map(|l| line_total(l.weight_kg, price))
            .sum();
        let expected: Decimal =
            lines.iter().map(|l| l.weight_kg).sum::<Decimal>() * price;

        prop_assert_eq!(total, expected);
    }

    /// Price maps with a non-positive entry are rejected before any write.
    #[test]
    fn price_map_with_non_positive_entry_is_rejected(
        mut prices in partial_price_map_strategy(),
        bad_index in 0..COMMODITIES.len(),
    ) {
        prop_assert!(validate_price_map(&prices).is_ok());

        prices.insert(COMMODITIES[bad_index].to_string(), Decimal::ZERO);
        prop_assert!(validate_price_map(&prices).is_err());
    }

    /// Invoice numbers from distinct sequence values never collide.
    #[test]
    fn invoice_numbers_are_unique_per_sequence_value(
        year in 2020..2035i32,
        sequences in prop::collection::hash_set(1..1_000_000i64, 2..50),
    ) {
        let numbers: HashSet<String> = sequences
            .iter()
            .map(|seq| format_invoice_number(year, *seq))
            .collect();
        prop_assert_eq!(numbers.len(), sequences.len());
    }
}

// ============================================================================
// Unit Tests: Reference Scenario
// ============================================================================

#[cfg(test)]
mod scenario_tests {
    use super::*;

    /// One booking, one stop, two tomato lines of 45 and 40 kg, priced at
    /// 25 per kg: one invoice of 2125.
    #[test]
    fn tomato_collection_invoices_at_2125() {
        let lines = vec![
            ChitLine {
                commodity_name: "Tomato".to_string(),
                weight_kg: Decimal::from(45),
            },
            ChitLine {
                commodity_name: "Tomato".to_string(),
                weight_kg: Decimal::from(40),
            },
        ];

        assert_eq!(chit_total_weight(&lines), Decimal::from(85));

        let mut prices = BTreeMap::new();
        prices.insert("Tomato".to_string(), Decimal::from(25));
        assert!(validate_price_map(&prices).is_ok());

        let commodities: Vec<String> =
            lines.iter().map(|l| l.commodity_name.clone()).collect();
        assert!(chit_is_fully_priced(&commodities, &prices));

        let grand_total: Decimal = lines
            .iter()
            .map(|l| line_total(l.weight_kg, prices["Tomato"]))
            .sum();
        assert_eq!(grand_total, Decimal::from(2125));
    }

    #[test]
    fn mixed_chit_waits_for_the_missing_price() {
        let commodities = vec!["Tomato".to_string(), "Okra".to_string()];

        let mut prices = BTreeMap::new();
        prices.insert("Tomato".to_string(), Decimal::from(25));
        assert!(!chit_is_fully_priced(&commodities, &prices));

        // A later run that also prices okra picks the chit up whole
        prices.insert("Okra".to_string(), Decimal::from(40));
        assert!(chit_is_fully_priced(&commodities, &prices));
    }
}

// ============================================================================
// Unit Tests: Invoice Number Format
// ============================================================================

#[cfg(test)]
mod invoice_number_tests {
    use super::*;

    #[test]
    fn number_is_year_and_zero_padded_sequence() {
        assert_eq!(format_invoice_number(2025, 7), "INV-2025-000007");
    }

    #[test]
    fn sequence_grows_past_the_padding() {
        assert_eq!(format_invoice_number(2025, 1_234_567), "INV-2025-1234567");
    }

    #[test]
    fn format_parses_back_into_parts() {
        let number = format_invoice_number(2024, 42);
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "INV");
        assert_eq!(parts[1].parse::<i32>().unwrap(), 2024);
        assert_eq!(parts[2].parse::<i64>().unwrap(), 42);
    }
}
