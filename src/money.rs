//! Exact-decimal conversion between delivered volume and money.
//!
//! Quantities are recorded in millilitres and priced per litre. All
//! arithmetic stays in `rust_decimal::Decimal` at full precision; rounding
//! to the 2-decimal money scale happens only at presentation and persistence
//! boundaries, never while accumulating, so a month of entries cannot drift
//! from the sum of its parts.

use rust_decimal::{Decimal, RoundingStrategy};

const ML_PER_LITRE: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// Converts a millilitre quantity to litres, exactly.
pub fn litres_from_ml(quantity_ml: i64) -> Decimal {
    Decimal::from(quantity_ml) / ML_PER_LITRE
}

/// Full-precision charge for a millilitre quantity at the given per-litre
/// price. Callers round with [`round_money`] once accumulation is done.
pub fn amount_for_ml(quantity_ml: i64, price_per_litre: Decimal) -> Decimal {
    litres_from_ml(quantity_ml) * price_per_litre
}

/// Rounds to the 2-decimal money scale, midpoint away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Litres shown in summaries use 2 decimals.
pub fn round_litres(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Litres on invoice line items use 3 decimals (one per 1 ml step).
pub fn round_litres_fine(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn litres_divide_exactly() {
        assert_eq!(litres_from_ml(0), dec!(0));
        assert_eq!(litres_from_ml(500), dec!(0.5));
        assert_eq!(litres_from_ml(1000), dec!(1));
        assert_eq!(litres_from_ml(1250), dec!(1.25));
        assert_eq!(litres_from_ml(1), dec!(0.001));
    }

    #[test]
    fn amount_is_exact_before_rounding() {
        // (q / 1000) * price with no float drift
        assert_eq!(amount_for_ml(1500, dec!(50)), dec!(75));
        assert_eq!(amount_for_ml(333, dec!(50)), dec!(16.65));
        assert_eq!(amount_for_ml(1, dec!(49.99)), dec!(0.04999));
    }

    #[test]
    fn rounding_happens_once_at_the_boundary() {
        // Three 333 ml entries at 50/L: the exact sum is 49.95; summing
        // per-entry rounded amounts would give the same here, but the
        // contract is accumulate-then-round.
        let entries = [333i64, 333, 333];
        let price = dec!(50);
        let exact: Decimal = entries.iter().map(|q| amount_for_ml(*q, price)).sum();
        assert_eq!(exact, dec!(49.95));
        assert_eq!(round_money(exact), dec!(49.95));
    }

    #[test]
    fn money_rounds_midpoint_away_from_zero() {
        assert_eq!(round_money(dec!(1.005)), dec!(1.01));
        assert_eq!(round_money(dec!(1.004)), dec!(1.00));
        assert_eq!(round_money(dec!(200.0)), dec!(200.00));
    }

    #[test]
    fn litres_display_scales() {
        assert_eq!(round_litres(litres_from_ml(4000)), dec!(4.00));
        assert_eq!(round_litres_fine(litres_from_ml(1333)), dec!(1.333));
    }
}
