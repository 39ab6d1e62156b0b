//! Loan amortization
//!
//! Standard annuity formula: fixed monthly payments over a fixed term at a
//! fixed annual rate. Intermediate math runs on f64; results are rounded to
//! cents only at the end, which is the precision the ledger stores.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Precomputed repayment figures for a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanTerms {
    pub monthly_payment: Decimal,
    pub total_to_pay: Decimal,
}

/// Compute the fixed monthly payment and total repayment for a loan.
///
/// With monthly rate `r = apr / 100 / 12` and term `m`:
/// `payment = p * r * (1+r)^m / ((1+r)^m - 1)`, degrading to `p / m` for a
/// zero rate. `months` must be > 0 and `apr` >= 0; callers validate both.
pub fn loan_terms(principal: Decimal, months: u32, apr: Decimal) -> LoanTerms {
    debug_assert!(months > 0);

    let p = principal.to_f64().unwrap_or(0.0);
    let m = months as f64;
    let r = apr.to_f64().unwrap_or(0.0) / 100.0 / 12.0;

    let payment = if r == 0.0 {
        p / m
    } else {
        let growth = (1.0 + r).powf(m);
        p * r * growth / (growth - 1.0)
    };

    LoanTerms {
        monthly_payment: round_cents(payment),
        total_to_pay: round_cents(payment * m),
    }
}

fn round_cents(value: f64) -> Decimal {
    Decimal::from_f64_retain(value)
        .unwrap_or_default()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_zero_rate_is_linear() {
        let terms = loan_terms(dec!(1000), 10, Decimal::ZERO);
        assert_eq!(terms.monthly_payment, dec!(100.00));
        assert_eq!(terms.total_to_pay, dec!(1000.00));
    }

    #[test]
    fn test_annuity_twelve_percent() {
        // 1200 over 12 months at 12% APR: r = 0.01 per month
        let terms = loan_terms(dec!(1200), 12, dec!(12));
        let expected = dec!(106.62);
        let diff = (terms.monthly_payment - expected).abs();
        assert!(
            diff <= dec!(0.05),
            "monthly payment {} not near {}",
            terms.monthly_payment,
            expected
        );
        // total comes from the unrounded fee, so it can differ from
        // monthly_payment * 12 by a few cents
        let total_diff = (terms.total_to_pay - terms.monthly_payment * dec!(12)).abs();
        assert!(total_diff < dec!(0.10), "total {} drifted", terms.total_to_pay);
    }

    #[test]
    fn test_higher_rate_costs_more() {
        let flat = loan_terms(dec!(1000), 10, Decimal::ZERO);
        let priced = loan_terms(dec!(1000), 10, dec!(5));
        assert!(priced.monthly_payment > flat.monthly_payment);
        assert!(priced.total_to_pay > dec!(1000));
    }

    #[test]
    fn test_single_month_term() {
        let terms = loan_terms(dec!(500), 1, Decimal::ZERO);
        assert_eq!(terms.monthly_payment, dec!(500.00));
        assert_eq!(terms.total_to_pay, dec!(500.00));
    }

    #[test]
    fn test_results_are_cent_precision() {
        let terms = loan_terms(dec!(3333.33), 7, dec!(9.9));
        assert!(terms.monthly_payment.scale() <= 2);
        assert!(terms.total_to_pay.scale() <= 2);
    }
}
