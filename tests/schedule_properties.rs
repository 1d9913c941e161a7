//! Property-based tests for amortization schedule guarantees
//!
//! These run the engine over arbitrary valid terms, including 0% loans and
//! disbursements on month-end dates.

use chrono::{Duration, NaiveDate};
use loan_ledger_rs::*;
use proptest::prelude::*;

fn engine(policy: RemainderPolicy) -> AmortizationEngine {
    AmortizationEngine::new(policy).with_rate_bounds(RateBounds::new(0, 100))
}

fn disbursement() -> impl Strategy<Value = NaiveDate> {
    // 2000-01-01 onwards, roughly a century of start dates
    (0i64..36_500).prop_map(|offset| NaiveDate::from_ymd_opt(2000, 1, 1).unwrap() + Duration::days(offset))
}

prop_compose! {
    fn loan_terms()(
        principal in 1i64..10_000_000_000,
        rate in 0u32..=100,
        months in 1u32..=600,
        disbursed in disbursement(),
    ) -> LoanTerms {
        LoanTerms::new(Money::from_minor(principal), Rate::from_percentage(rate), months, disbursed)
    }
}

proptest! {
    /// Property: one installment per month, indexed 1..=n without gaps
    #[test]
    fn schedule_covers_every_month(terms in loan_terms()) {
        let schedule = engine(RemainderPolicy::Truncate).compute_schedule(&terms).unwrap();

        prop_assert_eq!(schedule.len(), terms.duration_months as usize);
        for (index, entry) in schedule.entries.iter().enumerate() {
            prop_assert_eq!(entry.month, index as u32 + 1);
        }
    }

    /// Property: due dates strictly increase
    #[test]
    fn due_dates_strictly_increase(terms in loan_terms()) {
        let schedule = engine(RemainderPolicy::FinalInstallment).compute_schedule(&terms).unwrap();

        for pair in schedule.entries.windows(2) {
            prop_assert!(pair[0].due_date < pair[1].due_date);
        }
        prop_assert!(schedule.entries[0].due_date > terms.disbursement_date);
    }

    /// Property: truncation under-collects by exactly principal mod n
    #[test]
    fn truncate_deficit_is_division_remainder(terms in loan_terms()) {
        let schedule = engine(RemainderPolicy::Truncate).compute_schedule(&terms).unwrap();

        let collected = schedule.total_principal();
        prop_assert!(collected <= terms.principal);
        prop_assert_eq!(
            schedule.principal_shortfall().minor(),
            terms.principal.minor() % i64::from(terms.duration_months)
        );
    }

    /// Property: the final installment absorbs the remainder so principal reconciles exactly
    #[test]
    fn final_installment_reconciles_principal(terms in loan_terms()) {
        let schedule = engine(RemainderPolicy::FinalInstallment).compute_schedule(&terms).unwrap();

        prop_assert_eq!(schedule.total_principal(), terms.principal);
        prop_assert!(schedule.principal_shortfall().is_zero());
        prop_assert!(schedule.verify().is_ok());
    }

    /// Property: each month's amount is its principal plus interest on the opening balance
    #[test]
    fn interest_charged_on_opening_balance(terms in loan_terms()) {
        let schedule = engine(RemainderPolicy::Truncate).compute_schedule(&terms).unwrap();

        let mut remaining = terms.principal.minor();
        for entry in &schedule.entries {
            prop_assert_eq!(entry.remaining_principal_before_this_month.minor(), remaining);
            let expected = remaining * i64::from(terms.rate.percent()) / 100;
            prop_assert_eq!(entry.interest.minor(), expected);
            prop_assert_eq!(entry.amount, entry.principal + entry.interest);
            remaining -= entry.principal.minor();
        }
        prop_assert_eq!(schedule.total_amount, terms.principal + schedule.total_interest);
    }

    /// Property: the engine is a pure function of its input
    #[test]
    fn engine_is_idempotent(terms in loan_terms()) {
        let engine = engine(RemainderPolicy::FinalInstallment);
        let first = ScheduleView::from(&engine.compute_schedule(&terms).unwrap()).to_json().unwrap();
        let second = ScheduleView::from(&engine.compute_schedule(&terms).unwrap()).to_json().unwrap();

        prop_assert_eq!(first, second);
    }

    /// Property: a 0% loan charges no interest
    #[test]
    fn zero_rate_charges_no_interest(
        principal in 1i64..10_000_000_000,
        months in 1u32..=600,
        disbursed in disbursement(),
    ) {
        let terms = LoanTerms::new(Money::from_minor(principal), Rate::ZERO, months, disbursed);
        let schedule = engine(RemainderPolicy::Truncate).compute_schedule(&terms).unwrap();

        prop_assert!(schedule.total_interest.is_zero());
        for entry in &schedule.entries {
            prop_assert!(entry.interest.is_zero());
            prop_assert_eq!(entry.amount, entry.principal);
        }
    }

    /// Property: out-of-range terms are rejected, never partially computed
    #[test]
    fn invalid_terms_rejected(
        principal in -1_000i64..=0,
        rate in 101u32..1_000,
        disbursed in disbursement(),
    ) {
        let engine = AmortizationEngine::default();

        let bad_principal = LoanTerms::new(Money::from_minor(principal), Rate::from_percentage(10), 12, disbursed);
        let is_invalid = matches!(engine.compute_schedule(&bad_principal), Err(LedgerError::InvalidInput { .. }));
        prop_assert!(is_invalid);

        let bad_rate = LoanTerms::new(Money::from_minor(1_000), Rate::from_percentage(rate), 12, disbursed);
        let is_invalid = matches!(engine.compute_schedule(&bad_rate), Err(LedgerError::InvalidInput { .. }));
        prop_assert!(is_invalid);
    }
}
