use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::amortization::AmortizationSchedule;
use crate::context::Caller;
use crate::errors::{LedgerError, Result};
use crate::events::{EventStore, LedgerEvent};
use crate::records::{Installment, Loan, NewInstallment, NewLoan};
use crate::store::LedgerStore;
use crate::types::{CustomerId, InstallmentStatus};

/// where a computed schedule should be persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializeRequest {
    pub customer_id: CustomerId,
    /// importing a loan that is already mid-term: months numbered below this count start as PAID
    pub elapsed_months: Option<u32>,
}

impl MaterializeRequest {
    pub fn new(customer_id: CustomerId) -> Self {
        Self {
            customer_id,
            elapsed_months: None,
        }
    }

    pub fn elapsed(mut self, months: u32) -> Self {
        self.elapsed_months = Some(months);
        self
    }
}

/// persisted loan with its full installment ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializedLoan {
    pub loan: Loan,
    pub installments: Vec<Installment>,
}

/// turns a computed schedule into stored loan and installment rows, all or nothing
pub struct ScheduleMaterializer;

impl ScheduleMaterializer {
    /// build the installment rows for a schedule without touching the store
    pub fn installment_rows(
        schedule: &AmortizationSchedule,
        elapsed_months: Option<u32>,
        time_provider: &SafeTimeProvider,
    ) -> Vec<NewInstallment> {
        let now = time_provider.now();
        let elapsed = elapsed_months.unwrap_or(0);

        schedule
            .entries
            .iter()
            .map(|entry| NewInstallment {
                month_number: entry.month,
                principal: entry.principal,
                interest: entry.interest,
                amount: entry.amount,
                due_date: entry.due_date,
                status: if entry.month < elapsed {
                    InstallmentStatus::Paid
                } else {
                    InstallmentStatus::NotPaid
                },
                created_at: now,
            })
            .collect()
    }

    /// persist loan and installments as one unit. Never retries; a failure leaves nothing behind
    pub fn materialize<S: LedgerStore + ?Sized>(
        store: &mut S,
        caller: &Caller,
        schedule: &AmortizationSchedule,
        request: &MaterializeRequest,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<MaterializedLoan> {
        caller.authorize("originate loans")?;
        schedule.verify()?;

        let terms = schedule.terms;
        if let Some(elapsed) = request.elapsed_months {
            if elapsed > terms.duration_months {
                return Err(LedgerError::invalid(format!(
                    "{} elapsed months is beyond the {}-month term",
                    elapsed, terms.duration_months
                )));
            }
        }

        // fail fast with NotFound rather than a constraint error from the batch
        store.customer(request.customer_id)?;

        let shortfall = schedule.principal_shortfall();
        if !shortfall.is_zero() {
            warn!(
                customer_id = %request.customer_id,
                principal = %terms.principal,
                shortfall = %shortfall,
                policy = ?schedule.remainder_policy,
                "schedule under-collects principal"
            );
        }

        let now = time_provider.now();
        let rows = Self::installment_rows(schedule, request.elapsed_months, time_provider);
        let new_loan = NewLoan {
            customer_id: request.customer_id,
            terms,
            created_at: now,
        };

        let (loan, installments) = match store.insert_loan_with_installments(new_loan, &rows) {
            Ok(persisted) => persisted,
            Err(err) => {
                warn!(customer_id = %request.customer_id, error = %err, "loan materialization rolled back");
                events.emit(LedgerEvent::MaterializationRolledBack {
                    customer_id: request.customer_id,
                    reason: err.to_string(),
                    timestamp: now,
                });
                return Err(err);
            }
        };

        let prepaid = installments.iter().filter(|i| i.status.is_paid()).count();
        info!(
            loan_id = %loan.id,
            customer_id = %loan.customer_id,
            installments = installments.len(),
            prepaid,
            operator = %caller.operator,
            "loan materialized"
        );

        events.emit(LedgerEvent::LoanOriginated {
            loan_id: loan.id,
            customer_id: loan.customer_id,
            principal: loan.principal,
            rate: loan.interest_rate,
            duration_months: loan.duration_months,
            operator: caller.operator.clone(),
            timestamp: now,
        });
        events.emit(LedgerEvent::ScheduleMaterialized {
            loan_id: loan.id,
            installments: installments.len(),
            prepaid_installments: prepaid,
            total_interest: schedule.total_interest,
            total_amount: schedule.total_amount,
            principal_shortfall: shortfall,
            timestamp: now,
        });

        Ok(MaterializedLoan { loan, installments })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amortization::{AmortizationEngine, LoanTerms};
    use crate::money::{Money, Rate};
    use crate::records::CustomerDetails;
    use crate::store::{FaultPlan, MemoryLedgerStore, SqliteLedgerStore};
    use crate::types::RemainderPolicy;
    use chrono::{NaiveDate, TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use uuid::Uuid;

    fn time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()))
    }

    fn schedule(principal: i64, months: u32) -> AmortizationSchedule {
        AmortizationEngine::default()
            .compute_schedule(&LoanTerms::new(
                Money::from_minor(principal),
                Rate::from_percentage(10),
                months,
                NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            ))
            .unwrap()
    }

    #[test]
    fn test_materializes_full_schedule() {
        let time = time();
        let mut store = MemoryLedgerStore::new();
        let mut events = EventStore::new();
        let customer = store.insert_customer(CustomerDetails::new("Ada", "Obi"), time.now()).unwrap();
        let schedule = schedule(120_000, 3);

        let result = ScheduleMaterializer::materialize(
            &mut store,
            &Caller::officer("amaka"),
            &schedule,
            &MaterializeRequest::new(customer.id),
            &time,
            &mut events,
        )
        .unwrap();

        assert_eq!(result.loan.principal, Money::from_minor(120_000));
        assert_eq!(result.loan.customer_id, customer.id);
        assert_eq!(result.installments.len(), 3);
        for (row, entry) in result.installments.iter().zip(&schedule.entries) {
            assert_eq!(row.month_number, entry.month);
            assert_eq!(row.amount, entry.amount);
            assert_eq!(row.due_date, entry.due_date);
            assert_eq!(row.status, InstallmentStatus::NotPaid);
            assert_eq!(row.updated_at, time.now());
        }
        assert_eq!(events.events().len(), 2);
        assert!(matches!(events.events()[0], LedgerEvent::LoanOriginated { .. }));
    }

    #[test]
    fn test_elapsed_months_mark_earlier_installments() {
        let time = time();
        let mut store = MemoryLedgerStore::new();
        let customer = store.insert_customer(CustomerDetails::new("Ada", "Obi"), time.now()).unwrap();
        let schedule = schedule(120_000, 6);

        let result = ScheduleMaterializer::materialize(
            &mut store,
            &Caller::officer("amaka"),
            &schedule,
            &MaterializeRequest::new(customer.id).elapsed(2),
            &time,
            &mut EventStore::new(),
        )
        .unwrap();

        let statuses: Vec<InstallmentStatus> = result.installments.iter().map(|i| i.status).collect();
        assert_eq!(
            statuses,
            vec![
                InstallmentStatus::Paid,
                InstallmentStatus::NotPaid,
                InstallmentStatus::NotPaid,
                InstallmentStatus::NotPaid,
                InstallmentStatus::NotPaid,
                InstallmentStatus::NotPaid,
            ]
        );
        // amounts are untouched
        assert_eq!(result.installments[0].amount, schedule.entries[0].amount);
    }

    #[test]
    fn test_elapsed_beyond_term_rejected() {
        let time = time();
        let mut store = MemoryLedgerStore::new();
        let customer = store.insert_customer(CustomerDetails::new("Ada", "Obi"), time.now()).unwrap();

        let err = ScheduleMaterializer::materialize(
            &mut store,
            &Caller::officer("amaka"),
            &schedule(120_000, 3),
            &MaterializeRequest::new(customer.id).elapsed(4),
            &time,
            &mut EventStore::new(),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput { .. }));
        assert_eq!(store.loan_count(), 0);

        // a count equal to the term is accepted and leaves the last month open
        let result = ScheduleMaterializer::materialize(
            &mut store,
            &Caller::officer("amaka"),
            &schedule(120_000, 3),
            &MaterializeRequest::new(customer.id).elapsed(3),
            &time,
            &mut EventStore::new(),
        )
        .unwrap();
        let statuses: Vec<InstallmentStatus> = result.installments.iter().map(|i| i.status).collect();
        assert_eq!(
            statuses,
            vec![InstallmentStatus::Paid, InstallmentStatus::Paid, InstallmentStatus::NotPaid]
        );
    }

    #[test]
    fn test_batch_failure_leaves_nothing() {
        let time = time();
        let mut store = MemoryLedgerStore::new();
        let mut events = EventStore::new();
        let customer = store.insert_customer(CustomerDetails::new("Ada", "Obi"), time.now()).unwrap();
        store.set_faults(FaultPlan {
            fail_installment_batch: true,
            ..FaultPlan::default()
        });

        let err = ScheduleMaterializer::materialize(
            &mut store,
            &Caller::officer("amaka"),
            &schedule(120_000, 3),
            &MaterializeRequest::new(customer.id),
            &time,
            &mut events,
        )
        .unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(store.loan_count(), 0);
        assert_eq!(store.installment_count(), 0);
        assert!(matches!(
            events.events(),
            [LedgerEvent::MaterializationRolledBack { .. }]
        ));

        // resubmitting after the store recovers succeeds
        store.set_faults(FaultPlan::default());
        ScheduleMaterializer::materialize(
            &mut store,
            &Caller::officer("amaka"),
            &schedule(120_000, 3),
            &MaterializeRequest::new(customer.id),
            &time,
            &mut events,
        )
        .unwrap();
        assert_eq!(store.loan_count(), 1);
        assert_eq!(store.installment_count(), 3);
    }

    #[test]
    fn test_sqlite_transaction_is_used() {
        let time = time();
        let mut store = SqliteLedgerStore::in_memory().unwrap();
        let customer = store.insert_customer(CustomerDetails::new("Ada", "Obi"), time.now()).unwrap();

        let result = ScheduleMaterializer::materialize(
            &mut store,
            &Caller::officer("amaka"),
            &schedule(100_000, 12),
            &MaterializeRequest::new(customer.id),
            &time,
            &mut EventStore::new(),
        )
        .unwrap();
        assert_eq!(store.installments_for_loan(result.loan.id).unwrap(), result.installments);
    }

    #[test]
    fn test_unknown_customer() {
        let time = time();
        let mut store = MemoryLedgerStore::new();
        let err = ScheduleMaterializer::materialize(
            &mut store,
            &Caller::officer("amaka"),
            &schedule(120_000, 3),
            &MaterializeRequest::new(Uuid::new_v4()),
            &time,
            &mut EventStore::new(),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { entity: "customer", .. }));
    }

    #[test]
    fn test_auditor_cannot_materialize() {
        let time = time();
        let mut store = MemoryLedgerStore::new();
        let customer = store.insert_customer(CustomerDetails::new("Ada", "Obi"), time.now()).unwrap();
        let err = ScheduleMaterializer::materialize(
            &mut store,
            &Caller::auditor("tunde"),
            &schedule(120_000, 3),
            &MaterializeRequest::new(customer.id),
            &time,
            &mut EventStore::new(),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));
        assert_eq!(store.loan_count(), 0);
    }

    #[test]
    fn test_truncated_schedule_records_shortfall() {
        let time = time();
        let mut store = MemoryLedgerStore::new();
        let mut events = EventStore::new();
        let customer = store.insert_customer(CustomerDetails::new("Ada", "Obi"), time.now()).unwrap();
        let schedule = AmortizationEngine::new(RemainderPolicy::Truncate)
            .compute_schedule(&LoanTerms::new(
                Money::from_minor(100),
                Rate::from_percentage(10),
                3,
                NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            ))
            .unwrap();

        let result = ScheduleMaterializer::materialize(
            &mut store,
            &Caller::officer("amaka"),
            &schedule,
            &MaterializeRequest::new(customer.id),
            &time,
            &mut events,
        )
        .unwrap();

        let stored: Money = result.installments.iter().map(|i| i.principal).sum();
        assert_eq!(stored, Money::from_minor(99));
        assert!(events.events().iter().any(|e| matches!(
            e,
            LedgerEvent::ScheduleMaterialized { principal_shortfall, .. } if *principal_shortfall == Money::ONE
        )));
    }

    #[test]
    fn test_tampered_schedule_rejected() {
        let time = time();
        let mut store = MemoryLedgerStore::new();
        let customer = store.insert_customer(CustomerDetails::new("Ada", "Obi"), time.now()).unwrap();
        let mut tampered = schedule(120_000, 3);
        tampered.entries.remove(1);

        let err = ScheduleMaterializer::materialize(
            &mut store,
            &Caller::officer("amaka"),
            &tampered,
            &MaterializeRequest::new(customer.id),
            &time,
            &mut EventStore::new(),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput { .. }));
        assert_eq!(store.loan_count(), 0);

        // interest moved from month 1 to month 2 keeps the totals intact
        let mut shifted = schedule(120_000, 3);
        shifted.entries[0].interest = Money::ZERO;
        shifted.entries[0].amount = shifted.entries[0].principal;
        shifted.entries[1].interest = Money::from_minor(20_000);
        shifted.entries[1].amount = shifted.entries[1].principal + Money::from_minor(20_000);

        let err = ScheduleMaterializer::materialize(
            &mut store,
            &Caller::officer("amaka"),
            &shifted,
            &MaterializeRequest::new(customer.id),
            &time,
            &mut EventStore::new(),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput { .. }));
        assert_eq!(store.loan_count(), 0);
    }
}
