use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::context::Caller;
use crate::errors::Result;
use crate::events::{EventStore, LedgerEvent};
use crate::money::Money;
use crate::records::Installment;
use crate::store::LedgerStore;
use crate::types::{InstallmentId, InstallmentStatus};

/// move one installment to `new_status`.
///
/// Any state may follow any other, including reverting PAID. Only the status and its
/// timestamp change; other installments of the loan are untouched.
pub fn transition_status<S: LedgerStore + ?Sized>(
    store: &mut S,
    caller: &Caller,
    installment_id: InstallmentId,
    new_status: InstallmentStatus,
    time_provider: &SafeTimeProvider,
    events: &mut EventStore,
) -> Result<Installment> {
    caller.authorize("update payment status")?;

    let current = store.installment(installment_id)?;
    let now = time_provider.now();
    let updated = store.set_installment_status(installment_id, new_status, now)?;

    info!(
        installment_id = %installment_id,
        loan_id = %updated.loan_id,
        from = %current.status,
        to = %new_status,
        operator = %caller.operator,
        "installment status changed"
    );

    events.emit(LedgerEvent::InstallmentStatusChanged {
        installment_id,
        loan_id: updated.loan_id,
        old_status: current.status,
        new_status,
        operator: caller.operator.clone(),
        timestamp: now,
    });

    Ok(updated)
}

/// repayment position of a loan, folded fresh from its installment rows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanSummary {
    pub installment_count: usize,
    pub total_scheduled: Money,
    pub total_paid: Money,
    pub total_pending: Money,
    pub total_not_paid: Money,
    /// pending plus not paid
    pub total_outstanding: Money,
    pub paid_count: usize,
    pub pending_count: usize,
    pub not_paid_count: usize,
    pub overdue_count: usize,
    pub overdue_amount: Money,
    pub principal_collected: Money,
    pub interest_collected: Money,
    pub next_due: Option<NaiveDate>,
}

impl LoanSummary {
    pub fn fold(installments: &[Installment], today: NaiveDate) -> Self {
        let mut summary = LoanSummary {
            installment_count: installments.len(),
            ..LoanSummary::default()
        };

        for row in installments {
            summary.total_scheduled += row.amount;

            match row.status {
                InstallmentStatus::Paid => {
                    summary.total_paid += row.amount;
                    summary.paid_count += 1;
                    summary.principal_collected += row.principal;
                    summary.interest_collected += row.interest;
                }
                InstallmentStatus::Pending => {
                    summary.total_pending += row.amount;
                    summary.pending_count += 1;
                }
                InstallmentStatus::NotPaid => {
                    summary.total_not_paid += row.amount;
                    summary.not_paid_count += 1;
                }
            }

            if row.is_overdue(today) {
                summary.overdue_count += 1;
                summary.overdue_amount += row.amount;
            }

            if !row.status.is_paid() && row.due_date >= today {
                summary.next_due = Some(match summary.next_due {
                    Some(current) => current.min(row.due_date),
                    None => row.due_date,
                });
            }
        }

        summary.total_outstanding = summary.total_pending + summary.total_not_paid;
        summary
    }

    pub fn is_settled(&self) -> bool {
        self.installment_count > 0 && self.paid_count == self.installment_count
    }
}
