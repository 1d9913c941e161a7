pub mod memory;
pub mod sqlite;

use chrono::{DateTime, Utc};
use tracing::{error, warn};

use crate::errors::{LedgerError, Result};
use crate::records::{Customer, CustomerDetails, Installment, Loan, NewInstallment, NewLoan};
use crate::types::{CustomerId, InstallmentId, InstallmentStatus, LoanId};

pub use memory::{FaultPlan, MemoryLedgerStore};
pub use sqlite::SqliteLedgerStore;

/// relational store holding customers, loans and their installment rows.
///
/// Ids are assigned by the store. Deleting a customer removes its loans, deleting a
/// loan removes its installments. `insert_installments` is all-or-nothing per batch.
pub trait LedgerStore {
    fn insert_customer(&mut self, details: CustomerDetails, created_at: DateTime<Utc>) -> Result<Customer>;

    fn update_customer(
        &mut self,
        id: CustomerId,
        details: CustomerDetails,
        updated_at: DateTime<Utc>,
    ) -> Result<Customer>;

    fn customer(&self, id: CustomerId) -> Result<Customer>;

    /// newest first
    fn customers(&self) -> Result<Vec<Customer>>;

    /// customers whose first name, last name or phone contains `query`, ignoring ASCII case; newest first.
    /// A blank query lists everyone
    fn search_customers(&self, query: &str) -> Result<Vec<Customer>> {
        Ok(self
            .customers()?
            .into_iter()
            .filter(|c| c.details.matches_search(query))
            .collect())
    }

    fn delete_customer(&mut self, id: CustomerId) -> Result<()>;

    fn insert_loan(&mut self, loan: NewLoan) -> Result<Loan>;

    fn loan(&self, id: LoanId) -> Result<Loan>;

    /// newest first
    fn loans_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Loan>>;

    fn delete_loan(&mut self, id: LoanId) -> Result<()>;

    fn insert_installments(&mut self, loan_id: LoanId, rows: &[NewInstallment]) -> Result<Vec<Installment>>;

    fn installment(&self, id: InstallmentId) -> Result<Installment>;

    /// ordered by month number
    fn installments_for_loan(&self, loan_id: LoanId) -> Result<Vec<Installment>>;

    /// every installment row of every loan
    fn installments(&self) -> Result<Vec<Installment>>;

    fn set_installment_status(
        &mut self,
        id: InstallmentId,
        status: InstallmentStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Installment>;

    /// persist a loan and its full installment set as one unit.
    ///
    /// Stores without multi-statement transactions get this compensating version:
    /// if the batch fails the loan row is deleted again before the error is returned.
    fn insert_loan_with_installments(
        &mut self,
        loan: NewLoan,
        rows: &[NewInstallment],
    ) -> Result<(Loan, Vec<Installment>)> {
        let loan = self.insert_loan(loan)?;

        match self.insert_installments(loan.id, rows) {
            Ok(installments) => Ok((loan, installments)),
            Err(err) => {
                warn!(loan_id = %loan.id, error = %err, "installment batch failed, deleting loan row");
                if let Err(cleanup) = self.delete_loan(loan.id) {
                    error!(loan_id = %loan.id, error = %cleanup, "compensating delete failed");
                    return Err(LedgerError::persistence(format!(
                        "{err}; compensating delete of loan {} also failed: {cleanup}",
                        loan.id
                    )));
                }
                Err(err)
            }
        }
    }
}
