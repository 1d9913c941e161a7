use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::{LedgerError, Result};
use crate::records::{Customer, CustomerDetails, Installment, Loan, NewInstallment, NewLoan};
use crate::store::LedgerStore;
use crate::types::{CustomerId, InstallmentId, InstallmentStatus, LoanId};

/// failures to inject into the next writes, for exercising rollback paths
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultPlan {
    pub fail_loan_insert: bool,
    pub fail_installment_batch: bool,
    pub fail_loan_delete: bool,
}

/// in-process store without transactions; relies on the compensating loan delete
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    customers: Vec<Customer>,
    loans: Vec<Loan>,
    installments: Vec<Installment>,
    faults: FaultPlan,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults(faults: FaultPlan) -> Self {
        Self {
            faults,
            ..Self::default()
        }
    }

    pub fn set_faults(&mut self, faults: FaultPlan) {
        self.faults = faults;
    }

    pub fn loan_count(&self) -> usize {
        self.loans.len()
    }

    pub fn installment_count(&self) -> usize {
        self.installments.len()
    }

    fn customer_index(&self, id: CustomerId) -> Result<usize> {
        self.customers
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| LedgerError::not_found("customer", id))
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn insert_customer(&mut self, details: CustomerDetails, created_at: DateTime<Utc>) -> Result<Customer> {
        let customer = Customer {
            id: Uuid::new_v4(),
            details,
            created_at,
            updated_at: created_at,
        };
        self.customers.push(customer.clone());
        Ok(customer)
    }

    fn update_customer(
        &mut self,
        id: CustomerId,
        details: CustomerDetails,
        updated_at: DateTime<Utc>,
    ) -> Result<Customer> {
        let index = self.customer_index(id)?;
        let customer = &mut self.customers[index];
        customer.details = details;
        customer.updated_at = updated_at;
        Ok(customer.clone())
    }

    fn customer(&self, id: CustomerId) -> Result<Customer> {
        let index = self.customer_index(id)?;
        Ok(self.customers[index].clone())
    }

    fn customers(&self) -> Result<Vec<Customer>> {
        let mut customers: Vec<Customer> = self.customers.iter().rev().cloned().collect();
        customers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(customers)
    }

    fn delete_customer(&mut self, id: CustomerId) -> Result<()> {
        let index = self.customer_index(id)?;
        self.customers.remove(index);

        let loan_ids: HashSet<LoanId> = self
            .loans
            .iter()
            .filter(|l| l.customer_id == id)
            .map(|l| l.id)
            .collect();
        self.loans.retain(|l| l.customer_id != id);
        self.installments.retain(|i| !loan_ids.contains(&i.loan_id));
        Ok(())
    }

    fn insert_loan(&mut self, loan: NewLoan) -> Result<Loan> {
        if self.faults.fail_loan_insert {
            return Err(LedgerError::persistence("injected failure: loan insert"));
        }
        self.customer_index(loan.customer_id)?;

        let loan = Loan::from_new(Uuid::new_v4(), &loan);
        self.loans.push(loan.clone());
        Ok(loan)
    }

    fn loan(&self, id: LoanId) -> Result<Loan> {
        self.loans
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("loan", id))
    }

    fn loans_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Loan>> {
        let mut loans: Vec<Loan> = self
            .loans
            .iter()
            .rev()
            .filter(|l| l.customer_id == customer_id)
            .cloned()
            .collect();
        loans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(loans)
    }

    fn delete_loan(&mut self, id: LoanId) -> Result<()> {
        if self.faults.fail_loan_delete {
            return Err(LedgerError::persistence("injected failure: loan delete"));
        }
        let before = self.loans.len();
        self.loans.retain(|l| l.id != id);
        if self.loans.len() == before {
            return Err(LedgerError::not_found("loan", id));
        }
        self.installments.retain(|i| i.loan_id != id);
        Ok(())
    }

    fn insert_installments(&mut self, loan_id: LoanId, rows: &[NewInstallment]) -> Result<Vec<Installment>> {
        if self.faults.fail_installment_batch {
            return Err(LedgerError::persistence("injected failure: installment batch"));
        }
        if !self.loans.iter().any(|l| l.id == loan_id) {
            return Err(LedgerError::not_found("loan", loan_id));
        }

        // check the whole batch before touching anything
        let mut months: HashSet<u32> = self
            .installments
            .iter()
            .filter(|i| i.loan_id == loan_id)
            .map(|i| i.month_number)
            .collect();
        for row in rows {
            if !months.insert(row.month_number) {
                return Err(LedgerError::persistence(format!(
                    "duplicate month {} for loan {loan_id}",
                    row.month_number
                )));
            }
        }

        let inserted: Vec<Installment> = rows
            .iter()
            .map(|row| Installment::from_new(Uuid::new_v4(), loan_id, row))
            .collect();
        self.installments.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    fn installment(&self, id: InstallmentId) -> Result<Installment> {
        self.installments
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("installment", id))
    }

    fn installments_for_loan(&self, loan_id: LoanId) -> Result<Vec<Installment>> {
        let mut rows: Vec<Installment> = self
            .installments
            .iter()
            .filter(|i| i.loan_id == loan_id)
            .cloned()
            .collect();
        rows.sort_by_key(|i| i.month_number);
        Ok(rows)
    }

    fn installments(&self) -> Result<Vec<Installment>> {
        Ok(self.installments.clone())
    }

    fn set_installment_status(
        &mut self,
        id: InstallmentId,
        status: InstallmentStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Installment> {
        let row = self
            .installments
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| LedgerError::not_found("installment", id))?;
        row.status = status;
        row.updated_at = updated_at;
        Ok(row.clone())
    }
}
