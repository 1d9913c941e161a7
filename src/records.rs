use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::amortization::LoanTerms;
use crate::errors::{LedgerError, Result};
use crate::money::{Money, Rate};
use crate::types::{CustomerId, InstallmentId, InstallmentStatus, LoanId};

/// customer contact details as entered on the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl CustomerDetails {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Self::default()
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// trim every field, drop blank optionals, require both names
    pub fn normalized(self) -> Result<Self> {
        let first_name = self.first_name.trim().to_string();
        let last_name = self.last_name.trim().to_string();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(LedgerError::invalid("first name and last name are required"));
        }

        Ok(Self {
            first_name,
            last_name,
            phone: non_blank(self.phone),
            email: non_blank(self.email),
            address: non_blank(self.address),
        })
    }

    /// substring match on first name, last name or phone, ignoring ASCII case. A blank query matches everyone
    pub fn matches_search(&self, query: &str) -> bool {
        let needle = query.trim().to_ascii_lowercase();
        if needle.is_empty() {
            return true;
        }

        [Some(&self.first_name), Some(&self.last_name), self.phone.as_ref()]
            .into_iter()
            .flatten()
            .any(|field| field.to_ascii_lowercase().contains(&needle))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    #[serde(flatten)]
    pub details: CustomerDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.details.first_name, self.details.last_name)
    }
}

/// loan row before the store assigns its id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoan {
    pub customer_id: CustomerId,
    pub terms: LoanTerms,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub customer_id: CustomerId,
    pub principal: Money,
    pub interest_rate: Rate,
    pub duration_months: u32,
    pub disbursement_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Loan {
    pub fn from_new(id: LoanId, new: &NewLoan) -> Self {
        Self {
            id,
            customer_id: new.customer_id,
            principal: new.terms.principal,
            interest_rate: new.terms.rate,
            duration_months: new.terms.duration_months,
            disbursement_date: new.terms.disbursement_date,
            created_at: new.created_at,
        }
    }

    pub fn terms(&self) -> LoanTerms {
        LoanTerms::new(
            self.principal,
            self.interest_rate,
            self.duration_months,
            self.disbursement_date,
        )
    }
}

/// installment row before it is tied to a stored loan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInstallment {
    pub month_number: u32,
    pub principal: Money,
    pub interest: Money,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
    pub created_at: DateTime<Utc>,
}

/// one persisted month of a loan's repayment ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    pub id: InstallmentId,
    pub loan_id: LoanId,
    pub month_number: u32,
    pub principal: Money,
    pub interest: Money,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Installment {
    pub fn from_new(id: InstallmentId, loan_id: LoanId, new: &NewInstallment) -> Self {
        Self {
            id,
            loan_id,
            month_number: new.month_number,
            principal: new.principal,
            interest: new.interest,
            amount: new.amount,
            due_date: new.due_date,
            status: new.status,
            created_at: new.created_at,
            updated_at: new.created_at,
        }
    }

    /// unpaid and past its due date
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.status.is_paid() && self.due_date < today
    }

    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        if self.is_overdue(today) {
            (today - self.due_date).num_days()
        } else {
            0
        }
    }
}
