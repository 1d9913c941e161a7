/// serializable views handed to the dashboard and API layer
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::amortization::{AmortizationSchedule, ScheduleEntry};
use crate::errors::Result;
use crate::money::Money;
use crate::records::{Installment, Loan};
use crate::status::LoanSummary;

/// engine output in its wire shape: the ordered rows plus the two totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleView {
    pub schedule: Vec<ScheduleEntry>,
    pub total_interest: Money,
    pub total_amount: Money,
}

impl ScheduleView {
    pub fn from_schedule(schedule: &AmortizationSchedule) -> Self {
        ScheduleView {
            schedule: schedule.entries.clone(),
            total_interest: schedule.total_interest,
            total_amount: schedule.total_amount,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl From<&AmortizationSchedule> for ScheduleView {
    fn from(schedule: &AmortizationSchedule) -> Self {
        Self::from_schedule(schedule)
    }
}

/// a stored loan with its installments and repayment position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanView {
    pub loan: Loan,
    pub installments: Vec<Installment>,
    pub summary: LoanSummary,
    pub as_of: NaiveDate,
}

impl LoanView {
    pub fn new(loan: Loan, installments: Vec<Installment>, today: NaiveDate) -> Self {
        let summary = LoanSummary::fold(&installments, today);
        LoanView {
            loan,
            installments,
            summary,
            as_of: today,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
