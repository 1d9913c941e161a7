use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::{LedgerConfig, RateBounds, MAX_DURATION_MONTHS};
use crate::errors::{LedgerError, Result};
use crate::money::{Money, Rate};
use crate::types::{RemainderPolicy, DEFAULT_REMAINDER_POLICY};

/// financial terms of a loan, fixed at origination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanTerms {
    pub principal: Money,
    #[serde(rename = "ratePercent")]
    pub rate: Rate,
    pub duration_months: u32,
    pub disbursement_date: NaiveDate,
}

impl LoanTerms {
    pub fn new(principal: Money, rate: Rate, duration_months: u32, disbursement_date: NaiveDate) -> Self {
        Self {
            principal,
            rate,
            duration_months,
            disbursement_date,
        }
    }

    pub fn validate(&self, rate_bounds: &RateBounds, max_duration_months: u32) -> Result<()> {
        if !self.principal.is_positive() {
            return Err(LedgerError::invalid(format!(
                "principal must be at least 1, got {}",
                self.principal
            )));
        }

        if self.duration_months == 0 {
            return Err(LedgerError::invalid("duration must be at least 1 month"));
        }

        if self.duration_months > max_duration_months {
            return Err(LedgerError::invalid(format!(
                "duration of {} months exceeds the maximum of {}",
                self.duration_months, max_duration_months
            )));
        }

        if !rate_bounds.contains(self.rate) {
            return Err(LedgerError::invalid(format!(
                "interest rate {} outside accepted range {}%..={}%",
                self.rate, rate_bounds.min_percent, rate_bounds.max_percent
            )));
        }

        Ok(())
    }
}

/// one month of an amortization schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub month: u32,
    pub principal: Money,
    pub interest: Money,
    pub amount: Money,
    pub due_date: NaiveDate,
    /// balance the month's interest was charged on
    pub remaining_principal_before_this_month: Money,
}

/// complete repayment schedule for a set of loan terms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationSchedule {
    pub terms: LoanTerms,
    pub remainder_policy: RemainderPolicy,
    pub entries: Vec<ScheduleEntry>,
    pub total_interest: Money,
    pub total_amount: Money,
}

impl AmortizationSchedule {
    /// get entry for a 1-based month
    pub fn entry(&self, month: u32) -> Option<&ScheduleEntry> {
        if month == 0 {
            return None;
        }
        self.entries.get((month - 1) as usize)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// principal actually distributed across installments
    pub fn total_principal(&self) -> Money {
        self.entries.iter().map(|e| e.principal).sum()
    }

    /// principal the installments fail to collect; zero unless the remainder was truncated
    pub fn principal_shortfall(&self) -> Money {
        self.terms.principal - self.total_principal()
    }

    pub fn maturity_date(&self) -> Option<NaiveDate> {
        self.entries.last().map(|e| e.due_date)
    }

    /// re-check a schedule that did not come straight from the engine.
    ///
    /// The rows are recomputed from the schedule's own terms and policy and must match exactly.
    /// The pricing engine's rate and duration limits are not applied.
    pub fn verify(&self) -> Result<()> {
        let expected = self.terms.duration_months as usize;
        if self.entries.len() != expected {
            return Err(LedgerError::invalid(format!(
                "schedule has {} installments, terms require {}",
                self.entries.len(),
                expected
            )));
        }

        let recomputed = AmortizationEngine::new(self.remainder_policy)
            .with_rate_bounds(RateBounds::new(0, u32::MAX))
            .with_max_duration_months(self.terms.duration_months)
            .compute_schedule(&self.terms)?;

        for (index, (entry, computed)) in self.entries.iter().zip(&recomputed.entries).enumerate() {
            if entry != computed {
                return Err(LedgerError::invalid(format!(
                    "installment {} does not match its terms: expected {} ({} principal + {} interest) due {}",
                    index + 1,
                    computed.amount,
                    computed.principal,
                    computed.interest,
                    computed.due_date
                )));
            }
        }

        if self.total_interest != recomputed.total_interest || self.total_amount != recomputed.total_amount {
            return Err(LedgerError::invalid(format!(
                "schedule totals do not match its installments: expected interest {} and amount {}",
                recomputed.total_interest, recomputed.total_amount
            )));
        }

        Ok(())
    }
}

/// equal-principal, declining-balance amortization engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmortizationEngine {
    remainder_policy: RemainderPolicy,
    rate_bounds: RateBounds,
    max_duration_months: u32,
}

impl Default for AmortizationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_REMAINDER_POLICY)
    }
}

impl AmortizationEngine {
    pub fn new(remainder_policy: RemainderPolicy) -> Self {
        Self {
            remainder_policy,
            rate_bounds: RateBounds::default(),
            max_duration_months: MAX_DURATION_MONTHS,
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self {
            remainder_policy: config.remainder_policy,
            rate_bounds: config.rate_bounds,
            max_duration_months: config.max_duration_months,
        }
    }

    pub fn with_rate_bounds(mut self, rate_bounds: RateBounds) -> Self {
        self.rate_bounds = rate_bounds;
        self
    }

    pub fn with_max_duration_months(mut self, max_duration_months: u32) -> Self {
        self.max_duration_months = max_duration_months;
        self
    }

    pub fn remainder_policy(&self) -> RemainderPolicy {
        self.remainder_policy
    }

    /// compute the full schedule; either every installment is produced or an error is returned
    pub fn compute_schedule(&self, terms: &LoanTerms) -> Result<AmortizationSchedule> {
        terms.validate(&self.rate_bounds, self.max_duration_months)?;

        let (monthly_principal, remainder) = terms
            .principal
            .split_evenly(terms.duration_months)
            .ok_or_else(|| LedgerError::invalid("duration must be at least 1 month"))?;

        let mut entries = Vec::with_capacity(terms.duration_months as usize);
        let mut remaining = terms.principal;
        let mut total_interest = Money::ZERO;

        // each month's interest depends on the previous month's closing balance
        for month in 1..=terms.duration_months {
            let principal = match self.remainder_policy {
                RemainderPolicy::FinalInstallment if month == terms.duration_months => {
                    monthly_principal + remainder
                }
                _ => monthly_principal,
            };

            let interest = remaining.interest_at(terms.rate).ok_or_else(|| {
                LedgerError::invalid(format!("interest overflows for balance {remaining}"))
            })?;

            let amount = principal.checked_add(interest).ok_or_else(|| {
                LedgerError::invalid(format!("installment {month} overflows the money range"))
            })?;

            entries.push(ScheduleEntry {
                month,
                principal,
                interest,
                amount,
                due_date: due_date(terms.disbursement_date, month)?,
                remaining_principal_before_this_month: remaining,
            });

            total_interest = total_interest
                .checked_add(interest)
                .ok_or_else(|| LedgerError::invalid("total interest overflows the money range"))?;
            remaining -= principal;
        }

        let total_amount = terms
            .principal
            .checked_add(total_interest)
            .ok_or_else(|| LedgerError::invalid("total amount overflows the money range"))?;

        Ok(AmortizationSchedule {
            terms: *terms,
            remainder_policy: self.remainder_policy,
            entries,
            total_interest,
            total_amount,
        })
    }
}

/// compute a schedule with the default engine
pub fn compute_schedule(terms: &LoanTerms) -> Result<AmortizationSchedule> {
    AmortizationEngine::default().compute_schedule(terms)
}

/// disbursement date plus `month` calendar months, clamped to the end of shorter months
pub fn due_date(disbursement_date: NaiveDate, month: u32) -> Result<NaiveDate> {
    disbursement_date
        .checked_add_months(Months::new(month))
        .ok_or_else(|| {
            LedgerError::invalid(format!(
                "due date of month {month} after {disbursement_date} is out of range"
            ))
        })
}
