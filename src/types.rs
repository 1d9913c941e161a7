use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::LedgerError;

/// unique identifier for a customer
pub type CustomerId = Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for an installment row
pub type InstallmentId = Uuid;

/// repayment status of a single installment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstallmentStatus {
    /// money received
    Paid,
    /// payment announced but not yet confirmed
    Pending,
    /// initial state of every generated installment
    #[default]
    NotPaid,
}

impl InstallmentStatus {
    pub const ALL: [InstallmentStatus; 3] = [
        InstallmentStatus::Paid,
        InstallmentStatus::Pending,
        InstallmentStatus::NotPaid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InstallmentStatus::Paid => "PAID",
            InstallmentStatus::Pending => "PENDING",
            InstallmentStatus::NotPaid => "NOT_PAID",
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, InstallmentStatus::Paid)
    }
}

impl fmt::Display for InstallmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstallmentStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PAID" => Ok(InstallmentStatus::Paid),
            "PENDING" => Ok(InstallmentStatus::Pending),
            "NOT_PAID" => Ok(InstallmentStatus::NotPaid),
            other => Err(LedgerError::invalid(format!("invalid payment status: {other}"))),
        }
    }
}

/// what happens to `principal mod duration` when principal is split into equal monthly shares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    /// drop the remainder; installments under-collect principal by up to `duration - 1` units.
    /// reproduces schedules generated by the legacy dashboard
    Truncate,
    /// add the remainder to the last installment's principal portion so principal reconciles exactly
    FinalInstallment,
}

/// remainder policy applied unless configuration says otherwise
pub const DEFAULT_REMAINDER_POLICY: RemainderPolicy = RemainderPolicy::FinalInstallment;

// tracks DEFAULT_REMAINDER_POLICY
impl Default for RemainderPolicy {
    fn default() -> Self {
        DEFAULT_REMAINDER_POLICY
    }
}
