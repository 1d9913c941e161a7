use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::{Money, Rate};
use crate::types::{CustomerId, InstallmentId, InstallmentStatus, LoanId};

/// audit trail entries emitted by ledger operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LedgerEvent {
    // customer events
    CustomerRegistered {
        customer_id: CustomerId,
        operator: String,
        timestamp: DateTime<Utc>,
    },
    CustomerUpdated {
        customer_id: CustomerId,
        operator: String,
        timestamp: DateTime<Utc>,
    },
    CustomerRemoved {
        customer_id: CustomerId,
        loans_removed: usize,
        operator: String,
        timestamp: DateTime<Utc>,
    },

    // origination events
    LoanOriginated {
        loan_id: LoanId,
        customer_id: CustomerId,
        principal: Money,
        rate: Rate,
        duration_months: u32,
        operator: String,
        timestamp: DateTime<Utc>,
    },
    ScheduleMaterialized {
        loan_id: LoanId,
        installments: usize,
        prepaid_installments: usize,
        total_interest: Money,
        total_amount: Money,
        principal_shortfall: Money,
        timestamp: DateTime<Utc>,
    },
    MaterializationRolledBack {
        customer_id: CustomerId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    LoanRemoved {
        loan_id: LoanId,
        operator: String,
        timestamp: DateTime<Utc>,
    },

    // repayment events
    InstallmentStatusChanged {
        installment_id: InstallmentId,
        loan_id: LoanId,
        old_status: InstallmentStatus,
        new_status: InstallmentStatus,
        operator: String,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<LedgerEvent>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
