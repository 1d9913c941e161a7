use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use tracing::{debug, info};

use crate::amortization::{AmortizationEngine, AmortizationSchedule, LoanTerms};
use crate::config::LedgerConfig;
use crate::context::Caller;
use crate::errors::Result;
use crate::events::{EventStore, LedgerEvent};
use crate::materializer::{MaterializeRequest, MaterializedLoan, ScheduleMaterializer};
use crate::records::{Customer, CustomerDetails, Installment, Loan};
use crate::reports::{self, CollectionItem};
use crate::status::{self, LoanSummary};
use crate::store::LedgerStore;
use crate::types::{CustomerId, InstallmentId, InstallmentStatus, LoanId};
use crate::views::LoanView;

/// customer and loan ledger over a single store
pub struct LoanBook<S: LedgerStore> {
    store: S,
    config: LedgerConfig,
    engine: AmortizationEngine,
    events: EventStore,
}

impl<S: LedgerStore> LoanBook<S> {
    pub fn new(store: S, config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        let engine = AmortizationEngine::from_config(&config);

        Ok(Self {
            store,
            config,
            engine,
            events: EventStore::new(),
        })
    }

    pub fn with_defaults(store: S) -> Self {
        Self {
            store,
            engine: AmortizationEngine::default(),
            config: LedgerConfig::default(),
            events: EventStore::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn engine(&self) -> &AmortizationEngine {
        &self.engine
    }

    pub fn events(&self) -> &EventStore {
        &self.events
    }

    /// drain the audit trail collected so far
    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        self.events.take_events()
    }

    pub fn into_store(self) -> S {
        self.store
    }

    // customers

    pub fn register_customer(
        &mut self,
        caller: &Caller,
        details: CustomerDetails,
        time_provider: &SafeTimeProvider,
    ) -> Result<Customer> {
        caller.authorize("register customers")?;
        let now = time_provider.now();
        let customer = self.store.insert_customer(details.normalized()?, now)?;

        info!(customer_id = %customer.id, operator = %caller.operator, "customer registered");
        self.events.emit(LedgerEvent::CustomerRegistered {
            customer_id: customer.id,
            operator: caller.operator.clone(),
            timestamp: now,
        });

        Ok(customer)
    }

    pub fn update_customer(
        &mut self,
        caller: &Caller,
        customer_id: CustomerId,
        details: CustomerDetails,
        time_provider: &SafeTimeProvider,
    ) -> Result<Customer> {
        caller.authorize("update customers")?;
        let now = time_provider.now();
        let customer = self.store.update_customer(customer_id, details.normalized()?, now)?;

        info!(customer_id = %customer.id, operator = %caller.operator, "customer updated");
        self.events.emit(LedgerEvent::CustomerUpdated {
            customer_id,
            operator: caller.operator.clone(),
            timestamp: now,
        });

        Ok(customer)
    }

    pub fn customer(&self, caller: &Caller, customer_id: CustomerId) -> Result<Customer> {
        debug!(customer_id = %customer_id, operator = %caller.operator, "customer lookup");
        self.store.customer(customer_id)
    }

    /// newest first
    pub fn customers(&self, caller: &Caller) -> Result<Vec<Customer>> {
        debug!(operator = %caller.operator, "customer listing");
        self.store.customers()
    }

    /// customers whose name or phone contains `query`, newest first; a blank query lists everyone
    pub fn search_customers(&self, caller: &Caller, query: &str) -> Result<Vec<Customer>> {
        debug!(operator = %caller.operator, query, "customer search");
        self.store.search_customers(query)
    }

    /// delete a customer along with every loan and installment they hold; returns the number of loans removed
    pub fn remove_customer(
        &mut self,
        caller: &Caller,
        customer_id: CustomerId,
        time_provider: &SafeTimeProvider,
    ) -> Result<usize> {
        caller.authorize("remove customers")?;
        let loans_removed = self.store.loans_for_customer(customer_id)?.len();
        self.store.delete_customer(customer_id)?;

        let now = time_provider.now();
        info!(customer_id = %customer_id, loans_removed, operator = %caller.operator, "customer removed");
        self.events.emit(LedgerEvent::CustomerRemoved {
            customer_id,
            loans_removed,
            operator: caller.operator.clone(),
            timestamp: now,
        });

        Ok(loans_removed)
    }

    // loans

    /// compute a schedule without persisting anything
    pub fn preview_schedule(&self, caller: &Caller, terms: &LoanTerms) -> Result<AmortizationSchedule> {
        debug!(operator = %caller.operator, principal = %terms.principal, "schedule preview");
        self.engine.compute_schedule(terms)
    }

    /// compute the schedule for `terms` and store it against the customer.
    ///
    /// `elapsed_months` marks installments numbered below it as PAID, for loans imported mid-term.
    pub fn originate_loan(
        &mut self,
        caller: &Caller,
        customer_id: CustomerId,
        terms: LoanTerms,
        elapsed_months: Option<u32>,
        time_provider: &SafeTimeProvider,
    ) -> Result<MaterializedLoan> {
        caller.authorize("originate loans")?;
        let schedule = self.engine.compute_schedule(&terms)?;

        let mut request = MaterializeRequest::new(customer_id);
        if let Some(months) = elapsed_months {
            request = request.elapsed(months);
        }

        ScheduleMaterializer::materialize(
            &mut self.store,
            caller,
            &schedule,
            &request,
            time_provider,
            &mut self.events,
        )
    }

    pub fn loan(&self, caller: &Caller, loan_id: LoanId) -> Result<Loan> {
        debug!(loan_id = %loan_id, operator = %caller.operator, "loan lookup");
        self.store.loan(loan_id)
    }

    pub fn loans_for_customer(&self, caller: &Caller, customer_id: CustomerId) -> Result<Vec<Loan>> {
        debug!(customer_id = %customer_id, operator = %caller.operator, "loan listing");
        self.store.customer(customer_id)?;
        self.store.loans_for_customer(customer_id)
    }

    pub fn loan_view(&self, caller: &Caller, loan_id: LoanId, today: NaiveDate) -> Result<LoanView> {
        let loan = self.loan(caller, loan_id)?;
        let installments = self.store.installments_for_loan(loan_id)?;
        Ok(LoanView::new(loan, installments, today))
    }

    pub fn remove_loan(&mut self, caller: &Caller, loan_id: LoanId, time_provider: &SafeTimeProvider) -> Result<()> {
        caller.authorize("remove loans")?;
        self.store.delete_loan(loan_id)?;

        let now = time_provider.now();
        info!(loan_id = %loan_id, operator = %caller.operator, "loan removed");
        self.events.emit(LedgerEvent::LoanRemoved {
            loan_id,
            operator: caller.operator.clone(),
            timestamp: now,
        });

        Ok(())
    }

    // installments

    pub fn installment(&self, caller: &Caller, installment_id: InstallmentId) -> Result<Installment> {
        debug!(installment_id = %installment_id, operator = %caller.operator, "installment lookup");
        self.store.installment(installment_id)
    }

    pub fn set_installment_status(
        &mut self,
        caller: &Caller,
        installment_id: InstallmentId,
        new_status: InstallmentStatus,
        time_provider: &SafeTimeProvider,
    ) -> Result<Installment> {
        status::transition_status(
            &mut self.store,
            caller,
            installment_id,
            new_status,
            time_provider,
            &mut self.events,
        )
    }

    /// set status with system time
    pub fn set_installment_status_now(
        &mut self,
        caller: &Caller,
        installment_id: InstallmentId,
        new_status: InstallmentStatus,
    ) -> Result<Installment> {
        let time = SafeTimeProvider::new(hourglass_rs::TimeSource::System);
        self.set_installment_status(caller, installment_id, new_status, &time)
    }

    pub fn loan_summary(&self, caller: &Caller, loan_id: LoanId, today: NaiveDate) -> Result<LoanSummary> {
        debug!(loan_id = %loan_id, operator = %caller.operator, "loan summary");
        self.store.loan(loan_id)?;
        let installments = self.store.installments_for_loan(loan_id)?;
        Ok(LoanSummary::fold(&installments, today))
    }

    // collections

    pub fn overdue_installments(&self, caller: &Caller, today: NaiveDate) -> Result<Vec<CollectionItem>> {
        debug!(operator = %caller.operator, %today, "overdue listing");
        reports::overdue_installments(&self.store, today)
    }

    /// unpaid installments due within the configured window
    pub fn upcoming_installments(&self, caller: &Caller, today: NaiveDate) -> Result<Vec<CollectionItem>> {
        debug!(operator = %caller.operator, %today, "upcoming listing");
        reports::upcoming_installments(&self.store, today, self.config.upcoming_window_days)
    }
}
