use std::collections::HashMap;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};
use crate::money::Money;
use crate::records::{Customer, Installment};
use crate::store::LedgerStore;
use crate::types::{CustomerId, InstallmentId, InstallmentStatus, LoanId};

/// unpaid installment joined with the borrower's contact details, for collections follow-up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionItem {
    pub id: InstallmentId,
    pub loan_id: LoanId,
    pub month_number: u32,
    pub principal: Money,
    pub interest: Money,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_overdue: Option<i64>,
}

/// unpaid installments due before `today`, oldest first
pub fn overdue_installments<S: LedgerStore + ?Sized>(store: &S, today: NaiveDate) -> Result<Vec<CollectionItem>> {
    collect(store, |row| row.is_overdue(today), |row| Some(row.days_overdue(today)))
}

/// unpaid installments due within `[today, today + window_days]`, soonest first
pub fn upcoming_installments<S: LedgerStore + ?Sized>(
    store: &S,
    today: NaiveDate,
    window_days: u32,
) -> Result<Vec<CollectionItem>> {
    let horizon = today
        .checked_add_days(Days::new(u64::from(window_days)))
        .ok_or_else(|| LedgerError::invalid(format!("{window_days}-day window from {today} is out of range")))?;
    collect(
        store,
        |row| !row.status.is_paid() && row.due_date >= today && row.due_date <= horizon,
        |_| None,
    )
}

fn collect<S, F, D>(store: &S, include: F, days_overdue: D) -> Result<Vec<CollectionItem>>
where
    S: LedgerStore + ?Sized,
    F: Fn(&Installment) -> bool,
    D: Fn(&Installment) -> Option<i64>,
{
    let mut rows: Vec<Installment> = store.installments()?.into_iter().filter(|r| include(r)).collect();
    rows.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.month_number.cmp(&b.month_number)));

    let mut owners: HashMap<LoanId, CustomerId> = HashMap::new();
    let mut customers: HashMap<CustomerId, Customer> = HashMap::new();
    let mut items = Vec::with_capacity(rows.len());

    for row in rows {
        let customer_id = match owners.get(&row.loan_id) {
            Some(id) => *id,
            None => {
                let id = store.loan(row.loan_id)?.customer_id;
                owners.insert(row.loan_id, id);
                id
            }
        };
        if !customers.contains_key(&customer_id) {
            customers.insert(customer_id, store.customer(customer_id)?);
        }
        let customer = &customers[&customer_id];

        items.push(CollectionItem {
            id: row.id,
            loan_id: row.loan_id,
            month_number: row.month_number,
            principal: row.principal,
            interest: row.interest,
            amount: row.amount,
            due_date: row.due_date,
            status: row.status,
            customer_id,
            customer_name: customer.full_name(),
            customer_phone: customer.details.phone.clone(),
            days_overdue: days_overdue(&row),
        });
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amortization::{compute_schedule, LoanTerms};
    use crate::context::Caller;
    use crate::events::EventStore;
    use crate::materializer::{MaterializeRequest, ScheduleMaterializer};
    use crate::money::Rate;
    use crate::records::CustomerDetails;
    use crate::store::MemoryLedgerStore;
    use chrono::{TimeZone, Utc};
    use hourglass_rs::{SafeTimeProvider, TimeSource};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn book_loan(store: &mut MemoryLedgerStore, first: &str, disbursed: NaiveDate, time: &SafeTimeProvider) -> Vec<Installment> {
        let customer = store
            .insert_customer(CustomerDetails::new(first, "Obi").with_phone("0801"), time.now())
            .unwrap();
        let schedule = compute_schedule(&LoanTerms::new(
            Money::from_minor(120_000),
            Rate::from_percentage(10),
            3,
            disbursed,
        ))
        .unwrap();
        ScheduleMaterializer::materialize(
            store,
            &Caller::officer("amaka"),
            &schedule,
            &MaterializeRequest::new(customer.id),
            time,
            &mut EventStore::new(),
        )
        .unwrap()
        .installments
    }

    #[test]
    fn test_overdue_and_upcoming() {
        let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()));
        let mut store = MemoryLedgerStore::new();
        // due 2024-02-15, 03-15, 04-15
        let ada = book_loan(&mut store, "Ada", date(2024, 1, 15), &time);
        // due 2024-02-20, 03-20, 04-20
        let chi = book_loan(&mut store, "Chi", date(2024, 1, 20), &time);

        store
            .set_installment_status(ada[0].id, InstallmentStatus::Paid, time.now())
            .unwrap();

        let today = date(2024, 3, 16);
        let overdue = overdue_installments(&store, today).unwrap();
        let summary: Vec<(String, u32, Option<i64>)> = overdue
            .iter()
            .map(|i| (i.customer_name.clone(), i.month_number, i.days_overdue))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Chi Obi".to_string(), 1, Some(25)),
                ("Ada Obi".to_string(), 2, Some(1)),
            ]
        );
        assert_eq!(overdue[0].id, chi[0].id);
        assert_eq!(overdue[0].customer_phone.as_deref(), Some("0801"));

        let upcoming = upcoming_installments(&store, today, 7).unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, chi[1].id);
        assert_eq!(upcoming[0].days_overdue, None);
    }

    #[test]
    fn test_upcoming_window_is_inclusive() {
        let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()));
        let mut store = MemoryLedgerStore::new();
        let rows = book_loan(&mut store, "Ada", date(2024, 1, 15), &time);

        let upcoming = upcoming_installments(&store, date(2024, 2, 8), 7).unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, rows[0].id);

        assert!(upcoming_installments(&store, date(2024, 2, 7), 7).unwrap().is_empty());
        assert_eq!(upcoming_installments(&store, date(2024, 2, 15), 0).unwrap().len(), 1);
        assert!(overdue_installments(&store, date(2024, 2, 15)).unwrap().is_empty());
    }

    #[test]
    fn test_window_past_calendar_end_is_rejected() {
        let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()));
        let mut store = MemoryLedgerStore::new();
        book_loan(&mut store, "Ada", date(2024, 1, 15), &time);

        let err = upcoming_installments(&store, date(2024, 2, 8), 4_000_000_000).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput { .. }));
        assert!(upcoming_installments(&store, NaiveDate::MAX, 1).is_err());
    }

    #[test]
    fn test_days_overdue_serialized_only_when_present() {
        let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()));
        let mut store = MemoryLedgerStore::new();
        book_loan(&mut store, "Ada", date(2024, 1, 15), &time);

        let upcoming = upcoming_installments(&store, date(2024, 2, 10), 7).unwrap();
        let value = serde_json::to_value(&upcoming[0]).unwrap();
        assert!(value.get("days_overdue").is_none());
        assert_eq!(value["customer_name"], "Ada Obi");

        let overdue = overdue_installments(&store, date(2024, 2, 17)).unwrap();
        let value = serde_json::to_value(&overdue[0]).unwrap();
        assert_eq!(value["days_overdue"], 2);
    }
}
