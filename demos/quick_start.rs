use chrono::{NaiveDate, TimeZone, Utc};
use loan_ledger_rs::*;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()));
    let officer = Caller::officer("demo");

    let mut book = LoanBook::new(SqliteLedgerStore::in_memory()?, LedgerConfig::default())?;
    let customer = book.register_customer(
        &officer,
        CustomerDetails::new("Ada", "Obi").with_phone("0801 234 5678"),
        &time,
    )?;

    let terms = LoanTerms::new(
        Money::from_minor(120_000),
        Rate::from_percentage(10),
        3,
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
    );
    println!("schedule preview:");
    println!("{}", ScheduleView::from(&book.preview_schedule(&officer, &terms)?).to_json_pretty()?);

    let originated = book.originate_loan(&officer, customer.id, terms, None, &time)?;
    book.set_installment_status(&officer, originated.installments[0].id, InstallmentStatus::Paid, &time)?;

    let today = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
    println!("loan as of {today}:");
    println!("{}", book.loan_view(&officer, originated.loan.id, today)?.to_json_pretty()?);

    for item in book.overdue_installments(&officer, today)? {
        println!(
            "overdue: {} month {} {} ({} days)",
            item.customer_name,
            item.month_number,
            item.amount,
            item.days_overdue.unwrap_or_default()
        );
    }

    Ok(())
}
