//! SQLite-backed ledger store

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use crate::errors::{LedgerError, Result};
use crate::money::{Money, Rate};
use crate::records::{Customer, CustomerDetails, Installment, Loan, NewInstallment, NewLoan};
use crate::store::LedgerStore;
use crate::types::{CustomerId, InstallmentId, InstallmentStatus, LoanId};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS customers (
        id TEXT PRIMARY KEY,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        phone TEXT,
        email TEXT,
        address TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS loans (
        id TEXT PRIMARY KEY,
        customer_id TEXT NOT NULL REFERENCES customers(id) ON DELETE CASCADE,
        principal INTEGER NOT NULL CHECK (principal > 0),
        interest_rate INTEGER NOT NULL CHECK (interest_rate >= 0),
        duration_months INTEGER NOT NULL CHECK (duration_months > 0),
        disbursement_date TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS payments (
        id TEXT PRIMARY KEY,
        loan_id TEXT NOT NULL REFERENCES loans(id) ON DELETE CASCADE,
        month_number INTEGER NOT NULL,
        principal INTEGER NOT NULL,
        interest INTEGER NOT NULL,
        amount INTEGER NOT NULL,
        due_date TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'NOT_PAID' CHECK (status IN ('PAID', 'NOT_PAID', 'PENDING')),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (loan_id, month_number)
    );

    CREATE INDEX IF NOT EXISTS idx_loans_customer ON loans(customer_id);
    CREATE INDEX IF NOT EXISTS idx_payments_due_date ON payments(due_date);
";

const CUSTOMER_COLUMNS: &str =
    "id, first_name, last_name, phone, email, address, created_at, updated_at";
const LOAN_COLUMNS: &str =
    "id, customer_id, principal, interest_rate, duration_months, disbursement_date, created_at";
const PAYMENT_COLUMNS: &str =
    "id, loan_id, month_number, principal, interest, amount, due_date, status, created_at, updated_at";

/// SQLite storage for customers, loans and payments
pub struct SqliteLedgerStore {
    conn: Connection,
}

impl SqliteLedgerStore {
    /// open (or create) a store at the given database path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }
}

impl LedgerStore for SqliteLedgerStore {
    fn insert_customer(&mut self, details: CustomerDetails, created_at: DateTime<Utc>) -> Result<Customer> {
        let customer = Customer {
            id: Uuid::new_v4(),
            details,
            created_at,
            updated_at: created_at,
        };

        self.conn.execute(
            "INSERT INTO customers (id, first_name, last_name, phone, email, address, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                customer.id.to_string(),
                customer.details.first_name,
                customer.details.last_name,
                customer.details.phone,
                customer.details.email,
                customer.details.address,
                customer.created_at.to_rfc3339(),
                customer.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(customer)
    }

    fn update_customer(
        &mut self,
        id: CustomerId,
        details: CustomerDetails,
        updated_at: DateTime<Utc>,
    ) -> Result<Customer> {
        let rows = self.conn.execute(
            "UPDATE customers
             SET first_name = ?1, last_name = ?2, phone = ?3, email = ?4, address = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                details.first_name,
                details.last_name,
                details.phone,
                details.email,
                details.address,
                updated_at.to_rfc3339(),
                id.to_string(),
            ],
        )?;

        if rows == 0 {
            return Err(LedgerError::not_found("customer", id));
        }

        self.customer(id)
    }

    fn customer(&self, id: CustomerId) -> Result<Customer> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"),
                params![id.to_string()],
                RawCustomer::from_row,
            )
            .optional()?
            .ok_or_else(|| LedgerError::not_found("customer", id))?;
        raw.into_record()
    }

    fn customers(&self) -> Result<Vec<Customer>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY created_at DESC, rowid DESC"
        ))?;
        let raws = stmt
            .query_map([], RawCustomer::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        raws.into_iter().map(RawCustomer::into_record).collect()
    }

    fn search_customers(&self, query: &str) -> Result<Vec<Customer>> {
        let needle = query.trim();
        if needle.is_empty() {
            return self.customers();
        }

        // LIKE folds ASCII case
        let pattern = format!("%{}%", escape_like(needle));
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers
             WHERE first_name LIKE ?1 ESCAPE '\\' OR last_name LIKE ?1 ESCAPE '\\' OR phone LIKE ?1 ESCAPE '\\'
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let raws = stmt
            .query_map(params![pattern], RawCustomer::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!(query = needle, matches = raws.len(), "customer search");
        raws.into_iter().map(RawCustomer::into_record).collect()
    }

    fn delete_customer(&mut self, id: CustomerId) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM customers WHERE id = ?1", params![id.to_string()])?;
        if rows == 0 {
            return Err(LedgerError::not_found("customer", id));
        }
        Ok(())
    }

    fn insert_loan(&mut self, loan: NewLoan) -> Result<Loan> {
        insert_loan_row(&self.conn, &loan)
    }

    fn loan(&self, id: LoanId) -> Result<Loan> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {LOAN_COLUMNS} FROM loans WHERE id = ?1"),
                params![id.to_string()],
                RawLoan::from_row,
            )
            .optional()?
            .ok_or_else(|| LedgerError::not_found("loan", id))?;
        raw.into_record()
    }

    fn loans_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Loan>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE customer_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))?;
        let raws = stmt
            .query_map(params![customer_id.to_string()], RawLoan::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        raws.into_iter().map(RawLoan::into_record).collect()
    }

    fn delete_loan(&mut self, id: LoanId) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM loans WHERE id = ?1", params![id.to_string()])?;
        if rows == 0 {
            return Err(LedgerError::not_found("loan", id));
        }
        Ok(())
    }

    fn insert_installments(&mut self, loan_id: LoanId, rows: &[NewInstallment]) -> Result<Vec<Installment>> {
        let tx = self.conn.transaction()?;
        let installments = insert_installment_rows(&tx, loan_id, rows)?;
        tx.commit()?;
        Ok(installments)
    }

    fn installment(&self, id: InstallmentId) -> Result<Installment> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?1"),
                params![id.to_string()],
                RawInstallment::from_row,
            )
            .optional()?
            .ok_or_else(|| LedgerError::not_found("installment", id))?;
        raw.into_record()
    }

    fn installments_for_loan(&self, loan_id: LoanId) -> Result<Vec<Installment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE loan_id = ?1 ORDER BY month_number ASC"
        ))?;
        let raws = stmt
            .query_map(params![loan_id.to_string()], RawInstallment::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        raws.into_iter().map(RawInstallment::into_record).collect()
    }

    fn installments(&self) -> Result<Vec<Installment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments ORDER BY due_date ASC, month_number ASC"
        ))?;
        let raws = stmt
            .query_map([], RawInstallment::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        raws.into_iter().map(RawInstallment::into_record).collect()
    }

    fn set_installment_status(
        &mut self,
        id: InstallmentId,
        status: InstallmentStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Installment> {
        let rows = self.conn.execute(
            "UPDATE payments SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), updated_at.to_rfc3339(), id.to_string()],
        )?;
        if rows == 0 {
            return Err(LedgerError::not_found("installment", id));
        }
        self.installment(id)
    }

    /// loan row and payment rows in one SQLite transaction
    fn insert_loan_with_installments(
        &mut self,
        loan: NewLoan,
        rows: &[NewInstallment],
    ) -> Result<(Loan, Vec<Installment>)> {
        let tx = self.conn.transaction()?;
        let loan = insert_loan_row(&tx, &loan)?;
        let installments = insert_installment_rows(&tx, loan.id, rows)?;
        tx.commit()?;
        debug!(loan_id = %loan.id, installments = installments.len(), "loan transaction committed");
        Ok((loan, installments))
    }
}

fn insert_loan_row(conn: &Connection, loan: &NewLoan) -> Result<Loan> {
    let customer_exists = conn
        .query_row(
            "SELECT 1 FROM customers WHERE id = ?1",
            params![loan.customer_id.to_string()],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !customer_exists {
        return Err(LedgerError::not_found("customer", loan.customer_id));
    }

    let loan = Loan::from_new(Uuid::new_v4(), loan);
    conn.execute(
        "INSERT INTO loans (id, customer_id, principal, interest_rate, duration_months, disbursement_date, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            loan.id.to_string(),
            loan.customer_id.to_string(),
            loan.principal.minor(),
            loan.interest_rate.percent(),
            loan.duration_months,
            loan.disbursement_date.to_string(),
            loan.created_at.to_rfc3339(),
            loan.created_at.to_rfc3339(),
        ],
    )?;
    Ok(loan)
}

fn insert_installment_rows(conn: &Connection, loan_id: LoanId, rows: &[NewInstallment]) -> Result<Vec<Installment>> {
    let mut stmt = conn.prepare(
        "INSERT INTO payments (id, loan_id, month_number, principal, interest, amount, due_date, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;

    let mut inserted = Vec::with_capacity(rows.len());
    for row in rows {
        let installment = Installment::from_new(Uuid::new_v4(), loan_id, row);
        stmt.execute(params![
            installment.id.to_string(),
            installment.loan_id.to_string(),
            installment.month_number,
            installment.principal.minor(),
            installment.interest.minor(),
            installment.amount.minor(),
            installment.due_date.to_string(),
            installment.status.as_str(),
            installment.created_at.to_rfc3339(),
            installment.updated_at.to_rfc3339(),
        ])?;
        inserted.push(installment);
    }
    Ok(inserted)
}

fn parse_id(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| LedgerError::persistence(format!("corrupt id {value}: {e}")))
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| LedgerError::persistence(format!("corrupt date {value}: {e}")))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| LedgerError::persistence(format!("corrupt timestamp {value}: {e}")))
}

// rows are read as raw column values first; parsing happens outside the rusqlite closure

struct RawCustomer {
    id: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    created_at: String,
    updated_at: String,
}

impl RawCustomer {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            phone: row.get(3)?,
            email: row.get(4)?,
            address: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_record(self) -> Result<Customer> {
        Ok(Customer {
            id: parse_id(&self.id)?,
            details: CustomerDetails {
                first_name: self.first_name,
                last_name: self.last_name,
                phone: self.phone,
                email: self.email,
                address: self.address,
            },
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

struct RawLoan {
    id: String,
    customer_id: String,
    principal: i64,
    interest_rate: u32,
    duration_months: u32,
    disbursement_date: String,
    created_at: String,
}

impl RawLoan {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            customer_id: row.get(1)?,
            principal: row.get(2)?,
            interest_rate: row.get(3)?,
            duration_months: row.get(4)?,
            disbursement_date: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_record(self) -> Result<Loan> {
        Ok(Loan {
            id: parse_id(&self.id)?,
            customer_id: parse_id(&self.customer_id)?,
            principal: Money::from_minor(self.principal),
            interest_rate: Rate::from_percentage(self.interest_rate),
            duration_months: self.duration_months,
            disbursement_date: parse_date(&self.disbursement_date)?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

struct RawInstallment {
    id: String,
    loan_id: String,
    month_number: u32,
    principal: i64,
    interest: i64,
    amount: i64,
    due_date: String,
    status: String,
    created_at: String,
    updated_at: String,
}

impl RawInstallment {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            loan_id: row.get(1)?,
            month_number: row.get(2)?,
            principal: row.get(3)?,
            interest: row.get(4)?,
            amount: row.get(5)?,
            due_date: row.get(6)?,
            status: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_record(self) -> Result<Installment> {
        Ok(Installment {
            id: parse_id(&self.id)?,
            loan_id: parse_id(&self.loan_id)?,
            month_number: self.month_number,
            principal: Money::from_minor(self.principal),
            interest: Money::from_minor(self.interest),
            amount: Money::from_minor(self.amount),
            due_date: parse_date(&self.due_date)?,
            status: self.status.parse()?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

/// escape LIKE wildcards so user input only matches literally
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
