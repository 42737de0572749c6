use super::{InsertOutcome, RecordStore};
use crate::error::{AnalyticsError, Result};
use crate::schema::{
    BudgetRecord, BusinessUnit, CashFlowComponents, CashFlowRecord, DateRange, FinancialRecord,
    GeneratedSeries, PnlComponents,
};
use log::debug;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

impl ToSql for BusinessUnit {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for BusinessUnit {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: AnalyticsError| FromSqlError::Other(Box::new(e)))
    }
}

/// SQLite-backed store with one table per record type.
///
/// A single connection behind a mutex serves reads and writes alike, so reads
/// are serialized even though file databases run in WAL mode. A connection
/// pool would let readers proceed concurrently; one guarded connection is
/// enough for the request volume this serves.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str() == ":memory:" {
            return Self::open_in_memory();
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| AnalyticsError::StorageLock)
    }
}

/// Creates the three record tables and their indexes if they do not exist yet.
pub fn setup_database(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS financial_periods (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            period_date TEXT NOT NULL,
            company_unit TEXT NOT NULL DEFAULT 'consolidated',
            revenue REAL NOT NULL,
            cogs REAL NOT NULL,
            gross_profit REAL NOT NULL,
            salaries REAL NOT NULL,
            marketing REAL NOT NULL,
            rd_expense REAL NOT NULL,
            operations REAL NOT NULL,
            other_expenses REAL NOT NULL,
            total_expenses REAL NOT NULL,
            net_profit REAL NOT NULL,
            gross_margin_pct REAL NOT NULL,
            net_margin_pct REAL NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS budget_data (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            period_date TEXT NOT NULL,
            company_unit TEXT NOT NULL DEFAULT 'consolidated',
            budget_revenue REAL NOT NULL,
            budget_net_profit REAL NOT NULL,
            budget_expenses REAL NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS cash_flow_data (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            period_date TEXT NOT NULL,
            company_unit TEXT NOT NULL DEFAULT 'consolidated',
            operating_cash_flow REAL NOT NULL,
            investing_cash_flow REAL NOT NULL,
            financing_cash_flow REAL NOT NULL,
            net_cash_flow REAL NOT NULL,
            cash_balance REAL NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_financial_unit_date
            ON financial_periods(company_unit, period_date);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_budget_unit_date
            ON budget_data(company_unit, period_date);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_cash_flow_unit_date
            ON cash_flow_data(company_unit, period_date);",
    )?;

    Ok(())
}

fn count_for_unit(conn: &Connection, unit: BusinessUnit) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM financial_periods WHERE company_unit = ?1",
        params![unit],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

impl RecordStore for SqliteStore {
    fn financial_count(&self, unit: BusinessUnit) -> Result<usize> {
        let conn = self.lock()?;
        count_for_unit(&conn, unit)
    }

    fn insert_series(&self, unit: BusinessUnit, series: &GeneratedSeries) -> Result<InsertOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = count_for_unit(&tx, unit)?;
        if existing > 0 {
            return Ok(InsertOutcome::AlreadyPresent(existing));
        }

        {
            let mut insert_financial = tx.prepare(
                "INSERT INTO financial_periods (
                    period_date, company_unit, revenue, cogs, gross_profit, salaries, marketing,
                    rd_expense, operations, other_expenses, total_expenses, net_profit,
                    gross_margin_pct, net_margin_pct
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            )?;
            for record in &series.financials {
                let c = record.components();
                insert_financial.execute(params![
                    record.period_date(),
                    unit,
                    c.revenue,
                    c.cogs,
                    record.gross_profit(),
                    c.salaries,
                    c.marketing,
                    c.rd_expense,
                    c.operations,
                    c.other_expenses,
                    record.total_expenses(),
                    record.net_profit(),
                    record.gross_margin_pct(),
                    record.net_margin_pct(),
                ])?;
            }

            let mut insert_budget = tx.prepare(
                "INSERT INTO budget_data (
                    period_date, company_unit, budget_revenue, budget_net_profit, budget_expenses
                ) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for budget in &series.budgets {
                insert_budget.execute(params![
                    budget.period_date,
                    unit,
                    budget.budget_revenue,
                    budget.budget_net_profit,
                    budget.budget_expenses,
                ])?;
            }

            let mut insert_cash_flow = tx.prepare(
                "INSERT INTO cash_flow_data (
                    period_date, company_unit, operating_cash_flow, investing_cash_flow,
                    financing_cash_flow, net_cash_flow, cash_balance
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for cash_flow in &series.cash_flows {
                let flows = cash_flow.flows();
                insert_cash_flow.execute(params![
                    cash_flow.period_date(),
                    unit,
                    flows.operating_cash_flow,
                    flows.investing_cash_flow,
                    flows.financing_cash_flow,
                    cash_flow.net_cash_flow(),
                    cash_flow.cash_balance(),
                ])?;
            }
        }

        tx.commit()?;
        debug!("Committed {} months for {} to SQLite", series.len(), unit);

        Ok(InsertOutcome::Inserted(series.len()))
    }

    fn financial_records(
        &self,
        unit: BusinessUnit,
        range: DateRange,
    ) -> Result<Vec<FinancialRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT period_date, company_unit, revenue, cogs, salaries, marketing, rd_expense,
                    operations, other_expenses
             FROM financial_periods
             WHERE company_unit = ?1
               AND (?2 IS NULL OR period_date >= ?2)
               AND (?3 IS NULL OR period_date <= ?3)
             ORDER BY period_date ASC",
        )?;

        let records = stmt
            .query_map(params![unit, range.start, range.end], |row| {
                Ok(FinancialRecord::new(
                    row.get(0)?,
                    row.get(1)?,
                    PnlComponents {
                        revenue: row.get(2)?,
                        cogs: row.get(3)?,
                        salaries: row.get(4)?,
                        marketing: row.get(5)?,
                        rd_expense: row.get(6)?,
                        operations: row.get(7)?,
                        other_expenses: row.get(8)?,
                    },
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    fn budget_records(&self, unit: BusinessUnit, range: DateRange) -> Result<Vec<BudgetRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT period_date, company_unit, budget_revenue, budget_net_profit, budget_expenses
             FROM budget_data
             WHERE company_unit = ?1
               AND (?2 IS NULL OR period_date >= ?2)
               AND (?3 IS NULL OR period_date <= ?3)
             ORDER BY period_date ASC",
        )?;

        let records = stmt
            .query_map(params![unit, range.start, range.end], |row| {
                Ok(BudgetRecord {
                    period_date: row.get(0)?,
                    business_unit: row.get(1)?,
                    budget_revenue: row.get(2)?,
                    budget_net_profit: row.get(3)?,
                    budget_expenses: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    fn cash_flow_records(
        &self,
        unit: BusinessUnit,
        range: DateRange,
    ) -> Result<Vec<CashFlowRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT period_date, company_unit, operating_cash_flow, investing_cash_flow,
                    financing_cash_flow, cash_balance
             FROM cash_flow_data
             WHERE company_unit = ?1
               AND (?2 IS NULL OR period_date >= ?2)
               AND (?3 IS NULL OR period_date <= ?3)
             ORDER BY period_date ASC",
        )?;

        let records = stmt
            .query_map(params![unit, range.start, range.end], |row| {
                Ok(CashFlowRecord::from_stored(
                    row.get(0)?,
                    row.get(1)?,
                    CashFlowComponents {
                        operating_cash_flow: row.get(2)?,
                        investing_cash_flow: row.get(3)?,
                        financing_cash_flow: row.get(4)?,
                    },
                    row.get(5)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }
}
