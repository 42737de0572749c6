//! Persistence for generated records.
//!
//! Stores are append-only: a unit's history is written once by
//! [`RecordStore::insert_series`] and only read afterwards.

mod memory;
mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::schema::{
    BudgetRecord, BusinessUnit, CashFlowRecord, DateRange, FinancialRecord, GeneratedSeries,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The series was written; carries the number of months inserted.
    Inserted(usize),
    /// The unit already had records; nothing was written.
    AlreadyPresent(usize),
}

pub trait RecordStore: Send + Sync {
    fn financial_count(&self, unit: BusinessUnit) -> Result<usize>;

    /// Writes `series` for `unit` only if the unit has no records yet.
    ///
    /// The emptiness check and the write happen atomically, so concurrent
    /// callers for the same unit cannot both insert or interleave balance chains.
    fn insert_series(&self, unit: BusinessUnit, series: &GeneratedSeries) -> Result<InsertOutcome>;

    /// Financial records for `unit` within `range`, ascending by period date.
    fn financial_records(&self, unit: BusinessUnit, range: DateRange)
        -> Result<Vec<FinancialRecord>>;

    fn budget_records(&self, unit: BusinessUnit, range: DateRange) -> Result<Vec<BudgetRecord>>;

    fn cash_flow_records(&self, unit: BusinessUnit, range: DateRange)
        -> Result<Vec<CashFlowRecord>>;
}
