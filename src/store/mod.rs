use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::model::attendance::{AttendanceRecord, NewAttendance};
use crate::model::employee::{Category, Employee, EmployeeChanges, NewEmployee};

pub mod memory;
pub mod mysql;

/// Enumerates errors returned by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Represents an error reported by the database driver.
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A record with the same primary key is already stored.
    #[error("record {0} already exists")]
    Duplicate(String),

    /// The in-memory store was poisoned by a panicking writer.
    #[error("in-memory store is poisoned")]
    Poisoned,
}

/// Read side of the attendance table, plus the entry point for replacing it.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Opens a batch in which every write stays invisible to readers until
    /// [`AttendanceBatch::commit`].
    async fn begin(&self) -> Result<Box<dyn AttendanceBatch>, StoreError>;

    async fn find_all(&self) -> Result<Vec<AttendanceRecord>, StoreError>;

    async fn find_by_person(&self, person_id: &str) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Marks of one person on one day, earliest first.
    async fn find_by_person_and_date(
        &self,
        person_id: &str,
        date: &str,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    async fn distinct_ids(&self) -> Result<Vec<String>, StoreError>;

    async fn count(&self) -> Result<i64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// One all-or-nothing unit of attendance writes. Dropping a batch without
/// committing it discards its writes.
#[async_trait]
pub trait AttendanceBatch: Send {
    async fn delete_all(&mut self) -> Result<u64, StoreError>;

    async fn insert(&mut self, record: NewAttendance) -> Result<u64, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait EmployeeStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the RUT is taken.
    async fn insert(&self, employee: NewEmployee) -> Result<Employee, StoreError>;

    async fn find(&self, rut: &str) -> Result<Option<Employee>, StoreError>;

    async fn list(&self, active_only: bool, limit: u32, offset: u32) -> Result<Vec<Employee>, StoreError>;

    async fn count(&self, active_only: bool) -> Result<i64, StoreError>;

    /// Applies the changes and refreshes `updated_at`; `None` if the RUT is unknown.
    async fn update(&self, rut: &str, changes: &EmployeeChanges) -> Result<Option<Employee>, StoreError>;

    async fn find_by_category(&self, category: Category, active_only: bool) -> Result<Vec<Employee>, StoreError>;

    /// Case-insensitive partial match on first name, last name or both.
    async fn search_by_name(&self, term: &str, active_only: bool) -> Result<Vec<Employee>, StoreError>;

    /// Employees hired between `start` and `end`, both inclusive.
    async fn find_by_hire_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        active_only: bool,
    ) -> Result<Vec<Employee>, StoreError>;

    async fn count_by_category(&self, active_only: bool) -> Result<Vec<(Category, i64)>, StoreError>;

    /// Categories present on any record, active or not.
    async fn categories_in_use(&self) -> Result<Vec<Category>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
