use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{MySql, MySqlPool, Transaction};
use tracing::{debug, warn};

use crate::model::attendance::{AttendanceRecord, NewAttendance};
use crate::model::employee::{Category, Employee, EmployeeChanges, NewEmployee};
use crate::store::{AttendanceBatch, AttendanceStore, EmployeeStore, StoreError};
use crate::utils::db_utils::{SqlValue, build_update_sql, execute_update};

const ATTENDANCE_COLUMNS: &str = "id, `date`, `time`, person_id";
const EMPLOYEE_COLUMNS: &str =
    "rut, last_name, first_name, birth_date, category, hire_date, active, created_at, updated_at";

/// MySQL duplicate-key SQLSTATE.
const DUPLICATE_KEY: &str = "23000";

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

pub struct MySqlBatch {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl AttendanceBatch for MySqlBatch {
    async fn delete_all(&mut self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM attendance")
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert(&mut self, record: NewAttendance) -> Result<u64, StoreError> {
        let result = sqlx::query("INSERT INTO attendance (`date`, `time`, person_id) VALUES (?, ?, ?)")
            .bind(record.date)
            .bind(record.time)
            .bind(record.person_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.last_insert_id())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn begin(&self) -> Result<Box<dyn AttendanceBatch>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(MySqlBatch { tx }))
    }

    async fn find_all(&self) -> Result<Vec<AttendanceRecord>, StoreError> {
        let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance ORDER BY id");
        let rows = sqlx::query_as::<_, AttendanceRecord>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_by_person(&self, person_id: &str) -> Result<Vec<AttendanceRecord>, StoreError> {
        let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE person_id = ? ORDER BY id");
        let rows = sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(person_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_by_person_and_date(
        &self,
        person_id: &str,
        date: &str,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE person_id = ? AND `date` = ? ORDER BY `time`, id"
        );
        let rows = sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(person_id)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn distinct_ids(&self) -> Result<Vec<String>, StoreError> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT person_id FROM attendance ORDER BY person_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM attendance")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn active_clause(active_only: bool) -> &'static str {
    if active_only { " AND active = TRUE" } else { "" }
}

fn categories_from(raw: Vec<String>) -> Vec<Category> {
    raw.into_iter()
        .filter_map(|value| match Category::try_from(value.clone()) {
            Ok(category) => Some(category),
            Err(_) => {
                warn!(category = %value, "Skipping unknown employee category");
                None
            }
        })
        .collect()
}

/// `LIKE` pattern matching `term` literally anywhere in the column.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl EmployeeStore for MySqlStore {
    async fn insert(&self, employee: NewEmployee) -> Result<Employee, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO employees
            (rut, last_name, first_name, birth_date, category, hire_date, active)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&employee.rut)
        .bind(&employee.last_name)
        .bind(&employee.first_name)
        .bind(employee.birth_date)
        .bind(employee.category.as_ref())
        .bind(employee.hire_date)
        .bind(employee.active)
        .execute(&self.pool)
        .await;

        if let Err(sqlx::Error::Database(db_err)) = &result {
            if db_err.code().as_deref() == Some(DUPLICATE_KEY) {
                return Err(StoreError::Duplicate(employee.rut));
            }
        }
        result?;

        self.find(&employee.rut)
            .await?
            .ok_or(StoreError::Sqlx(sqlx::Error::RowNotFound))
    }

    async fn find(&self, rut: &str) -> Result<Option<Employee>, StoreError> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE rut = ?");
        let employee = sqlx::query_as::<_, Employee>(&sql)
            .bind(rut)
            .fetch_optional(&self.pool)
            .await?;
        Ok(employee)
    }

    async fn list(&self, active_only: bool, limit: u32, offset: u32) -> Result<Vec<Employee>, StoreError> {
        let sql = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE 1 = 1{} ORDER BY rut LIMIT ? OFFSET ?",
            active_clause(active_only)
        );
        debug!(sql = %sql, limit, offset, "Fetching employees");

        let employees = sqlx::query_as::<_, Employee>(&sql)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(employees)
    }

    async fn count(&self, active_only: bool) -> Result<i64, StoreError> {
        let sql = format!(
            "SELECT COUNT(*) FROM employees WHERE 1 = 1{}",
            active_clause(active_only)
        );
        let total = sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn update(&self, rut: &str, changes: &EmployeeChanges) -> Result<Option<Employee>, StoreError> {
        let mut assignments = Vec::new();
        if let Some(v) = &changes.last_name {
            assignments.push(("last_name", SqlValue::String(v.clone())));
        }
        if let Some(v) = &changes.first_name {
            assignments.push(("first_name", SqlValue::String(v.clone())));
        }
        if let Some(v) = changes.birth_date {
            assignments.push(("birth_date", SqlValue::Date(v)));
        }
        if let Some(v) = changes.category {
            assignments.push(("category", SqlValue::String(v.to_string())));
        }
        if let Some(v) = changes.hire_date {
            assignments.push(("hire_date", SqlValue::Date(v)));
        }
        if let Some(v) = changes.active {
            assignments.push(("active", SqlValue::Bool(v)));
        }
        assignments.push(("updated_at", SqlValue::CurrentTimestamp));

        if let Some(update) = build_update_sql("employees", &assignments, "rut", rut) {
            debug!(sql = %update.sql, rut, "Updating employee");
            execute_update(&self.pool, update).await?;
        }

        // MySQL reports only rows whose values changed, so existence is
        // decided by reading the row back.
        self.find(rut).await
    }

    async fn find_by_category(&self, category: Category, active_only: bool) -> Result<Vec<Employee>, StoreError> {
        let sql = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE category = ?{} ORDER BY rut",
            active_clause(active_only)
        );
        let employees = sqlx::query_as::<_, Employee>(&sql)
            .bind(category.as_ref())
            .fetch_all(&self.pool)
            .await?;
        Ok(employees)
    }

    async fn search_by_name(&self, term: &str, active_only: bool) -> Result<Vec<Employee>, StoreError> {
        let sql = format!(
            r#"
            SELECT {EMPLOYEE_COLUMNS} FROM employees
            WHERE (first_name LIKE ? OR last_name LIKE ? OR CONCAT(first_name, ' ', last_name) LIKE ?){}
            ORDER BY rut
            "#,
            active_clause(active_only)
        );
        let like = contains_pattern(term);
        debug!(sql = %sql, like = %like, "Searching employees");

        let employees = sqlx::query_as::<_, Employee>(&sql)
            .bind(&like)
            .bind(&like)
            .bind(&like)
            .fetch_all(&self.pool)
            .await?;
        Ok(employees)
    }

    async fn find_by_hire_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        active_only: bool,
    ) -> Result<Vec<Employee>, StoreError> {
        let sql = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE hire_date BETWEEN ? AND ?{} ORDER BY hire_date, rut",
            active_clause(active_only)
        );
        let employees = sqlx::query_as::<_, Employee>(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;
        Ok(employees)
    }

    async fn count_by_category(&self, active_only: bool) -> Result<Vec<(Category, i64)>, StoreError> {
        let sql = format!(
            "SELECT category, COUNT(*) FROM employees WHERE 1 = 1{} GROUP BY category ORDER BY category",
            active_clause(active_only)
        );
        let rows = sqlx::query_as::<_, (String, i64)>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(name, total)| {
                let category = categories_from(vec![name]).pop()?;
                Some((category, total))
            })
            .collect())
    }

    async fn categories_in_use(&self) -> Result<Vec<Category>, StoreError> {
        let raw = sqlx::query_scalar::<_, String>("SELECT DISTINCT category FROM employees ORDER BY category")
            .fetch_all(&self.pool)
            .await?;
        Ok(categories_from(raw))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        AttendanceStore::ping(self).await
    }
}
