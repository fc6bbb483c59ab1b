use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use crate::model::attendance::{AttendanceRecord, NewAttendance};
use crate::model::employee::{Category, Employee, EmployeeChanges, NewEmployee};
use crate::store::{AttendanceBatch, AttendanceStore, EmployeeStore, StoreError};

/// Process-local store backing both services when no database is configured.
#[derive(Default)]
pub struct MemoryStore {
    attendance: Arc<RwLock<Vec<AttendanceRecord>>>,
    next_id: Arc<AtomicU64>,
    employees: RwLock<BTreeMap<String, Employee>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Result<Vec<AttendanceRecord>, StoreError> {
        Ok(self.attendance.read().map_err(|_| StoreError::Poisoned)?.clone())
    }

    fn select(&self, active_only: bool, keep: impl Fn(&Employee) -> bool) -> Result<Vec<Employee>, StoreError> {
        let employees = self.employees.read().map_err(|_| StoreError::Poisoned)?;
        Ok(employees
            .values()
            .filter(|e| (!active_only || e.active) && keep(e))
            .cloned()
            .collect())
    }
}

/// Writes are staged on a private copy and swapped in on commit, so readers
/// only ever see a whole snapshot.
pub struct MemoryBatch {
    target: Arc<RwLock<Vec<AttendanceRecord>>>,
    next_id: Arc<AtomicU64>,
    staged: Vec<AttendanceRecord>,
}

#[async_trait]
impl AttendanceBatch for MemoryBatch {
    async fn delete_all(&mut self) -> Result<u64, StoreError> {
        let removed = self.staged.len() as u64;
        self.staged.clear();
        Ok(removed)
    }

    async fn insert(&mut self, record: NewAttendance) -> Result<u64, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.staged.push(record.with_id(id));
        Ok(id)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut current = self.target.write().map_err(|_| StoreError::Poisoned)?;
        *current = self.staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn AttendanceBatch>, StoreError> {
        Ok(Box::new(MemoryBatch {
            target: Arc::clone(&self.attendance),
            next_id: Arc::clone(&self.next_id),
            staged: self.snapshot()?,
        }))
    }

    async fn find_all(&self) -> Result<Vec<AttendanceRecord>, StoreError> {
        self.snapshot()
    }

    async fn find_by_person(&self, person_id: &str) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut rows = self.snapshot()?;
        rows.retain(|r| r.person_id == person_id);
        Ok(rows)
    }

    async fn find_by_person_and_date(
        &self,
        person_id: &str,
        date: &str,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut rows = self.snapshot()?;
        rows.retain(|r| r.person_id == person_id && r.date == date);
        rows.sort_by(|a, b| a.time.cmp(&b.time).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn distinct_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut ids: Vec<String> = self.snapshot()?.into_iter().map(|r| r.person_id).collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn count(&self) -> Result<i64, StoreError> {
        Ok(self.attendance.read().map_err(|_| StoreError::Poisoned)?.len() as i64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl EmployeeStore for MemoryStore {
    async fn insert(&self, employee: NewEmployee) -> Result<Employee, StoreError> {
        let mut employees = self.employees.write().map_err(|_| StoreError::Poisoned)?;
        if employees.contains_key(&employee.rut) {
            return Err(StoreError::Duplicate(employee.rut));
        }

        let now = Utc::now();
        let stored = Employee {
            rut: employee.rut,
            last_name: employee.last_name,
            first_name: employee.first_name,
            birth_date: employee.birth_date,
            category: employee.category,
            hire_date: employee.hire_date,
            active: employee.active,
            created_at: now,
            updated_at: now,
        };
        employees.insert(stored.rut.clone(), stored.clone());
        Ok(stored)
    }

    async fn find(&self, rut: &str) -> Result<Option<Employee>, StoreError> {
        let employees = self.employees.read().map_err(|_| StoreError::Poisoned)?;
        Ok(employees.get(rut).cloned())
    }

    async fn list(&self, active_only: bool, limit: u32, offset: u32) -> Result<Vec<Employee>, StoreError> {
        Ok(self
            .select(active_only, |_| true)?
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count(&self, active_only: bool) -> Result<i64, StoreError> {
        Ok(self.select(active_only, |_| true)?.len() as i64)
    }

    async fn update(&self, rut: &str, changes: &EmployeeChanges) -> Result<Option<Employee>, StoreError> {
        let mut employees = self.employees.write().map_err(|_| StoreError::Poisoned)?;
        let Some(current) = employees.get_mut(rut) else {
            return Ok(None);
        };

        let mut updated = changes.apply_to(current);
        updated.updated_at = Utc::now();
        *current = updated.clone();
        Ok(Some(updated))
    }

    async fn find_by_category(&self, category: Category, active_only: bool) -> Result<Vec<Employee>, StoreError> {
        self.select(active_only, |e| e.category == category)
    }

    async fn search_by_name(&self, term: &str, active_only: bool) -> Result<Vec<Employee>, StoreError> {
        let needle = term.to_lowercase();
        self.select(active_only, |e| {
            e.first_name.to_lowercase().contains(&needle)
                || e.last_name.to_lowercase().contains(&needle)
                || e.full_name().to_lowercase().contains(&needle)
        })
    }

    async fn find_by_hire_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        active_only: bool,
    ) -> Result<Vec<Employee>, StoreError> {
        let mut employees = self.select(active_only, |e| e.hire_date >= start && e.hire_date <= end)?;
        employees.sort_by(|a, b| a.hire_date.cmp(&b.hire_date).then_with(|| a.rut.cmp(&b.rut)));
        Ok(employees)
    }

    async fn count_by_category(&self, active_only: bool) -> Result<Vec<(Category, i64)>, StoreError> {
        let mut counts: BTreeMap<Category, i64> = BTreeMap::new();
        for employee in self.select(active_only, |_| true)? {
            *counts.entry(employee.category).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn categories_in_use(&self) -> Result<Vec<Category>, StoreError> {
        let mut categories: Vec<Category> = self
            .select(false, |_| true)?
            .into_iter()
            .map(|e| e.category)
            .collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark(date: &str, time: &str, rut: &str) -> NewAttendance {
        NewAttendance {
            date: date.into(),
            time: time.into(),
            person_id: rut.into(),
        }
    }

    #[actix_web::test]
    async fn uncommitted_batch_is_invisible() {
        let store = MemoryStore::new();

        let mut batch = store.begin().await.unwrap();
        batch.insert(mark("2023/10/15", "08:00", "1-9")).await.unwrap();
        assert_eq!(AttendanceStore::count(&store).await.unwrap(), 0);

        batch.commit().await.unwrap();
        assert_eq!(AttendanceStore::count(&store).await.unwrap(), 1);
    }

    #[actix_web::test]
    async fn rollback_keeps_previous_snapshot() {
        let store = MemoryStore::new();
        let mut batch = store.begin().await.unwrap();
        batch.insert(mark("2023/10/15", "08:00", "1-9")).await.unwrap();
        batch.commit().await.unwrap();

        let mut batch = store.begin().await.unwrap();
        assert_eq!(batch.delete_all().await.unwrap(), 1);
        batch.insert(mark("2023/10/16", "09:00", "2-K")).await.unwrap();
        batch.rollback().await.unwrap();

        let rows = store.find_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].person_id, "1-9");
    }

    #[actix_web::test]
    async fn person_and_date_is_ordered_by_time() {
        let store = MemoryStore::new();
        let mut batch = store.begin().await.unwrap();
        batch.insert(mark("2023/10/15", "17:30", "1-9")).await.unwrap();
        batch.insert(mark("2023/10/15", "08:00", "1-9")).await.unwrap();
        batch.insert(mark("2023/10/16", "08:10", "1-9")).await.unwrap();
        batch.insert(mark("2023/10/15", "08:05", "2-K")).await.unwrap();
        batch.commit().await.unwrap();

        let day = store.find_by_person_and_date("1-9", "2023/10/15").await.unwrap();
        let times: Vec<_> = day.iter().map(|r| r.time.as_str()).collect();
        assert_eq!(times, ["08:00", "17:30"]);

        assert_eq!(store.distinct_ids().await.unwrap(), ["1-9", "2-K"]);
        assert_eq!(store.find_by_person("1-9").await.unwrap().len(), 3);
    }

    #[actix_web::test]
    async fn duplicate_rut_is_rejected() {
        let store = MemoryStore::new();
        let employee = NewEmployee {
            rut: "12345678-9".into(),
            last_name: "Pérez".into(),
            first_name: "Ana".into(),
            birth_date: NaiveDate::from_ymd_opt(1985, 3, 15).unwrap(),
            category: Category::B,
            hire_date: NaiveDate::from_ymd_opt(2020, 1, 15).unwrap(),
            active: true,
        };

        store.insert(employee.clone()).await.unwrap();
        assert!(matches!(
            store.insert(employee).await,
            Err(StoreError::Duplicate(rut)) if rut == "12345678-9"
        ));
    }
}
