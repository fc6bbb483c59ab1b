//! Employee operations over an [`EmployeeStore`].
//!
//! Handlers stay thin: they extract the request, call one function here and
//! serialize the result. Validation, lookups and error translation live here
//! so they can be exercised against the in-memory store.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use utoipa::ToSchema;

use crate::model::employee::{Category, Employee, EmployeeChanges};
use crate::store::{EmployeeStore, StoreError};
use crate::validation::employee::{
    EmployeeInput, EmployeePatch, FieldError, NAME_MIN_CHARS, Rule, ValidationErrors, parse_category, parse_date,
    validate_changes, validate_new,
};

#[derive(Debug, Error)]
pub enum EmployeeError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Employee with RUT {0} not found")]
    NotFound(String),

    #[error("Employee with RUT {0} already exists")]
    AlreadyExists(String),

    #[error("Internal server error")]
    Store(#[from] StoreError),
}

impl EmployeeError {
    fn invalid(field: &'static str, rule: Rule) -> Self {
        EmployeeError::Validation(ValidationErrors(vec![FieldError { field, rule }]))
    }
}

/// Page coordinates after defaults and bounds have been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, per_page: Option<u32>, default_per_page: u32, max_per_page: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(default_per_page).clamp(1, max_per_page),
        }
    }

    fn offset(&self) -> u32 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

#[derive(Debug, Serialize, PartialEq, Eq, ToSchema)]
pub struct Pagination {
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 50)]
    pub per_page: u32,
    #[schema(example = 120)]
    pub total: i64,
    #[schema(example = 3)]
    pub pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    fn new(request: PageRequest, total: i64) -> Self {
        let per_page = i64::from(request.per_page);
        let pages = (total + per_page - 1) / per_page;
        Self {
            page: request.page,
            per_page: request.per_page,
            total,
            pages,
            has_next: i64::from(request.page) < pages,
            has_prev: request.page > 1,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EmployeePage {
    pub employees: Vec<Employee>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, PartialEq, Eq, ToSchema)]
pub struct EmployeeStats {
    pub total_employees: i64,
    pub total_inactive: i64,
    pub total_all: i64,
    /// Active employees per category.
    #[schema(example = json!({"A": 10, "B": 4}))]
    pub by_category: BTreeMap<String, i64>,
    pub available_categories: Vec<Category>,
}

#[derive(Debug, Serialize, PartialEq, Eq, ToSchema)]
pub struct EmployeeCategory {
    #[schema(example = "12345678-9")]
    pub rut: String,
    pub category: Category,
    pub first_name: String,
    pub last_name: String,
}

pub async fn create(
    store: &dyn EmployeeStore,
    input: &EmployeeInput,
    today: NaiveDate,
) -> Result<Employee, EmployeeError> {
    let employee = validate_new(input, today)?;

    let created = store.insert(employee).await.map_err(|e| match e {
        StoreError::Duplicate(rut) => EmployeeError::AlreadyExists(rut),
        other => EmployeeError::Store(other),
    })?;

    info!(rut = %created.rut, "Employee created");
    Ok(created)
}

pub async fn get(store: &dyn EmployeeStore, rut: &str) -> Result<Employee, EmployeeError> {
    store
        .find(rut)
        .await?
        .ok_or_else(|| EmployeeError::NotFound(rut.to_string()))
}

pub async fn list(
    store: &dyn EmployeeStore,
    request: PageRequest,
    active_only: bool,
) -> Result<EmployeePage, EmployeeError> {
    let total = store.count(active_only).await?;
    let employees = store
        .list(active_only, request.per_page, request.offset())
        .await?;

    Ok(EmployeePage {
        employees,
        pagination: Pagination::new(request, total),
    })
}

/// Partial update. Date rules are checked against the record as it would
/// look once the patch is applied.
pub async fn update(
    store: &dyn EmployeeStore,
    rut: &str,
    patch: &EmployeePatch,
    today: NaiveDate,
) -> Result<Employee, EmployeeError> {
    let current = get(store, rut).await?;
    let changes = validate_changes(patch, &current, today)?;
    if changes.is_empty() {
        return Ok(current);
    }

    let updated = apply(store, rut, &changes).await?;
    info!(rut, "Employee updated");
    Ok(updated)
}

/// Marks the employee inactive. The record is kept.
pub async fn soft_delete(store: &dyn EmployeeStore, rut: &str) -> Result<Employee, EmployeeError> {
    let changes = EmployeeChanges {
        active: Some(false),
        ..EmployeeChanges::default()
    };
    let employee = apply(store, rut, &changes).await?;
    info!(rut, "Employee deactivated");
    Ok(employee)
}

pub async fn activate(store: &dyn EmployeeStore, rut: &str) -> Result<Employee, EmployeeError> {
    let changes = EmployeeChanges {
        active: Some(true),
        ..EmployeeChanges::default()
    };
    let employee = apply(store, rut, &changes).await?;
    info!(rut, "Employee reactivated");
    Ok(employee)
}

async fn apply(store: &dyn EmployeeStore, rut: &str, changes: &EmployeeChanges) -> Result<Employee, EmployeeError> {
    store
        .update(rut, changes)
        .await?
        .ok_or_else(|| EmployeeError::NotFound(rut.to_string()))
}

pub async fn search(store: &dyn EmployeeStore, term: &str, active_only: bool) -> Result<Vec<Employee>, EmployeeError> {
    let term = term.trim();
    match term.chars().count() {
        0 => return Err(EmployeeError::invalid("name", Rule::Required)),
        n if n < NAME_MIN_CHARS => return Err(EmployeeError::invalid("name", Rule::TooShort)),
        _ => {}
    }

    Ok(store.search_by_name(term, active_only).await?)
}

pub async fn by_category(
    store: &dyn EmployeeStore,
    raw: &str,
    active_only: bool,
) -> Result<(Category, Vec<Employee>), EmployeeError> {
    let category = parse_category(raw).map_err(|rule| EmployeeError::invalid("category", rule))?;
    let employees = store.find_by_category(category, active_only).await?;
    Ok((category, employees))
}

pub async fn hired_between(
    store: &dyn EmployeeStore,
    start: &str,
    end: &str,
    active_only: bool,
) -> Result<Vec<Employee>, EmployeeError> {
    let mut errors = Vec::new();
    let start = parse_date(start).map_err(|rule| errors.push(FieldError { field: "start_date", rule }));
    let end = parse_date(end).map_err(|rule| errors.push(FieldError { field: "end_date", rule }));

    match (start, end) {
        (Ok(start), Ok(end)) => Ok(store.find_by_hire_range(start, end, active_only).await?),
        _ => Err(EmployeeError::Validation(ValidationErrors(errors))),
    }
}

pub async fn stats(store: &dyn EmployeeStore) -> Result<EmployeeStats, EmployeeError> {
    let active = store.count(true).await?;
    let all = store.count(false).await?;

    let by_category = store
        .count_by_category(true)
        .await?
        .into_iter()
        .map(|(category, total)| (category.to_string(), total))
        .collect();

    Ok(EmployeeStats {
        total_employees: active,
        total_inactive: all - active,
        total_all: all,
        by_category,
        available_categories: store.categories_in_use().await?,
    })
}

pub async fn category_of(store: &dyn EmployeeStore, rut: &str) -> Result<EmployeeCategory, EmployeeError> {
    let employee = get(store, rut).await?;
    Ok(EmployeeCategory {
        rut: employee.rut,
        category: employee.category,
        first_name: employee.first_name,
        last_name: employee.last_name,
    })
}
