//! Field rules for employee records.
//!
//! Unlike line ingestion, which stops at the first bad line, employee
//! validation collects every failing field so the caller can report them all
//! at once.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

use crate::model::employee::{Category, DATE_FORMAT, Employee, EmployeeChanges, NewEmployee};
use crate::validation::line::{is_date, is_rut};

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;

pub const MIN_AGE_YEARS: u32 = 18;
pub const MAX_AGE_YEARS: u32 = 100;
pub const MIN_HIRING_AGE_YEARS: u32 = 16;
pub const MAX_SENIORITY_YEARS: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rule {
    #[error("is required")]
    Required,

    #[error("must be in format xxxxxxxx-x")]
    RutFormat,

    #[error("must have at least {} characters", NAME_MIN_CHARS)]
    TooShort,

    #[error("cannot exceed {} characters", NAME_MAX_CHARS)]
    TooLong,

    #[error("must be a valid date in format yyyy/MM/dd")]
    DateFormat,

    #[error("must be one of A, B or C")]
    Category,

    #[error("cannot be in the future")]
    InFuture,

    #[error("cannot be more than {} years ago", MAX_AGE_YEARS)]
    OlderThanMaxAge,

    #[error("employee must be at least {} years old", MIN_AGE_YEARS)]
    Underage,

    #[error("cannot be more than {} years ago", MAX_SENIORITY_YEARS)]
    HiredTooLongAgo,

    #[error("cannot precede the birth date")]
    HiredBeforeBirth,

    #[error("must be at least {} years after the birth date", MIN_HIRING_AGE_YEARS)]
    HiredTooYoung,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub rule: Rule,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.rule)
    }
}

/// Every field failure found in one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    #[cfg(test)]
    pub fn has(&self, field: &str, rule: &Rule) -> bool {
        self.0.iter().any(|e| e.field == field && &e.rule == rule)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
        f.write_str(&joined)
    }
}

impl std::error::Error for ValidationErrors {}

/// JSON shape of one field error.
#[derive(Serialize, ToSchema)]
pub struct FieldErrorBody {
    #[schema(example = "birth_date")]
    pub field: &'static str,
    #[schema(example = "employee must be at least 18 years old")]
    pub message: String,
}

impl From<&FieldError> for FieldErrorBody {
    fn from(e: &FieldError) -> Self {
        FieldErrorBody {
            field: e.field,
            message: e.rule.to_string(),
        }
    }
}

/// Raw create payload; every field optional so missing ones are reported
/// alongside malformed ones.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct EmployeeInput {
    #[schema(example = "12345678-9")]
    pub rut: Option<String>,
    #[schema(example = "González Pérez")]
    pub last_name: Option<String>,
    #[schema(example = "Juan Carlos")]
    pub first_name: Option<String>,
    #[schema(example = "1985/03/15")]
    pub birth_date: Option<String>,
    #[schema(example = "A")]
    pub category: Option<String>,
    #[schema(example = "2020/01/15")]
    pub hire_date: Option<String>,
    pub active: Option<bool>,
}

/// Raw update payload. The RUT is immutable and therefore absent.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct EmployeePatch {
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    #[schema(example = "1985/03/15")]
    pub birth_date: Option<String>,
    #[schema(example = "B")]
    pub category: Option<String>,
    #[schema(example = "2020/01/15")]
    pub hire_date: Option<String>,
    pub active: Option<bool>,
}

#[derive(Default)]
struct Collector(Vec<FieldError>);

impl Collector {
    fn push(&mut self, field: &'static str, rule: Rule) {
        self.0.push(FieldError { field, rule });
    }

    fn check<T>(&mut self, field: &'static str, result: Result<T, Rule>) -> Option<T> {
        result.map_err(|rule| self.push(field, rule)).ok()
    }

    fn required<T>(
        &mut self,
        field: &'static str,
        raw: Option<&str>,
        parse: impl FnOnce(&str) -> Result<T, Rule>,
    ) -> Option<T> {
        match raw {
            Some(value) => self.check(field, parse(value)),
            None => {
                self.push(field, Rule::Required);
                None
            }
        }
    }

    fn optional<T>(
        &mut self,
        field: &'static str,
        raw: Option<&str>,
        parse: impl FnOnce(&str) -> Result<T, Rule>,
    ) -> Option<T> {
        raw.and_then(|value| self.check(field, parse(value)))
    }

    fn finish<T>(self, value: impl FnOnce() -> Option<T>) -> Result<T, ValidationErrors> {
        if !self.0.is_empty() {
            return Err(ValidationErrors(self.0));
        }
        value().ok_or(ValidationErrors(self.0))
    }
}

pub fn parse_rut(raw: &str) -> Result<String, Rule> {
    let rut = raw.trim();
    if rut.is_empty() {
        Err(Rule::Required)
    } else if is_rut(rut) {
        Ok(rut.to_string())
    } else {
        Err(Rule::RutFormat)
    }
}

pub fn parse_name(raw: &str) -> Result<String, Rule> {
    let name = raw.trim();
    match name.chars().count() {
        0 => Err(Rule::Required),
        n if n < NAME_MIN_CHARS => Err(Rule::TooShort),
        n if n > NAME_MAX_CHARS => Err(Rule::TooLong),
        _ => Ok(name.to_string()),
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, Rule> {
    let date = raw.trim();
    if date.is_empty() {
        return Err(Rule::Required);
    }
    if !is_date(date) {
        return Err(Rule::DateFormat);
    }
    NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|_| Rule::DateFormat)
}

pub fn parse_category(raw: &str) -> Result<Category, Rule> {
    let category = raw.trim();
    if category.is_empty() {
        return Err(Rule::Required);
    }
    category.parse().map_err(|_| Rule::Category)
}

fn years_before(date: NaiveDate, years: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(years * 12))
        .unwrap_or(NaiveDate::MIN)
}

fn years_after(date: NaiveDate, years: u32) -> NaiveDate {
    date.checked_add_months(Months::new(years * 12))
        .unwrap_or(NaiveDate::MAX)
}

/// Age bounds for a birth date as of `today`.
pub fn birth_date_rules(birth: NaiveDate, today: NaiveDate) -> Vec<Rule> {
    let mut broken = Vec::new();
    if birth > today {
        broken.push(Rule::InFuture);
    } else if birth < years_before(today, MAX_AGE_YEARS) {
        broken.push(Rule::OlderThanMaxAge);
    } else if birth > years_before(today, MIN_AGE_YEARS) {
        broken.push(Rule::Underage);
    }
    broken
}

/// Hire date bounds as of `today`, plus coherence with the birth date when
/// one is known. The ordering check runs regardless of the other outcomes.
pub fn hire_date_rules(hire: NaiveDate, birth: Option<NaiveDate>, today: NaiveDate) -> Vec<Rule> {
    let mut broken = Vec::new();
    if hire > today {
        broken.push(Rule::InFuture);
    } else if hire < years_before(today, MAX_SENIORITY_YEARS) {
        broken.push(Rule::HiredTooLongAgo);
    }

    if let Some(birth) = birth {
        if hire < birth {
            broken.push(Rule::HiredBeforeBirth);
        } else if hire < years_after(birth, MIN_HIRING_AGE_YEARS) {
            broken.push(Rule::HiredTooYoung);
        }
    }
    broken
}

fn temporal_rules(collector: &mut Collector, birth: Option<NaiveDate>, hire: Option<NaiveDate>, today: NaiveDate) {
    if let Some(birth) = birth {
        for rule in birth_date_rules(birth, today) {
            collector.push("birth_date", rule);
        }
    }
    if let Some(hire) = hire {
        for rule in hire_date_rules(hire, birth, today) {
            collector.push("hire_date", rule);
        }
    }
}

/// Validates a create payload against every field rule.
pub fn validate_new(input: &EmployeeInput, today: NaiveDate) -> Result<NewEmployee, ValidationErrors> {
    let mut c = Collector::default();

    let rut = c.required("rut", input.rut.as_deref(), parse_rut);
    let last_name = c.required("last_name", input.last_name.as_deref(), parse_name);
    let first_name = c.required("first_name", input.first_name.as_deref(), parse_name);
    let birth_date = c.required("birth_date", input.birth_date.as_deref(), parse_date);
    let category = c.required("category", input.category.as_deref(), parse_category);
    let hire_date = c.required("hire_date", input.hire_date.as_deref(), parse_date);

    temporal_rules(&mut c, birth_date, hire_date, today);

    c.finish(|| {
        Some(NewEmployee {
            rut: rut?,
            last_name: last_name?,
            first_name: first_name?,
            birth_date: birth_date?,
            category: category?,
            hire_date: hire_date?,
            active: input.active.unwrap_or(true),
        })
    })
}

/// Validates an update payload. Date coherence is checked on the record as it
/// would look after the update, so changing only one date cannot break the
/// pairing with the stored other one.
pub fn validate_changes(
    patch: &EmployeePatch,
    current: &Employee,
    today: NaiveDate,
) -> Result<EmployeeChanges, ValidationErrors> {
    let mut c = Collector::default();

    let changes = EmployeeChanges {
        last_name: c.optional("last_name", patch.last_name.as_deref(), parse_name),
        first_name: c.optional("first_name", patch.first_name.as_deref(), parse_name),
        birth_date: c.optional("birth_date", patch.birth_date.as_deref(), parse_date),
        category: c.optional("category", patch.category.as_deref(), parse_category),
        hire_date: c.optional("hire_date", patch.hire_date.as_deref(), parse_date),
        active: patch.active,
    };

    if changes.birth_date.is_some() || changes.hire_date.is_some() {
        let merged = changes.apply_to(current);
        temporal_rules(&mut c, Some(merged.birth_date), Some(merged.hire_date), today);
    }

    c.finish(|| Some(changes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn valid_input() -> EmployeeInput {
        EmployeeInput {
            rut: Some("12345678-9".into()),
            last_name: Some("González Pérez".into()),
            first_name: Some("Juan Carlos".into()),
            birth_date: Some("1985/03/15".into()),
            category: Some("a".into()),
            hire_date: Some("2020/01/15".into()),
            active: None,
        }
    }

    fn stored() -> Employee {
        let stamp: DateTime<Utc> = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        Employee {
            rut: "12345678-9".into(),
            last_name: "González".into(),
            first_name: "Juan".into(),
            birth_date: date(1990, 1, 1),
            category: Category::A,
            hire_date: date(2015, 6, 1),
            active: true,
            created_at: stamp,
            updated_at: stamp,
        }
    }

    #[test]
    fn accepts_a_complete_payload() {
        let employee = validate_new(&valid_input(), today()).unwrap();

        assert_eq!(employee.category, Category::A);
        assert_eq!(employee.birth_date, date(1985, 3, 15));
        assert!(employee.active);
    }

    #[test]
    fn reports_every_broken_field() {
        let input = EmployeeInput {
            rut: Some("invalid-rut".into()),
            first_name: Some("".into()),
            last_name: Some("Test".into()),
            birth_date: Some("2030/01/01".into()),
            category: Some("X".into()),
            hire_date: Some("2020/01/01".into()),
            active: None,
        };

        let errors = validate_new(&input, today()).unwrap_err();

        assert!(errors.has("rut", &Rule::RutFormat));
        assert!(errors.has("first_name", &Rule::Required));
        assert!(errors.has("category", &Rule::Category));
        assert!(errors.has("birth_date", &Rule::InFuture));
        assert!(errors.has("hire_date", &Rule::HiredBeforeBirth));
    }

    #[test]
    fn missing_fields_are_required() {
        let errors = validate_new(&EmployeeInput::default(), today()).unwrap_err();
        assert_eq!(errors.0.len(), 6);
        assert!(errors.0.iter().all(|e| e.rule == Rule::Required));
    }

    #[test]
    fn name_length_bounds() {
        assert_eq!(parse_name(" A "), Err(Rule::TooShort));
        assert_eq!(parse_name(&"x".repeat(101)), Err(Rule::TooLong));
        assert_eq!(parse_name(" Ñuñoa "), Ok("Ñuñoa".to_string()));
    }

    #[test]
    fn birth_in_2010_is_underage() {
        assert_eq!(birth_date_rules(date(2010, 1, 1), today()), vec![Rule::Underage]);
    }

    #[test]
    fn age_limits() {
        assert_eq!(birth_date_rules(date(1900, 1, 1), today()), vec![Rule::OlderThanMaxAge]);
        assert!(birth_date_rules(date(1993, 1, 1), today()).is_empty());
        // Eighteenth birthday today.
        assert!(birth_date_rules(date(2008, 10, 16), today()).is_empty());
        assert_eq!(birth_date_rules(date(2008, 10, 17), today()), vec![Rule::Underage]);
    }

    #[test]
    fn hire_before_birth_always_fails_ordering() {
        let birth = date(1990, 1, 1);
        for hire in [date(1989, 1, 1), date(1960, 1, 1), date(1900, 5, 5)] {
            let rules = hire_date_rules(hire, Some(birth), today());
            assert!(rules.contains(&Rule::HiredBeforeBirth), "{hire}: {rules:?}");
        }
    }

    #[test]
    fn hire_needs_sixteen_years_after_birth() {
        let birth = date(1990, 1, 1);
        assert_eq!(hire_date_rules(date(2000, 1, 1), Some(birth), today()), vec![Rule::HiredTooYoung]);
        assert!(hire_date_rules(date(2010, 1, 1), Some(birth), today()).is_empty());
    }

    #[test]
    fn hire_date_bounds() {
        assert_eq!(hire_date_rules(date(2030, 1, 1), None, today()), vec![Rule::InFuture]);
        assert_eq!(hire_date_rules(date(1970, 1, 1), None, today()), vec![Rule::HiredTooLongAgo]);
    }

    #[test]
    fn update_checks_coherence_against_stored_dates() {
        let patch = EmployeePatch {
            hire_date: Some("1989/12/31".into()),
            ..Default::default()
        };

        let errors = validate_changes(&patch, &stored(), today()).unwrap_err();
        assert!(errors.has("hire_date", &Rule::HiredBeforeBirth));
    }

    #[test]
    fn update_with_only_names_skips_date_rules() {
        let patch = EmployeePatch {
            first_name: Some("  Pedro ".into()),
            category: Some("c".into()),
            ..Default::default()
        };

        let changes = validate_changes(&patch, &stored(), today()).unwrap();
        assert_eq!(changes.first_name.as_deref(), Some("Pedro"));
        assert_eq!(changes.category, Some(Category::C));
        assert_eq!(changes.birth_date, None);
    }

    #[test]
    fn display_joins_field_messages() {
        let errors = ValidationErrors(vec![
            FieldError { field: "rut", rule: Rule::RutFormat },
            FieldError { field: "category", rule: Rule::Category },
        ]);
        assert_eq!(
            errors.to_string(),
            "rut must be in format xxxxxxxx-x; category must be one of A, B or C"
        );
    }
}
