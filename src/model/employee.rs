use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Wire format for every calendar date the services exchange.
pub const DATE_FORMAT: &str = "%Y/%m/%d";

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash,
    Serialize, Deserialize, Display, AsRefStr, EnumString, ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum Category {
    A,
    B,
    C,
}

impl TryFrom<String> for Category {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.trim().parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "rut": "12345678-9",
        "last_name": "González Pérez",
        "first_name": "Juan Carlos",
        "birth_date": "1985/03/15",
        "category": "A",
        "hire_date": "2020/01/15",
        "active": true,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    })
)]
pub struct Employee {
    #[schema(example = "12345678-9")]
    pub rut: String,

    pub last_name: String,

    pub first_name: String,

    #[serde(with = "slash_date")]
    #[schema(example = "1985/03/15", value_type = String, format = "date")]
    pub birth_date: NaiveDate,

    #[sqlx(try_from = "String")]
    pub category: Category,

    #[serde(with = "slash_date")]
    #[schema(example = "2020/01/15", value_type = String, format = "date")]
    pub hire_date: NaiveDate,

    pub active: bool,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,

    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Validated payload for a new employee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEmployee {
    pub rut: String,
    pub last_name: String,
    pub first_name: String,
    pub birth_date: NaiveDate,
    pub category: Category,
    pub hire_date: NaiveDate,
    pub active: bool,
}

/// Validated partial update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeeChanges {
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub category: Option<Category>,
    pub hire_date: Option<NaiveDate>,
    pub active: Option<bool>,
}

impl EmployeeChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The record as it would look once these changes are applied.
    pub fn apply_to(&self, employee: &Employee) -> Employee {
        Employee {
            last_name: self.last_name.clone().unwrap_or_else(|| employee.last_name.clone()),
            first_name: self.first_name.clone().unwrap_or_else(|| employee.first_name.clone()),
            birth_date: self.birth_date.unwrap_or(employee.birth_date),
            category: self.category.unwrap_or(employee.category),
            hire_date: self.hire_date.unwrap_or(employee.hire_date),
            active: self.active.unwrap_or(employee.active),
            ..employee.clone()
        }
    }
}

mod slash_date {
    use super::DATE_FORMAT;
    use chrono::NaiveDate;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(DATE_FORMAT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Employee {
        let stamp = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Employee {
            rut: "12345678-9".into(),
            last_name: "Pérez".into(),
            first_name: "Ana".into(),
            birth_date: NaiveDate::from_ymd_opt(1985, 3, 15).unwrap(),
            category: Category::A,
            hire_date: NaiveDate::from_ymd_opt(2020, 1, 15).unwrap(),
            active: true,
            created_at: stamp,
            updated_at: stamp,
        }
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!(Category::try_from(" b ".to_string()).unwrap(), Category::B);
        assert!(Category::try_from("X".to_string()).is_err());
    }

    #[test]
    fn dates_serialize_with_slashes() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["birth_date"], "1985/03/15");
        assert_eq!(json["hire_date"], "2020/01/15");
        assert_eq!(json["category"], "A");
    }

    #[test]
    fn changes_keep_untouched_fields() {
        let changes = EmployeeChanges {
            category: Some(Category::C),
            ..Default::default()
        };
        let merged = changes.apply_to(&sample());

        assert_eq!(merged.category, Category::C);
        assert_eq!(merged.first_name, "Ana");
        assert_eq!(merged.rut, "12345678-9");
    }
}
