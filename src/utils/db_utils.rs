use chrono::NaiveDate;
use sqlx::{Executor, MySql};


/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    Bool(bool),
    Date(NaiveDate),
    /// Rendered inline as `CURRENT_TIMESTAMP`, nothing is bound.
    CurrentTimestamp,
}


/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug, PartialEq)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}


/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
/// Returns `None` when there is nothing to assign.
pub fn build_update_sql(
    table: &str,
    assignments: &[(&str, SqlValue)],
    id_column: &str,
    id_value: &str,
) -> Option<SqlUpdate> {
    if assignments.is_empty() {
        return None;
    }

    // Build SET clause
    let set_clause = assignments
        .iter()
        .map(|(column, value)| match value {
            SqlValue::CurrentTimestamp => format!("{} = CURRENT_TIMESTAMP", column),
            _ => format!("{} = ?", column),
        })
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table, set_clause, id_column
    );

    let mut values: Vec<SqlValue> = assignments
        .iter()
        .map(|(_, value)| value.clone())
        .filter(|value| *value != SqlValue::CurrentTimestamp)
        .collect();

    // WHERE id = ?
    values.push(SqlValue::String(id_value.to_string()));

    Some(SqlUpdate { sql, values })
}


/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update<'e, E>(executor: E, update: SqlUpdate) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = MySql>,
{
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::CurrentTimestamp => query,
        };
    }

    let result = query.execute(executor).await?;
    Ok(result.rows_affected())
}
