use sqlx::MySqlPool;
use tracing::info;

const CREATE_ATTENDANCE: &str = r#"
    CREATE TABLE IF NOT EXISTS attendance (
        id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
        `date` VARCHAR(10) NOT NULL,
        `time` VARCHAR(5) NOT NULL,
        person_id VARCHAR(12) NOT NULL,
        INDEX idx_attendance_person (person_id)
    )
"#;

const CREATE_EMPLOYEES: &str = r#"
    CREATE TABLE IF NOT EXISTS employees (
        rut VARCHAR(12) NOT NULL PRIMARY KEY,
        last_name VARCHAR(100) NOT NULL,
        first_name VARCHAR(100) NOT NULL,
        birth_date DATE NOT NULL,
        category CHAR(1) NOT NULL,
        hire_date DATE NOT NULL,
        active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        INDEX idx_employees_category (category)
    )
"#;

/// Connects and makes sure both tables exist.
pub async fn init_db(database_url: &str) -> Result<MySqlPool, sqlx::Error> {
    let pool = MySqlPool::connect(database_url).await?;

    sqlx::query(CREATE_ATTENDANCE).execute(&pool).await?;
    sqlx::query(CREATE_EMPLOYEES).execute(&pool).await?;
    info!("Database tables created or verified");

    Ok(pool)
}
