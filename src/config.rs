use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    /// `None` runs both services on the in-memory store.
    pub database_url: Option<String>,
    pub api_prefix: String,

    // Uploads
    pub max_upload_bytes: usize,

    // Pagination
    pub employees_per_page: u32,
    pub max_employees_per_page: u32,

    // Rate limiting
    pub rate_upload_per_min: u32,
    pub rate_api_per_min: u32,

    // Logging
    pub log_dir: String,
    pub log_level: tracing::Level,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let config = Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string()),
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", 16 * 1024 * 1024)?, // 16 MiB

            employees_per_page: parse_or("EMPLOYEES_PER_PAGE", 50)?,
            max_employees_per_page: parse_or("MAX_EMPLOYEES_PER_PAGE", 200)?,

            rate_upload_per_min: parse_or("RATE_UPLOAD_PER_MIN", 30)?,
            rate_api_per_min: parse_or("RATE_API_PER_MIN", 1000)?,

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: parse_or("LOG_LEVEL", tracing::Level::INFO)?,
        };

        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        let positive = [
            ("MAX_UPLOAD_BYTES", self.max_upload_bytes as u64),
            ("EMPLOYEES_PER_PAGE", self.employees_per_page as u64),
            ("MAX_EMPLOYEES_PER_PAGE", self.max_employees_per_page as u64),
            ("RATE_UPLOAD_PER_MIN", self.rate_upload_per_min as u64),
            ("RATE_API_PER_MIN", self.rate_api_per_min as u64),
        ];

        match positive.into_iter().find(|(_, v)| *v == 0) {
            Some((key, _)) => Err(ConfigError::Zero { key }),
            None => Ok(()),
        }
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:0".to_string(),
            database_url: None,
            api_prefix: "/api".to_string(),
            max_upload_bytes: 16 * 1024 * 1024,
            employees_per_page: 50,
            max_employees_per_page: 200,
            rate_upload_per_min: 1000,
            rate_api_per_min: 1000,
            log_dir: "logs".to_string(),
            log_level: tracing::Level::INFO,
        }
    }
}
