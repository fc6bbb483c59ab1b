use std::sync::Arc;

use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use dotenvy::dotenv;

mod api;
mod config;
mod db;
mod docs;
mod ingest;
mod model;
mod routes;
mod service;
mod store;
mod utils;
mod validation;

use config::Config;
use db::init_db;
use routes::RateLimits;
use store::memory::MemoryStore;
use store::mysql::MySqlStore;
use store::{AttendanceStore, EmployeeStore};

use crate::docs::ApiDoc;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

type Stores = (Arc<dyn AttendanceStore>, Arc<dyn EmployeeStore>);

/// One backend serves both services.
fn shared<S: AttendanceStore + EmployeeStore + 'static>(store: S) -> Stores {
    let store = Arc::new(store);
    let attendance: Arc<dyn AttendanceStore> = store.clone();
    let employees: Arc<dyn EmployeeStore> = store;
    (attendance, employees)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(addr = %config.server_addr, "Server starting...");

    let (attendance, employees) = match &config.database_url {
        Some(url) => {
            let pool = init_db(url).await.context("Failed to connect to database")?;
            shared(MySqlStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL is not set, records are kept in memory only");
            shared(MemoryStore::new())
        }
    };

    let limits = RateLimits::from_config(&config)?;
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::from(attendance.clone()))
            .app_data(Data::from(employees.clone()))
            .app_data(Data::new(config.clone()))
            .configure(|cfg| routes::configure(cfg, &config, &limits))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
