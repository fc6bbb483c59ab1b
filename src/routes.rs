use crate::{
    api::{
        attendance, employee,
        error::{json_error_handler, query_error_handler},
        health,
    },
    config::{Config, ConfigError},
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;

type LimiterConfig = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-IP limiter settings, built once so every worker shares the same buckets.
#[derive(Clone)]
pub struct RateLimits {
    upload: LimiterConfig,
    api: LimiterConfig,
}

impl RateLimits {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            upload: build_limiter("RATE_UPLOAD_PER_MIN", config.rate_upload_per_min)?,
            api: build_limiter("RATE_API_PER_MIN", config.rate_api_per_min)?,
        })
    }
}

fn build_limiter(key: &'static str, requests_per_min: u32) -> Result<LimiterConfig, ConfigError> {
    let per_ms = (60_000 / u64::from(requests_per_min.max(1))).max(1);
    GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or(ConfigError::Zero { key })
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limits: &RateLimits) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler));

    // Employee service
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(Governor::new(&limits.api))
            .route("/ping", web::get().to(employee::ping))
            // /employees
            .service(
                web::resource("/employees")
                    .route(web::post().to(employee::create_employee))
                    .route(web::get().to(employee::list_employees)),
            )
            // fixed paths must come before /employees/{rut}
            .route("/employees/search", web::get().to(employee::search_employees))
            .route("/employees/stats", web::get().to(employee::employee_stats))
            .route("/employees/date-range", web::get().to(employee::employees_by_date_range))
            .route(
                "/employees/category/{category}",
                web::get().to(employee::employees_by_category),
            )
            // /employees/{rut}
            .service(
                web::resource("/employees/{rut}")
                    .route(web::get().to(employee::get_employee))
                    .route(web::put().to(employee::update_employee))
                    .route(web::delete().to(employee::delete_employee)),
            )
            .route("/employees/{rut}/activate", web::patch().to(employee::activate_employee))
            .route("/employees/{rut}/category", web::get().to(employee::employee_category)),
    );

    // Upload service
    cfg.service(
        web::resource("/upload")
            .wrap(Governor::new(&limits.upload))
            .route(web::post().to(attendance::upload)),
    );
    cfg.service(health::index);
    cfg.service(
        web::scope("")
            .wrap(Governor::new(&limits.api))
            .route("/ping", web::get().to(health::ping))
            .route("/health", web::get().to(health::health))
            .route("/data", web::get().to(attendance::list_records))
            .route("/data/rut/{rut}", web::get().to(attendance::records_by_rut))
            .route("/ruts", web::get().to(attendance::list_ruts))
            .route("/stats", web::get().to(attendance::stats)),
    );
}
