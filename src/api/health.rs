use actix_web::{HttpResponse, get, web};
use chrono::Utc;
use serde_json::json;
use tracing::error;

use crate::store::{AttendanceStore, EmployeeStore, StoreError};

const SERVICE: &str = "attendance-upload-service";

#[get("/")]
pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "service": "HR Timeclock",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "description": "Attendance log ingestion and employee management",
        "endpoints": {
            "upload": "POST /upload",
            "get_data": "GET /data",
            "get_data_by_rut": "GET /data/rut/{rut}",
            "get_ruts": "GET /ruts",
            "get_stats": "GET /stats",
            "health": "GET /ping",
            "health_detailed": "GET /health",
            "employees": "GET|POST /api/employees",
            "docs": "GET /swagger-ui/"
        }
    }))
}

/// Upload service liveness
#[utoipa::path(
    get,
    path = "/ping",
    responses(
        (status = 200, description = "Service is up", body = Object, example = json!({
            "status": "ok",
            "service": "attendance-upload-service"
        }))
    ),
    tag = "Health"
)]
pub async fn ping() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": SERVICE
    }))
}

fn describe(check: Result<(), StoreError>, store: &str) -> (bool, String) {
    match check {
        Ok(()) => (true, "connected".to_string()),
        Err(e) => {
            error!(error = %e, store, "Health check failed");
            (false, "unreachable".to_string())
        }
    }
}

/// Store connectivity
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Both stores answer", body = Object, example = json!({
            "service": "attendance-upload-service",
            "status": "healthy",
            "database": {"attendance": "connected", "employees": "connected"},
            "timestamp": "2024-01-01T00:00:00+00:00"
        })),
        (status = 503, description = "At least one store is unreachable", body = Object)
    ),
    tag = "Health"
)]
pub async fn health(
    attendance: web::Data<dyn AttendanceStore>,
    employees: web::Data<dyn EmployeeStore>,
) -> HttpResponse {
    let (attendance_ok, attendance_status) = describe(attendance.ping().await, "attendance");
    let (employees_ok, employees_status) = describe(employees.ping().await, "employees");
    let healthy = attendance_ok && employees_ok;

    let body = json!({
        "service": SERVICE,
        "status": if healthy { "healthy" } else { "unhealthy" },
        "database": {
            "attendance": attendance_status,
            "employees": employees_status
        },
        "timestamp": Utc::now().to_rfc3339()
    });

    if healthy {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}
