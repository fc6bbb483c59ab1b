use actix_web::{HttpResponse, web};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

use crate::config::Config;
use crate::service::employee::{self as service, EmployeeError, PageRequest};
use crate::store::EmployeeStore;
use crate::validation::employee::{EmployeeInput, EmployeePatch};

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn default_active_only() -> bool {
    true
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// 1-based page number.
    pub page: Option<u32>,
    /// Page size, capped by the server.
    pub per_page: Option<u32>,
    /// Hide deactivated employees (default `true`).
    #[serde(default = "default_active_only")]
    #[param(default = true)]
    pub active_only: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// At least two characters of a first or last name.
    pub name: Option<String>,
    #[serde(default = "default_active_only")]
    #[param(default = true)]
    pub active_only: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActiveQuery {
    #[serde(default = "default_active_only")]
    #[param(default = true)]
    pub active_only: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateRangeQuery {
    /// `yyyy/MM/dd`, inclusive.
    pub start_date: Option<String>,
    /// `yyyy/MM/dd`, inclusive.
    pub end_date: Option<String>,
    #[serde(default = "default_active_only")]
    #[param(default = true)]
    pub active_only: bool,
}

/// Employee service liveness
#[utoipa::path(
    get,
    path = "/api/ping",
    responses(
        (status = 200, description = "Service is up", body = Object, example = json!({
            "status": "ok",
            "service": "employee-service"
        }))
    ),
    tag = "Employee"
)]
pub async fn ping() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": "employee-service"
    }))
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = EmployeeInput,
    responses(
        (status = 201, description = "Employee created successfully", body = crate::model::employee::Employee),
        (status = 400, description = "Validation failed", body = crate::api::error::ErrorBody, example = json!({
            "success": false,
            "error": "Validation failed: birth_date employee must be at least 18 years old",
            "errors": [{"field": "birth_date", "message": "employee must be at least 18 years old"}]
        })),
        (status = 409, description = "RUT already registered", body = crate::api::error::ErrorBody),
        (status = 500, description = "Internal server error", body = crate::api::error::ErrorBody)
    ),
    tag = "Employee"
)]
pub async fn create_employee(
    store: web::Data<dyn EmployeeStore>,
    payload: web::Json<EmployeeInput>,
) -> Result<HttpResponse, EmployeeError> {
    let employee = service::create(store.get_ref(), &payload, today()).await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Employee created successfully",
        "data": employee
    })))
}

/// Get Employee by RUT
#[utoipa::path(
    get,
    path = "/api/employees/{rut}",
    params(
        ("rut", Path, description = "Employee RUT, e.g. 12345678-9")
    ),
    responses(
        (status = 200, description = "Employee found", body = crate::model::employee::Employee),
        (status = 404, description = "Employee not found", body = crate::api::error::ErrorBody, example = json!({
            "success": false,
            "error": "Employee with RUT 12345678-9 not found"
        })),
        (status = 500, description = "Internal server error", body = crate::api::error::ErrorBody)
    ),
    tag = "Employee"
)]
pub async fn get_employee(
    store: web::Data<dyn EmployeeStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, EmployeeError> {
    let employee = service::get(store.get_ref(), &path).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": employee
    })))
}

/// List Employees
#[utoipa::path(
    get,
    path = "/api/employees",
    params(ListQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = crate::service::employee::EmployeePage),
        (status = 500, description = "Internal server error", body = crate::api::error::ErrorBody)
    ),
    tag = "Employee"
)]
pub async fn list_employees(
    store: web::Data<dyn EmployeeStore>,
    config: web::Data<Config>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, EmployeeError> {
    let request = PageRequest::new(
        query.page,
        query.per_page,
        config.employees_per_page,
        config.max_employees_per_page,
    );
    let page = service::list(store.get_ref(), request, query.active_only).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": page
    })))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/employees/{rut}",
    params(
        ("rut", Path, description = "Employee RUT")
    ),
    request_body = EmployeePatch,
    responses(
        (status = 200, description = "Employee updated successfully", body = crate::model::employee::Employee),
        (status = 400, description = "Validation failed", body = crate::api::error::ErrorBody),
        (status = 404, description = "Employee not found", body = crate::api::error::ErrorBody),
        (status = 500, description = "Internal server error", body = crate::api::error::ErrorBody)
    ),
    tag = "Employee"
)]
pub async fn update_employee(
    store: web::Data<dyn EmployeeStore>,
    path: web::Path<String>,
    payload: web::Json<EmployeePatch>,
) -> Result<HttpResponse, EmployeeError> {
    let employee = service::update(store.get_ref(), &path, &payload, today()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Employee updated successfully",
        "data": employee
    })))
}

/// Deactivate Employee
#[utoipa::path(
    delete,
    path = "/api/employees/{rut}",
    params(
        ("rut", Path, description = "Employee RUT")
    ),
    responses(
        (status = 200, description = "Employee deactivated, record kept", body = Object, example = json!({
            "success": true,
            "message": "Employee 12345678-9 deactivated successfully"
        })),
        (status = 404, description = "Employee not found", body = crate::api::error::ErrorBody),
        (status = 500, description = "Internal server error", body = crate::api::error::ErrorBody)
    ),
    tag = "Employee"
)]
pub async fn delete_employee(
    store: web::Data<dyn EmployeeStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, EmployeeError> {
    let employee = service::soft_delete(store.get_ref(), &path).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Employee {} deactivated successfully", employee.rut)
    })))
}

/// Reactivate Employee
#[utoipa::path(
    patch,
    path = "/api/employees/{rut}/activate",
    params(
        ("rut", Path, description = "Employee RUT")
    ),
    responses(
        (status = 200, description = "Employee reactivated", body = crate::model::employee::Employee),
        (status = 404, description = "Employee not found", body = crate::api::error::ErrorBody),
        (status = 500, description = "Internal server error", body = crate::api::error::ErrorBody)
    ),
    tag = "Employee"
)]
pub async fn activate_employee(
    store: web::Data<dyn EmployeeStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, EmployeeError> {
    let employee = service::activate(store.get_ref(), &path).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Employee {} reactivated successfully", employee.rut),
        "data": employee
    })))
}

/// Search Employees by name
#[utoipa::path(
    get,
    path = "/api/employees/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching employees", body = Object, example = json!({
            "success": true,
            "search_term": "juan",
            "total": 1,
            "data": []
        })),
        (status = 400, description = "Missing or too short search term", body = crate::api::error::ErrorBody),
        (status = 500, description = "Internal server error", body = crate::api::error::ErrorBody)
    ),
    tag = "Employee"
)]
pub async fn search_employees(
    store: web::Data<dyn EmployeeStore>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, EmployeeError> {
    let term = query.name.as_deref().unwrap_or_default().trim();
    let employees = service::search(store.get_ref(), term, query.active_only).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "search_term": term,
        "total": employees.len(),
        "data": employees
    })))
}

/// Employees by category
#[utoipa::path(
    get,
    path = "/api/employees/category/{category}",
    params(
        ("category", Path, description = "A, B or C (any case)"),
        ActiveQuery
    ),
    responses(
        (status = 200, description = "Employees of the category", body = Object, example = json!({
            "success": true,
            "category": "A",
            "total": 0,
            "data": []
        })),
        (status = 400, description = "Unknown category", body = crate::api::error::ErrorBody),
        (status = 500, description = "Internal server error", body = crate::api::error::ErrorBody)
    ),
    tag = "Employee"
)]
pub async fn employees_by_category(
    store: web::Data<dyn EmployeeStore>,
    path: web::Path<String>,
    query: web::Query<ActiveQuery>,
) -> Result<HttpResponse, EmployeeError> {
    let (category, employees) = service::by_category(store.get_ref(), &path, query.active_only).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "category": category,
        "total": employees.len(),
        "data": employees
    })))
}

/// Employees by hire date range
#[utoipa::path(
    get,
    path = "/api/employees/date-range",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Employees hired within the range", body = Object, example = json!({
            "success": true,
            "date_range": {"start_date": "2020/01/01", "end_date": "2023/12/31"},
            "total": 0,
            "data": []
        })),
        (status = 400, description = "Missing or invalid dates", body = crate::api::error::ErrorBody),
        (status = 500, description = "Internal server error", body = crate::api::error::ErrorBody)
    ),
    tag = "Employee"
)]
pub async fn employees_by_date_range(
    store: web::Data<dyn EmployeeStore>,
    query: web::Query<DateRangeQuery>,
) -> Result<HttpResponse, EmployeeError> {
    let start = query.start_date.as_deref().unwrap_or_default();
    let end = query.end_date.as_deref().unwrap_or_default();
    let employees = service::hired_between(store.get_ref(), start, end, query.active_only).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "date_range": {
            "start_date": start.trim(),
            "end_date": end.trim()
        },
        "total": employees.len(),
        "data": employees
    })))
}

/// Employee statistics
#[utoipa::path(
    get,
    path = "/api/employees/stats",
    responses(
        (status = 200, description = "Headcount by state and category", body = crate::service::employee::EmployeeStats),
        (status = 500, description = "Internal server error", body = crate::api::error::ErrorBody)
    ),
    tag = "Employee"
)]
pub async fn employee_stats(store: web::Data<dyn EmployeeStore>) -> Result<HttpResponse, EmployeeError> {
    let stats = service::stats(store.get_ref()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": stats
    })))
}

/// Category of one employee
#[utoipa::path(
    get,
    path = "/api/employees/{rut}/category",
    params(
        ("rut", Path, description = "Employee RUT")
    ),
    responses(
        (status = 200, description = "Category and name of the employee", body = crate::service::employee::EmployeeCategory),
        (status = 404, description = "Employee not found", body = crate::api::error::ErrorBody),
        (status = 500, description = "Internal server error", body = crate::api::error::ErrorBody)
    ),
    tag = "Employee"
)]
pub async fn employee_category(
    store: web::Data<dyn EmployeeStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, EmployeeError> {
    let category = service::category_of(store.get_ref(), &path).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": category
    })))
}

#[cfg(test)]
mod tests {
    use actix_web::{App, http::StatusCode, test};
    use serde_json::{Value, json};

    use crate::api::testing::{self, TestState};

    fn payload(rut: &str, first_name: &str) -> Value {
        json!({
            "rut": rut,
            "last_name": "González Pérez",
            "first_name": first_name,
            "birth_date": "1985/03/15",
            "category": "a",
            "hire_date": "2020/01/15"
        })
    }

    #[actix_web::test]
    async fn create_then_fetch() {
        let state = TestState::new();
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

        let resp = test::call_service(&app, testing::post_json("/api/employees", &payload("12345678-9", "Juan")).to_request()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = test::call_and_read_body_json(&app, testing::get("/api/employees/12345678-9").to_request()).await;
        assert_eq!(body["data"]["first_name"], "Juan");
        assert_eq!(body["data"]["category"], "A");
        assert_eq!(body["data"]["birth_date"], "1985/03/15");
        assert_eq!(body["data"]["active"], true);
    }

    #[actix_web::test]
    async fn duplicate_rut_conflicts() {
        let state = TestState::new();
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;
        test::call_service(&app, testing::post_json("/api/employees", &payload("12345678-9", "Juan")).to_request()).await;

        let resp = test::call_service(&app, testing::post_json("/api/employees", &payload("12345678-9", "Ana")).to_request()).await;

        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn validation_errors_are_listed_per_field() {
        let state = TestState::new();
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

        let mut bad = payload("12345678-9", "J");
        bad["birth_date"] = json!("2015/01/01");
        let resp = test::call_service(&app, testing::post_json("/api/employees", &bad).to_request()).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        let fields: Vec<&str> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap())
            .collect();
        assert!(fields.contains(&"first_name"));
        assert!(fields.contains(&"birth_date"));
    }

    #[actix_web::test]
    async fn malformed_json_keeps_error_shape() {
        let state = TestState::new();
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

        let req = testing::request(test::TestRequest::post().uri("/api/employees"))
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn delete_is_soft_and_reversible() {
        let state = TestState::new();
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;
        test::call_service(&app, testing::post_json("/api/employees", &payload("12345678-9", "Juan")).to_request()).await;

        let resp = test::call_service(&app, testing::request(test::TestRequest::delete().uri("/api/employees/12345678-9")).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::call_and_read_body_json(&app, testing::get("/api/employees/12345678-9").to_request()).await;
        assert_eq!(body["data"]["active"], false);

        let body: Value = test::call_and_read_body_json(&app, testing::get("/api/employees").to_request()).await;
        assert_eq!(body["data"]["pagination"]["total"], 0);
        let body: Value = test::call_and_read_body_json(&app, testing::get("/api/employees?active_only=false").to_request()).await;
        assert_eq!(body["data"]["pagination"]["total"], 1);

        let resp = test::call_service(
            &app,
            testing::request(test::TestRequest::patch().uri("/api/employees/12345678-9/activate")).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["active"], true);
    }

    #[actix_web::test]
    async fn unknown_rut_is_not_found() {
        let state = TestState::new();
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

        let resp = test::call_service(&app, testing::get("/api/employees/99999999-9").to_request()).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Employee with RUT 99999999-9 not found");
    }

    #[actix_web::test]
    async fn fixed_routes_are_not_taken_for_a_rut() {
        let state = TestState::new();
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;
        test::call_service(&app, testing::post_json("/api/employees", &payload("12345678-9", "Juan")).to_request()).await;
        test::call_service(&app, testing::post_json("/api/employees", &payload("11111111-1", "María")).to_request()).await;

        let body: Value = test::call_and_read_body_json(&app, testing::get("/api/employees/search?name=mar").to_request()).await;
        assert_eq!(body["total"], 1);

        let body: Value = test::call_and_read_body_json(&app, testing::get("/api/employees/stats").to_request()).await;
        assert_eq!(body["data"]["total_employees"], 2);
        assert_eq!(body["data"]["by_category"]["A"], 2);

        let body: Value = test::call_and_read_body_json(&app, testing::get("/api/employees/category/A").to_request()).await;
        assert_eq!(body["category"], "A");
        assert_eq!(body["total"], 2);

        let body: Value = test::call_and_read_body_json(
            &app,
            testing::get("/api/employees/date-range?start_date=2020/01/01&end_date=2020/12/31").to_request(),
        )
        .await;
        assert_eq!(body["total"], 2);

        let body: Value = test::call_and_read_body_json(&app, testing::get("/api/employees/12345678-9/category").to_request()).await;
        assert_eq!(body["data"]["category"], "A");
    }

    #[actix_web::test]
    async fn search_requires_a_term() {
        let state = TestState::new();
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

        let resp = test::call_service(&app, testing::get("/api/employees/search").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn list_caps_page_size() {
        let state = TestState::new();
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

        let body: Value = test::call_and_read_body_json(&app, testing::get("/api/employees?per_page=5000").to_request()).await;
        assert_eq!(body["data"]["pagination"]["per_page"], 200);
        assert_eq!(body["data"]["pagination"]["page"], 1);
    }
}
