use crate::api::attendance::{RecordsResponse, UploadForm, UploadResponse};
use crate::api::error::ErrorBody;
use crate::model::attendance::AttendanceRecord;
use crate::model::employee::{Category, Employee};
use crate::service::employee::{EmployeeCategory, EmployeePage, EmployeeStats, Pagination};
use crate::validation::employee::{EmployeeInput, EmployeePatch, FieldErrorBody};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HR Timeclock API",
        version = "1.0.0",
        description = r#"
## Attendance upload and employee management

### 🔹 Attendance upload
- `POST /upload` replaces every attendance record with the contents of a `DATA.TXT` file
- One mark per line: `yyyy/MM/dd;HH:mm;xxxxxxxx-x`
- The upload is all or nothing: the first invalid line rejects the whole file and keeps the previous records

### 🔹 Employees
- Create, read, update and list employees with pagination
- Deactivate (soft delete) and reactivate
- Search by name, filter by category or hire date range, statistics

### 📦 Response Format
- Successful responses carry `success: true`
- Failures carry `success: false` and an `error` message; validation failures list every field in `errors`

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::health::ping,
        crate::api::health::health,

        crate::api::attendance::upload,
        crate::api::attendance::list_records,
        crate::api::attendance::records_by_rut,
        crate::api::attendance::list_ruts,
        crate::api::attendance::stats,

        crate::api::employee::ping,
        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::activate_employee,
        crate::api::employee::search_employees,
        crate::api::employee::employees_by_category,
        crate::api::employee::employees_by_date_range,
        crate::api::employee::employee_stats,
        crate::api::employee::employee_category
    ),
    components(
        schemas(
            AttendanceRecord,
            UploadForm,
            UploadResponse,
            RecordsResponse,
            ErrorBody,
            FieldErrorBody,
            Category,
            Employee,
            EmployeeInput,
            EmployeePatch,
            EmployeePage,
            Pagination,
            EmployeeStats,
            EmployeeCategory
        )
    ),
    tags(
        (name = "Health", description = "Liveness and store connectivity"),
        (name = "Attendance", description = "Attendance log upload and queries"),
        (name = "Employee", description = "Employee management APIs"),
    )
)]
pub struct ApiDoc;
