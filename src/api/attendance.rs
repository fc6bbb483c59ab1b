use std::io;

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::api::error::QueryError;
use crate::config::Config;
use crate::ingest::{self, IngestionError};
use crate::model::attendance::AttendanceRecord;
use crate::store::AttendanceStore;
use crate::validation::line::is_date;

/// Name of the multipart part carrying the file.
const FILE_PART: &str = "file";

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// The `DATA.TXT` attendance log.
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    #[schema(example = true)]
    pub success: bool,
    #[schema(example = "File processed successfully. 3 records imported.")]
    pub message: String,
    #[schema(example = 3)]
    pub records_processed: usize,
}

#[derive(Serialize, ToSchema)]
pub struct RecordsResponse {
    pub success: bool,
    pub data: Vec<AttendanceRecord>,
    #[schema(example = 3)]
    pub total_records: usize,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RutQuery {
    /// Narrows the result to one day (`yyyy/MM/dd`).
    pub date: Option<String>,
}

/// Upload DATA.TXT
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File ingested, previous records replaced", body = UploadResponse),
        (status = 400, description = "Missing file, wrong file name or invalid line; nothing was changed", body = crate::api::error::ErrorBody, example = json!({
            "success": false,
            "error": "Line 3: invalid date \"2023-10-15\", expected yyyy/MM/dd"
        })),
        (status = 413, description = "File exceeds the upload limit", body = crate::api::error::ErrorBody),
        (status = 500, description = "Internal server error", body = crate::api::error::ErrorBody)
    ),
    tag = "Attendance"
)]
pub async fn upload(
    store: web::Data<dyn AttendanceStore>,
    config: web::Data<Config>,
    mut payload: Multipart,
) -> Result<HttpResponse, IngestionError> {
    while let Some(field) = payload.next().await {
        let field = field.map_err(|e| {
            warn!(error = %e, "Unreadable multipart request");
            IngestionError::MissingFile
        })?;

        if field.name() != FILE_PART {
            continue;
        }

        let file_name = field
            .content_disposition()
            .get_filename()
            .unwrap_or_default()
            .to_string();
        info!(file_name = %file_name, "Processing attendance upload");

        let content = field.map(|chunk| chunk.map_err(|e| io::Error::other(e.to_string())));
        let summary = ingest::ingest(store.get_ref(), &file_name, content, config.max_upload_bytes).await?;

        return Ok(HttpResponse::Ok().json(UploadResponse {
            success: true,
            message: summary.message(),
            records_processed: summary.records_processed,
        }));
    }

    Err(IngestionError::MissingFile)
}

/// All attendance records
#[utoipa::path(
    get,
    path = "/data",
    responses(
        (status = 200, description = "Every record of the last successful upload", body = RecordsResponse),
        (status = 500, description = "Internal server error", body = crate::api::error::ErrorBody)
    ),
    tag = "Attendance"
)]
pub async fn list_records(store: web::Data<dyn AttendanceStore>) -> Result<HttpResponse, QueryError> {
    let data = store.find_all().await?;

    Ok(HttpResponse::Ok().json(RecordsResponse {
        success: true,
        total_records: data.len(),
        data,
    }))
}

/// Records of one RUT
#[utoipa::path(
    get,
    path = "/data/rut/{rut}",
    params(
        ("rut", Path, description = "Person id, e.g. 12345678-9"),
        RutQuery
    ),
    responses(
        (status = 200, description = "Records of the person", body = Object, example = json!({
            "success": true,
            "rut": "12345678-9",
            "data": [{"id": 1, "date": "2023/10/15", "time": "08:00", "person_id": "12345678-9"}],
            "total_records": 1
        })),
        (status = 400, description = "Invalid date filter", body = crate::api::error::ErrorBody),
        (status = 500, description = "Internal server error", body = crate::api::error::ErrorBody)
    ),
    tag = "Attendance"
)]
pub async fn records_by_rut(
    store: web::Data<dyn AttendanceStore>,
    path: web::Path<String>,
    query: web::Query<RutQuery>,
) -> Result<HttpResponse, QueryError> {
    let rut = path.into_inner();

    let data = match query.date.as_deref().map(str::trim) {
        Some(date) if !is_date(date) => {
            return Err(QueryError::InvalidDate {
                field: "date",
                value: date.to_string(),
            });
        }
        Some(date) => store.find_by_person_and_date(&rut, date).await?,
        None => store.find_by_person(&rut).await?,
    };

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "rut": rut,
        "date": query.date,
        "total_records": data.len(),
        "data": data,
    })))
}

/// Distinct RUTs
#[utoipa::path(
    get,
    path = "/ruts",
    responses(
        (status = 200, description = "Sorted distinct person ids", body = Object, example = json!({
            "success": true,
            "ruts": ["12345678-9", "87654321-0"],
            "total_ruts": 2
        })),
        (status = 500, description = "Internal server error", body = crate::api::error::ErrorBody)
    ),
    tag = "Attendance"
)]
pub async fn list_ruts(store: web::Data<dyn AttendanceStore>) -> Result<HttpResponse, QueryError> {
    let ruts = store.distinct_ids().await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "total_ruts": ruts.len(),
        "ruts": ruts,
    })))
}

/// Upload statistics
#[utoipa::path(
    get,
    path = "/stats",
    responses(
        (status = 200, description = "Record and person totals", body = Object, example = json!({
            "success": true,
            "stats": {"total_records": 3, "total_employees": 2, "service_status": "active"}
        })),
        (status = 500, description = "Internal server error", body = crate::api::error::ErrorBody)
    ),
    tag = "Attendance"
)]
pub async fn stats(store: web::Data<dyn AttendanceStore>) -> Result<HttpResponse, QueryError> {
    let total_records = store.count().await?;
    let total_employees = store.distinct_ids().await?.len();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "stats": {
            "total_records": total_records,
            "total_employees": total_employees,
            "service_status": "active",
        }
    })))
}

#[cfg(test)]
mod tests {
    use actix_web::{App, http::StatusCode, test};
    use serde_json::Value;

    use crate::api::testing::{self, TestState};

    const SAMPLE: &str = "2023/10/15;08:00;12345678-9\n2023/10/15;17:30;12345678-9\n\n2023/10/16;08:15;87654321-0\n";

    #[actix_web::test]
    async fn upload_then_read_back() {
        let state = TestState::new();
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

        let resp = test::call_service(&app, testing::upload_request("DATA.TXT", SAMPLE).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["records_processed"], 3);

        let body: Value = test::call_and_read_body_json(&app, testing::get("/data").to_request()).await;
        assert_eq!(body["total_records"], 3);
        assert_eq!(body["data"][2]["person_id"], "87654321-0");

        let body: Value = test::call_and_read_body_json(&app, testing::get("/ruts").to_request()).await;
        assert_eq!(body["ruts"], serde_json::json!(["12345678-9", "87654321-0"]));

        let body: Value = test::call_and_read_body_json(&app, testing::get("/stats").to_request()).await;
        assert_eq!(body["stats"]["total_records"], 3);
        assert_eq!(body["stats"]["total_employees"], 2);
    }

    #[actix_web::test]
    async fn invalid_line_keeps_previous_upload() {
        let state = TestState::new();
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;
        test::call_service(&app, testing::upload_request("DATA.TXT", SAMPLE).to_request()).await;

        let resp = test::call_service(
            &app,
            testing::upload_request("DATA.TXT", "2023/10/20;08:00;1-9\n2023-10-15;08:00;12345678-9\n").to_request(),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().starts_with("Line 2"));

        let body: Value = test::call_and_read_body_json(&app, testing::get("/data").to_request()).await;
        assert_eq!(body["total_records"], 3);
    }

    #[actix_web::test]
    async fn wrong_file_name_is_a_bad_request() {
        let state = TestState::new();
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

        let resp = test::call_service(&app, testing::upload_request("WRONG.TXT", SAMPLE).to_request()).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("DATA.TXT"));
    }

    #[actix_web::test]
    async fn missing_file_part_is_a_bad_request() {
        let state = TestState::new();
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

        let resp = test::call_service(&app, testing::multipart_request("attachment", "DATA.TXT", SAMPLE).to_request()).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "No file was provided");
    }

    #[actix_web::test]
    async fn records_by_rut_with_date_filter() {
        let state = TestState::new();
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;
        test::call_service(&app, testing::upload_request("DATA.TXT", SAMPLE).to_request()).await;

        let body: Value = test::call_and_read_body_json(&app, testing::get("/data/rut/12345678-9").to_request()).await;
        assert_eq!(body["total_records"], 2);

        let body: Value =
            test::call_and_read_body_json(&app, testing::get("/data/rut/12345678-9?date=2023/10/16").to_request()).await;
        assert_eq!(body["total_records"], 0);

        let resp = test::call_service(&app, testing::get("/data/rut/12345678-9?date=2023-10-15").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
