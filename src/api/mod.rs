pub mod attendance;
pub mod employee;
pub mod error;
pub mod health;

/// Shared fixtures for the handler tests.
#[cfg(test)]
pub mod testing {
    use std::sync::Arc;

    use actix_web::test::TestRequest;
    use actix_web::web;
    use serde_json::Value;

    use crate::config::Config;
    use crate::routes::{self, RateLimits};
    use crate::store::memory::MemoryStore;
    use crate::store::{AttendanceStore, EmployeeStore};

    const BOUNDARY: &str = "hr-timeclock-test-boundary";

    /// One memory store serving both services, as `main` wires it.
    pub struct TestState {
        pub store: Arc<MemoryStore>,
        pub config: Config,
        limits: RateLimits,
    }

    impl TestState {
        pub fn new() -> Self {
            let config = Config::default();
            let limits = RateLimits::from_config(&config).expect("rate limits");
            Self {
                store: Arc::new(MemoryStore::new()),
                config,
                limits,
            }
        }

        pub fn configure(&self, cfg: &mut web::ServiceConfig) {
            let attendance: Arc<dyn AttendanceStore> = self.store.clone();
            let employees: Arc<dyn EmployeeStore> = self.store.clone();

            cfg.app_data(web::Data::from(attendance))
                .app_data(web::Data::from(employees))
                .app_data(web::Data::new(self.config.clone()));
            routes::configure(cfg, &self.config, &self.limits);
        }
    }

    /// The rate limiter keys on the peer address, so every request needs one.
    pub fn request(req: TestRequest) -> TestRequest {
        req.peer_addr("127.0.0.1:40000".parse().expect("peer address"))
    }

    pub fn get(uri: &str) -> TestRequest {
        request(TestRequest::get().uri(uri))
    }

    pub fn post_json(uri: &str, body: &Value) -> TestRequest {
        request(TestRequest::post().uri(uri)).set_json(body)
    }

    pub fn multipart_request(part: &str, file_name: &str, content: &str) -> TestRequest {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{part}\"; filename=\"{file_name}\"\r\n\
             Content-Type: text/plain\r\n\
             \r\n\
             {content}\r\n\
             --{BOUNDARY}--\r\n"
        );

        request(TestRequest::post().uri("/upload"))
            .insert_header(("content-type", format!("multipart/form-data; boundary={BOUNDARY}")))
            .set_payload(body)
    }

    pub fn upload_request(file_name: &str, content: &str) -> TestRequest {
        multipart_request("file", file_name, content)
    }
}
