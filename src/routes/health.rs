use actix_web::{get, web, HttpResponse};
use chrono::Utc;

use crate::db::Store;
use crate::models::health::HealthResponse;

#[get("/health")]
pub async fn health_check(store: web::Data<Store>) -> HttpResponse {
    let mode = match store.get_ref() {
        Store::Postgres(_) => "postgres",
        Store::Mock(_) => "mock",
    };

    let response = HealthResponse {
        status: "ok".to_string(),
        mode: mode.to_string(),
        time: Utc::now(),
    };

    HttpResponse::Ok().json(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    use crate::db::MemStore;

    #[actix_web::test]
    async fn test_health_reports_mock_mode() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Store::Mock(MemStore::new())))
                .service(health_check),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["mode"], "mock");
    }
}
