use actix_web::{HttpResponse, Result};
use actix_web::web::Data;
use serde_json::json;

use crate::services::database::DatabaseService;

pub async fn health_check(db: Data<DatabaseService>) -> Result<HttpResponse> {
    match db.health_check().await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "status": "ok",
            "database": "up",
            "timestamp": chrono::Utc::now(),
        }))),
        Err(e) => {
            log::error!("Health check failed: {}", e);
            Ok(HttpResponse::ServiceUnavailable().json(json!({
                "status": "degraded",
                "database": "down",
            })))
        }
    }
}
