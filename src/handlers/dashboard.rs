use actix_web::{HttpResponse, Result, get};
use actix_web::web::Data;

use crate::models::common::ApiResponse;
use crate::services::database::{DashboardStats, DatabaseService};

#[get("/stats")]
pub async fn get_stats(db: Data<DatabaseService>) -> Result<HttpResponse> {
    match db.get_dashboard_stats().await {
        Ok(stats) => Ok(HttpResponse::Ok().json(ApiResponse::success(stats))),
        Err(e) => {
            log::error!("Failed to load dashboard stats: {}", e);
            Ok(HttpResponse::InternalServerError()
                .json(ApiResponse::<DashboardStats>::error(format!("Failed to load stats: {}", e))))
        }
    }
}
