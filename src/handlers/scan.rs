use actix_web::{HttpResponse, Result, post};
use actix_web::web::Data;

use crate::models::common::ApiResponse;
use crate::services::scanner::{ExpiryScanner, ScanError, ScanReport};
use crate::tasks::expiry_scan::run_expiry_scan;

#[post("/scan")]
pub async fn trigger_scan(scanner: Data<ExpiryScanner>) -> Result<HttpResponse> {
    match run_expiry_scan(&scanner).await {
        Ok(report) => Ok(HttpResponse::Ok().json(ApiResponse::success(report))),
        Err(ScanError::AlreadyRunning) => Ok(HttpResponse::Conflict()
            .json(ApiResponse::<ScanReport>::error(ScanError::AlreadyRunning.to_string()))),
        Err(e) => Ok(HttpResponse::InternalServerError().json(ApiResponse::<ScanReport>::error(e.to_string()))),
    }
}
