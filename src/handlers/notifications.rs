use actix_web::{HttpResponse, Result, delete, get, patch, post};
use actix_web::web::{Data, Json, Path};
use uuid::Uuid;
use validator::Validate;

use crate::models::common::ApiResponse;
use crate::models::notification::{CreateNotificationRequest, Notification};
use crate::services::database::DatabaseService;

#[get("")]
pub async fn list_notifications(db: Data<DatabaseService>) -> Result<HttpResponse> {
    match db.get_notifications().await {
        Ok(notifications) => Ok(HttpResponse::Ok().json(ApiResponse::success(notifications))),
        Err(e) => Ok(server_error("Failed to load notifications", e)),
    }
}

#[get("/unread")]
pub async fn list_unread_notifications(db: Data<DatabaseService>) -> Result<HttpResponse> {
    match db.get_unread_notifications().await {
        Ok(notifications) => Ok(HttpResponse::Ok().json(ApiResponse::success(notifications))),
        Err(e) => Ok(server_error("Failed to load unread notifications", e)),
    }
}

#[post("")]
pub async fn create_notification(
    db: Data<DatabaseService>,
    payload: Json<CreateNotificationRequest>,
) -> Result<HttpResponse> {
    let request = payload.into_inner();
    if let Err(errors) = request.validate() {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::<Notification>::error(format!("Validation failed: {}", errors))));
    }

    let notification = Notification::new(request);
    match db.insert_notification(&notification).await {
        Ok(()) => Ok(HttpResponse::Created().json(ApiResponse::success(notification))),
        Err(e) => Ok(server_error("Failed to create notification", e)),
    }
}

#[patch("/{notification_id}/read")]
pub async fn mark_notification_read(
    db: Data<DatabaseService>,
    path: Path<Uuid>,
) -> Result<HttpResponse> {
    let notification_id = path.into_inner();

    match db.mark_notification_read(&notification_id).await {
        Ok(true) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            notification_id,
            "Notification marked as read".to_string(),
        ))),
        Ok(false) => Ok(not_found(notification_id)),
        Err(e) => Ok(server_error("Failed to update notification", e)),
    }
}

#[delete("/{notification_id}")]
pub async fn delete_notification(
    db: Data<DatabaseService>,
    path: Path<Uuid>,
) -> Result<HttpResponse> {
    let notification_id = path.into_inner();

    match db.delete_notification(&notification_id).await {
        Ok(true) => Ok(HttpResponse::NoContent().finish()),
        Ok(false) => Ok(not_found(notification_id)),
        Err(e) => Ok(server_error("Failed to delete notification", e)),
    }
}

fn not_found(notification_id: Uuid) -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::<()>::error(format!(
        "Notification {} not found",
        notification_id
    )))
}

fn server_error(context: &str, e: anyhow::Error) -> HttpResponse {
    log::error!("{}: {}", context, e);
    HttpResponse::InternalServerError().json(ApiResponse::<()>::error(format!("{}: {}", context, e)))
}
