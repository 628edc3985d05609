use actix_web::{HttpResponse, Result, delete, get, patch, post};
use actix_web::web::{Data, Json, Path, Query};
use chrono::{Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::common::ApiResponse;
use crate::models::domain::{CreateDomainRequest, UpdateDomainRequest};
use crate::models::registrar::{CreateRegistrarRequest, UpdateRegistrarRequest};
use crate::models::ssl_certificate::{CreateSslCertificateRequest, UpdateSslCertificateRequest};
use crate::services::database::{DatabaseService, RegistrarRemoval};

#[derive(Debug, Deserialize)]
pub struct ExpiringQuery {
    pub days: Option<i64>,
}

impl ExpiringQuery {
    fn window_days(&self) -> i64 {
        self.days.unwrap_or(30).clamp(1, 730)
    }
}

// Registrars

#[get("")]
pub async fn list_registrars(db: Data<DatabaseService>) -> Result<HttpResponse> {
    match db.get_registrars().await {
        Ok(registrars) => Ok(HttpResponse::Ok().json(ApiResponse::success(registrars))),
        Err(e) => Ok(server_error("Failed to load registrars", e)),
    }
}

#[post("")]
pub async fn create_registrar(
    db: Data<DatabaseService>,
    payload: Json<CreateRegistrarRequest>,
) -> Result<HttpResponse> {
    let request = payload.into_inner();
    if let Err(errors) = request.validate() {
        return Ok(bad_request(errors));
    }

    match db.create_registrar(request).await {
        Ok(registrar) => Ok(HttpResponse::Created().json(ApiResponse::success(registrar))),
        Err(e) => Ok(server_error("Failed to create registrar", e)),
    }
}

#[get("/{registrar_id}")]
pub async fn get_registrar(db: Data<DatabaseService>, path: Path<Uuid>) -> Result<HttpResponse> {
    let registrar_id = path.into_inner();
    match db.get_registrar(&registrar_id).await {
        Ok(Some(registrar)) => Ok(HttpResponse::Ok().json(ApiResponse::success(registrar))),
        Ok(None) => Ok(not_found("Registrar", registrar_id)),
        Err(e) => Ok(server_error("Failed to load registrar", e)),
    }
}

#[patch("/{registrar_id}")]
pub async fn update_registrar(
    db: Data<DatabaseService>,
    path: Path<Uuid>,
    payload: Json<UpdateRegistrarRequest>,
) -> Result<HttpResponse> {
    let registrar_id = path.into_inner();
    let request = payload.into_inner();
    if let Err(errors) = request.validate() {
        return Ok(bad_request(errors));
    }

    match db.update_registrar(&registrar_id, request).await {
        Ok(Some(registrar)) => Ok(HttpResponse::Ok().json(ApiResponse::success(registrar))),
        Ok(None) => Ok(not_found("Registrar", registrar_id)),
        Err(e) => Ok(server_error("Failed to update registrar", e)),
    }
}

#[delete("/{registrar_id}")]
pub async fn delete_registrar(db: Data<DatabaseService>, path: Path<Uuid>) -> Result<HttpResponse> {
    let registrar_id = path.into_inner();
    match db.delete_registrar(&registrar_id).await {
        Ok(RegistrarRemoval::Deleted) => Ok(HttpResponse::NoContent().finish()),
        Ok(RegistrarRemoval::NotFound) => Ok(not_found("Registrar", registrar_id)),
        Ok(RegistrarRemoval::InUse(domains)) => Ok(HttpResponse::Conflict().json(ApiResponse::<()>::error(
            format!("Registrar {} still has {} domain(s) assigned", registrar_id, domains),
        ))),
        Err(e) => Ok(server_error("Failed to delete registrar", e)),
    }
}

// Domains

#[get("")]
pub async fn list_domains(db: Data<DatabaseService>) -> Result<HttpResponse> {
    match db.get_domains().await {
        Ok(domains) => Ok(HttpResponse::Ok().json(ApiResponse::success(domains))),
        Err(e) => Ok(server_error("Failed to load domains", e)),
    }
}

#[get("/expiring")]
pub async fn list_expiring_domains(db: Data<DatabaseService>, query: Query<ExpiringQuery>) -> Result<HttpResponse> {
    let now = Utc::now();
    let until = now + Duration::days(query.window_days());
    match db.get_domains_expiring_between(now, until).await {
        Ok(domains) => Ok(HttpResponse::Ok().json(ApiResponse::success(domains))),
        Err(e) => Ok(server_error("Failed to load expiring domains", e)),
    }
}

#[get("/{domain_id}")]
pub async fn get_domain(db: Data<DatabaseService>, path: Path<Uuid>) -> Result<HttpResponse> {
    let domain_id = path.into_inner();
    match db.get_domain(&domain_id).await {
        Ok(Some(domain)) => Ok(HttpResponse::Ok().json(ApiResponse::success(domain))),
        Ok(None) => Ok(not_found("Domain", domain_id)),
        Err(e) => Ok(server_error("Failed to load domain", e)),
    }
}

#[post("")]
pub async fn create_domain(
    db: Data<DatabaseService>,
    payload: Json<CreateDomainRequest>,
) -> Result<HttpResponse> {
    let request = payload.into_inner();
    if let Err(errors) = request.validate() {
        return Ok(bad_request(errors));
    }

    match db.get_registrar(&request.registrar_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return Ok(not_found("Registrar", request.registrar_id)),
        Err(e) => return Ok(server_error("Failed to load registrar", e)),
    }

    match db.create_domain(request).await {
        Ok(domain) => Ok(HttpResponse::Created().json(ApiResponse::success(domain))),
        Err(e) => Ok(server_error("Failed to create domain", e)),
    }
}

#[patch("/{domain_id}")]
pub async fn update_domain(
    db: Data<DatabaseService>,
    path: Path<Uuid>,
    payload: Json<UpdateDomainRequest>,
) -> Result<HttpResponse> {
    let domain_id = path.into_inner();
    let request = payload.into_inner();
    if let Err(errors) = request.validate() {
        return Ok(bad_request(errors));
    }

    if let Some(registrar_id) = request.registrar_id {
        match db.get_registrar(&registrar_id).await {
            Ok(Some(_)) => {}
            Ok(None) => return Ok(not_found("Registrar", registrar_id)),
            Err(e) => return Ok(server_error("Failed to load registrar", e)),
        }
    }

    match db.update_domain(&domain_id, request).await {
        Ok(Some(domain)) => Ok(HttpResponse::Ok().json(ApiResponse::success(domain))),
        Ok(None) => Ok(not_found("Domain", domain_id)),
        Err(e) => Ok(server_error("Failed to update domain", e)),
    }
}

#[post("/{domain_id}/complete")]
pub async fn complete_domain(db: Data<DatabaseService>, path: Path<Uuid>) -> Result<HttpResponse> {
    let domain_id = path.into_inner();
    match db.mark_domain_completed(&domain_id).await {
        Ok(Some(domain)) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            domain,
            "Domain marked as renewed".to_string(),
        ))),
        Ok(None) => Ok(not_found("Domain", domain_id)),
        Err(e) => Ok(server_error("Failed to complete domain", e)),
    }
}

#[delete("/{domain_id}")]
pub async fn delete_domain(db: Data<DatabaseService>, path: Path<Uuid>) -> Result<HttpResponse> {
    let domain_id = path.into_inner();
    match db.delete_domain(&domain_id).await {
        Ok(true) => Ok(HttpResponse::NoContent().finish()),
        Ok(false) => Ok(not_found("Domain", domain_id)),
        Err(e) => Ok(server_error("Failed to delete domain", e)),
    }
}

// SSL certificates

#[get("")]
pub async fn list_ssl_certificates(db: Data<DatabaseService>) -> Result<HttpResponse> {
    match db.get_ssl_certificates().await {
        Ok(certs) => Ok(HttpResponse::Ok().json(ApiResponse::success(certs))),
        Err(e) => Ok(server_error("Failed to load SSL certificates", e)),
    }
}

#[get("/expiring")]
pub async fn list_expiring_ssl_certificates(
    db: Data<DatabaseService>,
    query: Query<ExpiringQuery>,
) -> Result<HttpResponse> {
    let now = Utc::now();
    let until = now + Duration::days(query.window_days());
    match db.get_ssl_certificates_expiring_between(now, until).await {
        Ok(certs) => Ok(HttpResponse::Ok().json(ApiResponse::success(certs))),
        Err(e) => Ok(server_error("Failed to load expiring SSL certificates", e)),
    }
}

#[post("")]
pub async fn create_ssl_certificate(
    db: Data<DatabaseService>,
    payload: Json<CreateSslCertificateRequest>,
) -> Result<HttpResponse> {
    let request = payload.into_inner();
    if let Err(errors) = request.validate() {
        return Ok(bad_request(errors));
    }

    match db.create_ssl_certificate(request).await {
        Ok(cert) => Ok(HttpResponse::Created().json(ApiResponse::success(cert))),
        Err(e) => Ok(server_error("Failed to create SSL certificate", e)),
    }
}

#[get("/{cert_id}")]
pub async fn get_ssl_certificate(db: Data<DatabaseService>, path: Path<Uuid>) -> Result<HttpResponse> {
    let cert_id = path.into_inner();
    match db.get_ssl_certificate(&cert_id).await {
        Ok(Some(cert)) => Ok(HttpResponse::Ok().json(ApiResponse::success(cert))),
        Ok(None) => Ok(not_found("SSL certificate", cert_id)),
        Err(e) => Ok(server_error("Failed to load SSL certificate", e)),
    }
}

#[patch("/{cert_id}")]
pub async fn update_ssl_certificate(
    db: Data<DatabaseService>,
    path: Path<Uuid>,
    payload: Json<UpdateSslCertificateRequest>,
) -> Result<HttpResponse> {
    let cert_id = path.into_inner();
    let request = payload.into_inner();
    if let Err(errors) = request.validate() {
        return Ok(bad_request(errors));
    }

    match db.update_ssl_certificate(&cert_id, request).await {
        Ok(Some(cert)) => Ok(HttpResponse::Ok().json(ApiResponse::success(cert))),
        Ok(None) => Ok(not_found("SSL certificate", cert_id)),
        Err(e) => Ok(server_error("Failed to update SSL certificate", e)),
    }
}

#[post("/{cert_id}/complete")]
pub async fn complete_ssl_certificate(db: Data<DatabaseService>, path: Path<Uuid>) -> Result<HttpResponse> {
    let cert_id = path.into_inner();
    match db.mark_ssl_certificate_completed(&cert_id).await {
        Ok(Some(cert)) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            cert,
            "SSL certificate marked as renewed".to_string(),
        ))),
        Ok(None) => Ok(not_found("SSL certificate", cert_id)),
        Err(e) => Ok(server_error("Failed to complete SSL certificate", e)),
    }
}

#[delete("/{cert_id}")]
pub async fn delete_ssl_certificate(db: Data<DatabaseService>, path: Path<Uuid>) -> Result<HttpResponse> {
    let cert_id = path.into_inner();
    match db.delete_ssl_certificate(&cert_id).await {
        Ok(true) => Ok(HttpResponse::NoContent().finish()),
        Ok(false) => Ok(not_found("SSL certificate", cert_id)),
        Err(e) => Ok(server_error("Failed to delete SSL certificate", e)),
    }
}

fn bad_request(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiResponse::<()>::error(format!("Validation failed: {}", errors)))
}

fn not_found(kind: &str, id: Uuid) -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::<()>::error(format!("{} {} not found", kind, id)))
}

fn server_error(context: &str, e: anyhow::Error) -> HttpResponse {
    log::error!("{}: {}", context, e);
    HttpResponse::InternalServerError().json(ApiResponse::<()>::error(format!("{}: {}", context, e)))
}
