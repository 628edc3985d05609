use surrealdb::{Surreal, engine::any::{self, Any}};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::config::DatabaseConfig;
use crate::models::{
    domain::{Domain, DomainWithRegistrar, CreateDomainRequest, UpdateDomainRequest},
    notification::Notification,
    registrar::{Registrar, CreateRegistrarRequest, UpdateRegistrarRequest},
    ssl_certificate::{SslCertificate, CreateSslCertificateRequest, UpdateSslCertificateRequest},
};
use crate::services::milestones::MilestoneCalculator;
use crate::services::store::{ItemStore, LedgerWrite, NotificationLedger, StoreError};

const REGISTRARS: &str = "registrars";
const DOMAINS: &str = "domains";
const SSL_CERTIFICATES: &str = "ssl_certificates";
const NOTIFICATIONS: &str = "notifications";
const NOTIFICATION_KEYS: &str = "notification_keys";

#[derive(Clone)]
pub struct DatabaseService {
    db: Surreal<Any>,
    calculator: MilestoneCalculator,
}

impl DatabaseService {
    pub async fn new(config: &DatabaseConfig, calculator: MilestoneCalculator) -> Result<Self> {
        let db = any::connect(config.url.as_str()).await?;
        db.use_ns(config.namespace.as_str()).use_db(config.database.as_str()).await?;

        let service = Self { db, calculator };
        service.initialize_schema().await?;

        Ok(service)
    }

    /// Throwaway in-memory database.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let config = DatabaseConfig {
            url: "mem://".to_string(),
            namespace: "expiry_tracker".to_string(),
            database: "test".to_string(),
        };
        Self::new(&config, MilestoneCalculator::default()).await
    }

    async fn initialize_schema(&self) -> Result<()> {
        self.db.query("
            DEFINE TABLE registrars SCHEMALESS;
            DEFINE TABLE domains SCHEMALESS;
            DEFINE INDEX domain_completed ON domains COLUMNS is_completed;
            DEFINE TABLE ssl_certificates SCHEMALESS;
            DEFINE INDEX ssl_completed ON ssl_certificates COLUMNS is_completed;
            DEFINE TABLE notifications SCHEMALESS;
            DEFINE INDEX notification_unread ON notifications COLUMNS is_read;
            DEFINE TABLE notification_keys SCHEMALESS;
        ").await?.check()?;

        log::info!("Database schema initialized successfully");
        Ok(())
    }

    // Generic record helpers. Record ids are the model's UUID; the stored
    // content carries no `id` field and reads alias `meta::id(id)` back to it.

    async fn insert<T: Serialize>(&self, table: &str, id: Uuid, record: &T) -> Result<()> {
        self.db
            .query("CREATE type::thing($table, $id) CONTENT $content")
            .bind(("table", table))
            .bind(("id", id.to_string()))
            .bind(("content", content_of(record)?))
            .await?
            .check()?;
        Ok(())
    }

    async fn replace<T: Serialize>(&self, table: &str, id: Uuid, record: &T) -> Result<()> {
        self.db
            .query("UPDATE type::thing($table, $id) CONTENT $content")
            .bind(("table", table))
            .bind(("id", id.to_string()))
            .bind(("content", content_of(record)?))
            .await?
            .check()?;
        Ok(())
    }

    async fn fetch<T: DeserializeOwned>(&self, table: &str, id: Uuid) -> Result<Option<T>> {
        let record: Option<T> = self.db
            .query("SELECT *, meta::id(id) AS id FROM type::thing($table, $id)")
            .bind(("table", table))
            .bind(("id", id.to_string()))
            .await?
            .take(0)?;
        Ok(record)
    }

    async fn fetch_all<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>> {
        let records: Vec<T> = self.db
            .query("SELECT *, meta::id(id) AS id FROM type::table($table)")
            .bind(("table", table))
            .await?
            .take(0)?;
        Ok(records)
    }

    async fn fetch_where_active<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>> {
        let records: Vec<T> = self.db
            .query("SELECT *, meta::id(id) AS id FROM type::table($table) WHERE is_completed = false")
            .bind(("table", table))
            .await?
            .take(0)?;
        Ok(records)
    }

    async fn remove(&self, table: &str, id: Uuid) -> Result<bool> {
        if self.fetch::<serde_json::Value>(table, id).await?.is_none() {
            return Ok(false);
        }

        self.db
            .query("DELETE type::thing($table, $id)")
            .bind(("table", table))
            .bind(("id", id.to_string()))
            .await?
            .check()?;
        Ok(true)
    }

    async fn count(&self, table: &str) -> Result<u64> {
        let result: Vec<serde_json::Value> = self.db
            .query("SELECT count() FROM type::table($table) GROUP ALL")
            .bind(("table", table))
            .await?
            .take(0)?;
        Ok(extract_count(&result))
    }

    // Registrar operations
    pub async fn create_registrar(&self, request: CreateRegistrarRequest) -> Result<Registrar> {
        let registrar = Registrar::new(request);
        self.insert(REGISTRARS, registrar.id, &registrar).await?;
        log::info!("Created registrar {} ({})", registrar.name, registrar.id);
        Ok(registrar)
    }

    pub async fn get_registrar(&self, registrar_id: &Uuid) -> Result<Option<Registrar>> {
        self.fetch(REGISTRARS, *registrar_id).await
    }

    pub async fn get_registrars(&self) -> Result<Vec<Registrar>> {
        let mut registrars: Vec<Registrar> = self.fetch_all(REGISTRARS).await?;
        registrars.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(registrars)
    }

    pub async fn update_registrar(&self, registrar_id: &Uuid, request: UpdateRegistrarRequest) -> Result<Option<Registrar>> {
        let Some(mut registrar) = self.get_registrar(registrar_id).await? else {
            return Ok(None);
        };
        registrar.update(request);
        self.replace(REGISTRARS, registrar.id, &registrar).await?;
        Ok(Some(registrar))
    }

    /// Refuses while any domain still points at the registrar.
    pub async fn delete_registrar(&self, registrar_id: &Uuid) -> Result<RegistrarRemoval> {
        if self.get_registrar(registrar_id).await?.is_none() {
            return Ok(RegistrarRemoval::NotFound);
        }

        let domains = self.count_domains_for_registrar(registrar_id).await?;
        if domains > 0 {
            log::warn!("Registrar {} still has {} domains, not deleting", registrar_id, domains);
            return Ok(RegistrarRemoval::InUse(domains));
        }

        if self.remove(REGISTRARS, *registrar_id).await? {
            Ok(RegistrarRemoval::Deleted)
        } else {
            Ok(RegistrarRemoval::NotFound)
        }
    }

    async fn count_domains_for_registrar(&self, registrar_id: &Uuid) -> Result<usize> {
        let domains: Vec<Domain> = self.fetch_all(DOMAINS).await?;
        Ok(domains.iter().filter(|d| d.registrar_id == *registrar_id).count())
    }

    // Domain operations
    pub async fn create_domain(&self, request: CreateDomainRequest) -> Result<Domain> {
        if self.get_registrar(&request.registrar_id).await?.is_none() {
            return Err(anyhow!("Registrar {} not found", request.registrar_id));
        }

        let domain = Domain::new(request, &self.calculator);
        self.insert(DOMAINS, domain.id, &domain).await?;
        log::info!("Created domain {} expiring {}", domain.name, domain.expiry_date);
        Ok(domain)
    }

    pub async fn get_domain(&self, domain_id: &Uuid) -> Result<Option<DomainWithRegistrar>> {
        let Some(domain) = self.fetch::<Domain>(DOMAINS, *domain_id).await? else {
            return Ok(None);
        };
        let registrar = self.get_registrar(&domain.registrar_id).await?;
        Ok(Some(DomainWithRegistrar { domain, registrar }))
    }

    /// All domains, newest first, joined with their registrar.
    pub async fn get_domains(&self) -> Result<Vec<DomainWithRegistrar>> {
        let mut domains: Vec<Domain> = self.fetch_all(DOMAINS).await?;
        domains.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.join_registrars(domains).await
    }

    pub async fn update_domain(&self, domain_id: &Uuid, request: UpdateDomainRequest) -> Result<Option<Domain>> {
        let Some(mut domain) = self.fetch::<Domain>(DOMAINS, *domain_id).await? else {
            return Ok(None);
        };
        if let Some(registrar_id) = request.registrar_id {
            if self.get_registrar(&registrar_id).await?.is_none() {
                return Err(anyhow!("Registrar {} not found", registrar_id));
            }
        }
        domain.update(request, &self.calculator);
        self.replace(DOMAINS, domain.id, &domain).await?;
        Ok(Some(domain))
    }

    pub async fn delete_domain(&self, domain_id: &Uuid) -> Result<bool> {
        self.remove(DOMAINS, *domain_id).await
    }

    pub async fn mark_domain_completed(&self, domain_id: &Uuid) -> Result<Option<Domain>> {
        let Some(mut domain) = self.fetch::<Domain>(DOMAINS, *domain_id).await? else {
            return Ok(None);
        };
        domain.mark_completed();
        self.replace(DOMAINS, domain.id, &domain).await?;
        log::info!("Domain {} marked completed", domain.name);
        Ok(Some(domain))
    }

    pub async fn get_active_domains(&self) -> Result<Vec<Domain>> {
        self.fetch_where_active(DOMAINS).await
    }

    /// Open domains expiring within `[start, end]`, soonest first.
    pub async fn get_domains_expiring_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<DomainWithRegistrar>> {
        let mut domains: Vec<Domain> = self
            .get_active_domains()
            .await?
            .into_iter()
            .filter(|d| d.expiry_date >= start && d.expiry_date <= end)
            .collect();
        domains.sort_by_key(|d| d.expiry_date);
        self.join_registrars(domains).await
    }

    async fn join_registrars(&self, domains: Vec<Domain>) -> Result<Vec<DomainWithRegistrar>> {
        let registrars = self.get_registrars().await?;
        Ok(domains
            .into_iter()
            .map(|domain| {
                let registrar = registrars.iter().find(|r| r.id == domain.registrar_id).cloned();
                DomainWithRegistrar { domain, registrar }
            })
            .collect())
    }

    // SSL certificate operations
    pub async fn create_ssl_certificate(&self, request: CreateSslCertificateRequest) -> Result<SslCertificate> {
        let cert = SslCertificate::new(request, &self.calculator);
        self.insert(SSL_CERTIFICATES, cert.id, &cert).await?;
        log::info!("Created SSL certificate {} expiring {}", cert.domain, cert.expiry_date);
        Ok(cert)
    }

    pub async fn get_ssl_certificate(&self, cert_id: &Uuid) -> Result<Option<SslCertificate>> {
        self.fetch(SSL_CERTIFICATES, *cert_id).await
    }

    pub async fn get_ssl_certificates(&self) -> Result<Vec<SslCertificate>> {
        let mut certs: Vec<SslCertificate> = self.fetch_all(SSL_CERTIFICATES).await?;
        certs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(certs)
    }

    pub async fn update_ssl_certificate(&self, cert_id: &Uuid, request: UpdateSslCertificateRequest) -> Result<Option<SslCertificate>> {
        let Some(mut cert) = self.get_ssl_certificate(cert_id).await? else {
            return Ok(None);
        };
        cert.update(request, &self.calculator);
        self.replace(SSL_CERTIFICATES, cert.id, &cert).await?;
        Ok(Some(cert))
    }

    pub async fn delete_ssl_certificate(&self, cert_id: &Uuid) -> Result<bool> {
        self.remove(SSL_CERTIFICATES, *cert_id).await
    }

    pub async fn mark_ssl_certificate_completed(&self, cert_id: &Uuid) -> Result<Option<SslCertificate>> {
        let Some(mut cert) = self.get_ssl_certificate(cert_id).await? else {
            return Ok(None);
        };
        cert.mark_completed();
        self.replace(SSL_CERTIFICATES, cert.id, &cert).await?;
        log::info!("SSL certificate {} marked completed", cert.domain);
        Ok(Some(cert))
    }

    pub async fn get_active_ssl_certificates(&self) -> Result<Vec<SslCertificate>> {
        self.fetch_where_active(SSL_CERTIFICATES).await
    }

    pub async fn get_ssl_certificates_expiring_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<SslCertificate>> {
        let mut certs: Vec<SslCertificate> = self
            .get_active_ssl_certificates()
            .await?
            .into_iter()
            .filter(|c| c.expiry_date >= start && c.expiry_date <= end)
            .collect();
        certs.sort_by_key(|c| c.expiry_date);
        Ok(certs)
    }

    // Notification operations
    pub async fn get_notifications(&self) -> Result<Vec<Notification>> {
        let mut notifications: Vec<Notification> = self.fetch_all(NOTIFICATIONS).await?;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    pub async fn get_unread_notifications(&self) -> Result<Vec<Notification>> {
        let mut notifications: Vec<Notification> = self.db
            .query("SELECT *, meta::id(id) AS id FROM notifications WHERE is_read = false")
            .await?
            .take(0)?;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    pub async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        self.insert(NOTIFICATIONS, notification.id, notification).await?;
        log::info!(
            "Recorded {} notification for {} {}",
            notification.notification_type, notification.kind, notification.item_name
        );
        Ok(())
    }

    async fn has_notification_key(&self, key: &str) -> Result<bool> {
        let existing: Vec<serde_json::Value> = self.db
            .query("SELECT notification_id FROM type::thing($table, $key)")
            .bind(("table", NOTIFICATION_KEYS))
            .bind(("key", key))
            .await?
            .take(0)?;
        Ok(!existing.is_empty())
    }

    /// Writes the key and the notification in one transaction; an existing key
    /// aborts it.
    pub async fn insert_notification_once(&self, notification: &Notification) -> Result<bool> {
        let key = notification
            .dedup_key
            .clone()
            .ok_or_else(|| anyhow!("Notification {} has no dedup key", notification.id))?;

        if self.has_notification_key(&key).await? {
            return Ok(false);
        }

        let result = self.db
            .query("
                BEGIN TRANSACTION;
                CREATE type::thing($keys, $key) SET notification_id = $id, created_at = $created_at;
                CREATE type::thing($table, $id) CONTENT $content;
                COMMIT TRANSACTION;
            ")
            .bind(("keys", NOTIFICATION_KEYS))
            .bind(("key", key.as_str()))
            .bind(("table", NOTIFICATIONS))
            .bind(("id", notification.id.to_string()))
            .bind(("created_at", notification.created_at.to_rfc3339()))
            .bind(("content", content_of(notification)?))
            .await
            .map_err(anyhow::Error::from)
            .and_then(|response| response.check().map_err(anyhow::Error::from));

        match result {
            Ok(_) => {
                log::info!("Recorded {} notification for {}", notification.notification_type, notification.item_name);
                Ok(true)
            }
            // Lost a race with another writer for the same key.
            Err(_) if self.has_notification_key(&key).await? => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn mark_notification_read(&self, notification_id: &Uuid) -> Result<bool> {
        // UPDATE on a missing record id would create it
        if self.fetch::<serde_json::Value>(NOTIFICATIONS, *notification_id).await?.is_none() {
            return Ok(false);
        }

        self.db
            .query("UPDATE type::thing($table, $id) SET is_read = true")
            .bind(("table", NOTIFICATIONS))
            .bind(("id", notification_id.to_string()))
            .await?
            .check()?;
        Ok(true)
    }

    /// Removes the record only; its dedup key stays so the milestone is not
    /// fired again for the same expiry.
    pub async fn delete_notification(&self, notification_id: &Uuid) -> Result<bool> {
        self.remove(NOTIFICATIONS, *notification_id).await
    }

    // Utility methods
    pub async fn health_check(&self) -> Result<()> {
        self.db.health().await?;
        Ok(())
    }

    pub async fn get_dashboard_stats(&self) -> Result<DashboardStats> {
        let soon = Utc::now() + Duration::days(30);
        let expiring_domains = self
            .get_active_domains()
            .await?
            .iter()
            .filter(|d| d.expiry_date <= soon)
            .count() as u64;
        let expiring_certs = self
            .get_active_ssl_certificates()
            .await?
            .iter()
            .filter(|c| c.expiry_date <= soon)
            .count() as u64;
        let unread = self.get_unread_notifications().await?.len() as u64;

        Ok(DashboardStats {
            total_domains: self.count(DOMAINS).await?,
            total_ssl_certificates: self.count(SSL_CERTIFICATES).await?,
            total_registrars: self.count(REGISTRARS).await?,
            expiring_soon: expiring_domains + expiring_certs,
            unread_notifications: unread,
        })
    }
}

#[async_trait]
impl ItemStore for DatabaseService {
    async fn list_active_domains(&self) -> Result<Vec<Domain>, StoreError> {
        Ok(self.get_active_domains().await?)
    }

    async fn list_active_ssl_certificates(&self) -> Result<Vec<SslCertificate>, StoreError> {
        Ok(self.get_active_ssl_certificates().await?)
    }
}

#[async_trait]
impl NotificationLedger for DatabaseService {
    async fn create_notification(&self, notification: Notification) -> Result<Notification, StoreError> {
        self.insert_notification(&notification).await?;
        Ok(notification)
    }

    async fn create_notification_once(&self, notification: Notification) -> Result<LedgerWrite, StoreError> {
        if self.insert_notification_once(&notification).await? {
            Ok(LedgerWrite::Created(notification))
        } else {
            Ok(LedgerWrite::AlreadyRecorded)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrarRemoval {
    Deleted,
    NotFound,
    /// Number of domains still assigned to the registrar.
    InUse(usize),
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_domains: u64,
    pub total_ssl_certificates: u64,
    pub total_registrars: u64,
    pub expiring_soon: u64,
    pub unread_notifications: u64,
}

fn content_of<T: Serialize>(record: &T) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(record)?;
    if let Some(object) = value.as_object_mut() {
        object.remove("id");
    }
    Ok(value)
}

fn extract_count(result: &[serde_json::Value]) -> u64 {
    result.first()
        .and_then(|v| v.get("count"))
        .and_then(|v| v.as_u64())
        .unwrap_or(0)
}
