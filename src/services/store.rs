use async_trait::async_trait;
use thiserror::Error;

use crate::models::domain::Domain;
use crate::models::notification::Notification;
use crate::models::ssl_certificate::SslCertificate;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] anyhow::Error),
}

/// Read side of the item store used by the expiry scan.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Domains that have not been marked completed.
    async fn list_active_domains(&self) -> Result<Vec<Domain>, StoreError>;

    /// Certificates that have not been marked completed.
    async fn list_active_ssl_certificates(&self) -> Result<Vec<SslCertificate>, StoreError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerWrite {
    Created(Notification),
    /// A record with the same dedup key already exists.
    AlreadyRecorded,
}

#[async_trait]
pub trait NotificationLedger: Send + Sync {
    /// Unconditional insert.
    async fn create_notification(&self, notification: Notification) -> Result<Notification, StoreError>;

    /// Insert unless a record with the notification's dedup key exists.
    async fn create_notification_once(&self, notification: Notification) -> Result<LedgerWrite, StoreError>;
}
