use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::ScanConfig;
use crate::models::milestone::Milestone;
use crate::models::notification::{CreateNotificationRequest, Notification};
use crate::models::tracked_item::{Trackable, TrackedItem};
use crate::services::dispatcher::{DispatchError, Dispatcher};
use crate::services::milestones::MilestoneCalculator;
use crate::services::store::{ItemStore, LedgerWrite, NotificationLedger, StoreError};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("an expiry scan is already running")]
    AlreadyRunning,

    #[error("expiry scan timed out after {0:?}")]
    TimedOut(Duration),

    /// Listing the tracked items failed; nothing was scanned.
    #[error("failed to load tracked items: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ScanReport {
    pub started_at: Option<DateTime<Utc>>,
    pub items_scanned: usize,
    pub notifications_created: usize,
    pub duplicates_skipped: usize,
    pub dispatch_failures: usize,
    pub item_failures: usize,
}

#[derive(Debug, Default)]
struct ItemOutcome {
    created: usize,
    duplicates: usize,
    dispatch_failures: usize,
    failed: bool,
}

/// Walks every open item once, records each due milestone in the ledger and
/// then sends the reminder.
pub struct ExpiryScanner {
    items: Arc<dyn ItemStore>,
    ledger: Arc<dyn NotificationLedger>,
    dispatcher: Arc<dyn Dispatcher>,
    calculator: MilestoneCalculator,
    config: ScanConfig,
    running: Mutex<()>,
}

impl ExpiryScanner {
    pub fn new(
        items: Arc<dyn ItemStore>,
        ledger: Arc<dyn NotificationLedger>,
        dispatcher: Arc<dyn Dispatcher>,
        calculator: MilestoneCalculator,
        config: ScanConfig,
    ) -> Self {
        Self {
            items,
            ledger,
            dispatcher,
            calculator,
            config,
            running: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub async fn run_scan(&self, now: DateTime<Utc>) -> Result<ScanReport, ScanError> {
        let _guard = self.running.try_lock().map_err(|_| ScanError::AlreadyRunning)?;

        log::info!("Starting expiry scan at {}", now);

        if self.config.timeout_secs == 0 {
            return self.scan(now).await;
        }

        let limit = Duration::from_secs(self.config.timeout_secs);
        tokio::time::timeout(limit, self.scan(now))
            .await
            .map_err(|_| {
                log::error!("Expiry scan exceeded {:?}, abandoning remaining items", limit);
                ScanError::TimedOut(limit)
            })?
    }

    async fn scan(&self, now: DateTime<Utc>) -> Result<ScanReport, ScanError> {
        let items = self.load_items().await?;

        let mut report = ScanReport {
            started_at: Some(now),
            items_scanned: items.len(),
            ..ScanReport::default()
        };

        let outcomes: Vec<ItemOutcome> = stream::iter(items)
            .map(|item| self.scan_item(item, now))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            report.notifications_created += outcome.created;
            report.duplicates_skipped += outcome.duplicates;
            report.dispatch_failures += outcome.dispatch_failures;
            if outcome.failed {
                report.item_failures += 1;
            }
        }

        log::info!(
            "Expiry scan finished: {} items, {} notifications, {} duplicates skipped, {} dispatch failures, {} item failures",
            report.items_scanned,
            report.notifications_created,
            report.duplicates_skipped,
            report.dispatch_failures,
            report.item_failures
        );

        Ok(report)
    }

    async fn load_items(&self) -> Result<Vec<TrackedItem>, StoreError> {
        let domains = self.items.list_active_domains().await?;
        let certificates = self.items.list_active_ssl_certificates().await?;

        let items = domains
            .iter()
            .map(|domain| domain.tracked())
            .chain(certificates.iter().map(|cert| cert.tracked()))
            .filter(|item| {
                if item.is_completed {
                    log::debug!("Skipping completed {} {}", item.kind, item.name);
                    return false;
                }
                true
            })
            .collect();

        Ok(items)
    }

    async fn scan_item(&self, item: TrackedItem, now: DateTime<Utc>) -> ItemOutcome {
        let mut outcome = ItemOutcome::default();
        let due = self.calculator.due_milestones(item.expiry_date, now);

        if due.is_empty() {
            log::debug!("No reminders due for {} {}", item.kind, item.name);
            return outcome;
        }

        for milestone in due {
            let notification = self.notification_for(&item, milestone);

            let created = match self.record(notification).await {
                Ok(LedgerWrite::Created(notification)) => notification,
                Ok(LedgerWrite::AlreadyRecorded) => {
                    log::info!("{} reminder for {} {} already recorded", milestone, item.kind, item.name);
                    outcome.duplicates += 1;
                    continue;
                }
                Err(e) => {
                    log::error!("Failed to record {} reminder for {} {}: {}", milestone, item.kind, item.name, e);
                    outcome.failed = true;
                    continue;
                }
            };
            outcome.created += 1;

            let message = reminder_message(&item, now);
            match self.dispatcher.send(&message).await {
                Ok(()) => {}
                Err(DispatchError::Configuration(reason)) => {
                    log::warn!(
                        "Reminder {} saved but not sent over {}: {}",
                        created.id,
                        self.dispatcher.channel_name(),
                        reason
                    );
                    outcome.dispatch_failures += 1;
                }
                Err(e) => {
                    log::warn!("Reminder {} saved but delivery failed: {}", created.id, e);
                    outcome.dispatch_failures += 1;
                }
            }
        }

        outcome
    }

    fn notification_for(&self, item: &TrackedItem, milestone: Milestone) -> Notification {
        let notification = Notification::new(CreateNotificationRequest {
            kind: item.kind,
            item_id: item.id,
            item_name: item.name.clone(),
            notification_type: milestone,
            expiry_date: item.expiry_date,
            is_read: false,
        });

        if self.config.dedup {
            notification.with_dedup_key()
        } else {
            notification
        }
    }

    async fn record(&self, notification: Notification) -> Result<LedgerWrite, StoreError> {
        let attempts = self.config.ledger_write_attempts.max(1);
        let mut attempt = 1;

        loop {
            let result = if self.config.dedup {
                self.ledger.create_notification_once(notification.clone()).await
            } else {
                self.ledger
                    .create_notification(notification.clone())
                    .await
                    .map(LedgerWrite::Created)
            };

            match result {
                Ok(write) => return Ok(write),
                Err(e) if attempt < attempts => {
                    log::warn!("Ledger write attempt {}/{} failed: {}", attempt, attempts, e);
                    tokio::time::sleep(Duration::from_millis(50 * u64::from(attempt))).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// `Reminder: Domain "example.com" will expire in 30 days.`
pub fn reminder_message(item: &TrackedItem, now: DateTime<Utc>) -> String {
    let days = (item.expiry_date.date_naive() - now.date_naive()).num_days();
    format!(
        "Reminder: {} \"{}\" will expire in {} day{}.",
        item.kind.label(),
        item.name,
        days,
        if days == 1 { "" } else { "s" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use uuid::Uuid;

    use crate::models::common::ItemKind;
    use crate::models::domain::Domain;
    use crate::models::ssl_certificate::SslCertificate;

    // Returns completed items too, so the scanner's own check is what excludes them.
    #[derive(Default)]
    struct MemoryStore {
        domains: Vec<Domain>,
        certificates: Vec<SslCertificate>,
        fail_listing: bool,
        notifications: std::sync::Mutex<Vec<Notification>>,
        failing_items: Vec<Uuid>,
        ledger_calls: AtomicUsize,
    }

    impl MemoryStore {
        fn saved(&self) -> Vec<Notification> {
            self.notifications.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ItemStore for MemoryStore {
        async fn list_active_domains(&self) -> Result<Vec<Domain>, StoreError> {
            if self.fail_listing {
                return Err(StoreError::Database(anyhow::anyhow!("connection refused")));
            }
            Ok(self.domains.clone())
        }

        async fn list_active_ssl_certificates(&self) -> Result<Vec<SslCertificate>, StoreError> {
            Ok(self.certificates.clone())
        }
    }

    #[async_trait]
    impl NotificationLedger for MemoryStore {
        async fn create_notification(&self, notification: Notification) -> Result<Notification, StoreError> {
            self.ledger_calls.fetch_add(1, Ordering::SeqCst);
            if self.failing_items.contains(&notification.item_id) {
                return Err(StoreError::Database(anyhow::anyhow!("write rejected")));
            }
            self.notifications.lock().unwrap().push(notification.clone());
            Ok(notification)
        }

        async fn create_notification_once(&self, notification: Notification) -> Result<LedgerWrite, StoreError> {
            let exists = self
                .notifications
                .lock()
                .unwrap()
                .iter()
                .any(|n| n.dedup_key.is_some() && n.dedup_key == notification.dedup_key);
            if exists {
                return Ok(LedgerWrite::AlreadyRecorded);
            }
            self.create_notification(notification).await.map(LedgerWrite::Created)
        }
    }

    #[derive(Default)]
    struct RecordingDispatcher {
        sent: std::sync::Mutex<Vec<String>>,
        unconfigured: bool,
    }

    #[async_trait]
    impl Dispatcher for RecordingDispatcher {
        async fn send(&self, message: &str) -> Result<(), DispatchError> {
            if self.unconfigured {
                return Err(DispatchError::Configuration("EMAIL is not set".to_string()));
            }
            self.sent.lock().unwrap().push(message.to_string());
            Ok(())
        }

        fn channel_name(&self) -> &str {
            "recording"
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
    }

    fn domain(name: &str, days: i64) -> Domain {
        Domain {
            id: Uuid::new_v4(),
            name: name.to_string(),
            registrar_id: Uuid::new_v4(),
            expiry_date: now() + ChronoDuration::days(days),
            renewal_period_years: 1,
            auto_renewal: false,
            is_completed: false,
            completed_at: None,
            next_notification_date: None,
            notes: None,
            created_at: now(),
        }
    }

    fn certificate(name: &str, days: i64) -> SslCertificate {
        SslCertificate {
            id: Uuid::new_v4(),
            domain: name.to_string(),
            issuer: "Let's Encrypt".to_string(),
            expiry_date: now() + ChronoDuration::days(days),
            renewal_period_years: 1,
            auto_renewal: true,
            is_completed: false,
            completed_at: None,
            next_notification_date: None,
            notes: None,
            created_at: now(),
        }
    }

    fn scanner(store: Arc<MemoryStore>, dispatcher: Arc<RecordingDispatcher>, config: ScanConfig) -> ExpiryScanner {
        ExpiryScanner::new(store.clone(), store, dispatcher, MilestoneCalculator::default(), config)
    }

    #[tokio::test]
    async fn test_scan_records_then_sends() {
        let store = Arc::new(MemoryStore {
            domains: vec![domain("example.com", 30), domain("quiet.com", 29)],
            certificates: vec![certificate("secure.example.com", 1)],
            ..MemoryStore::default()
        });
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let scanner = scanner(store.clone(), dispatcher.clone(), ScanConfig::default());

        let report = scanner.run_scan(now()).await.unwrap();
        assert_eq!(report.items_scanned, 3);
        assert_eq!(report.notifications_created, 2);
        assert_eq!(report.started_at, Some(now()));

        let saved = store.saved();
        assert_eq!(saved.len(), 2);
        assert!(saved.iter().all(|n| !n.is_read));
        assert!(saved.iter().any(|n| n.kind == ItemKind::Ssl && n.notification_type == Milestone::OneDay));

        let mut sent = dispatcher.sent.lock().unwrap().clone();
        sent.sort();
        assert_eq!(
            sent,
            vec![
                "Reminder: Domain \"example.com\" will expire in 30 days.".to_string(),
                "Reminder: SSL certificate \"secure.example.com\" will expire in 1 day.".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_repeated_scan_is_idempotent_with_dedup() {
        let store = Arc::new(MemoryStore {
            domains: vec![domain("example.com", 7)],
            ..MemoryStore::default()
        });
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let scanner = scanner(store.clone(), dispatcher.clone(), ScanConfig::default());

        scanner.run_scan(now()).await.unwrap();
        let second = scanner.run_scan(now() + ChronoDuration::hours(3)).await.unwrap();

        assert_eq!(second.notifications_created, 0);
        assert_eq!(second.duplicates_skipped, 1);
        assert_eq!(store.saved().len(), 1);
        assert_eq!(dispatcher.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_scan_duplicates_without_dedup() {
        let store = Arc::new(MemoryStore {
            domains: vec![domain("example.com", 7)],
            ..MemoryStore::default()
        });
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let config = ScanConfig { dedup: false, ..ScanConfig::default() };
        let scanner = scanner(store.clone(), dispatcher.clone(), config);

        scanner.run_scan(now()).await.unwrap();
        scanner.run_scan(now()).await.unwrap();

        let saved = store.saved();
        assert_eq!(saved.len(), 2);
        assert!(saved.iter().all(|n| n.dedup_key.is_none()));
        assert_eq!(dispatcher.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_completed_item_is_excluded() {
        let mut done = domain("renewed.com", 30);
        done.mark_completed();
        let mut renewed_cert = certificate("renewed.com", 7);
        renewed_cert.mark_completed();
        let store = Arc::new(MemoryStore {
            domains: vec![done],
            certificates: vec![renewed_cert],
            ..MemoryStore::default()
        });
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let scanner = scanner(store.clone(), dispatcher.clone(), ScanConfig::default());

        let report = scanner.run_scan(now()).await.unwrap();
        assert_eq!(report.items_scanned, 0);
        assert!(store.saved().is_empty());
        assert!(dispatcher.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_dispatcher_still_persists() {
        let store = Arc::new(MemoryStore {
            domains: vec![domain("example.com", 180)],
            ..MemoryStore::default()
        });
        let dispatcher = Arc::new(RecordingDispatcher { unconfigured: true, ..RecordingDispatcher::default() });
        let scanner = scanner(store.clone(), dispatcher, ScanConfig::default());

        let report = scanner.run_scan(now()).await.unwrap();
        assert_eq!(report.notifications_created, 1);
        assert_eq!(report.dispatch_failures, 1);
        assert_eq!(store.saved()[0].notification_type, Milestone::SixMonths);
    }

    #[tokio::test]
    async fn test_ledger_failure_is_isolated_per_item() {
        let broken = domain("broken.com", 30);
        let store = Arc::new(MemoryStore {
            failing_items: vec![broken.id],
            domains: vec![broken, domain("fine.com", 30)],
            ..MemoryStore::default()
        });
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let config = ScanConfig { ledger_write_attempts: 2, ..ScanConfig::default() };
        let scanner = scanner(store.clone(), dispatcher.clone(), config);

        let report = scanner.run_scan(now()).await.unwrap();
        assert_eq!(report.item_failures, 1);
        assert_eq!(report.notifications_created, 1);
        assert_eq!(store.saved()[0].item_name, "fine.com");
        // two attempts for the broken item, one for the healthy one
        assert_eq!(store.ledger_calls.load(Ordering::SeqCst), 3);
        assert_eq!(dispatcher.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_listing_failure_aborts_scan() {
        let store = Arc::new(MemoryStore { fail_listing: true, ..MemoryStore::default() });
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let scanner = scanner(store, dispatcher, ScanConfig::default());

        assert!(matches!(scanner.run_scan(now()).await, Err(ScanError::Store(_))));
    }

    #[tokio::test]
    async fn test_concurrent_scan_is_rejected() {
        let store = Arc::new(MemoryStore::default());
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let scanner = scanner(store, dispatcher, ScanConfig::default());

        let _held = scanner.running.lock().await;
        assert!(matches!(scanner.run_scan(now()).await, Err(ScanError::AlreadyRunning)));
    }

    #[tokio::test]
    async fn test_scan_against_database_records_once() {
        use crate::models::registrar::CreateRegistrarRequest;
        use crate::models::domain::CreateDomainRequest;
        use crate::services::database::DatabaseService;

        let db = Arc::new(DatabaseService::in_memory().await.unwrap());
        let registrar = db
            .create_registrar(CreateRegistrarRequest {
                name: "Namecheap".to_string(),
                login_url: None,
                login_username: None,
                two_factor_mobile: None,
                notes: None,
            })
            .await
            .unwrap();
        let domain = db
            .create_domain(CreateDomainRequest {
                name: "example.com".to_string(),
                registrar_id: registrar.id,
                expiry_date: Utc::now() + ChronoDuration::days(30),
                renewal_period_years: None,
                auto_renewal: None,
                notes: None,
            })
            .await
            .unwrap();
        let renewed = db
            .create_domain(CreateDomainRequest {
                name: "renewed.com".to_string(),
                registrar_id: registrar.id,
                expiry_date: Utc::now() + ChronoDuration::days(30),
                renewal_period_years: None,
                auto_renewal: None,
                notes: None,
            })
            .await
            .unwrap();
        db.mark_domain_completed(&renewed.id).await.unwrap();

        let dispatcher = Arc::new(RecordingDispatcher::default());
        let scanner = ExpiryScanner::new(
            db.clone(),
            db.clone(),
            dispatcher.clone(),
            MilestoneCalculator::default(),
            ScanConfig::default(),
        );

        let first = scanner.run_scan(Utc::now()).await.unwrap();
        let second = scanner.run_scan(Utc::now()).await.unwrap();

        assert_eq!(first.items_scanned, 1);
        assert_eq!(first.notifications_created, 1);
        assert_eq!(second.notifications_created, 0);
        assert_eq!(second.duplicates_skipped, 1);

        let saved = db.get_notifications().await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].item_id, domain.id);
        assert_eq!(saved[0].notification_type, Milestone::ThirtyDays);
        assert_eq!(dispatcher.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_reminder_message_format() {
        let item = domain("example.com", 30).tracked();
        assert_eq!(
            reminder_message(&item, now()),
            "Reminder: Domain \"example.com\" will expire in 30 days."
        );
    }
}
