use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::models::common::ItemKind;
use crate::models::tracked_item::{Trackable, TrackedItem};
use crate::services::milestones::MilestoneCalculator;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SslCertificate {
    pub id: Uuid,
    pub domain: String,
    pub issuer: String,
    pub expiry_date: DateTime<Utc>,
    pub renewal_period_years: u32,
    pub auto_renewal: bool,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub next_notification_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSslCertificateRequest {
    #[validate(length(min = 1, max = 253, message = "Certificate domain is required"))]
    pub domain: String,
    #[validate(length(min = 1, max = 200, message = "Issuer is required"))]
    pub issuer: String,
    pub expiry_date: DateTime<Utc>,
    #[validate(range(min = 1, max = 10, message = "Renewal period must be 1-10 years"))]
    pub renewal_period_years: Option<u32>,
    pub auto_renewal: Option<bool>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateSslCertificateRequest {
    #[validate(length(min = 1, max = 253, message = "Certificate domain cannot be empty"))]
    pub domain: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Issuer cannot be empty"))]
    pub issuer: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 10, message = "Renewal period must be 1-10 years"))]
    pub renewal_period_years: Option<u32>,
    pub auto_renewal: Option<bool>,
    pub notes: Option<String>,
}

impl SslCertificate {
    pub fn new(request: CreateSslCertificateRequest, calculator: &MilestoneCalculator) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            domain: request.domain.trim().to_string(),
            issuer: request.issuer.trim().to_string(),
            expiry_date: request.expiry_date,
            renewal_period_years: request.renewal_period_years.unwrap_or(1),
            auto_renewal: request.auto_renewal.unwrap_or(false),
            is_completed: false,
            completed_at: None,
            next_notification_date: calculator.next_notification_date(request.expiry_date, now),
            notes: request.notes,
            created_at: now,
        }
    }

    pub fn update(&mut self, request: UpdateSslCertificateRequest, calculator: &MilestoneCalculator) {
        if let Some(domain) = request.domain {
            self.domain = domain.trim().to_string();
        }
        if let Some(issuer) = request.issuer {
            self.issuer = issuer.trim().to_string();
        }
        if let Some(expiry_date) = request.expiry_date {
            self.expiry_date = expiry_date;
        }
        if let Some(years) = request.renewal_period_years {
            self.renewal_period_years = years;
        }
        if let Some(auto_renewal) = request.auto_renewal {
            self.auto_renewal = auto_renewal;
        }
        if request.notes.is_some() {
            self.notes = request.notes;
        }
        if !self.is_completed {
            self.next_notification_date =
                calculator.next_notification_date(self.expiry_date, Utc::now());
        }
    }

    pub fn mark_completed(&mut self) {
        self.is_completed = true;
        self.completed_at = Some(Utc::now());
        self.next_notification_date = None;
    }
}

impl Trackable for SslCertificate {
    fn tracked(&self) -> TrackedItem {
        TrackedItem {
            kind: ItemKind::Ssl,
            id: self.id,
            name: self.domain.clone(),
            expiry_date: self.expiry_date,
            is_completed: self.is_completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_certificate_named_by_domain() {
        let calculator = MilestoneCalculator::default();
        let cert = SslCertificate::new(
            CreateSslCertificateRequest {
                domain: "API.example.com".to_string(),
                issuer: "Let's Encrypt".to_string(),
                expiry_date: Utc::now() + Duration::days(60),
                renewal_period_years: None,
                auto_renewal: Some(true),
                notes: None,
            },
            &calculator,
        );

        let tracked = cert.tracked();
        assert_eq!(tracked.kind, ItemKind::Ssl);
        assert_eq!(tracked.name, "API.example.com");
        assert!(cert.auto_renewal);
    }

    #[test]
    fn test_update_expiry_refreshes_next_notification() {
        let calculator = MilestoneCalculator::default();
        let mut cert = SslCertificate::new(
            CreateSslCertificateRequest {
                domain: "example.com".to_string(),
                issuer: "DigiCert".to_string(),
                expiry_date: Utc::now() + Duration::days(3),
                renewal_period_years: None,
                auto_renewal: None,
                notes: None,
            },
            &calculator,
        );
        let before = cert.next_notification_date;

        cert.update(
            UpdateSslCertificateRequest {
                expiry_date: Some(Utc::now() + Duration::days(400)),
                ..Default::default()
            },
            &calculator,
        );

        assert_ne!(cert.next_notification_date, before);
        assert!(cert.next_notification_date.unwrap() > Utc::now());
    }
}
