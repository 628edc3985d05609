use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::models::common::ItemKind;
use crate::models::registrar::Registrar;
use crate::models::tracked_item::{Trackable, TrackedItem};
use crate::services::milestones::MilestoneCalculator;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Domain {
    pub id: Uuid,
    pub name: String,
    pub registrar_id: Uuid,
    pub expiry_date: DateTime<Utc>,
    pub renewal_period_years: u32,
    pub auto_renewal: bool,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub next_notification_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A domain joined with its registrar, as listed to users.
#[derive(Debug, Clone, Serialize)]
pub struct DomainWithRegistrar {
    #[serde(flatten)]
    pub domain: Domain,
    pub registrar: Option<Registrar>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateDomainRequest {
    #[validate(length(min = 1, max = 253, message = "Domain name is required"))]
    pub name: String,
    pub registrar_id: Uuid,
    pub expiry_date: DateTime<Utc>,
    #[validate(range(min = 1, max = 10, message = "Renewal period must be 1-10 years"))]
    pub renewal_period_years: Option<u32>,
    pub auto_renewal: Option<bool>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateDomainRequest {
    #[validate(length(min = 1, max = 253, message = "Domain name cannot be empty"))]
    pub name: Option<String>,
    pub registrar_id: Option<Uuid>,
    pub expiry_date: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 10, message = "Renewal period must be 1-10 years"))]
    pub renewal_period_years: Option<u32>,
    pub auto_renewal: Option<bool>,
    pub notes: Option<String>,
}

impl Domain {
    pub fn new(request: CreateDomainRequest, calculator: &MilestoneCalculator) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            registrar_id: request.registrar_id,
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

    pub fn update(&mut self, request: UpdateDomainRequest, calculator: &MilestoneCalculator) {
        if let Some(name) = request.name {
            self.name = name.trim().to_string();
        }
        if let Some(registrar_id) = request.registrar_id {
            self.registrar_id = registrar_id;
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

    /// Renewal handled; no more reminders for this record.
    pub fn mark_completed(&mut self) {
        self.is_completed = true;
        self.completed_at = Some(Utc::now());
        self.next_notification_date = None;
    }
}

impl Trackable for Domain {
    fn tracked(&self) -> TrackedItem {
        TrackedItem {
            kind: ItemKind::Domain,
            id: self.id,
            name: self.name.clone(),
            expiry_date: self.expiry_date,
            is_completed: self.is_completed,
        }
    }
}
