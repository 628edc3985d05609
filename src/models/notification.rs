use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::models::common::ItemKind;
use crate::models::milestone::Milestone;

/// One fired milestone. Only `is_read` changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub item_id: Uuid,
    pub item_name: String,
    pub notification_type: Milestone,
    pub expiry_date: DateTime<Utc>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    /// Set when the record was written through the idempotent path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedup_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateNotificationRequest {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub item_id: Uuid,
    #[validate(length(min = 1, message = "Item name is required"))]
    pub item_name: String,
    pub notification_type: Milestone,
    pub expiry_date: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
}

impl Notification {
    pub fn new(request: CreateNotificationRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: request.kind,
            item_id: request.item_id,
            item_name: request.item_name,
            notification_type: request.notification_type,
            expiry_date: request.expiry_date,
            is_read: request.is_read,
            created_at: Utc::now(),
            dedup_key: None,
        }
    }

    pub fn with_dedup_key(mut self) -> Self {
        self.dedup_key = Some(dedup_key(self.item_id, self.notification_type, self.expiry_date));
        self
    }
}

/// Identity of a milestone for one expiry cycle of one item. A renewed item
/// gets a new expiry date and therefore fresh keys.
pub fn dedup_key(item_id: Uuid, milestone: Milestone, expiry_date: DateTime<Utc>) -> String {
    format!(
        "{}:{}:{}",
        item_id,
        milestone.label(),
        expiry_date.date_naive().format("%Y-%m-%d")
    )
}
