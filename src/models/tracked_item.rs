use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::common::ItemKind;

/// The slice of a domain or certificate that the expiry scan needs.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrackedItem {
    pub kind: ItemKind,
    pub id: Uuid,
    pub name: String,
    pub expiry_date: DateTime<Utc>,
    pub is_completed: bool,
}

pub trait Trackable {
    fn tracked(&self) -> TrackedItem;
}
