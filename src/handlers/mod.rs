pub mod dashboard;
pub mod health;
pub mod items;
pub mod notifications;
pub mod scan;
