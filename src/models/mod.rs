pub mod common;
pub mod domain;
pub mod milestone;
pub mod notification;
pub mod registrar;
pub mod ssl_certificate;
pub mod tracked_item;
