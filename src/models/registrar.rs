use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Registrar {
    pub id: Uuid,
    pub name: String,
    pub login_url: Option<String>,
    pub login_username: Option<String>,
    pub two_factor_mobile: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRegistrarRequest {
    #[validate(length(min = 1, max = 200, message = "Registrar name is required"))]
    pub name: String,
    #[validate(url(message = "Login URL must be a valid URL"))]
    pub login_url: Option<String>,
    pub login_username: Option<String>,
    pub two_factor_mobile: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateRegistrarRequest {
    #[validate(length(min = 1, max = 200, message = "Registrar name cannot be empty"))]
    pub name: Option<String>,
    #[validate(url(message = "Login URL must be a valid URL"))]
    pub login_url: Option<String>,
    pub login_username: Option<String>,
    pub two_factor_mobile: Option<String>,
    pub notes: Option<String>,
}

impl Registrar {
    pub fn new(request: CreateRegistrarRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            login_url: request.login_url,
            login_username: request.login_username,
            two_factor_mobile: request.two_factor_mobile,
            notes: request.notes,
            created_at: Utc::now(),
        }
    }

    pub fn update(&mut self, request: UpdateRegistrarRequest) {
        if let Some(name) = request.name {
            self.name = name.trim().to_string();
        }
        if request.login_url.is_some() {
            self.login_url = request.login_url;
        }
        if request.login_username.is_some() {
            self.login_username = request.login_username;
        }
        if request.two_factor_mobile.is_some() {
            self.two_factor_mobile = request.two_factor_mobile;
        }
        if request.notes.is_some() {
            self.notes = request.notes;
        }
    }
}
