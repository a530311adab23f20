use serde::Serialize;
use chrono::{DateTime, Utc};

use super::user::{normalize_email, validate_email, validate_password, LoginRequest};

/// A CMS operator account.
#[derive(Debug, Clone, Serialize)]
pub struct Admin {
    pub id: i32,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub created_at: DateTime<Utc>,
}

/// `POST /addadmin` takes the same body as a login.
pub type CreateAdminRequest = LoginRequest;

impl CreateAdminRequest {
    pub fn validate_new(&self) -> Result<(), String> {
        validate_email(&self.email)?;
        validate_password(&self.password)
    }

    pub fn normalized_admin_email(&self) -> String {
        normalize_email(&self.email)
    }
}
