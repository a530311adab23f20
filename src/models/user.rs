use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// A mobile app account.
/// The password hash and the last issued token are kept out of JSON.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payload of `POST /register`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Credentials shared by the mobile and CMS login routes.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNameRequest {
    pub name: String,
}

/// Text fields of the CMS `POST /addUser` multipart form.
#[derive(Debug)]
pub struct NewUserForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

pub const MIN_PASSWORD_LEN: usize = 6;

impl RegisterRequest {
    /// Validates name, email format and password length.
    ///
    /// # Returns
    /// * `Result<(), String>` - The first rule that failed, as a 400 message
    pub fn validate(&self) -> Result<(), String> {
        validate_name(&self.name)?;
        validate_email(&self.email)?;
        validate_password(&self.password)
    }

    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err("Email and password are required".to_string());
        }
        Ok(())
    }

    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }
}

impl UpdateNameRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_name(&self.name)
    }

    pub fn normalized_name(&self) -> String {
        self.name.trim().to_string()
    }
}

impl NewUserForm {
    pub fn validate(&self) -> Result<(), String> {
        validate_name(&self.name)?;
        validate_email(&self.email)?;
        validate_password(&self.password)
    }

    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }
}

fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Name cannot be empty".to_string());
    }

    if name.len() > 100 {
        return Err("Name cannot exceed 100 characters".to_string());
    }

    Ok(())
}

pub(crate) fn validate_email(email: &str) -> Result<(), String> {
    if email.trim().is_empty() {
        return Err("Email cannot be empty".to_string());
    }

    if email.len() > 255 {
        return Err("Email cannot exceed 255 characters".to_string());
    }

    if !is_valid_email(email.trim()) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

pub(crate) fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(format!("Password must be at least {} characters", MIN_PASSWORD_LEN));
    }

    // bcrypt only looks at the first 72 bytes
    if password.len() > 72 {
        return Err("Password cannot exceed 72 bytes".to_string());
    }

    Ok(())
}

/// Emails are stored trimmed and lowercased so lookups ignore case.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Minimal shape check: one `@`, non-empty local part, dotted domain.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || local.len() > 64 || domain.contains('@') {
        return false;
    }

    if domain.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return false;
    }

    local.chars().all(|c| c.is_alphanumeric() || ".-_+".contains(c))
        && domain.chars().all(|c| c.is_alphanumeric() || ".-".contains(c))
}
