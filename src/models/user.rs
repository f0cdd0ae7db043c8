use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Basic email format validation.
///
/// Validates that email has:
/// - Exactly one @ symbol
/// - Non-empty local part (before @)
/// - Non-empty domain part (after @)
/// - At least one dot in the domain
///
/// This is intentionally permissive to avoid rejecting valid but unusual emails.
/// It's not meant to be RFC 5322 compliant - just a basic sanity check.
fn validate_email_format(email: &str) -> Result<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(AppError::BadRequest("Email is required".into()));
    }

    // Check for exactly one @
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(AppError::BadRequest("Please enter a valid email".into()));
    }

    let local_part = parts[0];
    let domain_part = parts[1];

    // Local part cannot be empty
    if local_part.is_empty() {
        return Err(AppError::BadRequest("Please enter a valid email".into()));
    }

    // Domain cannot be empty and must have at least one dot
    if domain_part.is_empty() || !domain_part.contains('.') {
        return Err(AppError::BadRequest("Please enter a valid email".into()));
    }

    // Domain cannot start or end with a dot
    if domain_part.starts_with('.') || domain_part.ends_with('.') {
        return Err(AppError::BadRequest("Please enter a valid email".into()));
    }

    // Local part cannot have spaces
    if local_part.contains(' ') {
        return Err(AppError::BadRequest("Please enter a valid email".into()));
    }

    Ok(())
}

/// Checkout phone numbers are 10-digit Indian mobiles (leading 6-9).
fn validate_phone_format(phone: &str) -> Result<()> {
    let phone = phone.trim();

    if phone.len() != 10
        || !phone.starts_with(['6', '7', '8', '9'])
        || !phone.chars().all(|c| c.is_ascii_digit())
    {
        return Err(AppError::BadRequest(
            "Enter a valid 10-digit mobile number".into(),
        ));
    }

    Ok(())
}

/// Buyer identity - created on first order attempt, never deleted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub phone: String,
    pub name: String,
    pub created_at: i64,
    /// Whether the fulfillment email with the PDF attached has reached this user
    pub pdf_delivered: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl CreateUser {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("Name is required".into()));
        }
        validate_email_format(&self.email)?;
        validate_phone_format(&self.phone)?;
        Ok(())
    }
}
