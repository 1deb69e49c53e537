//! Client-side checks for the login and signup forms.
//!
//! A form that fails validation never reaches the network; the error names
//! the field so the view can show it inline.

use thiserror::Error;

use crate::models::{LoginRequest, RegisterRequest};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Enter a valid email address")]
    InvalidEmail,

    #[error("Passwords do not match")]
    PasswordMismatch,
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<LoginRequest, ValidationError> {
        let email = validate_email(&self.email)?;
        require("Password", &self.password)?;
        Ok(LoginRequest {
            email,
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    pub fn validate(&self) -> Result<RegisterRequest, ValidationError> {
        require("Name", &self.name)?;
        let email = validate_email(&self.email)?;
        require("Password", &self.password)?;
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(RegisterRequest {
            name: self.name.trim().to_string(),
            email,
            password: self.password.clone(),
        })
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}

/// Trim and sanity-check an email address. The server has the final word.
pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim();
    require("Email", email)?;
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
        {
            Ok(email.to_string())
        }
        _ => Err(ValidationError::InvalidEmail),
    }
}
