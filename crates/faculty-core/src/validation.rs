//! Input validation for login and admin requests

use once_cell::sync::Lazy;
use regex::Regex;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::types::{CreateUserRequest, UpdateUserRequest};
use crate::Error;

static USERNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9_.-]{3,50}$").expect("username pattern is valid")
});
static PHONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9 ]{8,20}$").expect("phone pattern is valid"));

/// Validated create user request
#[derive(Debug, Validate)]
pub struct ValidatedCreateUserRequest {
    #[validate(length(min = 3, max = 50), custom(function = "validate_username_format"))]
    pub username: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    #[validate(email, length(max = 100))]
    pub email: String,

    #[validate(custom(function = "validate_phone_format"))]
    pub phone: Option<String>,

    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
}

impl From<&CreateUserRequest> for ValidatedCreateUserRequest {
    fn from(request: &CreateUserRequest) -> Self {
        Self {
            username: request.username.clone(),
            password: request.password.clone(),
            email: request.email.clone(),
            phone: request.phone.clone(),
            full_name: request.full_name.trim().to_string(),
        }
    }
}

/// Validated update user request; absent fields are not checked
#[derive(Debug, Validate)]
pub struct ValidatedUpdateUserRequest {
    #[validate(email, length(max = 100))]
    pub email: Option<String>,

    #[validate(custom(function = "validate_phone_format"))]
    pub phone: Option<String>,

    #[validate(length(min = 1, max = 200))]
    pub full_name: Option<String>,

    #[validate(length(max = 500))]
    pub avatar_url: Option<String>,
}

impl From<&UpdateUserRequest> for ValidatedUpdateUserRequest {
    fn from(request: &UpdateUserRequest) -> Self {
        Self {
            email: request.email.clone(),
            phone: request.phone.clone(),
            full_name: request.full_name.as_deref().map(|name| name.trim().to_string()),
            avatar_url: request.avatar_url.clone(),
        }
    }
}

fn validate_username_format(username: &str) -> Result<(), ValidationError> {
    if USERNAME_REGEX.is_match(username) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_username_format"))
    }
}

fn validate_phone_format(phone: &str) -> Result<(), ValidationError> {
    if PHONE_REGEX.is_match(phone) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_phone_format"))
    }
}

/// Validate an admin create-user request
pub fn validate_create_user(request: &CreateUserRequest) -> Result<(), Error> {
    ValidatedCreateUserRequest::from(request)
        .validate()
        .map_err(|errors| Error::Validation(describe(&errors)))
}

/// Validate an admin update-user request
pub fn validate_update_user(request: &UpdateUserRequest) -> Result<(), Error> {
    ValidatedUpdateUserRequest::from(request)
        .validate()
        .map_err(|errors| Error::Validation(describe(&errors)))
}

/// Both login fields must be present and non-blank
pub fn validate_login(username: &str, password: &str) -> Result<(), Error> {
    if username.trim().is_empty() {
        return Err(Error::Validation("username must not be blank".to_string()));
    }
    if password.is_empty() {
        return Err(Error::Validation("password must not be blank".to_string()));
    }
    Ok(())
}

fn describe(errors: &ValidationErrors) -> String {
    let mut fields: Vec<String> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let codes: Vec<&str> = errs.iter().map(|e| e.code.as_ref()).collect();
            format!("{}: {}", field, codes.join(", "))
        })
        .collect();
    fields.sort();
    fields.join("; ")
}
