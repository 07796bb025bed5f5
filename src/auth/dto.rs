use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::{
    code,
    password::password_policy_violation,
    repo_types::{User, UserRole},
};
use crate::error::AppError;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref PHONE_RE: Regex = Regex::new(r"^\+?[0-9]{10,15}$").unwrap();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_email(email: &str) -> Result<(), AppError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(AppError::Validation("invalid email".into()))
    }
}

fn check_password(password: &str) -> Result<(), AppError> {
    match password_policy_violation(password) {
        None => Ok(()),
        Some(rule) => Err(AppError::Validation(rule.into())),
    }
}

fn check_code(value: i32) -> Result<(), AppError> {
    if code::is_well_formed(value) {
        Ok(())
    } else {
        Err(AppError::Validation("code must be a 6-digit number".into()))
    }
}

/// Request body for user registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone_number: String,
    #[serde(default)]
    pub role: Option<UserRole>,
}

impl RegisterRequest {
    /// Trims and lower-cases in place, then checks every field.
    pub fn normalize_and_validate(&mut self) -> Result<(), AppError> {
        self.name = self.name.trim().to_string();
        self.email = normalize_email(&self.email);
        self.phone_number = self.phone_number.trim().to_string();

        let name_len = self.name.chars().count();
        if !(2..=100).contains(&name_len) {
            return Err(AppError::Validation("name must be 2 to 100 characters".into()));
        }
        check_email(&self.email)?;
        if !PHONE_RE.is_match(&self.phone_number) {
            return Err(AppError::Validation("invalid phone number".into()));
        }
        check_password(&self.password)?;
        if self.role == Some(UserRole::Admin) {
            return Err(AppError::Validation("admin role cannot be self-assigned".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub code: i32,
}

impl VerifyEmailRequest {
    pub fn normalize_and_validate(&mut self) -> Result<(), AppError> {
        self.email = normalize_email(&self.email);
        check_email(&self.email)?;
        check_code(self.code)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn normalize_and_validate(&mut self) -> Result<(), AppError> {
        self.email = normalize_email(&self.email);
        check_email(&self.email)?;
        if self.password.is_empty() {
            return Err(AppError::Validation("password is required".into()));
        }
        Ok(())
    }
}

/// Body for forgot-password and resend-verification.
#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

impl EmailRequest {
    pub fn normalize_and_validate(&mut self) -> Result<(), AppError> {
        self.email = normalize_email(&self.email);
        check_email(&self.email)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: i32,
    pub new_password: String,
}

impl ResetPasswordRequest {
    pub fn normalize_and_validate(&mut self) -> Result<(), AppError> {
        self.email = normalize_email(&self.email);
        check_email(&self.email)?;
        check_code(self.code)?;
        check_password(&self.new_password)
    }
}

/// Body for refresh and logout.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Response returned after login or refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Outward-facing user. Never carries the password hash or one-time code.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub role: UserRole,
    pub is_email_verified: bool,
    pub is_deleted: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            phone_number: u.phone_number,
            role: u.role,
            is_email_verified: u.is_email_verified,
            is_deleted: u.is_deleted,
            created_at: u.created_at,
        }
    }
}
