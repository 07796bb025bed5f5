use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
    Seeker,
    Recruiter,
}

/// User record in the credential store.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,           // trimmed, lower-cased
    pub phone_number: String,
    pub role: UserRole,
    #[serde(skip_serializing)]
    pub password_hash: String,   // Argon2 PHC string
    #[serde(skip_serializing)]
    pub one_time_code: Option<i32>,
    pub is_email_verified: bool,
    pub is_reset_password: bool,
    pub is_deleted: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Fields supplied at registration; everything else takes its initial value.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub role: UserRole,
    pub password_hash: String,
    pub one_time_code: i32,
}
