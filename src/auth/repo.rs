use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};
use crate::error::{AppError, AppResult};

const USER_COLUMNS: &str = "id, name, email, phone_number, role, password_hash, one_time_code, \
     is_email_verified, is_reset_password, is_deleted, created_at, updated_at";

/// Persistence of identity state.
///
/// Uniqueness of `email` and `phone_number` among non-deleted users is
/// enforced by `insert` itself, so no caller needs a preceding lookup.
/// Every mutation is a single conditional write that touches only the
/// fields it owns, so concurrent calls cannot overwrite each other.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: NewUser) -> AppResult<User>;

    /// Includes soft-deleted records.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    async fn find_active_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Replaces the outstanding code of an active user.
    async fn set_code(&self, email: &str, code: i32) -> AppResult<Option<User>>;

    /// Marks the email verified if `code` is outstanding for `email`, consuming it.
    async fn consume_verification_code(&self, email: &str, code: i32)
        -> AppResult<Option<User>>;

    /// Stores `password_hash` if `code` is outstanding for `email`, consuming it.
    async fn consume_reset_code(
        &self,
        email: &str,
        code: i32,
        password_hash: &str,
    ) -> AppResult<Option<User>>;

    /// Sets only the deletion flag. `None` if no such user exists.
    async fn soft_delete(&self, id: Uuid) -> AppResult<Option<User>>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Field guarded by each unique index on `users`.
pub(crate) fn conflict_field(constraint: Option<&str>) -> Option<&'static str> {
    match constraint? {
        "users_email_active_key" => Some("email"),
        "users_phone_number_active_key" => Some("phoneNumber"),
        _ => None,
    }
}

fn map_unique_violation(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            if let Some(field) = conflict_field(db_err.constraint()) {
                return AppError::Conflict(field);
            }
        }
    }
    AppError::Database(err)
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: NewUser) -> AppResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (name, email, phone_number, role, password_hash, one_time_code)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.phone_number)
            .bind(user.role)
            .bind(&user.password_hash)
            .bind(user.one_time_code)
            .fetch_one(&self.db)
            .await
            .map_err(map_unique_violation)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_active_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND NOT is_deleted");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn set_code(&self, email: &str, code: i32) -> AppResult<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
               SET one_time_code = $2, updated_at = now()
             WHERE email = $1 AND NOT is_deleted
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .bind(code)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn consume_verification_code(
        &self,
        email: &str,
        code: i32,
    ) -> AppResult<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
               SET is_email_verified = TRUE,
                   one_time_code = NULL,
                   updated_at = now()
             WHERE email = $1 AND one_time_code = $2 AND NOT is_deleted
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .bind(code)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn consume_reset_code(
        &self,
        email: &str,
        code: i32,
        password_hash: &str,
    ) -> AppResult<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
               SET password_hash = $3,
                   is_reset_password = TRUE,
                   one_time_code = NULL,
                   updated_at = now()
             WHERE email = $1 AND one_time_code = $2 AND NOT is_deleted
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .bind(code)
            .bind(password_hash)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn soft_delete(&self, id: Uuid) -> AppResult<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
               SET is_deleted = TRUE, updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }
}
