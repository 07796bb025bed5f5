use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Application, ApplicationStatus};
use crate::error::{AppError, AppResult};

const APPLICATION_COLUMNS: &str =
    "id, job_id, applicant_id, cover_letter, resume_url, status, created_at, updated_at";

/// A second application to the same job becomes `Conflict("application")`.
pub async fn insert(
    db: &PgPool,
    job_id: Uuid,
    applicant_id: Uuid,
    cover_letter: Option<&str>,
    resume_url: Option<&str>,
) -> AppResult<Application> {
    let sql = format!(
        r#"
        INSERT INTO applications (job_id, applicant_id, cover_letter, resume_url)
        VALUES ($1, $2, $3, $4)
        RETURNING {APPLICATION_COLUMNS}
        "#
    );
    sqlx::query_as::<_, Application>(&sql)
        .bind(job_id)
        .bind(applicant_id)
        .bind(cover_letter)
        .bind(resume_url)
        .fetch_one(db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("application")
            }
            _ => AppError::Database(e),
        })
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> AppResult<Option<Application>> {
    let sql = format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1");
    let row = sqlx::query_as::<_, Application>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn list_by_applicant(db: &PgPool, applicant_id: Uuid) -> AppResult<Vec<Application>> {
    let sql = format!(
        "SELECT {APPLICATION_COLUMNS} FROM applications \
         WHERE applicant_id = $1 ORDER BY created_at DESC"
    );
    let rows = sqlx::query_as::<_, Application>(&sql)
        .bind(applicant_id)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn list_by_job(db: &PgPool, job_id: Uuid) -> AppResult<Vec<Application>> {
    let sql = format!(
        "SELECT {APPLICATION_COLUMNS} FROM applications WHERE job_id = $1 ORDER BY created_at ASC"
    );
    let rows = sqlx::query_as::<_, Application>(&sql)
        .bind(job_id)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn set_status(
    db: &PgPool,
    id: Uuid,
    status: ApplicationStatus,
) -> AppResult<Option<Application>> {
    let sql = format!(
        r#"
        UPDATE applications
           SET status = $2, updated_at = now()
         WHERE id = $1
        RETURNING {APPLICATION_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, Application>(&sql)
        .bind(id)
        .bind(status)
        .fetch_optional(db)
        .await?;
    Ok(row)
}
