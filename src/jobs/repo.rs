use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Job, JobChanges, NewJob};
use crate::error::AppResult;

const JOB_COLUMNS: &str = "id, recruiter_id, title, company, location, description, \
     employment_type, salary_min, salary_max, is_open, created_at, updated_at";

/// Substring pattern for ILIKE with `\`, `%` and `_` taken literally.
pub(crate) fn contains_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Open postings, newest first. `search` matches title or company.
pub async fn list_open(
    db: &PgPool,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<Job>> {
    let sql = format!(
        r#"
        SELECT {JOB_COLUMNS}
          FROM jobs
         WHERE is_open
           AND ($1::text IS NULL OR title ILIKE $1 ESCAPE '\' OR company ILIKE $1 ESCAPE '\')
         ORDER BY created_at DESC
         LIMIT $2 OFFSET $3
        "#
    );
    let rows = sqlx::query_as::<_, Job>(&sql)
        .bind(search.map(contains_pattern))
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> AppResult<Option<Job>> {
    let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");
    let job = sqlx::query_as::<_, Job>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(job)
}

pub async fn insert(db: &PgPool, recruiter_id: Uuid, job: &NewJob) -> AppResult<Job> {
    let sql = format!(
        r#"
        INSERT INTO jobs (recruiter_id, title, company, location, description,
                          employment_type, salary_min, salary_max)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {JOB_COLUMNS}
        "#
    );
    let job = sqlx::query_as::<_, Job>(&sql)
        .bind(recruiter_id)
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(&job.description)
        .bind(&job.employment_type)
        .bind(job.salary_min)
        .bind(job.salary_max)
        .fetch_one(db)
        .await?;
    Ok(job)
}

pub async fn update(db: &PgPool, id: Uuid, changes: &JobChanges) -> AppResult<Option<Job>> {
    let sql = format!(
        r#"
        UPDATE jobs
           SET title = COALESCE($2, title),
               company = COALESCE($3, company),
               location = COALESCE($4, location),
               description = COALESCE($5, description),
               employment_type = COALESCE($6, employment_type),
               salary_min = COALESCE($7, salary_min),
               salary_max = COALESCE($8, salary_max),
               is_open = COALESCE($9, is_open),
               updated_at = now()
         WHERE id = $1
        RETURNING {JOB_COLUMNS}
        "#
    );
    let job = sqlx::query_as::<_, Job>(&sql)
        .bind(id)
        .bind(changes.title.as_deref())
        .bind(changes.company.as_deref())
        .bind(changes.location.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.employment_type.as_deref())
        .bind(changes.salary_min)
        .bind(changes.salary_max)
        .bind(changes.is_open)
        .fetch_optional(db)
        .await?;
    Ok(job)
}

/// Returns whether a row was removed. Applications cascade.
pub async fn delete(db: &PgPool, id: Uuid) -> AppResult<bool> {
    let res = sqlx::query("DELETE FROM jobs WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}
