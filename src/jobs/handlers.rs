use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{check_salary_range, CreateJobRequest, JobListQuery, UpdateJobRequest},
    repo,
    repo_types::Job,
};
use crate::{
    auth::{extractors::AuthUser, repo_types::UserRole},
    error::{AppError, AppResult},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/:id", get(get_job))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", post(create_job))
        .route("/jobs/:id", put(update_job).delete(delete_job))
}

/// Loads a posting and checks that the caller owns it or is an admin.
pub(crate) async fn owned_job(state: &AppState, caller: &AuthUser, id: Uuid) -> AppResult<Job> {
    let job = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound("job"))?;
    caller.require_self_or_admin(job.recruiter_id)?;
    Ok(job)
}

#[instrument(skip(state))]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> AppResult<Json<Vec<Job>>> {
    let jobs = repo::list_open(&state.db, query.search(), query.limit(), query.offset()).await?;
    Ok(Json(jobs))
}

#[instrument(skip(state))]
pub async fn get_job(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Job>> {
    let job = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound("job"))?;
    Ok(Json(job))
}

#[instrument(skip_all, fields(recruiter = %caller.id))]
pub async fn create_job(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(payload): Json<CreateJobRequest>,
) -> AppResult<(StatusCode, Json<Job>)> {
    caller.require_role(&[UserRole::Recruiter])?;
    let new_job = payload.into_new_job()?;
    let job = repo::insert(&state.db, caller.id, &new_job).await?;
    info!(job_id = %job.id, "job created");
    Ok((StatusCode::CREATED, Json(job)))
}

#[instrument(skip(state, payload))]
pub async fn update_job(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateJobRequest>,
) -> AppResult<Json<Job>> {
    let changes = payload.into_changes()?;
    let current = owned_job(&state, &caller, id).await?;
    check_salary_range(
        changes.salary_min.or(current.salary_min),
        changes.salary_max.or(current.salary_max),
    )?;
    let job = repo::update(&state.db, id, &changes)
        .await?
        .ok_or(AppError::NotFound("job"))?;
    Ok(Json(job))
}

#[instrument(skip(state))]
pub async fn delete_job(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    owned_job(&state, &caller, id).await?;
    if !repo::delete(&state.db, id).await? {
        return Err(AppError::NotFound("job"));
    }
    info!(job_id = %id, "job deleted");
    Ok(StatusCode::NO_CONTENT)
}
