use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{ApplyRequest, UpdateStatusRequest},
    repo,
    repo_types::Application,
};
use crate::{
    auth::{extractors::AuthUser, repo_types::UserRole},
    error::{AppError, AppResult},
    jobs::{self, handlers::owned_job},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/jobs/:id/applications", post(apply).get(list_for_job))
        .route("/applications/mine", get(list_mine))
        .route("/applications/:id/status", put(update_status))
}

#[instrument(skip(state, payload), fields(applicant = %caller.id))]
pub async fn apply(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(job_id): Path<Uuid>,
    Json(mut payload): Json<ApplyRequest>,
) -> AppResult<(StatusCode, Json<Application>)> {
    caller.require_role(&[UserRole::Seeker, UserRole::User])?;
    payload.normalize_and_validate()?;

    let job = jobs::repo::find_by_id(&state.db, job_id)
        .await?
        .ok_or(AppError::NotFound("job"))?;
    if !job.is_open {
        return Err(AppError::Validation("job is closed".into()));
    }

    let application = repo::insert(
        &state.db,
        job.id,
        caller.id,
        payload.cover_letter.as_deref(),
        payload.resume_url.as_deref(),
    )
    .await?;
    info!(application_id = %application.id, %job_id, "application submitted");
    Ok((StatusCode::CREATED, Json(application)))
}

#[instrument(skip(state))]
pub async fn list_mine(
    State(state): State<AppState>,
    caller: AuthUser,
) -> AppResult<Json<Vec<Application>>> {
    let rows = repo::list_by_applicant(&state.db, caller.id).await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn list_for_job(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(job_id): Path<Uuid>,
) -> AppResult<Json<Vec<Application>>> {
    owned_job(&state, &caller, job_id).await?;
    let rows = repo::list_by_job(&state.db, job_id).await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn update_status(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<Application>> {
    let application = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound("application"))?;
    owned_job(&state, &caller, application.job_id).await?;

    let updated = repo::set_status(&state.db, id, payload.status)
        .await?
        .ok_or(AppError::NotFound("application"))?;
    info!(application_id = %id, status = ?updated.status, "application status changed");
    Ok(Json(updated))
}
