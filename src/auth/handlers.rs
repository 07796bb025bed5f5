use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::{
        dto::{
            AuthResponse, EmailRequest, LoginRequest, MessageResponse, PublicUser,
            RefreshTokenRequest, RegisterRequest, ResetPasswordRequest, VerifyEmailRequest,
        },
        extractors::AuthUser,
        services,
    },
    error::AppResult,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/verify-email", post(verify_email))
        .route("/auth/login", post(login))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/resend-verification", post(resend_verification))
        .route("/auth/delete/:user_id", delete(delete_user))
        .route("/auth/logout", post(logout))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<PublicUser>)> {
    payload.normalize_and_validate()?;
    let user = services::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip_all)]
pub async fn verify_email(
    State(state): State<AppState>,
    Json(mut payload): Json<VerifyEmailRequest>,
) -> AppResult<Json<PublicUser>> {
    payload.normalize_and_validate()?;
    let user = services::verify_email(&state, &payload.email, payload.code).await?;
    Ok(Json(user))
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    payload.normalize_and_validate()?;
    let session = services::login(&state, &payload.email, payload.password).await?;
    Ok(Json(session))
}

#[instrument(skip_all)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(mut payload): Json<EmailRequest>,
) -> AppResult<Json<MessageResponse>> {
    payload.normalize_and_validate()?;
    services::forgot_password(&state, &payload.email).await?;
    Ok(Json(MessageResponse {
        message: "password reset email sent",
    }))
}

#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    payload.normalize_and_validate()?;
    services::reset_password(&state, &payload.email, payload.code, payload.new_password).await?;
    Ok(Json(MessageResponse {
        message: "password has been reset",
    }))
}

#[instrument(skip_all)]
pub async fn resend_verification(
    State(state): State<AppState>,
    Json(mut payload): Json<EmailRequest>,
) -> AppResult<Json<MessageResponse>> {
    payload.normalize_and_validate()?;
    services::resend_verification(&state, &payload.email).await?;
    Ok(Json(MessageResponse {
        message: "verification email sent",
    }))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<PublicUser>> {
    let user = services::delete_user(&state, &caller, user_id).await?;
    Ok(Json(user))
}

#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Json<MessageResponse> {
    services::logout(&state, &payload.refresh_token);
    Json(MessageResponse {
        message: "logged out",
    })
}

#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> AppResult<Json<AuthResponse>> {
    let session = services::refresh(&state, &payload.refresh_token).await?;
    Ok(Json(session))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    caller: AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = services::current_user(&state, caller.id).await?;
    Ok(Json(user))
}
