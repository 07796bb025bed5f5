//! Credential and verification lifecycle.
//!
//! Every operation is a lookup, a conditional check and at most one write to
//! the user store. Outgoing mail goes through the bounded mail queue; only
//! `register` treats a failed enqueue as an error.

use anyhow::Context;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        code::generate_code,
        dto::{AuthResponse, PublicUser, RegisterRequest},
        extractors::AuthUser,
        password::{hash_password, verify_password},
        repo_types::{NewUser, User},
    },
    error::{AppError, AppResult},
    mail::templates,
    state::AppState,
};

async fn hash_blocking(plain: String) -> AppResult<String> {
    let hash = tokio::task::spawn_blocking(move || hash_password(&plain))
        .await
        .context("password hashing task")??;
    Ok(hash)
}

async fn verify_blocking(plain: String, hash: String) -> AppResult<bool> {
    let ok = tokio::task::spawn_blocking(move || verify_password(&plain, &hash))
        .await
        .context("password verification task")??;
    Ok(ok)
}

fn session(st: &AppState, user: User) -> AppResult<AuthResponse> {
    let tokens = st.keys.issue_pair(user.id, user.role)?;
    Ok(AuthResponse {
        user: user.into(),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    })
}

/// Creates an unverified account and queues its verification mail.
///
/// `req` is expected to be normalized and validated already.
#[instrument(skip_all, fields(email = %req.email))]
pub async fn register(st: &AppState, req: RegisterRequest) -> AppResult<PublicUser> {
    let password_hash = hash_blocking(req.password).await?;
    let code = generate_code();

    let user = st
        .users
        .insert(NewUser {
            name: req.name,
            email: req.email,
            phone_number: req.phone_number,
            role: req.role.unwrap_or_default(),
            password_hash,
            one_time_code: code,
        })
        .await
        .map_err(|e| {
            if let AppError::Conflict(field) = &e {
                warn!(%field, "registration conflict");
            }
            e
        })?;
    info!(user_id = %user.id, "user registered");

    st.mail.enqueue(templates::verification_email(
        &st.config.frontend_url,
        &user.name,
        &user.email,
        code,
    ))?;

    Ok(user.into())
}

/// Consumes the outstanding code and marks the email address verified.
#[instrument(skip_all, fields(email = %email))]
pub async fn verify_email(st: &AppState, email: &str, code: i32) -> AppResult<PublicUser> {
    if let Some(user) = st.users.consume_verification_code(email, code).await? {
        info!(user_id = %user.id, "email verified");
        return Ok(user.into());
    }

    match st.users.find_active_by_email(email).await? {
        Some(user) => {
            warn!(user_id = %user.id, "verification code mismatch");
            Err(AppError::InvalidCode)
        }
        None => Err(AppError::NotFound("user")),
    }
}

#[instrument(skip_all, fields(email = %email))]
pub async fn login(st: &AppState, email: &str, password: String) -> AppResult<AuthResponse> {
    let user = match st.users.find_active_by_email(email).await? {
        Some(u) => u,
        None => {
            warn!("login unknown email");
            return Err(AppError::NotFound("user"));
        }
    };

    if !user.is_email_verified {
        warn!(user_id = %user.id, "login before email verification");
        return Err(AppError::EmailNotVerified);
    }

    if !verify_blocking(password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = %user.id, "user logged in");
    session(st, user)
}

/// Stores a fresh code and builds a mail from it. Queue failures are logged only.
async fn reissue_code<F>(st: &AppState, email: &str, build_mail: F) -> AppResult<()>
where
    F: FnOnce(&str, &str, &str, i32) -> crate::mail::OutgoingMail,
{
    let code = generate_code();
    let user = st
        .users
        .set_code(email, code)
        .await?
        .ok_or(AppError::NotFound("user"))?;

    let mail = build_mail(&st.config.frontend_url, &user.name, &user.email, code);
    if let Err(e) = st.mail.enqueue(mail) {
        warn!(user_id = %user.id, error = %e, "code stored but mail not queued");
    }
    Ok(())
}

#[instrument(skip_all, fields(email = %email))]
pub async fn forgot_password(st: &AppState, email: &str) -> AppResult<()> {
    reissue_code(st, email, templates::reset_email).await?;
    info!("password reset code issued");
    Ok(())
}

#[instrument(skip_all, fields(email = %email))]
pub async fn resend_verification(st: &AppState, email: &str) -> AppResult<()> {
    reissue_code(st, email, templates::verification_email).await?;
    info!("verification code reissued");
    Ok(())
}

/// Replaces the password of the account matching both `email` and `code`.
#[instrument(skip_all, fields(email = %email))]
pub async fn reset_password(
    st: &AppState,
    email: &str,
    code: i32,
    new_password: String,
) -> AppResult<()> {
    let password_hash = hash_blocking(new_password).await?;
    let user = st
        .users
        .consume_reset_code(email, code, &password_hash)
        .await?
        .ok_or_else(|| {
            warn!("reset with unknown email/code pair");
            AppError::InvalidCode
        })?;
    info!(user_id = %user.id, "password reset");
    Ok(())
}

/// Soft-deletes `user_id`. Deleting an already deleted account is a no-op.
#[instrument(skip(st))]
pub async fn delete_user(st: &AppState, caller: &AuthUser, user_id: Uuid) -> AppResult<PublicUser> {
    caller.require_self_or_admin(user_id)?;

    let user = st
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::NotFound("user"))?;

    if user.is_deleted {
        debug!(%user_id, "user already deleted");
        return Ok(user.into());
    }

    let user = st
        .users
        .soft_delete(user_id)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    info!(%user_id, deleted_by = %caller.id, "user deleted");
    Ok(user.into())
}

/// Acknowledges a logout. Tokens are stateless and stay valid until they expire.
#[instrument(skip_all)]
pub fn logout(st: &AppState, refresh_token: &str) {
    match st.keys.verify_refresh(refresh_token) {
        Ok(claims) => info!(user_id = %claims.sub, "user logged out"),
        Err(e) => debug!(error = %e, "logout with unrecognized token"),
    }
}

/// Exchanges a valid refresh token for a new token pair.
#[instrument(skip_all)]
pub async fn refresh(st: &AppState, refresh_token: &str) -> AppResult<AuthResponse> {
    let claims = st.keys.verify_refresh(refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AppError::Unauthorized("invalid or expired refresh token".into())
    })?;

    let user = st
        .users
        .find_by_id(claims.sub)
        .await?
        .filter(|u| !u.is_deleted)
        .ok_or(AppError::NotFound("user"))?;

    if !user.is_email_verified {
        return Err(AppError::EmailNotVerified);
    }

    debug!(user_id = %user.id, "tokens refreshed");
    session(st, user)
}

pub async fn current_user(st: &AppState, user_id: Uuid) -> AppResult<PublicUser> {
    st.users
        .find_by_id(user_id)
        .await?
        .filter(|u| !u.is_deleted)
        .map(PublicUser::from)
        .ok_or(AppError::NotFound("user"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::UserRole;
    use crate::mail::OutgoingMail;
    use tokio::sync::mpsc::Receiver;

    const EMAIL: &str = "ann@x.com";
    const PHONE: &str = "1234567890";
    const PASSWORD: &str = "Abcdefg1";

    async fn register_ann(st: &AppState) -> AppResult<PublicUser> {
        register_as(st, EMAIL, PHONE).await
    }

    async fn register_as(st: &AppState, email: &str, phone: &str) -> AppResult<PublicUser> {
        let req = RegisterRequest {
            name: "Ann".into(),
            email: email.into(),
            password: PASSWORD.into(),
            phone_number: phone.into(),
            role: Some(UserRole::Seeker),
        };
        register(st, req).await
    }

    async fn stored(st: &AppState, email: &str) -> User {
        st.users
            .find_active_by_email(email)
            .await
            .unwrap()
            .expect("user stored")
    }

    async fn stored_code(st: &AppState, email: &str) -> i32 {
        stored(st, email).await.one_time_code.expect("code outstanding")
    }

    async fn verified_ann(st: &AppState) -> PublicUser {
        let user = register_ann(st).await.unwrap();
        let code = stored_code(st, EMAIL).await;
        verify_email(st, EMAIL, code).await.unwrap();
        user
    }

    fn drain(outbox: &mut Receiver<OutgoingMail>) -> Vec<OutgoingMail> {
        let mut mails = Vec::new();
        while let Ok(m) = outbox.try_recv() {
            mails.push(m);
        }
        mails
    }

    #[tokio::test]
    async fn registration_verification_login() {
        let (st, mut outbox) = AppState::fake();

        let user = register_ann(&st).await.unwrap();
        assert!(!user.is_email_verified);

        let code = stored_code(&st, EMAIL).await;
        assert!((100_000..=999_999).contains(&code));

        let mails = drain(&mut outbox);
        assert_eq!(mails.len(), 1);
        assert_eq!(mails[0].to, EMAIL);
        assert!(mails[0].body.contains(&format!("code={code}")));

        let verified = verify_email(&st, EMAIL, code).await.unwrap();
        assert!(verified.is_email_verified);
        assert_eq!(stored(&st, EMAIL).await.one_time_code, None);

        let session = login(&st, EMAIL, PASSWORD.into()).await.unwrap();
        assert!(!session.access_token.is_empty());
        assert!(!session.refresh_token.is_empty());
        assert_eq!(session.user.id, user.id);

        let claims = st.keys.verify_access(&session.access_token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, UserRole::Seeker);
    }

    #[tokio::test]
    async fn duplicate_email_or_phone_conflicts() {
        let (st, _outbox) = AppState::fake();
        register_ann(&st).await.unwrap();

        let err = register_as(&st, EMAIL, "5555555555").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict("email")));

        let err = register_as(&st, "other@x.com", PHONE).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict("phoneNumber")));
    }

    #[tokio::test]
    async fn wrong_code_leaves_user_unverified() {
        let (st, _outbox) = AppState::fake();
        register_ann(&st).await.unwrap();

        st.users.set_code(EMAIL, 482913).await.unwrap();

        let err = verify_email(&st, EMAIL, 482914).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCode));

        let user = stored(&st, EMAIL).await;
        assert!(!user.is_email_verified);
        assert_eq!(user.one_time_code, Some(482913));
    }

    #[tokio::test]
    async fn verification_code_is_single_use() {
        let (st, _outbox) = AppState::fake();
        register_ann(&st).await.unwrap();
        let code = stored_code(&st, EMAIL).await;

        verify_email(&st, EMAIL, code).await.unwrap();
        let err = verify_email(&st, EMAIL, code).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCode));
    }

    #[tokio::test]
    async fn verify_unknown_email_is_not_found() {
        let (st, _outbox) = AppState::fake();
        let err = verify_email(&st, "ghost@x.com", 123456).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn login_requires_verified_email_even_with_right_password() {
        let (st, _outbox) = AppState::fake();
        register_ann(&st).await.unwrap();

        let err = login(&st, EMAIL, PASSWORD.into()).await.unwrap_err();
        assert!(matches!(err, AppError::EmailNotVerified));
        let err = login(&st, EMAIL, "Wrong1pass".into()).await.unwrap_err();
        assert!(matches!(err, AppError::EmailNotVerified));
    }

    #[tokio::test]
    async fn login_failure_modes() {
        let (st, _outbox) = AppState::fake();
        verified_ann(&st).await;

        let err = login(&st, "ghost@x.com", PASSWORD.into()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = login(&st, EMAIL, "Wrong1pass".into()).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn reset_password_round_trip() {
        let (st, mut outbox) = AppState::fake();
        verified_ann(&st).await;
        drain(&mut outbox);

        forgot_password(&st, EMAIL).await.unwrap();
        let mails = drain(&mut outbox);
        assert_eq!(mails.len(), 1);
        assert!(mails[0].body.contains("/reset-password?"));

        let code = stored_code(&st, EMAIL).await;
        reset_password(&st, EMAIL, code, "Newpass99".into()).await.unwrap();

        let user = stored(&st, EMAIL).await;
        assert!(user.is_reset_password);
        assert_eq!(user.one_time_code, None);
        assert!(user.is_email_verified);

        assert!(login(&st, EMAIL, "Newpass99".into()).await.is_ok());
        let err = login(&st, EMAIL, PASSWORD.into()).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));

        let err = reset_password(&st, EMAIL, code, "Another1x".into()).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCode));
    }

    #[tokio::test]
    async fn reset_code_cannot_be_replayed_against_another_email() {
        let (st, _outbox) = AppState::fake();
        register_ann(&st).await.unwrap();
        register_as(&st, "bob@x.com", "5555555555").await.unwrap();

        forgot_password(&st, EMAIL).await.unwrap();
        let ann_code = stored_code(&st, EMAIL).await;

        let bob = stored(&st, "bob@x.com").await;
        if bob.one_time_code == Some(ann_code) {
            let other = if ann_code == 999_999 { 100_000 } else { ann_code + 1 };
            st.users.set_code("bob@x.com", other).await.unwrap();
        }

        let err = reset_password(&st, "bob@x.com", ann_code, "Newpass99".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCode));
        assert!(!stored(&st, "bob@x.com").await.is_reset_password);
    }

    #[tokio::test]
    async fn forgot_password_unknown_email_is_not_found() {
        let (st, _outbox) = AppState::fake();
        let err = forgot_password(&st, "ghost@x.com").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn resend_verification_replaces_code() {
        let (st, mut outbox) = AppState::fake();
        register_ann(&st).await.unwrap();

        st.users.set_code(EMAIL, 111_111).await.unwrap();
        drain(&mut outbox);

        resend_verification(&st, EMAIL).await.unwrap();
        let mails = drain(&mut outbox);
        assert_eq!(mails.len(), 1);
        assert!(mails[0].body.contains("/verify-email?"));

        let code = stored_code(&st, EMAIL).await;
        assert!(mails[0].body.contains(&code.to_string()));
        if code != 111_111 {
            let err = verify_email(&st, EMAIL, 111_111).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidCode));
        }
        assert!(verify_email(&st, EMAIL, code).await.is_ok());
    }

    #[tokio::test]
    async fn mail_queue_failure_does_not_fail_code_reissue() {
        let (st, outbox) = AppState::fake();
        verified_ann(&st).await;
        drop(outbox);

        forgot_password(&st, EMAIL).await.unwrap();
        assert!(stored(&st, EMAIL).await.one_time_code.is_some());
    }

    #[tokio::test]
    async fn registration_reports_mail_queue_failure() {
        let (st, outbox) = AppState::fake();
        drop(outbox);

        let err = register_ann(&st).await.unwrap_err();
        assert!(matches!(err, AppError::Mail(_)));
        assert!(err.is_retryable());
        assert!(stored(&st, EMAIL).await.one_time_code.is_some());
    }

    #[tokio::test]
    async fn soft_delete_blocks_login_but_keeps_record() {
        let (st, _outbox) = AppState::fake();
        let user = verified_ann(&st).await;
        let caller = AuthUser {
            id: user.id,
            role: UserRole::Seeker,
        };

        let deleted = delete_user(&st, &caller, user.id).await.unwrap();
        assert!(deleted.is_deleted);

        let err = login(&st, EMAIL, PASSWORD.into()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let record = st.users.find_by_id(user.id).await.unwrap().unwrap();
        assert!(record.is_deleted);

        // deleting twice is harmless
        assert!(delete_user(&st, &caller, user.id).await.unwrap().is_deleted);
    }

    #[tokio::test]
    async fn delete_requires_owner_or_admin() {
        let (st, _outbox) = AppState::fake();
        let ann = register_ann(&st).await.unwrap();

        let stranger = AuthUser {
            id: Uuid::new_v4(),
            role: UserRole::Recruiter,
        };
        let err = delete_user(&st, &stranger, ann.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let admin = AuthUser {
            id: Uuid::new_v4(),
            role: UserRole::Admin,
        };
        assert!(delete_user(&st, &admin, ann.id).await.is_ok());

        let err = delete_user(&st, &admin, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn refresh_issues_new_pair_until_account_deleted() {
        let (st, _outbox) = AppState::fake();
        let user = verified_ann(&st).await;
        let session = login(&st, EMAIL, PASSWORD.into()).await.unwrap();

        let refreshed = refresh(&st, &session.refresh_token).await.unwrap();
        assert_eq!(refreshed.user.id, user.id);
        assert!(st.keys.verify_access(&refreshed.access_token).is_ok());

        let err = refresh(&st, &session.access_token).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let caller = AuthUser {
            id: user.id,
            role: UserRole::Seeker,
        };
        delete_user(&st, &caller, user.id).await.unwrap();
        let err = refresh(&st, &session.refresh_token).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn logout_always_succeeds_and_revokes_nothing() {
        let (st, _outbox) = AppState::fake();
        verified_ann(&st).await;
        let session = login(&st, EMAIL, PASSWORD.into()).await.unwrap();

        logout(&st, &session.refresh_token);
        logout(&st, "garbage");

        assert!(refresh(&st, &session.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn current_user_hides_deleted_accounts() {
        let (st, _outbox) = AppState::fake();
        let user = register_ann(&st).await.unwrap();
        assert_eq!(current_user(&st, user.id).await.unwrap().email, EMAIL);

        let admin = AuthUser {
            id: Uuid::new_v4(),
            role: UserRole::Admin,
        };
        delete_user(&st, &admin, user.id).await.unwrap();
        assert!(matches!(
            current_user(&st, user.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_resets_with_one_code_succeed_once() {
        let (st, _outbox) = AppState::fake();
        verified_ann(&st).await;
        forgot_password(&st, EMAIL).await.unwrap();
        let code = stored_code(&st, EMAIL).await;

        let (first, second) = tokio::join!(
            reset_password(&st, EMAIL, code, "Firstpw11".into()),
            reset_password(&st, EMAIL, code, "Secondpw22".into()),
        );
        assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);

        let winner = if first.is_ok() { "Firstpw11" } else { "Secondpw22" };
        assert!(login(&st, EMAIL, winner.into()).await.is_ok());
    }

    #[tokio::test]
    async fn reset_racing_delete_keeps_account_deleted() {
        let (st, _outbox) = AppState::fake();
        let user = verified_ann(&st).await;
        forgot_password(&st, EMAIL).await.unwrap();
        let code = stored_code(&st, EMAIL).await;
        let caller = AuthUser {
            id: user.id,
            role: UserRole::Seeker,
        };

        let (_reset, deleted) = tokio::join!(
            reset_password(&st, EMAIL, code, "Newpass99".into()),
            delete_user(&st, &caller, user.id),
        );
        assert!(deleted.unwrap().is_deleted);

        let record = st.users.find_by_id(user.id).await.unwrap().unwrap();
        assert!(record.is_deleted);
        let err = login(&st, EMAIL, "Newpass99".into()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
