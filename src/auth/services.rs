use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    jwt::Claims,
    otp::{issue_challenge, verify_challenge, Rejection},
};
use crate::{
    accounts::{Account, AccountKind, AccountPatch, Role},
    error::{ApiError, ApiResult},
    mailer::otp_email,
    media::{self, ImageUpload},
    state::AppState,
    upstream,
};

pub const INVALID_OTP: &str = "Invalid or expired OTP";

/// Inactive accounts are treated as if they did not exist.
pub async fn find_active(state: &AppState, kind: AccountKind, email: &str) -> ApiResult<Account> {
    match state.accounts.find_by_email(kind, email).await? {
        Some(a) if a.is_active => Ok(a),
        Some(a) => {
            debug!(account_id = %a.id, "inactive account");
            Err(ApiError::NotFound(kind.not_found()))
        }
        None => Err(ApiError::NotFound(kind.not_found())),
    }
}

pub async fn find_active_by_id(state: &AppState, kind: AccountKind, id: Uuid) -> ApiResult<Account> {
    state
        .accounts
        .find_by_id(kind, id)
        .await?
        .filter(|a| a.is_active)
        .ok_or(ApiError::NotFound(kind.not_found()))
}

/// Puts a fresh challenge on `account`, persists it, then emails the code.
async fn send_challenge(state: &AppState, mut account: Account) -> ApiResult<()> {
    let code = issue_challenge(&mut account, &state.otp, OffsetDateTime::now_utc());
    state.accounts.save_login_state(&account).await?;

    let email = otp_email(&account.email, &code, state.otp.ttl.whole_minutes());
    upstream::call(&state.retry, "mail", || state.mailer.send(&email)).await?;
    info!(account_id = %account.id, kind = account.kind.as_str(), "otp sent");
    Ok(())
}

/// Members are provisioned on first login; admins must already exist.
pub async fn login(state: &AppState, kind: AccountKind, email: &str) -> ApiResult<()> {
    let account = match state.accounts.find_by_email(kind, email).await? {
        Some(a) if a.is_active => a,
        Some(_) => return Err(ApiError::NotFound(kind.not_found())),
        None if kind == AccountKind::Member => {
            let fresh = Account::provision(kind, email, Role::Member, OffsetDateTime::now_utc());
            let created = state
                .accounts
                .insert(&fresh)
                .await
                .map_err(|e| ApiError::from_db(e, "Email already registered"))?;
            info!(account_id = %created.id, "member provisioned");
            created
        }
        None => {
            warn!(kind = kind.as_str(), "login for unknown account");
            return Err(ApiError::NotFound(kind.not_found()));
        }
    };
    send_challenge(state, account).await
}

pub async fn resend(state: &AppState, kind: AccountKind, email: &str) -> ApiResult<()> {
    let account = find_active(state, kind, email).await?;
    send_challenge(state, account).await
}

/// Checks the code and returns the account together with a session token.
pub async fn verify(
    state: &AppState,
    kind: AccountKind,
    email: &str,
    otp: &str,
) -> ApiResult<(Account, String)> {
    let mut account = find_active(state, kind, email).await?;
    match verify_challenge(&mut account, otp, &state.otp, OffsetDateTime::now_utc()) {
        Ok(()) => {}
        Err(reason) => {
            if matches!(reason, Rejection::Mismatch | Rejection::Exhausted) {
                state.accounts.save_login_state(&account).await?;
            }
            warn!(account_id = %account.id, ?reason, attempts = account.failed_otp_attempts, "otp rejected");
            return Err(ApiError::BadRequest(INVALID_OTP.into()));
        }
    }
    state.accounts.save_login_state(&account).await?;

    let token = state.jwt.issue(account.id, &account.email, account.role)?;
    info!(account_id = %account.id, role = account.role.as_str(), "otp verified");
    Ok((account, token))
}

pub async fn me(state: &AppState, claims: &Claims) -> ApiResult<Account> {
    find_active_by_id(state, claims.role.kind(), claims.sub).await
}

pub async fn update_me(state: &AppState, claims: &Claims, patch: AccountPatch) -> ApiResult<Account> {
    let kind = claims.role.kind();
    let current = find_active_by_id(state, kind, claims.sub).await?;
    update_account(state, &current, patch).await
}

/// Applies `patch`, refusing an email or phone already held by another
/// account of the same kind.
pub async fn update_account(
    state: &AppState,
    current: &Account,
    patch: AccountPatch,
) -> ApiResult<Account> {
    if let Some(email) = patch.email.as_deref().filter(|e| *e != current.email) {
        if state.accounts.find_by_email(current.kind, email).await?.is_some() {
            return Err(ApiError::Conflict("Email already registered".into()));
        }
    }
    state
        .accounts
        .update(current.kind, current.id, &patch)
        .await
        .map_err(|e| ApiError::from_db(e, "Email or phone already registered"))?
        .ok_or(ApiError::NotFound(current.kind.not_found()))
}

/// Uploads the new avatar, stores it, then drops the old one.
pub async fn replace_avatar(
    state: &AppState,
    current: &Account,
    upload: &ImageUpload,
) -> ApiResult<Account> {
    let asset = media::upload_image(state, "avatars", upload).await?;
    let updated = state
        .accounts
        .set_avatar(current.kind, current.id, &asset)
        .await?
        .ok_or(ApiError::NotFound(current.kind.not_found()))?;
    media::discard_asset(state, current.avatar.clone()).await;
    Ok(updated)
}
