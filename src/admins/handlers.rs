use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{AdminListQuery, CreateAdminRequest, UpdateAdminRequest};
use crate::{
    accounts::{Account, AccountKind, AccountView, Role},
    auth::{
        extractors::AuthUser,
        gate::{protect, OWNER},
        services::{replace_avatar, update_account},
    },
    error::{ApiError, ApiResponse, ApiResult},
    extract::{Upload, ValidPath, ValidQuery, ValidatedJson},
    media::{self, discard_asset, MAX_UPLOAD_BYTES},
    state::AppState,
};

pub fn router(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .route("/admins", post(create_admin).get(list_admins))
        .route(
            "/admins/:id",
            get(get_admin).put(update_admin).delete(delete_admin),
        )
        .route(
            "/admins/:id/avatar",
            post(upload_admin_avatar).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024)),
        );
    protect(routes, state, OWNER)
}

async fn load(state: &AppState, id: Uuid) -> ApiResult<Account> {
    state
        .accounts
        .find_by_id(AccountKind::Admin, id)
        .await?
        .ok_or(ApiError::NotFound(AccountKind::Admin.not_found()))
}

#[instrument(skip(state, claims, body), fields(owner_id = %claims.sub))]
pub async fn create_admin(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ValidatedJson(body): ValidatedJson<CreateAdminRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<AccountView>>)> {
    if state
        .accounts
        .find_by_email(AccountKind::Admin, &body.email)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("Email already registered".into()));
    }
    let mut admin = Account::provision(
        AccountKind::Admin,
        &body.email,
        Role::Admin,
        OffsetDateTime::now_utc(),
    );
    admin.full_name = body.full_name;
    admin.phone = body.phone;
    let created = state
        .accounts
        .insert(&admin)
        .await
        .map_err(|e| ApiError::from_db(e, "Email or phone already registered"))?;
    info!(admin_id = %created.id, "admin created");
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Admin created", created.view()),
    ))
}

#[instrument(skip(state, _caller))]
pub async fn list_admins(
    State(state): State<AppState>,
    _caller: AuthUser,
    ValidQuery(q): ValidQuery<AdminListQuery>,
) -> ApiResult<Json<ApiResponse<Vec<AccountView>>>> {
    let page = q.paging();
    let (admins, total) = state
        .accounts
        .list(AccountKind::Admin, &q.filter(), page.limit, page.offset())
        .await?;
    let views = admins.iter().map(Account::view).collect();
    Ok(ApiResponse::page("Admins fetched", views, page.describe(total)))
}

#[instrument(skip(state, _caller))]
pub async fn get_admin(
    State(state): State<AppState>,
    _caller: AuthUser,
    ValidPath(id): ValidPath<Uuid>,
) -> ApiResult<Json<ApiResponse<AccountView>>> {
    let admin = load(&state, id).await?;
    Ok(ApiResponse::ok("Admin fetched", admin.view()))
}

#[instrument(skip(state, _caller, body))]
pub async fn update_admin(
    State(state): State<AppState>,
    _caller: AuthUser,
    ValidPath(id): ValidPath<Uuid>,
    ValidatedJson(body): ValidatedJson<UpdateAdminRequest>,
) -> ApiResult<Json<ApiResponse<AccountView>>> {
    let current = load(&state, id).await?;
    let updated = update_account(&state, &current, body.into_patch()).await?;
    info!(admin_id = %id, "admin updated");
    Ok(ApiResponse::ok("Admin updated", updated.view()))
}

#[instrument(skip(state, claims), fields(owner_id = %claims.sub))]
pub async fn delete_admin(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ValidPath(id): ValidPath<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    if id == claims.sub {
        return Err(ApiError::BadRequest("You cannot delete your own account".into()));
    }
    let current = load(&state, id).await?;
    if !state.accounts.delete(AccountKind::Admin, id).await? {
        return Err(ApiError::NotFound(AccountKind::Admin.not_found()));
    }
    discard_asset(&state, current.avatar).await;
    info!(admin_id = %id, "admin deleted");
    Ok(ApiResponse::done("Admin deleted"))
}

#[instrument(skip(state, _caller, mp))]
pub async fn upload_admin_avatar(
    State(state): State<AppState>,
    _caller: AuthUser,
    ValidPath(id): ValidPath<Uuid>,
    Upload(mut mp): Upload,
) -> ApiResult<Json<ApiResponse<AccountView>>> {
    let upload = media::read_image(&mut mp, "avatar").await?;
    let current = load(&state, id).await?;
    let updated = replace_avatar(&state, &current, &upload).await?;
    Ok(ApiResponse::ok("Avatar updated", updated.view()))
}
