use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CreateRetreatRequest, RetreatListQuery, UpdateRetreatRequest, DATE_ORDER},
    repo,
    repo_types::Retreat,
};
use crate::{
    auth::{
        extractors::AuthUser,
        gate::{protect, STAFF},
    },
    error::{ApiError, ApiResponse, ApiResult},
    extract::{Upload, ValidPath, ValidQuery, ValidatedJson},
    media::{self, discard_asset, MAX_UPLOAD_BYTES},
    slug::{unique_slug, SlugTable},
    state::AppState,
};

pub const NOT_FOUND: &str = "Retreat not found";

pub fn admin_router(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .route("/retreats", post(create_retreat).get(list_retreats))
        .route(
            "/retreats/:id",
            get(get_retreat).put(update_retreat).delete(delete_retreat),
        )
        .route(
            "/retreats/:id/thumbnail",
            post(upload_thumbnail).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024)),
        );
    protect(routes, state, STAFF)
}

/// Published retreats only. The detail route is keyed by slug.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/retreats", get(list_published))
        .route("/retreats/:id", get(get_published))
}

pub(crate) async fn load(state: &AppState, id: Uuid) -> ApiResult<Retreat> {
    repo::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound(NOT_FOUND))
}

#[instrument(skip(state, claims, body), fields(admin_id = %claims.sub))]
pub async fn create_retreat(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ValidatedJson(body): ValidatedJson<CreateRetreatRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Retreat>>)> {
    let (
        Some(title),
        Some(location),
        Some(start_time),
        Some(end_time),
        Some(start_date),
        Some(end_date),
    ) = (
        body.title,
        body.location,
        body.start_time,
        body.end_time,
        body.start_date,
        body.end_date,
    )
    else {
        return Err(ApiError::BadRequest("Missing required fields".into()));
    };
    let slug = unique_slug(&state.db, SlugTable::Retreats, &title, None).await?;
    let now = OffsetDateTime::now_utc();
    let draft = Retreat {
        id: Uuid::new_v4(),
        title,
        slug,
        excerpt: body.excerpt,
        description: body.description,
        location,
        start_time,
        end_time,
        start_date,
        end_date,
        max_participants: body.max_participants.unwrap_or(0),
        price: body.price.unwrap_or(0.0),
        is_published: body.is_published.unwrap_or(false),
        created_by: claims.sub,
        thumbnail: None,
        meta_title: body.meta_title,
        meta_description: body.meta_description,
        participant_count: 0,
        created_at: now,
        updated_at: now,
    };
    let retreat = repo::insert(&state.db, &draft)
        .await
        .map_err(|e| ApiError::from_db(e, "Retreat slug already exists"))?;
    info!(retreat_id = %retreat.id, slug = %retreat.slug, "retreat created");
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Retreat created", retreat),
    ))
}

#[instrument(skip(state, _caller))]
pub async fn list_retreats(
    State(state): State<AppState>,
    _caller: AuthUser,
    ValidQuery(q): ValidQuery<RetreatListQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Retreat>>>> {
    let page = q.paging();
    let (items, total) = repo::list(&state.db, &q.filter(), page.limit, page.offset()).await?;
    Ok(ApiResponse::page("Retreats fetched", items, page.describe(total)))
}

#[instrument(skip(state, _caller))]
pub async fn get_retreat(
    State(state): State<AppState>,
    _caller: AuthUser,
    ValidPath(id): ValidPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Retreat>>> {
    let retreat = load(&state, id).await?;
    Ok(ApiResponse::ok("Retreat fetched", retreat))
}

#[instrument(skip(state, _caller, body))]
pub async fn update_retreat(
    State(state): State<AppState>,
    _caller: AuthUser,
    ValidPath(id): ValidPath<Uuid>,
    ValidatedJson(body): ValidatedJson<UpdateRetreatRequest>,
) -> ApiResult<Json<ApiResponse<Retreat>>> {
    let mut retreat = load(&state, id).await?;
    if body.apply(&mut retreat) {
        retreat.slug = unique_slug(&state.db, SlugTable::Retreats, &retreat.title, Some(id)).await?;
    }
    if retreat.end_date < retreat.start_date {
        return Err(ApiError::Validation(vec![DATE_ORDER.into()]));
    }
    let saved = repo::save(&state.db, &retreat)
        .await
        .map_err(|e| ApiError::from_db(e, "Retreat slug already exists"))?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;
    info!(retreat_id = %id, "retreat updated");
    Ok(ApiResponse::ok("Retreat updated", saved))
}

#[instrument(skip(state, _caller))]
pub async fn delete_retreat(
    State(state): State<AppState>,
    _caller: AuthUser,
    ValidPath(id): ValidPath<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let retreat = load(&state, id).await?;
    if !repo::delete(&state.db, id).await? {
        return Err(ApiError::NotFound(NOT_FOUND));
    }
    discard_asset(&state, retreat.thumbnail).await;
    info!(retreat_id = %id, "retreat deleted");
    Ok(ApiResponse::done("Retreat deleted"))
}

#[instrument(skip(state, _caller, mp))]
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    _caller: AuthUser,
    ValidPath(id): ValidPath<Uuid>,
    Upload(mut mp): Upload,
) -> ApiResult<Json<ApiResponse<Retreat>>> {
    let upload = media::read_image(&mut mp, "thumbnail").await?;
    let current = load(&state, id).await?;
    let asset = media::upload_image(&state, "retreats", &upload).await?;
    let updated = repo::set_thumbnail(&state.db, id, &asset)
        .await?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;
    discard_asset(&state, current.thumbnail).await;
    Ok(ApiResponse::ok("Thumbnail updated", updated))
}

#[instrument(skip(state))]
pub async fn list_published(
    State(state): State<AppState>,
    ValidQuery(q): ValidQuery<RetreatListQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Retreat>>>> {
    let page = q.paging();
    let mut filter = q.filter();
    filter.is_published = Some(true);
    let (items, total) = repo::list(&state.db, &filter, page.limit, page.offset()).await?;
    Ok(ApiResponse::page("Retreats fetched", items, page.describe(total)))
}

#[instrument(skip(state))]
pub async fn get_published(
    State(state): State<AppState>,
    ValidPath(slug): ValidPath<String>,
) -> ApiResult<Json<ApiResponse<Retreat>>> {
    let retreat = repo::find_published_by_slug(&state.db, &slug)
        .await?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;
    Ok(ApiResponse::ok("Retreat fetched", retreat))
}
