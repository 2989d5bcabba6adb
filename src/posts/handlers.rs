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
    dto::{clean_tags, CreatePostRequest, PostListQuery, UpdatePostRequest},
    repo,
    repo_types::{Post, PostStatus},
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

const NOT_FOUND: &str = "Post not found";
const SLUG_TAKEN: &str = "Post slug already exists";

pub fn admin_router(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .route("/posts", post(create_post).get(list_posts))
        .route(
            "/posts/:id",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route(
            "/posts/:id/banner",
            post(upload_banner).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024)),
        );
    protect(routes, state, STAFF)
}

/// Published posts only, detail keyed by slug.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_published))
        .route("/posts/:id", get(get_published))
}

async fn load(state: &AppState, id: Uuid) -> ApiResult<Post> {
    repo::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound(NOT_FOUND))
}

#[instrument(skip(state, claims, body), fields(admin_id = %claims.sub))]
pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ValidatedJson(body): ValidatedJson<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Post>>)> {
    let (Some(title), Some(content)) = (body.title, body.content) else {
        return Err(ApiError::BadRequest("Missing required fields".into()));
    };
    let slug = unique_slug(&state.db, SlugTable::Posts, &title, None).await?;
    let now = OffsetDateTime::now_utc();
    let mut draft = Post {
        id: Uuid::new_v4(),
        title,
        slug,
        excerpt: body.excerpt,
        content,
        status: body.status.unwrap_or(PostStatus::Draft),
        tags: clean_tags(body.tags.unwrap_or_default()),
        category: body.category,
        banner: None,
        meta_title: body.meta_title,
        meta_description: body.meta_description,
        created_by: claims.sub,
        published_at: None,
        created_at: now,
        updated_at: now,
    };
    draft.mark_published(now);
    let post = repo::insert(&state.db, &draft)
        .await
        .map_err(|e| ApiError::from_db(e, SLUG_TAKEN))?;
    info!(post_id = %post.id, slug = %post.slug, "post created");
    Ok((StatusCode::CREATED, ApiResponse::ok("Post created", post)))
}

#[instrument(skip(state, _caller))]
pub async fn list_posts(
    State(state): State<AppState>,
    _caller: AuthUser,
    ValidQuery(q): ValidQuery<PostListQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Post>>>> {
    let page = q.paging();
    let (items, total) = repo::list(&state.db, &q.filter(), page.limit, page.offset()).await?;
    Ok(ApiResponse::page("Posts fetched", items, page.describe(total)))
}

#[instrument(skip(state, _caller))]
pub async fn get_post(
    State(state): State<AppState>,
    _caller: AuthUser,
    ValidPath(id): ValidPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Post>>> {
    Ok(ApiResponse::ok("Post fetched", load(&state, id).await?))
}

#[instrument(skip(state, _caller, body))]
pub async fn update_post(
    State(state): State<AppState>,
    _caller: AuthUser,
    ValidPath(id): ValidPath<Uuid>,
    ValidatedJson(body): ValidatedJson<UpdatePostRequest>,
) -> ApiResult<Json<ApiResponse<Post>>> {
    let mut post = load(&state, id).await?;
    if body.apply(&mut post) {
        post.slug = unique_slug(&state.db, SlugTable::Posts, &post.title, Some(id)).await?;
    }
    post.mark_published(OffsetDateTime::now_utc());
    let saved = repo::save(&state.db, &post)
        .await
        .map_err(|e| ApiError::from_db(e, SLUG_TAKEN))?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;
    info!(post_id = %id, status = saved.status.as_str(), "post updated");
    Ok(ApiResponse::ok("Post updated", saved))
}

#[instrument(skip(state, _caller))]
pub async fn delete_post(
    State(state): State<AppState>,
    _caller: AuthUser,
    ValidPath(id): ValidPath<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let post = load(&state, id).await?;
    if !repo::delete(&state.db, id).await? {
        return Err(ApiError::NotFound(NOT_FOUND));
    }
    discard_asset(&state, post.banner).await;
    info!(post_id = %id, "post deleted");
    Ok(ApiResponse::done("Post deleted"))
}

#[instrument(skip(state, _caller, mp))]
pub async fn upload_banner(
    State(state): State<AppState>,
    _caller: AuthUser,
    ValidPath(id): ValidPath<Uuid>,
    Upload(mut mp): Upload,
) -> ApiResult<Json<ApiResponse<Post>>> {
    let upload = media::read_image(&mut mp, "banner").await?;
    let current = load(&state, id).await?;
    let asset = media::upload_image(&state, "posts", &upload).await?;
    let updated = repo::set_banner(&state.db, id, &asset)
        .await?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;
    discard_asset(&state, current.banner).await;
    Ok(ApiResponse::ok("Banner updated", updated))
}

#[instrument(skip(state))]
pub async fn list_published(
    State(state): State<AppState>,
    ValidQuery(q): ValidQuery<PostListQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Post>>>> {
    let page = q.paging();
    let mut filter = q.filter();
    filter.status = Some(PostStatus::Published);
    let (items, total) = repo::list(&state.db, &filter, page.limit, page.offset()).await?;
    Ok(ApiResponse::page("Posts fetched", items, page.describe(total)))
}

#[instrument(skip(state))]
pub async fn get_published(
    State(state): State<AppState>,
    ValidPath(slug): ValidPath<String>,
) -> ApiResult<Json<ApiResponse<Post>>> {
    let post = repo::find_published_by_slug(&state.db, &slug)
        .await?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;
    Ok(ApiResponse::ok("Post fetched", post))
}
