use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Post, PostFilter, PostRow, PostStatus};
use crate::accounts::{store::like_pattern, Asset};

const COLUMNS: &str = r#"
    id, title, slug, excerpt, content, status, tags, category,
    banner_url, banner_public_id, meta_title, meta_description,
    created_by, published_at, created_at, updated_at
"#;

const FILTER: &str = r#"
    WHERE ($1::text IS NULL OR status = $1)
      AND ($2::text IS NULL OR category = $2)
      AND ($3::text IS NULL OR $3 = ANY(tags))
      AND ($4::text IS NULL OR title ILIKE $4 OR excerpt ILIKE $4 OR content ILIKE $4)
"#;

pub async fn insert(db: &PgPool, p: &Post) -> anyhow::Result<Post> {
    let row = sqlx::query_as::<_, PostRow>(&format!(
        r#"
        INSERT INTO posts (id, title, slug, excerpt, content, status, tags, category,
                           meta_title, meta_description, created_by, published_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(p.id)
    .bind(&p.title)
    .bind(&p.slug)
    .bind(&p.excerpt)
    .bind(&p.content)
    .bind(p.status.as_str())
    .bind(&p.tags)
    .bind(&p.category)
    .bind(&p.meta_title)
    .bind(&p.meta_description)
    .bind(p.created_by)
    .bind(p.published_at)
    .fetch_one(db)
    .await
    .context("insert post")?;
    Post::try_from(row)
}

pub async fn save(db: &PgPool, p: &Post) -> anyhow::Result<Option<Post>> {
    let row = sqlx::query_as::<_, PostRow>(&format!(
        r#"
        UPDATE posts
           SET title = $2, slug = $3, excerpt = $4, content = $5, status = $6,
               tags = $7, category = $8, meta_title = $9, meta_description = $10,
               published_at = $11, updated_at = now()
         WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(p.id)
    .bind(&p.title)
    .bind(&p.slug)
    .bind(&p.excerpt)
    .bind(&p.content)
    .bind(p.status.as_str())
    .bind(&p.tags)
    .bind(&p.category)
    .bind(&p.meta_title)
    .bind(&p.meta_description)
    .bind(p.published_at)
    .fetch_optional(db)
    .await
    .context("update post")?;
    row.map(Post::try_from).transpose()
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Post>> {
    let row = sqlx::query_as::<_, PostRow>(&format!("SELECT {COLUMNS} FROM posts WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find post")?;
    row.map(Post::try_from).transpose()
}

pub async fn find_published_by_slug(db: &PgPool, slug: &str) -> anyhow::Result<Option<Post>> {
    let row = sqlx::query_as::<_, PostRow>(&format!(
        "SELECT {COLUMNS} FROM posts WHERE slug = $1 AND status = 'published'"
    ))
    .bind(slug)
    .fetch_optional(db)
    .await
    .context("find post by slug")?;
    row.map(Post::try_from).transpose()
}

/// Newest first; published posts by publication time.
pub async fn list(
    db: &PgPool,
    f: &PostFilter,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<Post>, i64)> {
    let status = f.status.map(PostStatus::as_str);
    let search = f.search.as_deref().map(like_pattern);

    let rows = sqlx::query_as::<_, PostRow>(&format!(
        "SELECT {COLUMNS} FROM posts {FILTER} ORDER BY published_at DESC NULLS LAST, created_at DESC LIMIT $5 OFFSET $6"
    ))
    .bind(status)
    .bind(&f.category)
    .bind(&f.tag)
    .bind(&search)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list posts")?;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM posts {FILTER}"))
        .bind(status)
        .bind(&f.category)
        .bind(&f.tag)
        .bind(&search)
        .fetch_one(db)
        .await
        .context("count posts")?;

    let posts = rows
        .into_iter()
        .map(Post::try_from)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok((posts, total))
}

pub async fn set_banner(db: &PgPool, id: Uuid, asset: &Asset) -> anyhow::Result<Option<Post>> {
    let row = sqlx::query_as::<_, PostRow>(&format!(
        r#"
        UPDATE posts
           SET banner_url = $2, banner_public_id = $3, updated_at = now()
         WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&asset.url)
    .bind(&asset.public_id)
    .fetch_optional(db)
    .await
    .context("set post banner")?;
    row.map(Post::try_from).transpose()
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete post")?;
    Ok(res.rows_affected() > 0)
}
