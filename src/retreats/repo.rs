use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Retreat, RetreatFilter, RetreatRow};
use crate::accounts::{store::like_pattern, Asset};

const COLUMNS: &str = r#"
    r.id, r.title, r.slug, r.excerpt, r.description, r.location,
    r.start_time, r.end_time, r.start_date, r.end_date,
    r.max_participants, r.price, r.is_published, r.created_by,
    r.thumbnail_url, r.thumbnail_public_id, r.meta_title, r.meta_description,
    (SELECT COUNT(*) FROM participants p
      WHERE p.retreat_id = r.id AND p.status <> 'cancelled') AS participant_count,
    r.created_at, r.updated_at
"#;

const FILTER: &str = r#"
    WHERE ($1::bool IS NULL OR r.is_published = $1)
      AND ($2::date IS NULL OR r.start_date >= $2)
      AND ($3::date IS NULL OR r.end_date <= $3)
      AND ($4::text IS NULL OR r.title ILIKE $4 OR r.location ILIKE $4 OR r.description ILIKE $4)
"#;

/// `r` carries the final field values; `id`, timestamps and the count are
/// assigned by the database.
pub async fn insert(db: &PgPool, r: &Retreat) -> anyhow::Result<Retreat> {
    let row = sqlx::query_as::<_, RetreatRow>(&format!(
        r#"
        INSERT INTO retreats AS r (id, title, slug, excerpt, description, location,
                                   start_time, end_time, start_date, end_date,
                                   max_participants, price, is_published, created_by,
                                   meta_title, meta_description)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(r.id)
    .bind(&r.title)
    .bind(&r.slug)
    .bind(&r.excerpt)
    .bind(&r.description)
    .bind(&r.location)
    .bind(&r.start_time)
    .bind(&r.end_time)
    .bind(r.start_date)
    .bind(r.end_date)
    .bind(r.max_participants)
    .bind(r.price)
    .bind(r.is_published)
    .bind(r.created_by)
    .bind(&r.meta_title)
    .bind(&r.meta_description)
    .fetch_one(db)
    .await
    .context("insert retreat")?;
    Ok(row.into())
}

pub async fn save(db: &PgPool, r: &Retreat) -> anyhow::Result<Option<Retreat>> {
    let row = sqlx::query_as::<_, RetreatRow>(&format!(
        r#"
        UPDATE retreats AS r
           SET title = $2, slug = $3, excerpt = $4, description = $5, location = $6,
               start_time = $7, end_time = $8, start_date = $9, end_date = $10,
               max_participants = $11, price = $12, is_published = $13,
               meta_title = $14, meta_description = $15, updated_at = now()
         WHERE r.id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(r.id)
    .bind(&r.title)
    .bind(&r.slug)
    .bind(&r.excerpt)
    .bind(&r.description)
    .bind(&r.location)
    .bind(&r.start_time)
    .bind(&r.end_time)
    .bind(r.start_date)
    .bind(r.end_date)
    .bind(r.max_participants)
    .bind(r.price)
    .bind(r.is_published)
    .bind(&r.meta_title)
    .bind(&r.meta_description)
    .fetch_optional(db)
    .await
    .context("update retreat")?;
    Ok(row.map(Retreat::from))
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Retreat>> {
    let row = sqlx::query_as::<_, RetreatRow>(&format!(
        "SELECT {COLUMNS} FROM retreats r WHERE r.id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find retreat")?;
    Ok(row.map(Retreat::from))
}

pub async fn find_published_by_slug(db: &PgPool, slug: &str) -> anyhow::Result<Option<Retreat>> {
    let row = sqlx::query_as::<_, RetreatRow>(&format!(
        "SELECT {COLUMNS} FROM retreats r WHERE r.slug = $1 AND r.is_published"
    ))
    .bind(slug)
    .fetch_optional(db)
    .await
    .context("find retreat by slug")?;
    Ok(row.map(Retreat::from))
}

/// Sorted by start date, soonest first.
pub async fn list(
    db: &PgPool,
    f: &RetreatFilter,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<Retreat>, i64)> {
    let search = f.search.as_deref().map(like_pattern);

    let rows = sqlx::query_as::<_, RetreatRow>(&format!(
        "SELECT {COLUMNS} FROM retreats r {FILTER} ORDER BY r.start_date ASC, r.created_at DESC LIMIT $5 OFFSET $6"
    ))
    .bind(f.is_published)
    .bind(f.start_from)
    .bind(f.end_until)
    .bind(&search)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list retreats")?;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM retreats r {FILTER}"))
        .bind(f.is_published)
        .bind(f.start_from)
        .bind(f.end_until)
        .bind(&search)
        .fetch_one(db)
        .await
        .context("count retreats")?;

    Ok((rows.into_iter().map(Retreat::from).collect(), total))
}

pub async fn set_thumbnail(db: &PgPool, id: Uuid, asset: &Asset) -> anyhow::Result<Option<Retreat>> {
    let row = sqlx::query_as::<_, RetreatRow>(&format!(
        r#"
        UPDATE retreats AS r
           SET thumbnail_url = $2, thumbnail_public_id = $3, updated_at = now()
         WHERE r.id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&asset.url)
    .bind(&asset.public_id)
    .fetch_optional(db)
    .await
    .context("set retreat thumbnail")?;
    Ok(row.map(Retreat::from))
}

/// Participants and their robe transactions go with it (FK cascade).
pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM retreats WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete retreat")?;
    Ok(res.rows_affected() > 0)
}
