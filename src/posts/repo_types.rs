use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::accounts::Asset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(PostStatus::Draft),
            "published" => Some(PostStatus::Published),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PostRow {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub status: String,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub banner_url: Option<String>,
    pub banner_public_id: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub created_by: Uuid,
    pub published_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub status: PostStatus,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub banner: Option<Asset>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub created_by: Uuid,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl TryFrom<PostRow> for Post {
    type Error = anyhow::Error;

    fn try_from(r: PostRow) -> Result<Self, Self::Error> {
        let status = PostStatus::parse(&r.status)
            .ok_or_else(|| anyhow::anyhow!("unknown post status {:?}", r.status))?;
        let banner = match (r.banner_url, r.banner_public_id) {
            (Some(url), Some(public_id)) => Some(Asset { url, public_id }),
            _ => None,
        };
        Ok(Self {
            id: r.id,
            title: r.title,
            slug: r.slug,
            excerpt: r.excerpt,
            content: r.content,
            status,
            tags: r.tags,
            category: r.category,
            banner,
            meta_title: r.meta_title,
            meta_description: r.meta_description,
            created_by: r.created_by,
            published_at: r.published_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

impl Post {
    /// Stamps the first publication time; later edits keep it.
    pub fn mark_published(&mut self, now: OffsetDateTime) {
        if self.status == PostStatus::Published && self.published_at.is_none() {
            self.published_at = Some(now);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn post(status: PostStatus) -> Post {
        Post {
            id: Uuid::nil(),
            title: "Walking meditation".into(),
            slug: "walking-meditation".into(),
            excerpt: None,
            content: "Step by step.".into(),
            status,
            tags: vec!["practice".into()],
            category: None,
            banner: None,
            meta_title: None,
            meta_description: None,
            created_by: Uuid::nil(),
            published_at: None,
            created_at: datetime!(2025-01-01 0:00 UTC),
            updated_at: datetime!(2025-01-01 0:00 UTC),
        }
    }

    #[test]
    fn publication_time_is_set_once() {
        let first = datetime!(2025-02-01 9:00 UTC);
        let mut p = post(PostStatus::Published);
        p.mark_published(first);
        p.mark_published(datetime!(2025-03-01 9:00 UTC));
        assert_eq!(p.published_at, Some(first));

        let mut d = post(PostStatus::Draft);
        d.mark_published(first);
        assert!(d.published_at.is_none());
    }
}
