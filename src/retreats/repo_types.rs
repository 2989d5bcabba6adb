use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{accounts::Asset, dates::iso_date};

#[derive(Debug, Clone, FromRow)]
pub struct RetreatRow {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub description: Option<String>,
    pub location: String,
    pub start_time: String,
    pub end_time: String,
    pub start_date: Date,
    pub end_date: Date,
    pub max_participants: i32,
    pub price: f64,
    pub is_published: bool,
    pub created_by: Uuid,
    pub thumbnail_url: Option<String>,
    pub thumbnail_public_id: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub participant_count: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Retreat {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub description: Option<String>,
    pub location: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(with = "iso_date")]
    pub start_date: Date,
    #[serde(with = "iso_date")]
    pub end_date: Date,
    /// 0 means no limit.
    pub max_participants: i32,
    pub price: f64,
    pub is_published: bool,
    pub created_by: Uuid,
    pub thumbnail: Option<Asset>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    /// Registrations that are not cancelled.
    pub participant_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<RetreatRow> for Retreat {
    fn from(r: RetreatRow) -> Self {
        let thumbnail = match (r.thumbnail_url, r.thumbnail_public_id) {
            (Some(url), Some(public_id)) => Some(Asset { url, public_id }),
            _ => None,
        };
        Self {
            id: r.id,
            title: r.title,
            slug: r.slug,
            excerpt: r.excerpt,
            description: r.description,
            location: r.location,
            start_time: r.start_time,
            end_time: r.end_time,
            start_date: r.start_date,
            end_date: r.end_date,
            max_participants: r.max_participants,
            price: r.price,
            is_published: r.is_published,
            created_by: r.created_by,
            thumbnail,
            meta_title: r.meta_title,
            meta_description: r.meta_description,
            participant_count: r.participant_count,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// `max_participants` of 0 means no limit.
pub fn has_room(max_participants: i32, active: i64) -> bool {
    max_participants <= 0 || active < i64::from(max_participants)
}

#[derive(Debug, Clone, Default)]
pub struct RetreatFilter {
    pub is_published: Option<bool>,
    pub start_from: Option<Date>,
    pub end_until: Option<Date>,
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity() {
        assert!(has_room(0, 500));
        assert!(has_room(10, 9));
        assert!(!has_room(10, 10));
        assert!(!has_room(1, 3));
    }
}
