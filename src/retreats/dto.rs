use serde::Deserialize;
use time::Date;
use validator::{Validate, ValidationError};

use super::repo_types::{Retreat, RetreatFilter};
use crate::{
    dates::iso_date,
    extract::trimmed,
    pagination::{Page, PageQuery},
};

pub const DATE_ORDER: &str = "End date must be on or after start date";

fn check_dates(body: &CreateRetreatRequest) -> Result<(), ValidationError> {
    match (body.start_date, body.end_date) {
        (Some(start), Some(end)) if end < start => {
            Err(ValidationError::new("date_order").with_message(DATE_ORDER.into()))
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "check_dates"))]
pub struct CreateRetreatRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(
        required(message = "Title is required"),
        length(min = 1, max = 200, message = "Title must be 1-200 characters")
    )]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(max = 300, message = "Excerpt must be at most 300 characters"))]
    pub excerpt: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(
        required(message = "Location is required"),
        length(min = 1, max = 200, message = "Location must be 1-200 characters")
    )]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(
        required(message = "Start time is required"),
        length(min = 1, max = 20, message = "Start time must be 1-20 characters")
    )]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(
        required(message = "End time is required"),
        length(min = 1, max = 20, message = "End time must be 1-20 characters")
    )]
    pub end_time: Option<String>,
    #[serde(default, with = "iso_date::option")]
    #[validate(required(message = "Start date is required"))]
    pub start_date: Option<Date>,
    #[serde(default, with = "iso_date::option")]
    #[validate(required(message = "End date is required"))]
    pub end_date: Option<Date>,
    #[validate(range(min = 1, message = "Max participants must be at least 1"))]
    pub max_participants: Option<i32>,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,
    pub is_published: Option<bool>,
    #[serde(default, deserialize_with = "trimmed")]
    pub meta_title: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    pub meta_description: Option<String>,
}

/// Same fields as creation, all optional.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateRetreatRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(max = 300, message = "Excerpt must be at most 300 characters"))]
    pub excerpt: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 200, message = "Location must be 1-200 characters"))]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 20, message = "Start time must be 1-20 characters"))]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 20, message = "End time must be 1-20 characters"))]
    pub end_time: Option<String>,
    #[serde(default, with = "iso_date::option")]
    pub start_date: Option<Date>,
    #[serde(default, with = "iso_date::option")]
    pub end_date: Option<Date>,
    #[validate(range(min = 1, message = "Max participants must be at least 1"))]
    pub max_participants: Option<i32>,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,
    pub is_published: Option<bool>,
    #[serde(default, deserialize_with = "trimmed")]
    pub meta_title: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    pub meta_description: Option<String>,
}

impl UpdateRetreatRequest {
    /// Merges the given fields into `r`. Returns whether the title changed.
    pub fn apply(self, r: &mut Retreat) -> bool {
        let renamed = self.title.as_ref().is_some_and(|t| *t != r.title);
        if let Some(v) = self.title {
            r.title = v;
        }
        if let Some(v) = self.location {
            r.location = v;
        }
        if let Some(v) = self.start_time {
            r.start_time = v;
        }
        if let Some(v) = self.end_time {
            r.end_time = v;
        }
        if let Some(v) = self.start_date {
            r.start_date = v;
        }
        if let Some(v) = self.end_date {
            r.end_date = v;
        }
        if let Some(v) = self.max_participants {
            r.max_participants = v;
        }
        if let Some(v) = self.price {
            r.price = v;
        }
        if let Some(v) = self.is_published {
            r.is_published = v;
        }
        if self.excerpt.is_some() {
            r.excerpt = self.excerpt;
        }
        if self.description.is_some() {
            r.description = self.description;
        }
        if self.meta_title.is_some() {
            r.meta_title = self.meta_title;
        }
        if self.meta_description.is_some() {
            r.meta_description = self.meta_description;
        }
        renamed
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RetreatListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub is_published: Option<bool>,
    #[serde(default, with = "iso_date::option")]
    pub start_date: Option<Date>,
    #[serde(default, with = "iso_date::option")]
    pub end_date: Option<Date>,
    pub search: Option<String>,
}

impl RetreatListQuery {
    pub fn paging(&self) -> Page {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
        .resolve()
    }

    pub fn filter(&self) -> RetreatFilter {
        RetreatFilter {
            is_published: self.is_published,
            start_from: self.start_date,
            end_until: self.end_date,
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }
}
