use serde::Deserialize;
use validator::{Validate, ValidationError};

use super::repo_types::{Post, PostFilter, PostStatus};
use crate::{
    extract::trimmed,
    pagination::{Page, PageQuery},
};

const MAX_TAGS: usize = 20;
const MAX_TAG_LEN: usize = 50;

fn check_tags(tags: &[String]) -> Result<(), ValidationError> {
    if tags.len() > MAX_TAGS {
        return Err(ValidationError::new("tags")
            .with_message(format!("At most {MAX_TAGS} tags are allowed").into()));
    }
    if tags.iter().any(|t| t.trim().chars().count() > MAX_TAG_LEN) {
        return Err(ValidationError::new("tags")
            .with_message(format!("Tags must be at most {MAX_TAG_LEN} characters").into()));
    }
    Ok(())
}

/// Trimmed, blank entries dropped, first occurrence wins.
pub fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for t in tags {
        let t = t.trim();
        if !t.is_empty() && !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(
        required(message = "Title is required"),
        length(min = 1, max = 200, message = "Title must be 1-200 characters")
    )]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(
        required(message = "Content is required"),
        length(min = 1, message = "Content is required")
    )]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(max = 300, message = "Excerpt must be at most 300 characters"))]
    pub excerpt: Option<String>,
    pub status: Option<PostStatus>,
    #[validate(custom(function = "check_tags"))]
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(max = 100, message = "Category must be at most 100 characters"))]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    pub meta_title: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    pub meta_description: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(max = 300, message = "Excerpt must be at most 300 characters"))]
    pub excerpt: Option<String>,
    pub status: Option<PostStatus>,
    #[validate(custom(function = "check_tags"))]
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(max = 100, message = "Category must be at most 100 characters"))]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    pub meta_title: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    pub meta_description: Option<String>,
}

impl UpdatePostRequest {
    /// Returns whether the title changed.
    pub fn apply(self, p: &mut Post) -> bool {
        let renamed = self.title.as_ref().is_some_and(|t| *t != p.title);
        if let Some(v) = self.title {
            p.title = v;
        }
        if let Some(v) = self.content {
            p.content = v;
        }
        if let Some(v) = self.status {
            p.status = v;
        }
        if let Some(v) = self.tags {
            p.tags = clean_tags(v);
        }
        if self.excerpt.is_some() {
            p.excerpt = self.excerpt;
        }
        if self.category.is_some() {
            p.category = self.category;
        }
        if self.meta_title.is_some() {
            p.meta_title = self.meta_title;
        }
        if self.meta_description.is_some() {
            p.meta_description = self.meta_description;
        }
        renamed
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PostListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<PostStatus>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

fn non_blank(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl PostListQuery {
    pub fn paging(&self) -> Page {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
        .resolve()
    }

    pub fn filter(&self) -> PostFilter {
        PostFilter {
            status: self.status,
            category: non_blank(&self.category),
            tag: non_blank(&self.tag),
            search: non_blank(&self.search),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::collect_messages;
    use axum::{extract::Query, http::Uri};
    use serde_json::json;

    #[test]
    fn title_and_content_are_required() {
        let body: CreatePostRequest = serde_json::from_value(json!({"title": "  "})).unwrap();
        let msgs = collect_messages(&body.validate().unwrap_err());
        assert!(msgs.contains(&"Content is required".to_string()));
        assert!(msgs.contains(&"Title must be 1-200 characters".to_string()));
    }

    #[test]
    fn too_many_tags_are_rejected() {
        let tags: Vec<String> = (0..21).map(|i| format!("t{i}")).collect();
        let body: CreatePostRequest = serde_json::from_value(json!({
            "title": "Dharma talk",
            "content": "...",
            "tags": tags,
        }))
        .unwrap();
        let msgs = collect_messages(&body.validate().unwrap_err());
        assert_eq!(msgs, vec!["At most 20 tags are allowed"]);
    }

    #[test]
    fn tags_are_cleaned() {
        let tags = vec![" zen ".into(), "".into(), "zen".into(), "sangha".into()];
        assert_eq!(clean_tags(tags), vec!["zen", "sangha"]);
    }

    #[test]
    fn list_query_drops_blank_filters() {
        let uri: Uri = "/posts?status=draft&search=%20%20&tag=zen&page=2"
            .parse()
            .unwrap();
        let Query(q) = Query::<PostListQuery>::try_from_uri(&uri).unwrap();
        let f = q.filter();
        assert_eq!(f.status, Some(PostStatus::Draft));
        assert!(f.search.is_none());
        assert_eq!(f.tag.as_deref(), Some("zen"));
        assert_eq!(q.paging().page, 2);
    }
}
