//! URL slugs for retreats and posts.
//!
//! Titles are folded to ASCII (Vietnamese diacritics included), lowercased and
//! reduced to `a-z0-9-` with single separators. Collisions get a numeric
//! `-n` suffix.

use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

pub const MAX_LEN: usize = 120;

fn fold(ch: char) -> char {
    match ch {
        'à' | 'á' | 'ả' | 'ã' | 'ạ' | 'ă' | 'ằ' | 'ắ' | 'ẳ' | 'ẵ' | 'ặ' | 'â' | 'ầ' | 'ấ' | 'ẩ'
        | 'ẫ' | 'ậ' | 'ä' | 'å' => 'a',
        'è' | 'é' | 'ẻ' | 'ẽ' | 'ẹ' | 'ê' | 'ề' | 'ế' | 'ể' | 'ễ' | 'ệ' | 'ë' => 'e',
        'ì' | 'í' | 'ỉ' | 'ĩ' | 'ị' | 'î' | 'ï' => 'i',
        'ò' | 'ó' | 'ỏ' | 'õ' | 'ọ' | 'ô' | 'ồ' | 'ố' | 'ổ' | 'ỗ' | 'ộ' | 'ơ' | 'ờ' | 'ớ' | 'ở'
        | 'ỡ' | 'ợ' | 'ö' => 'o',
        'ù' | 'ú' | 'ủ' | 'ũ' | 'ụ' | 'ư' | 'ừ' | 'ứ' | 'ử' | 'ữ' | 'ự' | 'û' | 'ü' => 'u',
        'ỳ' | 'ý' | 'ỷ' | 'ỹ' | 'ỵ' | 'ÿ' => 'y',
        'đ' => 'd',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

/// `None` when nothing slug-worthy is left of the input.
pub fn slugify(input: &str) -> Option<String> {
    let mut slug = String::new();
    let mut prev_dash = false;
    for ch in input.trim().to_lowercase().chars().map(fold) {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    let truncated: String = slug.trim_matches('-').chars().take(MAX_LEN).collect();
    let normalized = truncated.trim_end_matches('-').to_string();
    (!normalized.is_empty()).then_some(normalized)
}

pub fn with_suffix(base: &str, suffix: usize) -> String {
    let suffix = format!("-{suffix}");
    let allowed = MAX_LEN.saturating_sub(suffix.len());
    let base_part: String = base.chars().take(allowed).collect();
    format!("{}{suffix}", base_part.trim_end_matches('-'))
}

/// Tables that carry a unique `slug` column.
#[derive(Debug, Clone, Copy)]
pub enum SlugTable {
    Retreats,
    Posts,
}

impl SlugTable {
    fn name(self) -> &'static str {
        match self {
            SlugTable::Retreats => "retreats",
            SlugTable::Posts => "posts",
        }
    }
}

/// First free slug for `title`, ignoring the row `current` (the one being
/// renamed).
pub async fn unique_slug(
    db: &PgPool,
    table: SlugTable,
    title: &str,
    current: Option<Uuid>,
) -> anyhow::Result<String> {
    let base = slugify(title).unwrap_or_else(|| "untitled".to_string());
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
        table.name()
    );
    let mut candidate = base.clone();
    let mut n = 0;
    loop {
        let taken: bool = sqlx::query_scalar(&sql)
            .bind(&candidate)
            .bind(current)
            .fetch_one(db)
            .await
            .context("check slug")?;
        if !taken {
            return Ok(candidate);
        }
        n += 1;
        candidate = with_suffix(&base, n);
    }
}
