use serde::Deserialize;
use validator::Validate;

use crate::{
    accounts::{AccountFilter, AccountPatch, Role},
    extract::{email, trimmed, EMAIL_RE, PHONE_RE},
    pagination::{Page, PageQuery},
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAdminRequest {
    #[serde(default, deserialize_with = "email")]
    #[validate(
        length(min = 1, message = "Email is required"),
        regex(path = *EMAIL_RE, message = "Invalid email format")
    )]
    pub email: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(
        required(message = "Full name is required"),
        length(min = 1, max = 100, message = "Full name must be 1-100 characters")
    )]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(regex(path = *PHONE_RE, message = "Phone must be 9-15 digits"))]
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateAdminRequest {
    #[serde(default, deserialize_with = "optional_email")]
    #[validate(regex(path = *EMAIL_RE, message = "Invalid email format"))]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100, message = "Full name must be 1-100 characters"))]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(regex(path = *PHONE_RE, message = "Phone must be 9-15 digits"))]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

fn optional_email<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(de)?;
    Ok(raw.as_deref().map(crate::extract::normalize_email))
}

impl UpdateAdminRequest {
    pub fn into_patch(self) -> AccountPatch {
        AccountPatch {
            email: self.email,
            full_name: self.full_name,
            phone: self.phone,
            is_active: self.is_active,
            ..Default::default()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub role: Option<Role>,
    pub is_verified: Option<bool>,
    pub search: Option<String>,
}

impl AdminListQuery {
    pub fn paging(&self) -> Page {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
        .resolve()
    }

    pub fn filter(&self) -> AccountFilter {
        AccountFilter {
            role: self.role,
            is_verified: self.is_verified,
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }
}
