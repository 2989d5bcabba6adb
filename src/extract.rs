use axum::{
    async_trait,
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Multipart, Path, Query, Request,
    },
    http::request::Parts,
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::error::ApiError;

lazy_static! {
    pub static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    pub static ref PHONE_RE: Regex = Regex::new(r"^[0-9]{9,15}$").unwrap();
    pub static ref OTP_RE: Regex = Regex::new(r"^[0-9]{6}$").unwrap();
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// serde hook so emails are normalized before any validation or lookup.
pub fn email<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(de)?;
    Ok(raw.as_deref().map(normalize_email).unwrap_or_default())
}

pub fn trimmed<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(de)?;
    Ok(raw.map(|s| s.trim().to_string()))
}

/// Flattens every field message into one list, ordered by field name.
pub fn collect_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    let mut out = Vec::new();
    for (field, kind) in fields {
        match kind {
            ValidationErrorsKind::Field(list) => {
                for e in list {
                    out.push(
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("{field} is invalid")),
                    );
                }
            }
            ValidationErrorsKind::Struct(inner) => out.extend(collect_messages(inner)),
            ValidationErrorsKind::List(items) => {
                for inner in items.values() {
                    out.extend(collect_messages(inner));
                }
            }
        }
    }
    out
}

/// JSON body that has been deserialized and validated.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e: JsonRejection| ApiError::Validation(vec![e.body_text()]))?;
        value
            .validate()
            .map_err(|e| ApiError::Validation(collect_messages(&e)))?;
        Ok(ValidatedJson(value))
    }
}

/// `Path` whose rejection keeps the response envelope.
pub struct ValidPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e: PathRejection| ApiError::Validation(vec![e.body_text()]))?;
        Ok(ValidPath(value))
    }
}

/// `Query` whose rejection keeps the response envelope.
pub struct ValidQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e: QueryRejection| ApiError::Validation(vec![e.body_text()]))?;
        Ok(ValidQuery(value))
    }
}

/// Multipart body; a missing or malformed boundary is a validation error.
pub struct Upload(pub Multipart);

#[async_trait]
impl<S> FromRequest<S> for Upload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mp = Multipart::from_request(req, state)
            .await
            .map_err(|e: MultipartRejection| ApiError::Validation(vec![e.body_text()]))?;
        Ok(Upload(mp))
    }
}
