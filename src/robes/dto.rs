use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::repo_types::{NewRobe, RobeKind, RobeStatus};
use crate::extract::trimmed;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRobeRequest {
    #[serde(rename = "type")]
    #[validate(required(message = "Type is required"))]
    pub kind: Option<RobeKind>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(max = 20, message = "Size must be at most 20 characters"))]
    pub size: Option<String>,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: Option<i32>,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    pub notes: Option<String>,
}

impl CreateRobeRequest {
    /// `None` when the kind is missing; validation reports that first.
    pub fn into_new(self, participant_id: Uuid) -> Option<NewRobe> {
        Some(NewRobe {
            participant_id,
            kind: self.kind?,
            size: self.size.filter(|s| !s.is_empty()),
            quantity: self.quantity.unwrap_or(1),
            price: self.price.unwrap_or(0.0),
            notes: self.notes,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateRobeRequest {
    pub status: Option<RobeStatus>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    pub notes: Option<String>,
}
