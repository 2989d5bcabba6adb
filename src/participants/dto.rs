use serde::Deserialize;
use validator::Validate;

use super::repo_types::{ParticipantChanges, ParticipantStatus, PaymentStatus};
use crate::extract::trimmed;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RosterQuery {
    pub status: Option<ParticipantStatus>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateParticipantRequest {
    pub status: Option<ParticipantStatus>,
    pub payment_status: Option<PaymentStatus>,
    #[validate(range(min = 0.0, message = "Payment amount cannot be negative"))]
    pub payment_amount: Option<f64>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    pub notes: Option<String>,
}

impl UpdateParticipantRequest {
    pub fn into_changes(self) -> ParticipantChanges {
        ParticipantChanges {
            status: self.status,
            payment_status: self.payment_status,
            payment_amount: self.payment_amount,
            notes: self.notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::Uri};
    use serde_json::json;

    #[test]
    fn update_parses_lowercase_statuses() {
        let body: UpdateParticipantRequest = serde_json::from_value(json!({
            "status": "confirmed",
            "payment_status": "paid",
            "payment_amount": 1500000.0
        }))
        .unwrap();
        assert!(body.validate().is_ok());
        let c = body.into_changes();
        assert_eq!(c.status, Some(ParticipantStatus::Confirmed));
        assert_eq!(c.payment_status, Some(PaymentStatus::Paid));
        assert!(c.notes.is_none());
    }

    #[test]
    fn negative_payment_is_rejected() {
        let body: UpdateParticipantRequest =
            serde_json::from_value(json!({"payment_amount": -1.0})).unwrap();
        assert!(body.validate().is_err());
    }

    #[test]
    fn unknown_status_does_not_deserialize() {
        let res = serde_json::from_value::<UpdateParticipantRequest>(json!({"status": "maybe"}));
        assert!(res.is_err());
    }

    #[test]
    fn roster_query_reads_status() {
        let uri: Uri = "/x?status=cancelled".parse().unwrap();
        let Query(q) = Query::<RosterQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(q.status, Some(ParticipantStatus::Cancelled));
    }
}
