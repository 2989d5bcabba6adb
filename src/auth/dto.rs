use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    accounts::{AccountPatch, Role},
    dates::iso_date,
    extract::{email, trimmed, EMAIL_RE, OTP_RE, PHONE_RE},
};

#[derive(Debug, Deserialize, Validate)]
pub struct EmailRequest {
    #[serde(default, deserialize_with = "email")]
    #[validate(
        length(min = 1, message = "Email is required"),
        regex(path = *EMAIL_RE, message = "Invalid email format")
    )]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[serde(default, deserialize_with = "email")]
    #[validate(
        length(min = 1, message = "Email is required"),
        regex(path = *EMAIL_RE, message = "Invalid email format")
    )]
    pub email: String,
    #[serde(default)]
    #[validate(regex(path = *OTP_RE, message = "OTP must be 6 digits"))]
    pub otp: String,
}

pub(crate) fn validate_gender(value: &str) -> Result<(), ValidationError> {
    match value {
        "male" | "female" | "other" => Ok(()),
        _ => Err(ValidationError::new("gender")
            .with_message("Gender must be male, female or other".into())),
    }
}

pub(crate) fn validate_marital_status(value: &str) -> Result<(), ValidationError> {
    match value {
        "single" | "married" => Ok(()),
        _ => Err(ValidationError::new("marital_status")
            .with_message("Marital status must be single or married".into())),
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateMemberMe {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100, message = "Full name must be 1-100 characters"))]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(regex(path = *PHONE_RE, message = "Phone must be 9-15 digits"))]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(max = 100, message = "Dharma name must be at most 100 characters"))]
    pub dharma_name: Option<String>,
    #[serde(default, with = "iso_date::option")]
    pub ordination_date: Option<Date>,
    #[serde(default, with = "iso_date::option")]
    pub date_of_birth: Option<Date>,
    #[serde(default)]
    #[validate(custom(function = "validate_gender"))]
    pub gender: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "validate_marital_status"))]
    pub marital_status: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(max = 255, message = "Address must be at most 255 characters"))]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    pub notes: Option<String>,
}

impl UpdateMemberMe {
    pub fn into_patch(self) -> AccountPatch {
        AccountPatch {
            full_name: self.full_name,
            phone: self.phone,
            dharma_name: self.dharma_name,
            ordination_date: self.ordination_date,
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            marital_status: self.marital_status,
            address: self.address,
            notes: self.notes,
            ..Default::default()
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateAdminMe {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100, message = "Full name must be 1-100 characters"))]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(regex(path = *PHONE_RE, message = "Phone must be 9-15 digits"))]
    pub phone: Option<String>,
}

impl UpdateAdminMe {
    pub fn into_patch(self) -> AccountPatch {
        AccountPatch {
            full_name: self.full_name,
            phone: self.phone,
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: SessionUser,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::collect_messages;

    #[test]
    fn member_update_reports_every_bad_field() {
        let body: UpdateMemberMe = serde_json::from_str(
            r#"{"phone":"12-34","gender":"robot","notes":"ok","date_of_birth":"1990-04-02"}"#,
        )
        .unwrap();
        let msgs = collect_messages(&body.validate().unwrap_err());
        assert_eq!(
            msgs,
            vec![
                "Gender must be male, female or other".to_string(),
                "Phone must be 9-15 digits".to_string(),
            ]
        );
    }

    #[test]
    fn member_update_patch_keeps_absent_fields_empty() {
        let body: UpdateMemberMe =
            serde_json::from_str(r#"{"full_name":"  Minh Chau ","is_monk":true}"#).unwrap();
        assert!(body.validate().is_ok());
        let patch = body.into_patch();
        assert_eq!(patch.full_name.as_deref(), Some("Minh Chau"));
        assert!(patch.phone.is_none());
        assert!(patch.email.is_none());
    }

    #[test]
    fn bad_date_is_a_parse_error() {
        assert!(serde_json::from_str::<UpdateMemberMe>(r#"{"date_of_birth":"02/04/1990"}"#).is_err());
    }
}
