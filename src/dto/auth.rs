use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{entity::enums::Role, models::Address};

#[derive(Deserialize, Debug, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub nom: String,
    #[validate(length(min = 1, message = "First name is required"))]
    pub prenom: String,
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub telephone: Option<String>,
    pub adresse: Option<Address>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Partial profile edit; absent or blank fields keep their current value.
#[derive(Deserialize, Debug, Default, ToSchema, Validate)]
pub struct UpdateProfileRequest {
    pub nom: Option<String>,
    pub prenom: Option<String>,
    #[validate(email(message = "Invalid email"))]
    pub email: Option<String>,
    pub telephone: Option<String>,
    pub adresse: Option<Address>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
}

/// Returned by register, login and profile update.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub nom: String,
    pub prenom: String,
    pub email: String,
    pub role: Role,
    pub token: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: usize,
}

/// Emails are stored trimmed and lowercased.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register() -> RegisterRequest {
        RegisterRequest {
            nom: "Trabelsi".into(),
            prenom: "Sami".into(),
            email: "sami@example.com".into(),
            password: "secret1".into(),
            telephone: None,
            adresse: None,
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(register().validate().is_ok());
    }

    #[test]
    fn short_password_and_bad_email_fail() {
        let mut req = register();
        req.password = "12345".into();
        assert!(req.validate().is_err());

        let mut req = register();
        req.email = "not-an-email".into();
        assert!(req.validate().is_err());
    }

    #[test]
    fn profile_update_only_validates_present_fields() {
        assert!(UpdateProfileRequest::default().validate().is_ok());
        let req = UpdateProfileRequest {
            password: Some("abc".into()),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Sami@Example.COM "), "sami@example.com");
    }
}
