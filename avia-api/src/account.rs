use avia_core::User;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::error::{AppError, FieldErrors};

pub const MIN_PASSWORD_LEN: usize = 8;

/// The user fields shared by registration and profile edits.
#[derive(Debug, Clone, Validate)]
pub struct AccountFields {
    #[validate(length(min = 2, max = 100, message = "Must be between 2 and 100 characters"))]
    pub first_name: String,
    #[validate(length(min = 2, max = 100, message = "Must be between 2 and 100 characters"))]
    pub last_name: String,
    #[validate(
        length(min = 10, max = 20, message = "Must be between 10 and 20 digits"),
        custom(function = "digits_only")
    )]
    pub phone: String,
    #[validate(length(min = 1, max = 50, message = "Must be between 1 and 50 characters"))]
    pub document_number: String,
}

fn digits_only(phone: &str) -> Result<(), ValidationError> {
    if phone.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("digits").with_message("Phone must contain only digits".into()))
    }
}

impl From<&User> for AccountFields {
    fn from(user: &User) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone: user.phone.clone(),
            document_number: user.document_number.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub document_number: String,
    pub password: String,
}

impl RegisterRequest {
    /// Password rules are reported on their own, before the user fields.
    pub fn check_password(&self) -> Result<(), AppError> {
        if self.password.is_empty() {
            return Err(AppError::field("password", "Required"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::field("password", "Too short"));
        }
        Ok(())
    }

    pub fn fields(&self) -> AccountFields {
        AccountFields {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            document_number: self.document_number.trim().to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub phone: String,
    pub password: String,
}

impl LoginRequest {
    pub fn check_present(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::new();
        if self.phone.trim().is_empty() {
            errors.insert("phone".into(), vec!["Required".into()]);
        }
        if self.password.is_empty() {
            errors.insert("password".into(), vec!["Required".into()]);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::fields(errors))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfilePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub document_number: Option<String>,
}

impl From<ProfilePatch> for avia_core::ProfileUpdate {
    fn from(patch: ProfilePatch) -> Self {
        let trimmed = |value: Option<String>| value.map(|v| v.trim().to_string());
        Self {
            first_name: trimmed(patch.first_name),
            last_name: trimmed(patch.last_name),
            phone: trimmed(patch.phone),
            document_number: trimmed(patch.document_number),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AccountFields {
        AccountFields {
            first_name: "Ivan".into(),
            last_name: "Petrov".into(),
            phone: "79001234567".into(),
            document_number: "4510 123456".into(),
        }
    }

    #[test]
    fn test_valid_fields_pass() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_phone_rules() {
        let mut fields = valid();
        fields.phone = "+7900123456".into();
        let errors = fields.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("phone"));

        fields.phone = "12345".into();
        assert!(fields.validate().is_err());
    }

    #[test]
    fn test_short_name_is_rejected() {
        let mut fields = valid();
        fields.last_name = "P".into();
        let errors = fields.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("last_name"));
    }

    #[test]
    fn test_password_checked_first() {
        let mut request = RegisterRequest { password: String::new(), ..Default::default() };
        assert!(matches!(
            request.check_password(),
            Err(AppError::ValidationError { ref errors, .. }) if errors["password"] == ["Required"]
        ));

        request.password = "short".into();
        assert!(matches!(
            request.check_password(),
            Err(AppError::ValidationError { ref errors, .. }) if errors["password"] == ["Too short"]
        ));

        request.password = "long enough".into();
        assert!(request.check_password().is_ok());
    }

    #[test]
    fn test_login_reports_only_missing_fields() {
        let request = LoginRequest { phone: "79001234567".into(), password: String::new() };
        match request.check_present() {
            Err(AppError::ValidationError { errors, .. }) => {
                assert!(!errors.contains_key("phone"));
                assert_eq!(errors["password"], vec!["Required".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
