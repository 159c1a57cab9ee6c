//! Authentication-related models

use super::user::{Role, UserResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Sign-up request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(length(min = 2, max = 255, message = "Name must be between 2 and 255 characters"))]
    pub name: String,
    #[validate(
        email(message = "Email must be a valid email address"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: String,
    #[validate(length(min = 6, max = 128, message = "Password must be between 6 and 128 characters"))]
    pub password: String,
    #[validate(custom(function = "validate_signup_role"))]
    pub role: Option<Role>,
}

impl SignUpRequest {
    /// Trims the free-text fields and lowercases the email before validation
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: normalize_email(&self.email),
            password: self.password,
            role: self.role,
        }
    }
}

/// Sign-in request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl SignInRequest {
    pub fn normalized(self) -> Self {
        Self {
            email: normalize_email(&self.email),
            password: self.password,
        }
    }
}

/// Input of `AuthService::create_user`
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl From<SignUpRequest> for CreateUser {
    fn from(req: SignUpRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
            password: req.password,
            role: req.role.unwrap_or_default(),
        }
    }
}

/// Input of `AuthService::authenticate_user`
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl From<SignInRequest> for Credentials {
    fn from(req: SignInRequest) -> Self {
        Self {
            email: req.email,
            password: req.password,
        }
    }
}

/// Identity embedded in a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration (unix seconds)
    pub exp: i64,
}

/// Body returned by sign-up, sign-in and profile
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: UserResponse,
}

/// Plain message body
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_signup_role(role: &Role) -> Result<(), ValidationError> {
    if role.is_persistable() {
        Ok(())
    } else {
        Err(ValidationError::new("role")
            .with_message("Role must be one of: user, admin".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(name: &str, email: &str, password: &str, role: Option<Role>) -> SignUpRequest {
        SignUpRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role,
        }
    }

    #[test]
    fn test_valid_signup() {
        let req = signup("Ann", "ann@x.com", "secret123", None);
        assert!(req.validate().is_ok());
        assert_eq!(CreateUser::from(req).role, Role::User);
    }

    #[test]
    fn test_signup_field_errors() {
        let req = signup("A", "not-an-email", "123", None);
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();

        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_signup_rejects_guest_role() {
        let req = signup("Ann", "ann@x.com", "secret123", Some(Role::Guest));
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("role"));

        let admin = signup("Ann", "ann@x.com", "secret123", Some(Role::Admin));
        assert!(admin.validate().is_ok());
    }

    #[test]
    fn test_normalization() {
        let req = signup("  Ann  ", "  Ann@X.com ", "secret123", None).normalized();
        assert_eq!(req.name, "Ann");
        assert_eq!(req.email, "ann@x.com");
        assert_eq!(req.password, "secret123");

        let signin = SignInRequest {
            email: " ANN@x.com".to_string(),
            password: " pw ".to_string(),
        }
        .normalized();
        assert_eq!(signin.email, "ann@x.com");
        assert_eq!(signin.password, " pw ");
    }
}
