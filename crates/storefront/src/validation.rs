//! Account form validation.
//!
//! Forms are validated before any backend call. Each validator returns the
//! backend payload on success, or the per-field messages to render next to
//! the inputs.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use cafe_origen_core::{Email, EmailError};

use crate::backend::{ProfileUpdate, Registration, UserProfile};

/// Spanish mobile format used by the shop: `+34-XXX-XX-XX-XX`.
#[allow(clippy::expect_used)]
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+34-\d{3}-\d{2}-\d{2}-\d{2}$").expect("phone pattern is a valid regex")
});

/// Minimum password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Field name to error message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    /// The message for a field, if it failed validation.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, Self> {
        if self.is_empty() { Ok(value()) } else { Err(self) }
    }
}

// =============================================================================
// Field Rules
// =============================================================================

fn char_len(value: &str) -> usize {
    value.chars().count()
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    match Email::parse(email) {
        Ok(_) => {}
        Err(EmailError::Empty) => errors.add("email", "Email is required"),
        Err(_) => errors.add("email", "Email is invalid"),
    }
}

fn check_min_len(
    errors: &mut FieldErrors,
    field: &'static str,
    label: &str,
    value: &str,
    min: usize,
) {
    if value.is_empty() {
        errors.add(field, format!("{label} is required"));
    } else if char_len(value) < min {
        errors.add(
            field,
            format!("{label} must be at least {min} characters long"),
        );
    }
}

fn check_phone(errors: &mut FieldErrors, phone: &str) {
    if !PHONE_RE.is_match(phone) {
        errors.add(
            "phone",
            "Phone number must be in the format +34-XXX-XX-XX-XX",
        );
    }
}

fn check_password_pair(errors: &mut FieldErrors, password: &str, confirm: &str) {
    if char_len(password) < MIN_PASSWORD_LEN {
        errors.add(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters long"),
        );
    }
    if password != confirm {
        errors.add("confirm_password", "Passwords do not match");
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// =============================================================================
// Profile
// =============================================================================

/// Profile edit form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub email: String,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub password: String,
    pub confirm_password: String,
}

impl ProfileForm {
    /// Prefill the form from the backend profile. Password fields stay blank.
    #[must_use]
    pub fn from_profile(user: &UserProfile) -> Self {
        Self {
            email: user.email.clone(),
            user_name: user.user_name.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone: user.phone.clone(),
            address: user.address.clone(),
            password: String::new(),
            confirm_password: String::new(),
        }
    }

    /// Copy of the form with the password fields cleared, for re-rendering.
    #[must_use]
    pub fn without_passwords(&self) -> Self {
        Self {
            password: String::new(),
            confirm_password: String::new(),
            ..self.clone()
        }
    }

    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns the failing fields and their messages.
    pub fn validate(&self) -> Result<ProfileUpdate, FieldErrors> {
        let email = self.email.trim();
        let user_name = self.user_name.trim();
        let first_name = self.first_name.trim();
        let last_name = self.last_name.trim();
        let phone = self.phone.trim();
        let address = self.address.trim();

        let mut errors = FieldErrors::default();
        check_email(&mut errors, email);
        check_min_len(&mut errors, "user_name", "Username", user_name, 3);
        check_min_len(&mut errors, "first_name", "First name", first_name, 2);
        check_min_len(&mut errors, "last_name", "Last name", last_name, 2);
        if phone.is_empty() {
            errors.add("phone", "Phone number is required");
        } else {
            check_phone(&mut errors, phone);
        }
        check_min_len(&mut errors, "address", "Address", address, 5);
        if !self.password.is_empty() {
            check_password_pair(&mut errors, &self.password, &self.confirm_password);
        }

        errors.into_result(|| ProfileUpdate {
            email: email.to_string(),
            user_name: user_name.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            phone: phone.to_string(),
            address: address.to_string(),
            password: (!self.password.is_empty()).then(|| self.password.clone()),
        })
    }
}

// =============================================================================
// Registration
// =============================================================================

/// Registration form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub email: String,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    /// Copy of the form with the password fields cleared, for re-rendering.
    #[must_use]
    pub fn without_passwords(&self) -> Self {
        Self {
            password: String::new(),
            confirm_password: String::new(),
            ..self.clone()
        }
    }

    /// Validate the form.
    ///
    /// Phone, names and address are optional here; a phone that is given
    /// must still follow the shop format.
    ///
    /// # Errors
    ///
    /// Returns the failing fields and their messages.
    pub fn validate(&self) -> Result<Registration, FieldErrors> {
        let email = self.email.trim();
        let user_name = self.user_name.trim();
        let phone = self.phone.trim();

        let mut errors = FieldErrors::default();
        check_email(&mut errors, email);
        check_min_len(&mut errors, "user_name", "Username", user_name, 3);
        if !phone.is_empty() {
            check_phone(&mut errors, phone);
        }
        check_password_pair(&mut errors, &self.password, &self.confirm_password);

        errors.into_result(|| Registration {
            email: email.to_string(),
            user_name: user_name.to_string(),
            password: self.password.clone(),
            first_name: non_empty(&self.first_name),
            last_name: non_empty(&self.last_name),
            phone: non_empty(phone),
            address: non_empty(&self.address),
            is_active: true,
        })
    }
}

// =============================================================================
// Login
// =============================================================================

/// Login form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    /// Local path to return to after login.
    pub return_to: Option<String>,
}

impl LoginForm {
    /// Validate the form, returning the trimmed email.
    ///
    /// # Errors
    ///
    /// Returns the failing fields and their messages.
    pub fn validate(&self) -> Result<String, FieldErrors> {
        let email = self.email.trim();

        let mut errors = FieldErrors::default();
        if email.is_empty() {
            errors.add("email", "Email is required");
        }
        if self.password.is_empty() {
            errors.add("password", "Password is required");
        }

        errors.into_result(|| email.to_string())
    }
}

/// Accept a redirect target only if it is a path on this site.
#[must_use]
pub fn safe_return_path(candidate: Option<&str>) -> Option<&str> {
    candidate.filter(|path| {
        path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn valid_profile() -> ProfileForm {
        ProfileForm {
            email: "ana@example.com".to_string(),
            user_name: "ana".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Ruiz".to_string(),
            phone: "+34-600-12-34-56".to_string(),
            address: "Calle Mayor 1".to_string(),
            password: String::new(),
            confirm_password: String::new(),
        }
    }

    #[test]
    fn test_valid_profile_without_password() {
        let update = valid_profile().validate().unwrap();
        assert_eq!(update.user_name, "ana");
        assert!(update.password.is_none());
    }

    #[test]
    fn test_profile_trims_fields() {
        let form = ProfileForm {
            user_name: "  ana  ".to_string(),
            ..valid_profile()
        };
        assert_eq!(form.validate().unwrap().user_name, "ana");
    }

    #[test]
    fn test_profile_required_fields() {
        let errors = ProfileForm::default().validate().unwrap_err();
        assert_eq!(errors.get("email"), Some("Email is required"));
        assert_eq!(errors.get("user_name"), Some("Username is required"));
        assert_eq!(errors.get("first_name"), Some("First name is required"));
        assert_eq!(errors.get("last_name"), Some("Last name is required"));
        assert_eq!(errors.get("phone"), Some("Phone number is required"));
        assert_eq!(errors.get("address"), Some("Address is required"));
        assert!(errors.get("password").is_none());
    }

    #[test]
    fn test_profile_minimum_lengths_count_characters() {
        let form = ProfileForm {
            user_name: "an".to_string(),
            first_name: "Á".to_string(),
            address: "Ñuño".to_string(),
            ..valid_profile()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors.get("user_name"),
            Some("Username must be at least 3 characters long")
        );
        assert!(errors.get("first_name").is_some());
        assert!(errors.get("address").is_some());

        // Two characters, four bytes
        let form = ProfileForm {
            first_name: "Íñ".to_string(),
            ..valid_profile()
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_phone_format() {
        for bad in ["600123456", "+34 600 12 34 56", "+34-600-12-34-5", "+33-600-12-34-56"] {
            let form = ProfileForm {
                phone: bad.to_string(),
                ..valid_profile()
            };
            let errors = form.validate().unwrap_err();
            assert_eq!(
                errors.get("phone"),
                Some("Phone number must be in the format +34-XXX-XX-XX-XX"),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_invalid_email() {
        let form = ProfileForm {
            email: "ana@localhost".to_string(),
            ..valid_profile()
        };
        assert_eq!(
            form.validate().unwrap_err().get("email"),
            Some("Email is invalid")
        );
    }

    #[test]
    fn test_profile_password_rules_apply_only_when_given() {
        let form = ProfileForm {
            password: "abc".to_string(),
            confirm_password: "abd".to_string(),
            ..valid_profile()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors.get("password"),
            Some("Password must be at least 6 characters long")
        );
        assert_eq!(errors.get("confirm_password"), Some("Passwords do not match"));

        let form = ProfileForm {
            password: "secreto1".to_string(),
            confirm_password: "secreto1".to_string(),
            ..valid_profile()
        };
        assert_eq!(form.validate().unwrap().password.as_deref(), Some("secreto1"));
    }

    #[test]
    fn test_without_passwords_blanks_both() {
        let form = ProfileForm {
            password: "secreto1".to_string(),
            confirm_password: "secreto1".to_string(),
            ..valid_profile()
        }
        .without_passwords();
        assert!(form.password.is_empty());
        assert!(form.confirm_password.is_empty());
        assert_eq!(form.email, "ana@example.com");
    }

    #[test]
    fn test_register_requires_matching_passwords() {
        let form = RegisterForm {
            email: "ana@example.com".to_string(),
            user_name: "ana".to_string(),
            password: "secreto1".to_string(),
            confirm_password: "secreto2".to_string(),
            ..RegisterForm::default()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("confirm_password"), Some("Passwords do not match"));
    }

    #[test]
    fn test_register_optional_phone() {
        let form = RegisterForm {
            email: "ana@example.com".to_string(),
            user_name: "ana".to_string(),
            password: "secreto1".to_string(),
            confirm_password: "secreto1".to_string(),
            ..RegisterForm::default()
        };
        let registration = form.clone().validate().unwrap();
        assert!(registration.phone.is_none());
        assert!(registration.is_active);

        let form = RegisterForm {
            phone: "12345".to_string(),
            ..form
        };
        assert!(form.validate().unwrap_err().get("phone").is_some());
    }

    #[test]
    fn test_login_requires_both_fields() {
        let errors = LoginForm::default().validate().unwrap_err();
        assert_eq!(errors.get("email"), Some("Email is required"));
        assert_eq!(errors.get("password"), Some("Password is required"));

        let form = LoginForm {
            email: " ana@example.com ".to_string(),
            password: "x".to_string(),
            return_to: None,
        };
        assert_eq!(form.validate().unwrap(), "ana@example.com");
    }

    #[test]
    fn test_safe_return_path() {
        assert_eq!(safe_return_path(Some("/products/3")), Some("/products/3"));
        assert_eq!(safe_return_path(Some("//evil.example")), None);
        assert_eq!(safe_return_path(Some("https://evil.example")), None);
        assert_eq!(safe_return_path(Some("/\\evil.example")), None);
        assert_eq!(safe_return_path(None), None);
    }
}
