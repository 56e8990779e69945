//! Input validation helpers shared by the auth, waiver, and contact forms

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email pattern"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{3})(\d{3})(\d{4})$").expect("static phone pattern"));

static SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[!@#$%^&*()_+\-=\[\]{};':"\\|,.<>/?]"#).expect("static special-char pattern")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn digits(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

/// US phone number, with or without country code
pub fn is_valid_phone(phone: &str) -> bool {
    matches!(digits(phone).len(), 10 | 11)
}

/// Format a 10-digit number as `(XXX) XXX-XXXX`; anything else is returned unchanged
pub fn format_phone_number(phone: &str) -> String {
    let cleaned = digits(phone);
    match PHONE_RE.captures(&cleaned) {
        Some(caps) => format!("({}) {}-{}", &caps[1], &caps[2], &caps[3]),
        None => phone.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordValidation {
    pub errors: Vec<&'static str>,
}

impl PasswordValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check password strength, reporting every rule that fails
pub fn validate_password(password: &str) -> PasswordValidation {
    let mut errors = Vec::new();

    if password.chars().count() < 8 {
        errors.push("Password must be at least 8 characters long");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("Password must contain at least one uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("Password must contain at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("Password must contain at least one number");
    }
    if !SPECIAL_RE.is_match(password) {
        errors.push("Password must contain at least one special character");
    }

    PasswordValidation { errors }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email() {
        assert!(is_valid_email("client@example.com"));
        assert!(!is_valid_email("client@example"));
        assert!(!is_valid_email("client example@x.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_phone() {
        assert!(is_valid_phone("(386) 387-1738"));
        assert!(is_valid_phone("+1 386 387 1738"));
        assert!(!is_valid_phone("387-1738"));
    }

    #[test]
    fn test_format_phone() {
        assert_eq!(format_phone_number("3863871738"), "(386) 387-1738");
        assert_eq!(format_phone_number("386.387.1738"), "(386) 387-1738");
        assert_eq!(format_phone_number("13863871738"), "13863871738");
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("Shoreline#42").is_valid());

        let weak = validate_password("abc");
        assert_eq!(weak.errors.len(), 4);
        assert!(weak
            .errors
            .contains(&"Password must be at least 8 characters long"));
        assert!(!weak
            .errors
            .contains(&"Password must contain at least one lowercase letter"));
    }
}
