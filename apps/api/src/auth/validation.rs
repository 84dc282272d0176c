//! Input validation for registration and profile data.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::AppError;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;
const MAX_EMAIL_LENGTH: usize = 120;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid regex")
});
static USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]{3,30}$").expect("valid regex"));
static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z\s'-]+$").expect("valid regex"));
static LINKEDIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(www\.)?linkedin\.com/in/[\w\-]+/?$").expect("valid regex")
});

const DISPOSABLE_DOMAINS: &[&str] = &[
    "10minutemail.com",
    "guerrillamail.com",
    "tempmail.org",
    "throwaway.email",
    "temp-mail.org",
    "mailinator.com",
];

const RESERVED_USERNAMES: &[&str] = &[
    "admin",
    "administrator",
    "root",
    "system",
    "api",
    "www",
    "mail",
    "email",
    "support",
    "help",
    "info",
    "contact",
    "talentiq",
    "talent",
    "recruiter",
    "candidate",
];

const WEAK_PASSWORDS: &[&str] = &[
    "password",
    "12345678",
    "qwerty123",
    "abc123456",
    "password123",
    "admin123",
    "letmein123",
];

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".into());
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(format!("Email must be less than {MAX_EMAIL_LENGTH} characters"));
    }
    if !EMAIL.is_match(email) {
        return Err("Please enter a valid email address".into());
    }
    let domain = email
        .rsplit_once('@')
        .map(|(_, d)| d.to_ascii_lowercase())
        .unwrap_or_default();
    if DISPOSABLE_DOMAINS.contains(&domain.as_str()) {
        return Err("Disposable email addresses are not allowed".into());
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".into());
    }
    if !USERNAME.is_match(username) {
        return Err(
            "Username must be 3-30 characters of letters, numbers, and underscores".into(),
        );
    }
    if RESERVED_USERNAMES.contains(&username.to_ascii_lowercase().as_str()) {
        return Err("This username is reserved, please choose another".into());
    }
    Ok(())
}

/// Returns every rule the password breaks.
pub fn validate_password(password: &str, username: Option<&str>) -> Result<(), Vec<String>> {
    if password.is_empty() {
        return Err(vec!["Password is required".into()]);
    }
    let mut errors = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        ));
    }
    if password.chars().count() > MAX_PASSWORD_LENGTH {
        errors.push(format!(
            "Password must be less than {MAX_PASSWORD_LENGTH} characters long"
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("Password must contain at least one lowercase letter".into());
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("Password must contain at least one uppercase letter".into());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("Password must contain at least one number".into());
    }
    if !password.chars().any(|c| "@$!%*?&".contains(c)) {
        errors.push("Password must contain at least one special character (@$!%*?&)".into());
    }
    if WEAK_PASSWORDS.contains(&password.to_lowercase().as_str()) {
        errors.push("Password is too common, please choose a stronger password".into());
    }
    if let Some(u) = username.filter(|u| !u.is_empty()) {
        if password.to_lowercase().contains(&u.to_lowercase()) {
            errors.push("Password cannot contain your username".into());
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn validate_name(name: &str, field: &str) -> Result<(), String> {
    let len = name.chars().count();
    if len == 0 {
        return Err(format!("{field} is required"));
    }
    if !(2..=50).contains(&len) {
        return Err(format!("{field} must be between 2 and 50 characters long"));
    }
    if !NAME.is_match(name) {
        return Err(format!(
            "{field} can only contain letters, spaces, hyphens, and apostrophes"
        ));
    }
    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<(), String> {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if digits < 10 {
        return Err("Phone number must be at least 10 digits".into());
    }
    if digits > 15 {
        return Err("Phone number is too long".into());
    }
    Ok(())
}

pub fn validate_linkedin_url(url: &str) -> Result<(), String> {
    if LINKEDIN.is_match(url) {
        Ok(())
    } else {
        Err("Please enter a valid LinkedIn profile URL".into())
    }
}

/// Normalizes North American numbers to `+1XXXXXXXXXX`; other inputs keep digits and `+`.
pub fn normalize_phone(phone: &str) -> String {
    let cleaned: String = phone
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();
    if cleaned.starts_with("+1") {
        return cleaned;
    }
    if cleaned.len() == 11 && cleaned.starts_with('1') {
        return format!("+{cleaned}");
    }
    if cleaned.len() == 10 && cleaned.chars().all(|c| c.is_ascii_digit()) {
        return format!("+1{cleaned}");
    }
    cleaned
}

/// Login throttling hook. No limiter is wired yet, so every attempt is allowed.
pub fn check_rate_limit(_client_key: &str, _action: &str) -> bool {
    true
}

/// Collapses field errors into a single 400.
pub fn collect(results: Vec<Result<(), String>>) -> Result<(), AppError> {
    let errors: Vec<String> = results.into_iter().filter_map(Result::err).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors.join("; ")))
    }
}
