//! Input validation helpers

use crate::error::{DomainError, DomainResult};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email regex is valid")
});

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 8;

/// Trimmed, non-empty string of at most `max` characters
pub fn required(field: &str, value: &str, max: usize) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > max {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Like [`required`] but maps blank input to `None`
pub fn optional(field: &str, value: Option<&str>, max: usize) -> DomainResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => required(field, v, max).map(Some),
    }
}

/// Normalized (trimmed, lower-cased) email address
pub fn email(value: &str) -> DomainResult<String> {
    let normalized = value.trim().to_lowercase();
    if normalized.len() > 254 || !EMAIL_RE.is_match(&normalized) {
        return Err(DomainError::validation(format!(
            "'{}' is not a valid email address",
            value.trim()
        )));
    }
    Ok(normalized)
}

/// Start must not be after end
pub fn date_range(start: NaiveDate, end: NaiveDate) -> DomainResult<()> {
    if start > end {
        return Err(DomainError::validation(format!(
            "start date {start} is after end date {end}"
        )));
    }
    Ok(())
}

/// At least [`MIN_PASSWORD_LEN`] characters with a letter and a digit
pub fn password(value: &str) -> DomainResult<()> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let has_letter = value.chars().any(char::is_alphabetic);
    let has_digit = value.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err(DomainError::validation(
            "password must contain a letter and a digit",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        assert_eq!(email("  Jane.Doe@Uni.EDU ").unwrap(), "jane.doe@uni.edu");
    }

    #[test]
    fn bad_emails_are_rejected() {
        for bad in ["", "plain", "a@b", "@uni.edu", "a b@uni.edu"] {
            assert!(email(bad).is_err(), "{bad} accepted");
        }
    }

    #[test]
    fn required_trims_and_limits() {
        assert_eq!(required("name", "  x ", 5).unwrap(), "x");
        assert!(required("name", "   ", 5).is_err());
        assert!(required("name", "abcdef", 5).is_err());
    }

    #[test]
    fn optional_blank_is_none() {
        assert_eq!(optional("phone", Some("  "), 10).unwrap(), None);
        assert_eq!(optional("phone", None, 10).unwrap(), None);
        assert_eq!(optional("phone", Some("123"), 10).unwrap(), Some("123".into()));
    }

    #[test]
    fn password_policy() {
        assert!(password("short1").is_err());
        assert!(password("allletters").is_err());
        assert!(password("12345678").is_err());
        assert!(password("letters123").is_ok());
    }

    #[test]
    fn reversed_range_is_rejected() {
        let a = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        assert!(date_range(a, b).is_ok());
        assert!(date_range(a, a).is_ok());
        assert!(date_range(b, a).is_err());
    }
}
