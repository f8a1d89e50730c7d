//! Request field validation
//!
//! Each check returns the first violation as a 400.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::ApiError;

static EMAIL: OnceLock<Regex> = OnceLock::new();
static ID_CARD: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Bad email regex"))
}

fn id_card_regex() -> &'static Regex {
    ID_CARD.get_or_init(|| {
        Regex::new(r"^[1-9]\d{5}(18|19|20)\d{2}(0[1-9]|1[0-2])(0[1-9]|[12]\d|3[01])\d{3}[\dXx]$")
            .expect("Bad id card regex")
    })
}

/// `value` must be between `min` and `max` characters
pub fn length(field: &str, value: &str, min: usize, max: usize) -> Result<(), ApiError> {
    let len = value.chars().count();
    if len < min || len > max {
        if min == 0 {
            return Err(ApiError::bad_request(format!(
                "{} must be at most {} characters",
                field, max
            )));
        }
        return Err(ApiError::bad_request(format!(
            "{} must be between {} and {} characters",
            field, min, max
        )));
    }
    Ok(())
}

/// Optional value capped at `max` characters
pub fn max_length(field: &str, value: Option<&str>, max: usize) -> Result<(), ApiError> {
    match value {
        Some(v) => length(field, v, 0, max),
        None => Ok(()),
    }
}

pub fn is_email(value: &str) -> bool {
    email_regex().is_match(value)
}

pub fn email(value: &str) -> Result<(), ApiError> {
    if is_email(value) {
        Ok(())
    } else {
        Err(ApiError::bad_request("Invalid email address"))
    }
}

pub fn is_url(value: &str) -> bool {
    url::Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Absent, empty, or an http(s) URL
pub fn url_or_empty(field: &str, value: Option<&str>) -> Result<(), ApiError> {
    match value {
        Some(v) if !v.is_empty() && !is_url(v) => {
            Err(ApiError::bad_request(format!("{} must be a valid URL", field)))
        }
        _ => Ok(()),
    }
}

pub fn password(value: &str) -> Result<(), ApiError> {
    if value.chars().count() < 6 {
        return Err(ApiError::bad_request("Password must be at least 6 characters"));
    }
    Ok(())
}

/// 18 character resident identity number
pub fn is_id_card(value: &str) -> bool {
    id_card_regex().is_match(value)
}

/// Empty strings from forms count as absent
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
