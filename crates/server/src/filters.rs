//! Custom Askama template filters for the public share page.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use chrono::{Datelike, Utc};

/// Returns the current year, for the page footer.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    Ok(Utc::now().year())
}

/// Reduces a display phone number to a `tel:` href value, keeping digits
/// and a leading `+`.
///
/// Usage in templates: `<a href="tel:{{ phone|tel_href }}">`
#[askama::filter_fn]
pub fn tel_href(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(strip_tel(&value.to_string()))
}

fn strip_tel(raw: &str) -> String {
    raw.chars()
        .enumerate()
        .filter(|(i, c)| c.is_ascii_digit() || (*i == 0 && *c == '+'))
        .map(|(_, c)| c)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::strip_tel;

    #[test]
    fn test_strip_tel_removes_formatting() {
        assert_eq!(strip_tel("+1 (555) 010-2030"), "+15550102030");
    }

    #[test]
    fn test_strip_tel_keeps_plain_numbers() {
        assert_eq!(strip_tel("0215550123"), "0215550123");
    }
}
