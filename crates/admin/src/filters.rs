//! Custom Askama template filters.

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Percent-encode a value for use inside a query string.
///
/// Usage in templates: `?search={{ search|query_value }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn query_value(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(urlencoding::encode(&value.to_string()).into_owned())
}
